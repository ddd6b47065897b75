/// Number of glyphs on the dialer. Addresses draw from this domain.
pub const SYMBOL_COUNT: u8 = 39;

/// Frame header size: payload length as ASCII decimal digits,
/// left-justified and padded with spaces.
pub const HEADER_LEN: usize = 8;

/// Status replies are a bare fixed-size frame with no length header.
pub const STATUS_REPLY_LEN: usize = 8;

/// Courtesy payload sent last on every exchange.
pub const DISCONNECT: &str = "!DISCONNECT";

/// Payload asking the remote gate for its wormhole state.
pub const STATUS_QUERY: &str = "what_is_your_status";

/// Payload telling the remote gate our centre button was pressed.
pub const CENTRE_BUTTON_INCOMING: &str = "centre_button_incoming";

/// Status-reply token of a gate with no open wormhole.
pub const STATUS_IDLE: &str = "False";

/// Reverse-lookup result for network addresses absent from the book.
pub const UNKNOWN_GATE: &str = "Unknown";

/// Reserved permanent-connection destination. A wormhole dialed to this
/// address ignores the centre-button cancel gesture.
pub const BLACK_HOLE: [u8; 6] = [5, 14, 22, 31, 8, 25];

/// Default subspace TCP port.
pub const DEFAULT_SUBSPACE_PORT: u16 = 3838;

/// Default connect/IO timeout for a single subspace exchange (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
