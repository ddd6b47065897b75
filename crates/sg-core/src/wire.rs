//! Subspace frame layout.
//!
//! Every payload travels as two writes: an 8-byte header holding the
//! payload length as left-justified, space-padded ASCII decimal, then
//! the UTF-8 payload itself. Status replies are the one exception, a
//! bare 8-byte frame with no header. Both sides of the wire share this
//! module's encoding.

use std::str::FromStr;
use std::fmt;

use crate::address::DialAddress;
use crate::constants::{
    CENTRE_BUTTON_INCOMING, DISCONNECT, HEADER_LEN, STATUS_QUERY, STATUS_REPLY_LEN,
};

/// Framing failures. These stay local to whichever side hit them and
/// never cross a component boundary as a panic.
#[derive(Debug, PartialEq, Eq)]
pub enum WireError {
    /// Payload length does not fit the 8-digit decimal header.
    PayloadTooLarge(usize),
    /// Header bytes were not ASCII digits padded with spaces.
    BadHeader([u8; HEADER_LEN]),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::PayloadTooLarge(len) => {
                write!(f, "payload of {len} bytes exceeds the header range")
            }
            WireError::BadHeader(bytes) => write!(f, "malformed frame header: {bytes:?}"),
        }
    }
}

impl std::error::Error for WireError {}

/// Encode a payload length as the frame header.
pub fn encode_header(payload_len: usize) -> Result<[u8; HEADER_LEN], WireError> {
    let digits = payload_len.to_string();
    if digits.len() > HEADER_LEN {
        return Err(WireError::PayloadTooLarge(payload_len));
    }
    let mut header = [b' '; HEADER_LEN];
    header[..digits.len()].copy_from_slice(digits.as_bytes());
    Ok(header)
}

/// Decode a frame header back to the payload length. Rejects anything
/// that is not digits followed by pad spaces.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<usize, WireError> {
    let text = std::str::from_utf8(header).map_err(|_| WireError::BadHeader(*header))?;
    let digits = text.trim_end_matches(' ');
    if digits.is_empty() {
        return Err(WireError::BadHeader(*header));
    }
    digits
        .parse::<usize>()
        .map_err(|_| WireError::BadHeader(*header))
}

/// Pad a status token into the bare 8-byte reply frame.
pub fn encode_status_reply(token: &str) -> [u8; STATUS_REPLY_LEN] {
    let mut reply = [b' '; STATUS_REPLY_LEN];
    let bytes = token.as_bytes();
    let len = bytes.len().min(STATUS_REPLY_LEN);
    reply[..len].copy_from_slice(&bytes[..len]);
    reply
}

/// Strip the pad from a received status reply.
pub fn decode_status_reply(reply: &[u8; STATUS_REPLY_LEN]) -> String {
    String::from_utf8_lossy(reply).trim_end_matches(' ').to_string()
}

/// Every payload a gate sends or understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubspaceMessage {
    /// A dialed address rendered as glyph numbers: `[7, 32, 27]`. Tells
    /// the receiver a wormhole is being opened toward it.
    Dial(DialAddress),
    /// The sender pressed its centre button mid-connection.
    CentreButtonIncoming,
    /// Ask for the receiver's wormhole state; obligates one status
    /// reply frame.
    StatusQuery,
    /// Courtesy end-of-exchange marker, always sent last.
    Disconnect,
}

impl SubspaceMessage {
    pub fn render(&self) -> String {
        match self {
            SubspaceMessage::Dial(address) => address.to_string(),
            SubspaceMessage::CentreButtonIncoming => CENTRE_BUTTON_INCOMING.to_string(),
            SubspaceMessage::StatusQuery => STATUS_QUERY.to_string(),
            SubspaceMessage::Disconnect => DISCONNECT.to_string(),
        }
    }

    /// Parse a received payload. Unknown payloads are `None`; the
    /// listener logs and drops them.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            CENTRE_BUTTON_INCOMING => Some(SubspaceMessage::CentreButtonIncoming),
            STATUS_QUERY => Some(SubspaceMessage::StatusQuery),
            DISCONNECT => Some(SubspaceMessage::Disconnect),
            other => DialAddress::from_str(other).ok().map(SubspaceMessage::Dial),
        }
    }

    /// Whether the receiver owes a status reply frame for this payload.
    pub fn expects_reply(&self) -> bool {
        matches!(self, SubspaceMessage::StatusQuery)
    }
}
