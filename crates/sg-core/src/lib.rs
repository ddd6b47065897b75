//! Dialing session and subspace protocol engine.
//!
//! The gate's only real state-transition logic lives here: accumulating
//! a dialed address from raw dialer input, deciding when a wormhole
//! opens, closes, or aborts, and the frame layout of the peer-to-peer
//! subspace protocol. Zero I/O: hardware, persistence, and sockets
//! belong to the caller, driven by the [`session::Effect`]s each
//! transition emits.

pub mod address;
pub mod book;
pub mod codec;
pub mod constants;
pub mod session;
pub mod symbol;
pub mod wire;

pub use address::{DialAddress, ParseAddressError};
pub use book::{AddressBook, GateEntry};
pub use codec::{DialInput, classify};
pub use constants::{
    BLACK_HOLE, DEFAULT_SUBSPACE_PORT, DEFAULT_TIMEOUT_SECS, DISCONNECT, HEADER_LEN, STATUS_IDLE,
    STATUS_QUERY, STATUS_REPLY_LEN, SYMBOL_COUNT, UNKNOWN_GATE,
};
pub use session::{CueContext, DialingSession, Direction, Effect, SessionEvent, WormholeState};
pub use symbol::Symbol;
pub use wire::{
    SubspaceMessage, WireError, decode_header, decode_status_reply, encode_header,
    encode_status_reply,
};
