//! Wire codec for the price feed
//!
//! Two message shapes travel on a connection, with no type tag in the byte
//! stream:
//!
//! - `Directory { symbols: repeated string = 1; names: repeated string = 2 }`
//! - `Update { data: repeated double = 1 [packed] }`, 7 doubles per record
//!
//! Both are protobuf-compatible. Which shape a frame holds is decided by its
//! position on the connection: the first frame is the directory, everything
//! after it is an update. [`DecodeSession`] enforces that convention as a
//! two-state machine and hands out the tagged [`WireMessage`] variant.

pub mod codec;
pub mod messages;
pub mod session;

pub use codec::{
    decode_directory, decode_update, encode, encode_directory, encode_update, DecodeError,
    WireMessage,
};
pub use session::{DecodeSession, SessionState};
