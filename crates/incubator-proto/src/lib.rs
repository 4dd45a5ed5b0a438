#![deny(clippy::all)]

//! CO₂ sensor wire protocol.
//!
//! The sensor speaks a framed ASCII/binary hybrid over a plain serial line:
//! short ASCII command/reply lines terminated by LF, plus an alternate
//! 7-byte binary frame for readings. Values are reported pre-scaled by a
//! multiplier (1, 10, or 100) that must be queried once at open time and
//! then applied by the caller to every subsequent ASCII reading (binary
//! frames carry the ppm value directly, independent of the multiplier).

mod codec;
mod frame;
mod multiplier;

pub use codec::Co2Codec;
pub use frame::{parse_frame, Frame};
pub use multiplier::{parse_multiplier_reply, Multiplier};

/// Sent at open time to ask the sensor for its reporting multiplier.
pub const MULTIPLIER_QUERY: &[u8] = b".";

/// Sent at open time (after the multiplier reply) to switch the sensor into
/// polling mode, where it answers a read request with a single value.
pub const POLLING_MODE_SET: &[u8] = b"K 2";

/// Errors raised while parsing a frame from the wire.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("frame incomplete, need more data")]
    Incomplete,
    #[error("malformed frame: {0}")]
    Malformed(&'static str),
}
