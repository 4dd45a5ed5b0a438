use std::io;

/// Errors surfaced at the HAL boundary.
///
/// Every blocking call into a probe or relay converts its underlying
/// failure (I2C error, serial timeout, GPIO fault) into one of these
/// variants; nothing above this boundary ever sees the original exception
/// type the driver library raised.
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("operation timed out")]
    Timeout,

    #[error("malformed frame: {0}")]
    BadFrame(String),

    #[error("device not connected")]
    Disconnected,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
