/// Represents all possible errors that can occur while talking to the inverter.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The outbound payload does not fit into a single frame.
    #[error("payload of {0} bytes exceeds the protocol maximum of {max} bytes", max = crate::protocol::MAX_PAYLOAD)]
    PayloadTooLarge(usize),

    /// The serial port accepted fewer bytes than the frame contains.
    #[error("short write: {written} of {expected} bytes sent")]
    ShortWrite { written: usize, expected: usize },

    /// The inverter's response is too short for the current protocol step.
    #[error("short response: got {actual} bytes, expected at least {expected}")]
    ShortResponse { actual: usize, expected: usize },

    /// A transport fault that is not a "no data yet" condition.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
