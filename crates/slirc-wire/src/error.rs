//! Error types for the wire layer.

use thiserror::Error;

/// Convenience alias for results carrying a [`WireError`].
pub type Result<T, E = WireError> = std::result::Result<T, E>;

/// Errors raised while framing, decoding, or parsing IRC lines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WireError {
    /// I/O error from the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the codec's length limit.
    #[error("line too long: {actual} bytes (limit {limit})")]
    LineTooLong {
        /// Length seen so far.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// An outbound line carries a character that would end it early.
    #[error("illegal control character {0:?} in line")]
    IllegalControlChar(char),

    /// The requested character encoding label is not known.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// A line could not be parsed as an IRC message.
    #[error("invalid message {line:?}: {cause}")]
    InvalidMessage {
        /// The offending line.
        line: String,
        /// What went wrong.
        cause: ParseErrorKind,
    },
}

/// Why a line failed to parse.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Nothing but whitespace.
    #[error("empty message")]
    Empty,
    /// The command token is missing or malformed.
    #[error("invalid command at byte {0}")]
    InvalidCommand(usize),
}
