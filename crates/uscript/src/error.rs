//! Protocol error types

use std::io;

/// Errors raised while exchanging messages with the editor
#[derive(Debug)]
pub enum ProtocolError {
    /// Reading from or writing to the channel failed
    Io(io::Error),
    /// A message without a non-empty `id`
    MissingId(String),
    /// A request without a method
    BadRequest(String),
    /// A line that cannot be a response to an outstanding request
    BadResponse(String),
    /// A response that answers some other request
    IdMismatch { expected: String, actual: String },
    /// The stream ended while a response was outstanding
    Closed,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
            ProtocolError::MissingId(line) => write!(f, "Bad editor msg; no id: '{}'", line),
            ProtocolError::BadRequest(line) => write!(f, "Bad editor request: '{}'", line),
            ProtocolError::BadResponse(line) => write!(f, "Bad editor response: '{}'", line),
            ProtocolError::IdMismatch { expected, actual } => write!(
                f,
                "Mismatched id: expected '{}', got '{}'",
                expected, actual
            ),
            ProtocolError::Closed => write!(f, "Editor closed the channel"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        ProtocolError::Io(e)
    }
}
