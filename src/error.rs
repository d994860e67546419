//! Error types
//!
//! Publishing never fails from the producer's point of view, so the only
//! errors surfaced by this crate come from the observer side: forwarding an
//! item across the transport boundary, or encoding it for the wire.

use std::fmt;
use std::io;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for observer-side operations
#[derive(Debug)]
pub enum Error {
    /// I/O failure while writing to an observer connection
    Io(io::Error),
    /// The observer's receiving end has gone away
    SinkClosed,
    /// Any other failure reported by a transport sink
    Transport(String),
    /// Failed to encode an item for the wire
    Serialization(serde_json::Error),
}

impl Error {
    /// Create a transport error from any message
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Whether this error means the observer connection is gone
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::SinkClosed => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::SinkClosed => write!(f, "Observer sink closed"),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e)
    }
}
