//! Error types for ordmap

use std::fmt;

/// Result type alias for ordmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for map operations
#[derive(Debug)]
pub enum Error {
    /// Head/tail links disagree with the index or the recorded size.
    ///
    /// This is always a bug in the map itself and is never retried.
    InvalidList(String),

    /// The map was structurally modified while an iteration was in flight
    ModifiedDuringIteration,

    /// A cursor was stepped against a map other than the one that made it
    ForeignCursor,

    /// JSON encode/decode failure
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidList(msg) => write!(f, "Invalid list: {}", msg),
            Error::ModifiedDuringIteration => write!(f, "Map modified during iteration"),
            Error::ForeignCursor => write!(f, "Cursor used with a map it was not created from"),
            Error::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

pub(crate) fn invalid_list(msg: impl Into<String>) -> Error {
    Error::InvalidList(msg.into())
}

/// Abort the current operation on an error that can only come from a bug or
/// from a broken iteration contract. Neither is recoverable.
#[cold]
#[track_caller]
pub(crate) fn fatal(err: Error) -> ! {
    panic!("{}", err)
}
