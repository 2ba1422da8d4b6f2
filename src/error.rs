//! Error types.
//!
//! Internally the crate uses `anyhow` (see `Res`). At the boundary of a command, errors are
//! classified with an `ErrorType` so that front ends (the CLI and MCP server) can tell a rejected
//! input apart from a failed write.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// Public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The class of a public error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A malformed calendar input, e.g. month 13 or an unparsable month key.
    InvalidDate,
    /// A month range whose end does not come strictly after its start.
    InvalidRange,
    /// Any other rejected input. Nothing has been written when this is returned.
    Validation,
    /// A database read or write failed. Any open transaction has been rolled back.
    Persistence,
    /// The home directory or `config.json` could not be created, read or written.
    Config,
    /// The MCP service failed.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// The public error type, an `anyhow::Error` tagged with its `ErrorType`.
pub struct Error {
    error_type: ErrorType,
    source: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            source: source.into(),
        }
    }

    pub(crate) fn msg<M>(error_type: ErrorType, message: M) -> Self
    where
        M: Display + Debug + Send + Sync + 'static,
    {
        Self::new(error_type, anyhow::Error::msg(message))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.source)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.source()
    }
}

/// Converts an internal result into a public `Result` with the given `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            let source: anyhow::Error = e.into();
            // Errors that were already classified keep their original type.
            match source.downcast::<Error>() {
                Ok(public) => public,
                Err(source) => Error::new(error_type, source),
            }
        })
    }
}
