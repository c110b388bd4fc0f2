//! Error types that are returned from the public interface of this crate.
//!
//! Internally we use `anyhow` and the `Res` alias. At the command boundary an internal error is
//! converted into the public `Error` with `pub_result`, which tags it with an `ErrorType` so that
//! callers (the CLI, the MCP server) can tell a bad input apart from a failed store operation or
//! an undelivered email.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The result type used internally by this crate.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The result type returned from the public interface of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad categories of failure.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Input was missing or invalid; no write was attempted.
    Validation,
    /// The record store rejected a read or a write.
    Database,
    /// An email could not be handed to the relay. Commands never return this: a failed email
    /// is reported as undelivered. It is returned by `notify::try_deliver`.
    Dispatch,
    /// The home directory or its configuration file is missing or invalid.
    Config,
    /// An HTTP request to the relay was malformed. The relay answers it with a 400.
    Request,
    /// A long-running service (relay, MCP server) failed.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: anyhow::Error) -> Self {
        Self { error_type, inner }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // The alternate form prints the full context chain.
        write!(f, "{} error: {:#}", self.error_type, self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Converts an internal result into the public `Result`, tagging the error with an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e.into()))
    }
}
