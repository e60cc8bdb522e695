//! Unified error type.

use std::fmt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by stack's fallible operations.
///
/// Composing and running a chain never fails: whatever a handler does is
/// written to the response. This type only surfaces failures at the edges,
/// where text from the outside world is turned into HTTP values.
#[derive(Debug)]
pub enum Error {
    /// The request body could not be read from the transport.
    Body(BoxError),
    /// A header name or value was not valid HTTP.
    InvalidHeader(String),
}

impl Error {
    pub(crate) fn body(e: impl Into<BoxError>) -> Self {
        Self::Body(e.into())
    }

    pub(crate) fn invalid_header(name: impl Into<String>) -> Self {
        Self::InvalidHeader(name.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body(e) => write!(f, "reading request body: {e}"),
            Self::InvalidHeader(name) => write!(f, "invalid header `{name}`"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Body(e) => Some(&**e),
            Self::InvalidHeader(_) => None,
        }
    }
}
