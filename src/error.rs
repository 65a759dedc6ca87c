//! Error types and utilities.
//!
//! Errors fall into three groups:
//!
//! - **Construction** errors (bad method, URI, header or query) are returned
//!   synchronously from the call that built the request, or delivered through
//!   the result holder when they come from a deferred decorator edit.
//! - **Transport** errors (connect failure, timeout) never cross the background
//!   boundary as a panic; they ride inside [`HttpResponse`](crate::HttpResponse).
//! - **Serialization** errors from body helpers are kept on the pending request
//!   and reported at dispatch instead of being dropped.
//!
//! # Examples
//!
//! ```rust
//! use rith_http::{Client, Dispatch, Error};
//!
//! let client = Client::new();
//! let err = client.request("NOT A METHOD", "http://localhost/", Dispatch::Deferred).unwrap_err();
//! assert!(matches!(err, Error::Http(_)));
//! ```
use crate::body::Error as BodyError;

/// A boxed, thread-safe error returned by a transport.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

impl_error!(Canceled, "request was canceled before it completed");

/// The main error type of this crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The method, URI or a header could not be parsed.
    #[error(transparent)]
    Http(#[from] http::Error),
    /// The query string could not be decoded or re-encoded.
    #[error("invalid query string: {0}")]
    InvalidQuery(String),
    /// The body could not be serialized, deserialized or read.
    #[error(transparent)]
    Body(#[from] BodyError),
    /// The transport failed to produce a response.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// The background request was canceled through its holder.
    #[error(transparent)]
    Canceled(#[from] Canceled),
    /// The result carries no response to read from.
    #[error("no response available, the request failed")]
    NoResponse,
    /// The background execution context could not be started.
    #[error("failed to start the background runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl Error {
    pub(crate) fn transport<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(error))
    }

    /// Returns `true` for errors produced while building the request.
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Http(_) | Self::InvalidQuery(_))
    }

    /// Returns `true` for errors reported by the transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Attempts to downcast a transport error to a concrete type.
    ///
    /// ```rust
    /// use rith_http::{Error, TransportError};
    /// use std::time::Duration;
    ///
    /// let err = Error::Transport(Box::new(TransportError::Timeout(Duration::from_secs(5))));
    /// assert!(matches!(err.downcast_transport_ref::<TransportError>(), Some(TransportError::Timeout(_))));
    /// ```
    pub fn downcast_transport_ref<E>(&self) -> Option<&E>
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        match self {
            Self::Transport(error) => error.downcast_ref(),
            _ => None,
        }
    }
}

impl From<http::method::InvalidMethod> for Error {
    fn from(error: http::method::InvalidMethod) -> Self {
        Self::Http(error.into())
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(error: http::uri::InvalidUri) -> Self {
        Self::Http(error.into())
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(error: http::header::InvalidHeaderName) -> Self {
        Self::Http(error.into())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(error: http::header::InvalidHeaderValue) -> Self {
        Self::Http(error.into())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Body(error.into())
    }
}

#[cfg(feature = "form")]
impl From<serde_urlencoded::ser::Error> for Error {
    fn from(error: serde_urlencoded::ser::Error) -> Self {
        Self::Body(error.into())
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = core::result::Result<T, Error>;
