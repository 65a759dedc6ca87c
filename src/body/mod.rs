//! HTTP request/response body handling.
//!
//! Bodies are always held in memory: a request body is built up front by the
//! decorator helpers, and a response body is fully collected by the transport
//! before the result holder resolves.
//!
//! A body can be in one of two states:
//!
//! - **Once**: a buffer of bytes, possibly empty
//! - **Frozen**: the bytes were moved out (usually handed to the transport)
//!
//! # Examples
//!
//! ```rust
//! use rith_http::Body;
//!
//! let empty = Body::empty();
//! assert_eq!(empty.len(), Some(0));
//!
//! let text = Body::from_text("Hello world!");
//! assert_eq!(text.as_str().unwrap(), "Hello world!");
//! ```
//!
//! ## JSON Handling
//!
//! ```rust
//! # #[cfg(feature = "json")]
//! # {
//! use rith_http::Body;
//! use serde_json::json;
//!
//! let body = Body::from_json(json!({"x": 1})).unwrap();
//! let value: serde_json::Value = body.json().unwrap();
//! assert_eq!(value, json!({"x": 1}));
//! # }
//! ```
mod convert;
mod error_type;
pub use error_type::Error;

use bytes::Bytes;
use bytestr::ByteStr;
use core::convert::Infallible;
use core::fmt::Debug;
use core::mem::replace;
use core::pin::Pin;
use core::task::{Context, Poll};
use http_body::{Frame, SizeHint};
use mime::Mime;

/// In-memory HTTP body with an optional MIME type.
///
/// The MIME type is what the decorator helpers use to fill in
/// `Content-Type`; it is informational otherwise.
pub struct Body {
    mime: Option<Mime>,
    inner: BodyInner,
}

impl Debug for Body {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("Body");
        s.field("mime", &self.mime);
        match &self.inner {
            BodyInner::Once(bytes) => s.field("len", &bytes.len()),
            BodyInner::Freeze => s.field("frozen", &true),
        };
        s.finish()
    }
}

impl_error!(
    BodyFrozen,
    "Body was frozen, it may have been consumed by `take()`"
);

enum BodyInner {
    Once(Bytes),
    Freeze,
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Body {
    /// Creates a new empty body.
    pub const fn empty() -> Self {
        Self {
            mime: None,
            inner: BodyInner::Once(Bytes::new()),
        }
    }

    /// Creates a frozen body that cannot provide data.
    ///
    /// ```rust
    /// use rith_http::Body;
    ///
    /// assert!(Body::frozen().is_frozen());
    /// ```
    pub const fn frozen() -> Self {
        Self {
            mime: None,
            inner: BodyInner::Freeze,
        }
    }

    /// Creates a body from bytes or byte-like data.
    ///
    /// The MIME type is set to `application/octet-stream`.
    ///
    /// ```rust
    /// use rith_http::Body;
    ///
    /// let body = Body::from_bytes(vec![72, 101, 108, 108, 111]);
    /// assert_eq!(body.len(), Some(5));
    /// ```
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            mime: Some(mime::APPLICATION_OCTET_STREAM),
            inner: BodyInner::Once(data.into()),
        }
    }

    /// Creates a body from text.
    ///
    /// The MIME type is set to `text/plain; charset=utf-8`.
    pub fn from_text(str: impl Into<ByteStr>) -> Self {
        Self {
            mime: Some(mime::TEXT_PLAIN_UTF_8),
            inner: BodyInner::Once(str.into().into()),
        }
    }

    /// Creates a body by serializing a value to JSON.
    ///
    /// The MIME type is set to `application/json`.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails, for example when a
    /// map has non-string keys.
    #[cfg(feature = "json")]
    pub fn from_json<T: serde::Serialize>(value: T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            mime: Some(mime::APPLICATION_JSON),
            ..Self::from_bytes(serde_json::to_vec(&value)?)
        })
    }

    /// Creates a body by serializing a value to URL-encoded form data.
    ///
    /// The MIME type is set to `application/x-www-form-urlencoded`.
    #[cfg(feature = "form")]
    pub fn from_form<T: serde::Serialize>(value: T) -> Result<Self, serde_urlencoded::ser::Error> {
        Ok(Self {
            mime: Some(mime::APPLICATION_WWW_FORM_URLENCODED),
            ..Self::from_bytes(serde_urlencoded::to_string(value)?)
        })
    }

    /// Returns the MIME type of the body, if known.
    pub fn mime(&self) -> Option<&Mime> {
        self.mime.as_ref()
    }

    /// Sets the MIME type of the body.
    pub fn with_mime(mut self, mime: Mime) -> Self {
        self.mime = Some(mime);
        self
    }

    /// Returns the length of the body in bytes.
    ///
    /// Frozen bodies have no length.
    pub const fn len(&self) -> Option<usize> {
        match &self.inner {
            BodyInner::Once(bytes) => Some(bytes.len()),
            BodyInner::Freeze => None,
        }
    }

    /// Returns `Some(true)` when the body holds zero bytes, `None` when frozen.
    pub const fn is_empty(&self) -> Option<bool> {
        match self.len() {
            Some(len) => Some(len == 0),
            None => None,
        }
    }

    /// Returns `true` if the bytes were moved out of this body.
    pub const fn is_frozen(&self) -> bool {
        matches!(self.inner, BodyInner::Freeze)
    }

    /// Moves the body out, leaving a frozen body behind.
    ///
    /// # Errors
    ///
    /// Returns [`BodyFrozen`] if the body was already taken.
    ///
    /// ```rust
    /// use rith_http::Body;
    ///
    /// let mut body = Body::from_bytes("test data");
    /// let taken = body.take().unwrap();
    /// assert!(body.is_frozen());
    /// assert!(body.take().is_err());
    /// assert_eq!(taken.as_bytes().unwrap(), b"test data");
    /// ```
    pub fn take(&mut self) -> Result<Self, BodyFrozen> {
        if self.is_frozen() {
            return Err(BodyFrozen::new());
        }
        Ok(replace(self, Self::frozen()))
    }

    /// Replaces the body, returning the previous one.
    pub fn replace(&mut self, body: Body) -> Body {
        replace(self, body)
    }

    /// Borrows the body bytes.
    pub fn as_bytes(&self) -> Result<&[u8], Error> {
        match &self.inner {
            BodyInner::Once(bytes) => Ok(bytes.as_ref()),
            BodyInner::Freeze => Err(Error::BodyFrozen),
        }
    }

    /// Returns a cheap clone of the body bytes.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        match &self.inner {
            BodyInner::Once(bytes) => Ok(bytes.clone()),
            BodyInner::Freeze => Err(Error::BodyFrozen),
        }
    }

    /// Borrows the body as UTF-8 text.
    pub fn as_str(&self) -> Result<&str, Error> {
        Ok(core::str::from_utf8(self.as_bytes()?)?)
    }

    /// Consumes the body and returns its bytes.
    pub fn into_bytes(self) -> Result<Bytes, Error> {
        match self.inner {
            BodyInner::Once(bytes) => Ok(bytes),
            BodyInner::Freeze => Err(Error::BodyFrozen),
        }
    }

    /// Consumes the body and returns it as a validated UTF-8 string.
    pub fn into_string(self) -> Result<ByteStr, Error> {
        Ok(ByteStr::from_utf8(self.into_bytes()?)?)
    }

    /// Deserializes the body as JSON.
    #[cfg(feature = "json")]
    pub fn json<T>(&self) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_slice(self.as_bytes()?)?)
    }

    /// Deserializes the body as URL-encoded form data.
    #[cfg(feature = "form")]
    pub fn form<T>(&self) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_urlencoded::from_bytes(self.as_bytes()?)?)
    }
}

impl http_body::Body for Body {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match replace(&mut this.inner, BodyInner::Freeze) {
            BodyInner::Once(bytes) if !bytes.is_empty() => Poll::Ready(Some(Ok(Frame::data(bytes)))),
            _ => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            BodyInner::Once(bytes) => bytes.is_empty(),
            BodyInner::Freeze => true,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            BodyInner::Once(bytes) => SizeHint::with_exact(bytes.len() as u64),
            BodyInner::Freeze => SizeHint::with_exact(0),
        }
    }
}
