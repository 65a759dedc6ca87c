//! HTTP response types.
//!
//! [`Response`] is what a transport produces: status, headers and a fully
//! collected [`Body`]. [`HttpResponse`] is what callers of the client see: the
//! outcome of one dispatch, holding either a response or the error that
//! prevented one.
//!
//! # Examples
//!
//! ```rust
//! use rith_http::{HttpResponse, Response, StatusCode};
//!
//! let created = HttpResponse::from(Ok(Response::new(StatusCode::CREATED, "made")));
//! assert!(created.error().is_none());
//! // Only a plain 200 counts as successful.
//! assert!(!created.is_successful());
//! assert_eq!(created.text().unwrap(), "made");
//! ```
use crate::{Body, Error, Result};
use bytes::Bytes;
use http::{header::AsHeaderName, Extensions, HeaderMap, HeaderValue, StatusCode, Version};

/// The HTTP response parts.
pub type ResponseParts = http::response::Parts;

/// An HTTP response with status, headers, and an in-memory body.
#[derive(Debug)]
pub struct Response {
    parts: ResponseParts,
    body: Body,
}

impl From<http::Response<Body>> for Response {
    fn from(response: http::Response<Body>) -> Self {
        let (parts, body) = response.into_parts();
        Self { parts, body }
    }
}

impl From<Response> for http::Response<Body> {
    fn from(response: Response) -> Self {
        Self::from_parts(response.parts, response.body)
    }
}

impl Response {
    /// Creates a response with the given status and body.
    ///
    /// ```rust
    /// use rith_http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::NOT_FOUND, "missing");
    /// assert_eq!(response.status(), StatusCode::NOT_FOUND);
    /// ```
    pub fn new(status: StatusCode, body: impl Into<Body>) -> Self {
        let mut response: Self = http::Response::new(body.into()).into();
        response.parts.status = status;
        response
    }

    /// Builds a response from parts and a body.
    pub fn from_parts(parts: ResponseParts, body: Body) -> Self {
        Self { parts, body }
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.parts.status
    }

    /// Returns the HTTP version.
    pub const fn version(&self) -> Version {
        self.parts.version
    }

    /// Returns the response headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the first value of a header.
    pub fn get_header(&self, name: impl AsHeaderName) -> Option<&HeaderValue> {
        self.parts.headers.get(name)
    }

    /// Sets a header, consuming and returning the response for chaining.
    pub fn header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
        self.parts.headers.insert(name, value);
        self
    }

    /// Returns the response extensions.
    pub const fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Returns the body.
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Splits the response into its parts and body.
    pub fn into_parts(self) -> (ResponseParts, Body) {
        (self.parts, self.body)
    }
}

/// The outcome of a single dispatch.
///
/// Exactly one of [`response`](Self::response) and [`error`](Self::error) is
/// populated. Transport failures never panic across the background boundary;
/// they end up here and must be checked explicitly, either through
/// [`is_successful`](Self::is_successful), [`error`](Self::error) or the
/// holder's `catch` continuation.
#[derive(Debug)]
pub struct HttpResponse {
    response: Option<Response>,
    error: Option<Error>,
}

impl From<Result<Response>> for HttpResponse {
    fn from(result: Result<Response>) -> Self {
        match result {
            Ok(response) => Self::succeeded(response),
            Err(error) => Self::failed(error),
        }
    }
}

impl HttpResponse {
    pub(crate) fn succeeded(response: Response) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    pub(crate) fn failed(error: Error) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }

    /// Returns the response, if the transport produced one.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Returns the error that prevented a response.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Returns the status code, if there is a response.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status)
    }

    /// Returns `true` iff there is no error and the status is exactly `200 OK`.
    ///
    /// Other 2xx codes such as `201 Created` are not considered successful.
    pub fn is_successful(&self) -> bool {
        self.error.is_none() && self.status() == Some(StatusCode::OK)
    }

    fn body(&self) -> Result<&Body> {
        self.response
            .as_ref()
            .map(Response::body)
            .ok_or(Error::NoResponse)
    }

    /// Returns the response body bytes.
    ///
    /// # Errors
    ///
    /// [`Error::NoResponse`] if the request failed.
    pub fn read_body(&self) -> Result<Bytes> {
        Ok(self.body()?.to_bytes()?)
    }

    /// Returns the response body as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        Ok(self.body()?.as_str()?)
    }

    /// Deserializes the response body as JSON.
    ///
    /// ```rust
    /// use rith_http::{HttpResponse, Response, StatusCode};
    /// use serde_json::Value;
    ///
    /// let outcome = HttpResponse::from(Ok(Response::new(StatusCode::OK, r#"{"x":1}"#)));
    /// let value: Value = outcome.unmarshal_json().unwrap();
    /// assert_eq!(value["x"], 1);
    /// ```
    #[cfg(feature = "json")]
    pub fn unmarshal_json<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(self.body()?.json()?)
    }
}
