//! HTTP request implementation.
//!
//! This module provides the [`Request`] type: request parts (method, URI,
//! version, headers, extensions) plus an in-memory [`Body`]. Besides header and
//! body access it knows how to:
//!
//! - Rewrite its query string with replace or additive semantics
//! - Install JSON or form bodies together with `Content-Type` and `Content-Length`
//!
//! # Examples
//!
//! ## Creating Basic Requests
//!
//! ```rust
//! use rith_http::Request;
//!
//! let get_req = Request::get("http://api.example.com/users")?;
//!
//! let post_req = Request::post("http://api.example.com/users")?
//!     .header(http::header::ACCEPT, http::HeaderValue::from_static("application/json"));
//! # Ok::<(), rith_http::Error>(())
//! ```
//!
//! ## Working with Request Bodies
//!
//! ```rust
//! # #[cfg(feature = "json")]
//! # {
//! use rith_http::Request;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct User { name: String, email: String }
//!
//! let user = User {
//!     name: "Alice".to_string(),
//!     email: "alice@example.com".to_string(),
//! };
//!
//! let request = Request::post("http://api.example.com/users")?.json(&user)?;
//! assert_eq!(request.content_length(), Some(request.body().len().unwrap() as u64));
//! # }
//! # Ok::<(), rith_http::Error>(())
//! ```
use crate::body::BodyFrozen;
use crate::{Body, Error, Query, Result};
use http::{
    header::{self, GetAll, HeaderName},
    uri::PathAndQuery,
    Extensions, HeaderMap, HeaderValue, Method, Uri, Version,
};

/// The HTTP request parts.
pub type RequestParts = http::request::Parts;

/// An HTTP request with method, URI, headers, and an in-memory body.
///
/// Method and URI are fixed at construction. Headers, the query string and the
/// body may change until the request is handed to a transport.
///
/// ```rust
/// use rith_http::Request;
///
/// let mut request = Request::get("http://localhost/search?a=1")?;
/// request.add_query("a", "2")?;
/// request.set_query("page", "3")?;
/// assert_eq!(request.uri().query(), Some("a=1&a=2&page=3"));
/// # Ok::<(), rith_http::Error>(())
/// ```
#[derive(Debug)]
pub struct Request {
    parts: RequestParts,
    body: Body,
}

impl From<http::Request<Body>> for Request {
    fn from(request: http::Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        Self { parts, body }
    }
}

impl From<Request> for http::Request<Body> {
    fn from(request: Request) -> Self {
        Self::from_parts(request.parts, request.body)
    }
}

impl Request {
    /// Creates a new request from an already parsed method and URI.
    pub fn new(method: Method, uri: Uri) -> Self {
        let (parts, ()) = http::Request::new(()).into_parts();
        let mut request = Self {
            parts,
            body: Body::empty(),
        };
        request.parts.method = method;
        request.parts.uri = uri;
        request
    }

    /// Parses `method` and `uri` and creates a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) when either value is malformed.
    ///
    /// ```rust
    /// use rith_http::Request;
    ///
    /// assert!(Request::try_new("PATCH", "/api/users/123").is_ok());
    /// assert!(Request::try_new("BAD METHOD", "/").is_err());
    /// assert!(Request::try_new("GET", "http://bad host/").is_err());
    /// ```
    pub fn try_new<M, U>(method: M, uri: U) -> Result<Self>
    where
        M: TryInto<Method>,
        M::Error: Into<http::Error>,
        U: TryInto<Uri>,
        U::Error: Into<http::Error>,
    {
        let method = method.try_into().map_err(|e| Error::Http(e.into()))?;
        let uri = uri.try_into().map_err(|e| Error::Http(e.into()))?;
        Ok(Self::new(method, uri))
    }

    /// Creates a new GET request.
    pub fn get<U>(uri: U) -> Result<Self>
    where
        U: TryInto<Uri>,
        U::Error: Into<http::Error>,
    {
        Self::try_new(Method::GET, uri)
    }

    /// Creates a new POST request.
    pub fn post<U>(uri: U) -> Result<Self>
    where
        U: TryInto<Uri>,
        U::Error: Into<http::Error>,
    {
        Self::try_new(Method::POST, uri)
    }

    /// Creates a new PUT request.
    pub fn put<U>(uri: U) -> Result<Self>
    where
        U: TryInto<Uri>,
        U::Error: Into<http::Error>,
    {
        Self::try_new(Method::PUT, uri)
    }

    /// Creates a new DELETE request.
    pub fn delete<U>(uri: U) -> Result<Self>
    where
        U: TryInto<Uri>,
        U::Error: Into<http::Error>,
    {
        Self::try_new(Method::DELETE, uri)
    }

    /// Returns a reference to the request parts.
    pub const fn parts(&self) -> &RequestParts {
        &self.parts
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the request URI.
    pub const fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the HTTP version.
    pub const fn version(&self) -> Version {
        self.parts.version
    }

    /// Sets the HTTP version.
    pub fn set_version(&mut self, version: Version) {
        self.parts.version = version;
    }

    /// Sets a header, consuming and returning the request for chaining.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the request headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Returns the first value of a header.
    pub fn get_header(&self, name: impl header::AsHeaderName) -> Option<&HeaderValue> {
        self.headers().get(name)
    }

    /// Returns every value of a header.
    pub fn get_headers(&self, name: impl header::AsHeaderName) -> GetAll<'_, HeaderValue> {
        self.headers().get_all(name)
    }

    /// Appends a header value, keeping existing values of the same name.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().append(name, value);
    }

    /// Inserts a header value, replacing existing values of the same name.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> Option<HeaderValue> {
        self.headers_mut().insert(name, value)
    }

    /// Returns the request extensions.
    pub const fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Returns the request extensions mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Returns the body.
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the body mutably.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Takes the body, leaving a frozen one.
    pub fn take_body(&mut self) -> core::result::Result<Body, BodyFrozen> {
        self.body.take()
    }

    /// Installs a body and updates `Content-Type` and `Content-Length` from it.
    ///
    /// Whatever body was there before is discarded.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        let body = body.into();
        if let Some(value) = body
            .mime()
            .and_then(|mime| HeaderValue::from_str(mime.as_ref()).ok())
        {
            self.insert_header(header::CONTENT_TYPE, value);
        }
        match body.len() {
            Some(len) => {
                self.insert_header(header::CONTENT_LENGTH, HeaderValue::from(len));
            }
            None => {
                self.headers_mut().remove(header::CONTENT_LENGTH);
            }
        }
        self.body = body;
    }

    /// Returns the declared `Content-Length`, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.get_header(header::CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    /// Serializes `value` to JSON and installs it as the body.
    ///
    /// Sets `Content-Type: application/json` and `Content-Length`.
    #[cfg(feature = "json")]
    pub fn set_json<T: serde::Serialize>(&mut self, value: T) -> Result<()> {
        let body = Body::from_json(value)?;
        self.set_body(body);
        self.insert_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(())
    }

    /// Builder form of [`Request::set_json`].
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize>(mut self, value: T) -> Result<Self> {
        self.set_json(value)?;
        Ok(self)
    }

    /// Serializes `value` to URL-encoded form data and installs it as the body.
    #[cfg(feature = "form")]
    pub fn set_form<T: serde::Serialize>(&mut self, value: T) -> Result<()> {
        let body = Body::from_form(value)?;
        self.set_body(body);
        self.insert_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        Ok(())
    }

    /// Builder form of [`Request::set_form`].
    #[cfg(feature = "form")]
    pub fn form<T: serde::Serialize>(mut self, value: T) -> Result<Self> {
        self.set_form(value)?;
        Ok(self)
    }

    /// Decodes the current query string.
    pub fn query(&self) -> Result<Query> {
        Query::parse(self.uri().query().unwrap_or_default())
    }

    /// Replaces the whole query string with `query`.
    ///
    /// The path is kept; an empty query removes the `?` entirely.
    pub fn replace_query(&mut self, query: &Query) -> Result<()> {
        let encoded = query.encode();
        let mut parts = self.parts.uri.clone().into_parts();
        let path_and_query = {
            let path = parts
                .path_and_query
                .as_ref()
                .map(PathAndQuery::path)
                .filter(|path| !path.is_empty())
                .unwrap_or("/");
            if encoded.is_empty() {
                path.to_owned()
            } else {
                format!("{path}?{encoded}")
            }
        };
        parts.path_and_query = Some(path_and_query.parse()?);
        self.parts.uri = Uri::from_parts(parts).map_err(http::Error::from)?;
        Ok(())
    }

    /// Sets `key` to `value`, dropping its previous values.
    pub fn set_query(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let (key, value): (String, String) = (key.into(), value.into());
        self.update_query(|query| {
            query.set(key, value);
        })
    }

    /// Appends `value` to `key`, keeping its previous values.
    pub fn add_query(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let (key, value): (String, String) = (key.into(), value.into());
        self.update_query(|query| {
            query.add(key, value);
        })
    }

    /// Merges `extra` into the current query additively.
    pub fn merge_query(&mut self, extra: &Query) -> Result<()> {
        self.update_query(|query| {
            query.merge(extra);
        })
    }

    fn update_query(&mut self, f: impl FnOnce(&mut Query)) -> Result<()> {
        let mut query = self.query()?;
        f(&mut query);
        self.replace_query(&query)
    }

    /// Splits the request into its parts and body.
    pub fn into_parts(self) -> (RequestParts, Body) {
        (self.parts, self.body)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::GET, Uri::from_static("/"))
    }
}
