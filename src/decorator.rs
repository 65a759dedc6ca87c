//! Fluent edits on a pending request.
//!
//! Every method records its edit on the holder's request and returns the
//! decorator again, so edits chain. Edits that can fail (a malformed header,
//! a value that does not serialize) do not fail the chain; the first such
//! error is kept and reported as the holder's outcome when it dispatches.
//!
//! ```rust,no_run
//! use rith_http::{Client, Dispatch};
//!
//! let client = Client::new();
//! let holder = client.request("PUT", "http://localhost:8080/users/7", Dispatch::Deferred)?;
//! holder
//!     .chain()
//!     .set_header("authorization", "Bearer token")
//!     .add_header("accept", "application/json")
//!     .add_header("accept", "text/plain")
//!     .set_query("dry_run", "true")
//!     .json(serde_json::json!({ "name": "Ada" }));
//! let outcome = holder.get_response();
//! # Ok::<(), rith_http::Error>(())
//! ```
use core::fmt::{self, Debug};

use http::{HeaderName, HeaderValue};

use crate::{Body, Error, Holder, HttpResponse, HyperTransport, Query, Request, Transport};

/// A handle for editing the request of a not yet dispatched [`Holder`].
///
/// Obtained from [`Holder::chain`] or inside [`Holder::before`]. Once the
/// holder has dispatched, edits are ignored.
pub struct RequestDecorator<'a, T: Transport = HyperTransport> {
    holder: &'a Holder<T>,
}

impl<T: Transport> Debug for RequestDecorator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDecorator")
            .field("holder", self.holder)
            .finish()
    }
}

impl<'a, T: Transport> RequestDecorator<'a, T> {
    pub(crate) fn new(holder: &'a Holder<T>) -> Self {
        Self { holder }
    }

    /// Returns the holder this decorator edits.
    pub fn holder(&self) -> &'a Holder<T> {
        self.holder
    }

    /// Sets a header, replacing every previous value of that name.
    pub fn set_header<K, V>(&self, name: K, value: V) -> &Self
    where
        K: TryInto<HeaderName>,
        K::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        self.holder.edit("set_header", |request| {
            let (name, value) = header_pair(name, value)?;
            request.insert_header(name, value);
            Ok(())
        });
        self
    }

    /// Adds a header value, keeping the previous values of that name.
    pub fn add_header<K, V>(&self, name: K, value: V) -> &Self
    where
        K: TryInto<HeaderName>,
        K::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        self.holder.edit("add_header", |request| {
            let (name, value) = header_pair(name, value)?;
            request.append_header(name, value);
            Ok(())
        });
        self
    }

    /// Sets a query parameter, replacing its previous values.
    pub fn set_query(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        self.holder
            .edit("set_query", |request| request.set_query(key, value));
        self
    }

    /// Adds a query parameter value, keeping its previous values.
    pub fn add_query(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        self.holder
            .edit("add_query", |request| request.add_query(key, value));
        self
    }

    /// Adds every value of `query` to the request's query string.
    pub fn merge_query(&self, query: &Query) -> &Self {
        self.holder
            .edit("merge_query", |request| request.merge_query(query));
        self
    }

    /// Serializes `value` as the JSON body.
    ///
    /// Sets `Content-Type: application/json` and `Content-Length`.
    #[cfg(feature = "json")]
    pub fn json<S: serde::Serialize>(&self, value: S) -> &Self {
        self.holder.edit("json", |request| request.set_json(value));
        self
    }

    /// Installs a JSON object body built from a string-keyed map.
    ///
    /// Shorthand for [`json`](RequestDecorator::json) on ad-hoc payloads.
    #[cfg(feature = "json")]
    pub fn simple_json(&self, object: serde_json::Map<String, serde_json::Value>) -> &Self {
        self.holder
            .edit("simple_json", |request| request.set_json(object));
        self
    }

    /// Serializes `value` as a URL-encoded form body.
    #[cfg(feature = "form")]
    pub fn form<S: serde::Serialize>(&self, value: S) -> &Self {
        self.holder.edit("form", |request| request.set_form(value));
        self
    }

    /// Installs a raw body with its `Content-Type` and `Content-Length`.
    pub fn body(&self, body: impl Into<Body>) -> &Self {
        self.holder.edit("body", |request| {
            request.set_body(body);
            Ok(())
        });
        self
    }

    /// Runs `edit` directly on the pending request.
    pub fn edit<F>(&self, edit: F) -> &Self
    where
        F: FnOnce(&mut Request),
    {
        self.holder.edit("edit", |request| {
            edit(request);
            Ok(())
        });
        self
    }

    /// Ends the chain with [`Holder::then`].
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn then<F>(&self, resolver: F) -> &'a Holder<T>
    where
        F: FnOnce(&HttpResponse),
    {
        self.holder.then(resolver)
    }
}

fn header_pair<K, V>(name: K, value: V) -> crate::Result<(HeaderName, HeaderValue)>
where
    K: TryInto<HeaderName>,
    K::Error: Into<http::Error>,
    V: TryInto<HeaderValue>,
    V::Error: Into<http::Error>,
{
    let name = name.try_into().map_err(|e| Error::Http(e.into()))?;
    let value = value.try_into().map_err(|e| Error::Http(e.into()))?;
    Ok((name, value))
}
