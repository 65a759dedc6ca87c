#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]
//! A fluent HTTP client layer with deferred decoration and single-shot results.
//!
//! The crate sits on top of an HTTP engine (a [`Transport`]) and adds the
//! conveniences a call site usually wants:
//!
//! - **Lazy client** - the transport and the background execution context are
//!   built on first use, with a config hook that runs exactly once
//! - **Result holders** - every request is wrapped in a [`Holder`] that sends
//!   at most once, caches its outcome and fires `then`/`catch` at most once
//! - **Deferred decoration** - headers, query parameters and bodies can be
//!   edited fluently until the holder dispatches
//! - **Interceptors** - a per-request hook plus an automatic `User-Agent`
//! - **Body helpers** - JSON and form encoding with matching content headers
//!
//! # Optional Features
//!
//! - `json` - JSON bodies and decoding via serde_json (enabled by default)
//! - `form` - URL-encoded form bodies via serde_urlencoded (enabled by default)
//!
//! # Examples
//!
//! ## Blocking calls
//!
//! ```rust,no_run
//! use rith_http::Client;
//!
//! let client = Client::new();
//! let outcome = client.get("http://localhost:8080/health")?;
//! match outcome.error() {
//!     None => println!("{:?}: {}", outcome.status(), outcome.text()?),
//!     Some(error) => eprintln!("request failed: {error}"),
//! }
//! # Ok::<(), rith_http::Error>(())
//! ```
//!
//! ## Deferred requests
//!
//! ```rust,no_run
//! # #[cfg(feature = "json")]
//! # {
//! use rith_http::{Client, Dispatch};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Created {
//!     id: u64,
//! }
//!
//! let client = Client::new();
//! client
//!     .request("POST", "http://localhost:8080/users", Dispatch::Deferred)?
//!     .before(|request| {
//!         request
//!             .set_header("authorization", "Bearer token")
//!             .json(serde_json::json!({ "name": "Ada" }));
//!     })
//!     .then(|outcome| {
//!         if let Ok(created) = outcome.unmarshal_json::<Created>() {
//!             println!("created user {}", created.id);
//!         }
//!     })
//!     .catch(|error| eprintln!("{error}"));
//! # }
//! # Ok::<(), rith_http::Error>(())
//! ```
//!
//! ## Inside an async runtime
//!
//! The blocking methods panic inside a runtime; await instead:
//!
//! ```rust,no_run
//! use rith_http::{Client, Request};
//!
//! # async fn run() -> rith_http::Result<()> {
//! let client = Client::new();
//! let outcome = client.fetch(Request::get("http://localhost:8080/health")?).await;
//! assert!(outcome.is_successful());
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;

pub mod error;
pub use error::{BoxError, Canceled, Error, Result};

mod body;
pub use body::Body;
pub use body::BodyFrozen;
pub use body::Error as BodyError;

mod query;
pub use query::Query;

pub mod request;
pub use request::Request;

pub mod response;
pub use response::{HttpResponse, Response};

pub mod transport;
#[doc(inline)]
pub use transport::{AnyTransport, HyperTransport, Transport, TransportError};

pub mod interceptor;
pub use interceptor::{ConfigInterceptor, RequestInterceptor};

mod client;
pub use client::{user_agent, Client, Dispatch, DEFAULT_TIMEOUT, PRODUCT};

mod holder;
pub use holder::{Holder, Resolution};

mod decorator;
pub use decorator::RequestDecorator;

pub use http::{
    header, method, uri, version, Extensions, HeaderMap, HeaderName, HeaderValue, Method,
    StatusCode, Uri, Version,
};
