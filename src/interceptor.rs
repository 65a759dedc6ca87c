//! Interceptor hooks for cross-cutting configuration.
//!
//! Two hooks exist:
//!
//! - [`ConfigInterceptor`] runs exactly once, right after a client builds its
//!   transport, and may reconfigure it (for example raise the timeout).
//! - [`RequestInterceptor`] runs before every dispatch, after all deferred
//!   decorator edits and before the `User-Agent` stamp.
//!
//! Closures implement both traits, which is how they are usually supplied:
//!
//! ```rust
//! use rith_http::{Client, HyperTransport};
//! use std::time::Duration;
//!
//! let client = Client::new();
//! client
//!     .on_config(|transport: &mut HyperTransport| transport.set_timeout(Duration::from_secs(30)))
//!     .on_request(|request: &mut rith_http::Request| {
//!         request.insert_header(
//!             http::header::ACCEPT,
//!             http::HeaderValue::from_static("application/json"),
//!         );
//!     });
//! ```
use core::any::type_name;

use crate::Request;

/// Mutates every outgoing request before it is sent.
pub trait RequestInterceptor: Send + Sync + 'static {
    /// Edits `request` in place.
    fn intercept(&self, request: &mut Request);

    /// Name used in debug output.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut Request) + Send + Sync + 'static,
{
    fn intercept(&self, request: &mut Request) {
        self(request)
    }
}

/// Configures a freshly built transport, once.
pub trait ConfigInterceptor<T>: Send + 'static {
    /// Applies the configuration to `transport`.
    fn configure(self: Box<Self>, transport: &mut T);

    /// Name used in debug output.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl<T, F> ConfigInterceptor<T> for F
where
    F: FnOnce(&mut T) + Send + 'static,
{
    fn configure(self: Box<Self>, transport: &mut T) {
        (*self)(transport)
    }
}
