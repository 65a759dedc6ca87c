//! Transport abstraction.
//!
//! A [`Transport`] is the HTTP engine this crate orchestrates: it takes a fully
//! prepared [`Request`] and produces a [`Response`] with its body collected.
//! Pooling, TLS and protocol details all live behind this trait.
//!
//! The crate ships [`HyperTransport`], a plain HTTP/1.1 transport on top of
//! `hyper-util`'s legacy client. Anything else (a mock in tests, a TLS-capable
//! client, a recording proxy) can be plugged in through
//! [`Client::with_transport`](crate::Client::with_transport).
//!
//! # Implementing a transport
//!
//! ```rust
//! use rith_http::{Error, Request, Response, StatusCode, Transport};
//!
//! struct Echo;
//!
//! impl Transport for Echo {
//!     type Error = Error;
//!
//!     async fn execute(&self, mut request: Request) -> Result<Response, Self::Error> {
//!         let body = request.take_body().map_err(rith_http::BodyError::from)?;
//!         Ok(Response::new(StatusCode::OK, body))
//!     }
//! }
//! ```
mod legacy;

pub use self::legacy::{HyperTransport, TransportError};

use core::{any::type_name, fmt::Debug, future::Future, pin::Pin};
use std::sync::Arc;

use crate::{Error, Request, Response};

/// An HTTP engine that executes prepared requests.
///
/// Implementations are shared between every dispatch of a client, so
/// `execute` takes `&self`.
pub trait Transport: Send + Sync + 'static {
    /// The error returned when no response could be produced.
    type Error: Into<Error> + Send + 'static;

    /// Sends `request` and returns the response with its body collected.
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, Self::Error>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    type Error = T::Error;
    async fn execute(&self, request: Request) -> Result<Response, Self::Error> {
        Transport::execute(self.as_ref(), request).await
    }
}

impl<T: Transport> Transport for Box<T> {
    type Error = T::Error;
    async fn execute(&self, request: Request) -> Result<Response, Self::Error> {
        Transport::execute(self.as_ref(), request).await
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn 'a + Send + Future<Output = T>>>;

pub(crate) trait TransportImpl: Send + Sync {
    fn execute_inner(&self, request: Request) -> BoxFuture<'_, Result<Response, Error>>;
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl<T: Transport> TransportImpl for T {
    fn execute_inner(&self, request: Request) -> BoxFuture<'_, Result<Response, Error>> {
        Box::pin(async move { Transport::execute(self, request).await.map_err(Into::into) })
    }
}

/// A type-erased transport.
///
/// Useful when the concrete transport is chosen at runtime:
///
/// ```rust
/// use rith_http::{AnyTransport, Client, HyperTransport};
///
/// let client = Client::with_transport(|timeout| AnyTransport::new(HyperTransport::new(timeout)));
/// ```
pub struct AnyTransport(Box<dyn TransportImpl>);

impl Debug for AnyTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("AnyTransport[{}]", self.name()))
    }
}

impl AnyTransport {
    /// Erases the concrete type of `transport`.
    pub fn new(transport: impl Transport) -> Self {
        Self(Box::new(transport))
    }

    /// Returns the type name of the wrapped transport.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Transport for AnyTransport {
    type Error = Error;
    async fn execute(&self, request: Request) -> Result<Response, Self::Error> {
        self.0.execute_inner(request).await
    }
}
