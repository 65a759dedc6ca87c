use core::time::Duration;

use http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use hyper_util::client::legacy::{connect::HttpConnector, Client as LegacyClient};
use hyper_util::rt::TokioExecutor;
use mime::Mime;

use super::Transport;
use crate::{Body, Error, Request, Response};

/// Errors produced by [`HyperTransport`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The exchange did not finish within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The connection could not be established or the request failed.
    #[error(transparent)]
    Request(#[from] hyper_util::client::legacy::Error),
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[source] hyper::Error),
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        Error::transport(error)
    }
}

/// Plain HTTP/1.1 transport backed by `hyper-util`'s pooled legacy client.
///
/// The timeout bounds the whole exchange, from connecting to collecting the
/// response body. It must be used from within a tokio runtime, which the
/// client takes care of.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: LegacyClient<HttpConnector, Body>,
    timeout: Duration,
}

impl HyperTransport {
    /// Creates a transport with the given exchange timeout.
    pub fn new(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        connector.set_nodelay(true);
        Self {
            client: LegacyClient::builder(TokioExecutor::new()).build(connector),
            timeout,
        }
    }

    /// Returns the exchange timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Changes the exchange timeout.
    ///
    /// Only meaningful from a config interceptor: once the client has built
    /// its transport it never hands out mutable access again.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

impl Transport for HyperTransport {
    type Error = TransportError;

    async fn execute(&self, request: Request) -> Result<Response, Self::Error> {
        let request: http::Request<Body> = request.into();
        let exchange = async {
            let response = self.client.request(request).await?;
            let (parts, incoming) = response.into_parts();
            let bytes = incoming
                .collect()
                .await
                .map_err(TransportError::Body)?
                .to_bytes();
            let mut body = Body::from_bytes(bytes);
            if let Some(mime) = parts
                .headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<Mime>().ok())
            {
                body = body.with_mime(mime);
            }
            Ok::<_, TransportError>(Response::from_parts(parts, body))
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}
