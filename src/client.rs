//! The client facade.
//!
//! A [`Client`] owns the lazily built engine (transport plus the execution
//! context background requests run on) and the interceptors. It is cheap to
//! clone; clones share everything.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rith_http::{Client, Dispatch, Query};
//!
//! let client = Client::new();
//!
//! // Blocking GET with extra query parameters.
//! let outcome = client.get_with_query("http://localhost:8080/items?a=1", &Query::from([("b", "2")]))?;
//! if outcome.is_successful() {
//!     println!("{}", outcome.text()?);
//! }
//!
//! // Deferred request: decorate, then resolve.
//! let holder = client.request("POST", "http://localhost:8080/items", Dispatch::Deferred)?;
//! holder
//!     .before(|request| {
//!         request.set_header("x-request-id", "42");
//!     })
//!     .then(|outcome| println!("status: {:?}", outcome.status()))
//!     .catch(|error| eprintln!("failed: {error}"));
//! # Ok::<(), rith_http::Error>(())
//! ```
use core::fmt::{self, Debug};
use core::future::Future;
use core::time::Duration;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use http::{header::USER_AGENT, HeaderValue, Method, Uri};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::interceptor::{ConfigInterceptor, RequestInterceptor};
use crate::{Error, Holder, HttpResponse, HyperTransport, Query, Request, Result, Transport};

/// Timeout a transport is built with before any config interceptor runs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Product token used in the `User-Agent` header.
pub const PRODUCT: &str = "RithHttp";

const WORKER_THREADS: usize = 2;

/// Returns the `User-Agent` value stamped on every outgoing request.
///
/// The format is `RithHttp/<version> (rust; <os>-<arch>)`.
///
/// ```rust
/// assert!(rith_http::user_agent().starts_with("RithHttp/"));
/// ```
pub fn user_agent() -> &'static str {
    static USER_AGENT: OnceLock<String> = OnceLock::new();
    USER_AGENT.get_or_init(|| {
        format!(
            "{PRODUCT}/{} (rust; {}-{})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    })
}

/// Whether a freshly created holder sends its request right away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// Wait until the holder is resolved, leaving room for decorator edits.
    #[default]
    Deferred,
    /// Send immediately.
    Immediate,
}

type TransportFactory<T> = Box<dyn FnOnce(Duration) -> T + Send>;

struct EngineSlot<T> {
    factory: Option<TransportFactory<T>>,
    config: Option<Box<dyn ConfigInterceptor<T>>>,
    engine: Option<Arc<Engine<T>>>,
}

/// Where background requests run: a runtime owned by the engine, never the
/// caller's.
struct Executor {
    handle: Handle,
    runtime: Option<Runtime>,
}

impl Executor {
    fn start() -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(WORKER_THREADS)
            .thread_name("rith-http-worker")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Dropping a runtime from async context panics, and the last client
        // clone may well be dropped there.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

pub(crate) struct Engine<T> {
    transport: Arc<T>,
    executor: Executor,
}

impl<T: Transport> Engine<T> {
    pub(crate) fn transport(&self) -> Arc<T> {
        self.transport.clone()
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.executor.handle.spawn(future)
    }
}

struct ClientRef<T> {
    slot: Mutex<EngineSlot<T>>,
    request_interceptor: RwLock<Option<Arc<dyn RequestInterceptor>>>,
}

/// Configuration facade and factory of [`Holder`]s.
///
/// The transport is built on first dispatch with [`DEFAULT_TIMEOUT`]; the
/// config interceptor, if any, runs right after, exactly once. Every dispatch
/// then runs the request interceptor and stamps [`user_agent`].
pub struct Client<T: Transport = HyperTransport> {
    inner: Arc<ClientRef<T>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interceptor = self
            .inner
            .request_interceptor
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|i| i.name()));
        f.debug_struct("Client")
            .field("transport", &core::any::type_name::<T>())
            .field("initialized", &self.is_initialized())
            .field("request_interceptor", &interceptor)
            .finish()
    }
}

impl Client<HyperTransport> {
    /// Creates a client backed by [`HyperTransport`].
    pub fn new() -> Self {
        Self::with_transport(HyperTransport::new)
    }
}

impl Default for Client<HyperTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client whose transport is built by `factory` on first use.
    ///
    /// The factory receives [`DEFAULT_TIMEOUT`] and runs inside the execution
    /// context, so it may spawn tasks or register timers.
    pub fn with_transport<F>(factory: F) -> Self
    where
        F: FnOnce(Duration) -> T + Send + 'static,
    {
        Self {
            inner: Arc::new(ClientRef {
                slot: Mutex::new(EngineSlot {
                    factory: Some(Box::new(factory)),
                    config: None,
                    engine: None,
                }),
                request_interceptor: RwLock::new(None),
            }),
        }
    }

    /// Installs the config interceptor.
    ///
    /// It runs once, when the transport is built. Installing one after the
    /// transport exists has no effect and is logged.
    pub fn on_config(&self, interceptor: impl ConfigInterceptor<T>) -> &Self {
        let mut slot = lock!(self.inner.slot);
        if slot.engine.is_some() {
            tracing::warn!(
                interceptor = interceptor.name(),
                "transport already built, config interceptor ignored"
            );
        } else {
            slot.config = Some(Box::new(interceptor));
        }
        self
    }

    /// Installs or replaces the request interceptor.
    pub fn on_request(&self, interceptor: impl RequestInterceptor) -> &Self {
        let mut current = self
            .inner
            .request_interceptor
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *current = Some(Arc::new(interceptor));
        self
    }

    /// Returns `true` once the transport has been built.
    pub fn is_initialized(&self) -> bool {
        lock!(self.inner.slot).engine.is_some()
    }

    /// Sends a GET request and blocks until it completes.
    ///
    /// The `Err` arm only carries construction errors; transport failures
    /// are inside the returned [`HttpResponse`].
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime; use [`Client::fetch`].
    pub fn get<U>(&self, url: U) -> Result<Arc<HttpResponse>>
    where
        U: TryInto<Uri>,
        U::Error: Into<http::Error>,
    {
        Ok(self.send(Request::get(url)?))
    }

    /// Like [`Client::get`], merging `query` into the URL's own query string.
    ///
    /// Values are added, never replaced: `?a=1` merged with `a=[2, 3], b=[4]`
    /// yields `?a=1&a=2&a=3&b=4`.
    pub fn get_with_query<U>(&self, url: U, query: &Query) -> Result<Arc<HttpResponse>>
    where
        U: TryInto<Uri>,
        U::Error: Into<http::Error>,
    {
        let mut request = Request::get(url)?;
        request.merge_query(query)?;
        Ok(self.send(request))
    }

    /// Builds a request and wraps it in a [`Holder`].
    ///
    /// # Errors
    ///
    /// Fails right away if `method` or `url` is malformed.
    pub fn request<M, U>(&self, method: M, url: U, dispatch: Dispatch) -> Result<Holder<T>>
    where
        M: TryInto<Method>,
        M::Error: Into<http::Error>,
        U: TryInto<Uri>,
        U::Error: Into<http::Error>,
    {
        Ok(self.send_async(Request::try_new(method, url)?, dispatch))
    }

    /// Sends a prepared request and blocks until it completes.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime; use [`Client::fetch`].
    pub fn send(&self, request: Request) -> Arc<HttpResponse> {
        self.send_async(request, Dispatch::Immediate).get_response()
    }

    /// Wraps a prepared request in a [`Holder`].
    pub fn send_async(&self, request: Request, dispatch: Dispatch) -> Holder<T> {
        let holder = Holder::new(self.clone(), request);
        if dispatch == Dispatch::Immediate {
            holder.dispatch();
        }
        holder
    }

    /// Sends a prepared request and awaits its completion.
    pub async fn fetch(&self, request: Request) -> Arc<HttpResponse> {
        let holder = self.send_async(request, Dispatch::Immediate);
        holder.response_async().await
    }

    /// Returns the engine, building it on first use.
    pub(crate) fn engine(&self) -> Result<Arc<Engine<T>>> {
        let mut slot = lock!(self.inner.slot);
        if let Some(engine) = &slot.engine {
            return Ok(engine.clone());
        }

        let executor = Executor::start().map_err(Error::Runtime)?;
        let factory = slot.factory.take().ok_or_else(|| {
            Error::Runtime(std::io::Error::other(
                "transport construction panicked on an earlier attempt",
            ))
        })?;

        let transport = {
            let _enter = executor.handle.enter();
            let mut transport = factory(DEFAULT_TIMEOUT);
            if let Some(config) = slot.config.take() {
                tracing::trace!(interceptor = config.name(), "applying config interceptor");
                config.configure(&mut transport);
            }
            transport
        };
        tracing::trace!(
            transport = core::any::type_name::<T>(),
            "transport initialized"
        );

        let engine = Arc::new(Engine {
            transport: Arc::new(transport),
            executor,
        });
        slot.engine = Some(engine.clone());
        Ok(engine)
    }

    /// Runs the request interceptor, then stamps the user agent.
    pub(crate) fn prepare(&self, request: &mut Request) {
        let interceptor = self
            .inner
            .request_interceptor
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(interceptor) = interceptor {
            interceptor.intercept(request);
        }
        request.insert_header(USER_AGENT, HeaderValue::from_static(user_agent()));
    }
}
