//! The single-shot result holder.
//!
//! A [`Holder`] tracks one request from creation to completion:
//!
//! 1. While not dispatched, the request can still be edited through a
//!    [`RequestDecorator`].
//! 2. [`dispatch`](Holder::dispatch) hands the request to a background task.
//!    It runs at most once no matter how often it is called.
//! 3. The background task sends exactly one [`HttpResponse`] through a
//!    one-shot channel. The first waiter receives it and caches it; every
//!    later read returns the same `Arc`.
//! 4. [`then`](Holder::then) and [`catch`](Holder::catch) each fire at most
//!    once, guarded by independent resolution states, so both can fire for
//!    the same holder.
//!
//! ```rust,no_run
//! use rith_http::{Client, Dispatch};
//!
//! let client = Client::new();
//! client
//!     .request("GET", "http://localhost:8080/status", Dispatch::Deferred)?
//!     .chain()
//!     .set_query("verbose", "1")
//!     .then(|outcome| println!("{:?}", outcome.status()))
//!     .catch(|error| eprintln!("{error}"));
//! # Ok::<(), rith_http::Error>(())
//! ```
use core::fmt::{self, Debug};
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::AbortHandle;

use crate::error::Canceled;
use crate::{Client, Error, HttpResponse, HyperTransport, Request, RequestDecorator, Transport};

const IDLE: u8 = 0;
const RESOLVING: u8 = 1;
const RESOLVED: u8 = 2;

/// Progress of one continuation (`then` or `catch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The continuation has not been requested yet.
    Idle,
    /// The continuation was claimed and is waiting or running, or it was
    /// claimed but had nothing to deliver.
    Resolving,
    /// The continuation ran.
    Resolved,
}

struct ResolutionState(AtomicU8);

impl ResolutionState {
    const fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    // Claims the continuation; only one caller ever wins.
    fn begin(&self) -> bool {
        self.0
            .compare_exchange(IDLE, RESOLVING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish(&self) {
        self.0.store(RESOLVED, Ordering::Release);
    }

    fn get(&self) -> Resolution {
        match self.0.load(Ordering::Acquire) {
            IDLE => Resolution::Idle,
            RESOLVING => Resolution::Resolving,
            _ => Resolution::Resolved,
        }
    }
}

struct Pending {
    request: Option<Request>,
    // First failed deferred edit; reported instead of sending the request.
    deferred: Option<Error>,
}

/// Asynchronous result holder around one request.
///
/// Created by [`Client::request`] or [`Client::send_async`]. All methods take
/// `&self`, so a holder can be shared between threads; callers racing on
/// `then`/`catch` never double-invoke a callback and all wait on the same
/// completion.
///
/// Dropping a dispatched holder does not stop its request: the background task
/// runs until the transport returns. Use [`cancel`](Holder::cancel) to stop it.
pub struct Holder<T: Transport = HyperTransport> {
    client: Client<T>,
    pending: Mutex<Pending>,
    dispatched: AtomicBool,
    canceled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<HttpResponse>>>,
    completion: AsyncMutex<Option<oneshot::Receiver<HttpResponse>>>,
    response: OnceLock<Arc<HttpResponse>>,
    then_state: ResolutionState,
    catch_state: ResolutionState,
    task: Mutex<Option<AbortHandle>>,
}

impl<T: Transport> Debug for Holder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Holder")
            .field("dispatched", &self.is_dispatched())
            .field("completed", &self.response.get().is_some())
            .field("then", &self.then_state.get())
            .field("catch", &self.catch_state.get())
            .finish()
    }
}

impl<T: Transport> Holder<T> {
    pub(crate) fn new(client: Client<T>, request: Request) -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            client,
            pending: Mutex::new(Pending {
                request: Some(request),
                deferred: None,
            }),
            dispatched: AtomicBool::new(false),
            canceled: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
            completion: AsyncMutex::new(Some(receiver)),
            response: OnceLock::new(),
            then_state: ResolutionState::new(),
            catch_state: ResolutionState::new(),
            task: Mutex::new(None),
        }
    }

    /// Returns `true` once the request was handed off (or canceled).
    pub fn is_dispatched(&self) -> bool {
        self.dispatched.load(Ordering::Acquire)
    }

    /// Returns the progress of the `then` continuation.
    pub fn then_state(&self) -> Resolution {
        self.then_state.get()
    }

    /// Returns the progress of the `catch` continuation.
    pub fn catch_state(&self) -> Resolution {
        self.catch_state.get()
    }

    /// Sends the request on a background task.
    ///
    /// Idempotent: only the first call does anything. If a deferred edit
    /// failed or the transport could not be built, nothing goes on the wire
    /// and the completion carries that error instead.
    pub fn dispatch(&self) -> &Self {
        if self.dispatched.swap(true, Ordering::AcqRel) {
            return self;
        }
        let Some(sender) = lock!(self.sender).take() else {
            return self;
        };

        let (request, deferred) = {
            let mut pending = lock!(self.pending);
            (pending.request.take(), pending.deferred.take())
        };
        let prepared = match (request, deferred) {
            _ if self.canceled.load(Ordering::SeqCst) => Err(Canceled::new().into()),
            (_, Some(error)) => Err(error),
            (Some(request), None) => self.client.engine().map(|engine| (engine, request)),
            (None, None) => Err(Canceled::new().into()),
        };

        let (engine, mut request) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                tracing::debug!(%error, "request failed before dispatch");
                let _ = sender.send(HttpResponse::failed(error));
                return self;
            }
        };

        self.client.prepare(&mut request);
        let method = request.method().clone();
        let uri = request.uri().clone();
        tracing::debug!(%method, %uri, "dispatching request");

        let transport = engine.transport();
        let task = engine.spawn(async move {
            let started = Instant::now();
            let outcome = match Transport::execute(&*transport, request).await {
                Ok(response) => {
                    tracing::debug!(
                        %method,
                        %uri,
                        status = %response.status(),
                        elapsed = ?started.elapsed(),
                        "request completed"
                    );
                    HttpResponse::succeeded(response)
                }
                Err(error) => {
                    let error: Error = error.into();
                    tracing::debug!(%method, %uri, %error, elapsed = ?started.elapsed(), "request failed");
                    HttpResponse::failed(error)
                }
            };
            // The receiver is gone only if the holder was dropped.
            let _ = sender.send(outcome);
        });
        // `cancel` may have run since the check above; it sets the flag
        // before looking at the slot.
        let mut slot = lock!(self.task);
        if self.canceled.load(Ordering::SeqCst) {
            task.abort();
            tracing::debug!("request canceled during dispatch");
        } else {
            *slot = Some(task.abort_handle());
        }
        self
    }

    /// Blocks until the completion arrives; later calls return the cache.
    fn wait(&self) -> Arc<HttpResponse> {
        if let Some(response) = self.response.get() {
            return response.clone();
        }
        let mut completion = self.completion.blocking_lock();
        if let Some(response) = self.response.get() {
            return response.clone();
        }
        let outcome = match completion.take() {
            Some(receiver) => receiver.blocking_recv().unwrap_or_else(|_| canceled()),
            None => canceled(),
        };
        self.response.get_or_init(|| Arc::new(outcome)).clone()
    }

    async fn wait_async(&self) -> Arc<HttpResponse> {
        if let Some(response) = self.response.get() {
            return response.clone();
        }
        let mut completion = self.completion.lock().await;
        if let Some(response) = self.response.get() {
            return response.clone();
        }
        let outcome = match completion.take() {
            Some(receiver) => receiver.await.unwrap_or_else(|_| canceled()),
            None => canceled(),
        };
        self.response.get_or_init(|| Arc::new(outcome)).clone()
    }

    /// Dispatches if needed and blocks until the outcome is available.
    ///
    /// Every call returns the same `Arc`.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime; use
    /// [`response_async`](Holder::response_async) there.
    pub fn get_response(&self) -> Arc<HttpResponse> {
        self.dispatch().wait()
    }

    /// Dispatches if needed and awaits the outcome.
    pub async fn response_async(&self) -> Arc<HttpResponse> {
        self.dispatch();
        self.wait_async().await
    }

    /// Runs `resolver` with the outcome, at most once per holder.
    ///
    /// The outcome is passed even when the request failed; check
    /// [`HttpResponse::is_successful`] or pair with [`catch`](Holder::catch).
    /// Calls after the first are no-ops and return immediately.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn then<F>(&self, resolver: F) -> &Self
    where
        F: FnOnce(&HttpResponse),
    {
        if !self.then_state.begin() {
            return self;
        }
        let response = self.get_response();
        resolver(&response);
        self.then_state.finish();
        self
    }

    /// Runs `resolver` with the error if the request failed, at most once.
    ///
    /// Independent of [`then`](Holder::then): both may fire for one holder.
    /// When the request succeeded nothing is called and later `catch` calls
    /// stay no-ops.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn catch<F>(&self, resolver: F) -> &Self
    where
        F: FnOnce(&Error),
    {
        if !self.catch_state.begin() {
            return self;
        }
        let response = self.get_response();
        if let Some(error) = response.error() {
            resolver(error);
            self.catch_state.finish();
        }
        self
    }

    /// Applies `mutator` to the pending request.
    ///
    /// Edits made after dispatch are ignored and logged. The mutator must not
    /// call back into this holder.
    pub fn before<F>(&self, mutator: F) -> &Self
    where
        F: FnOnce(&RequestDecorator<'_, T>),
    {
        mutator(&self.chain());
        self
    }

    /// Returns a decorator over the pending request.
    ///
    /// Every decorator of a holder edits the same request.
    pub fn chain(&self) -> RequestDecorator<'_, T> {
        RequestDecorator::new(self)
    }

    /// Stops the request.
    ///
    /// Before dispatch, the holder is resolved with [`Error::Canceled`] and
    /// never sends anything. While in flight, the background task is aborted
    /// and waiters observe the same error. After completion it does nothing.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        if !self.dispatched.swap(true, Ordering::AcqRel) {
            if let Some(sender) = lock!(self.sender).take() {
                let _ = sender.send(canceled());
            }
            tracing::debug!("request canceled before dispatch");
            return;
        }
        if let Some(task) = lock!(self.task).take() {
            task.abort();
            tracing::debug!("in-flight request aborted");
        }
    }

    /// Runs `edit` on the pending request, recording the first failure.
    pub(crate) fn edit<F>(&self, operation: &'static str, edit: F)
    where
        F: FnOnce(&mut Request) -> crate::Result<()>,
    {
        let mut pending = lock!(self.pending);
        let Pending { request, deferred } = &mut *pending;
        let Some(request) = request else {
            tracing::warn!(operation, "request already dispatched, edit ignored");
            return;
        };
        if let Err(error) = edit(request) {
            tracing::debug!(operation, %error, "deferred edit failed");
            deferred.get_or_insert(error);
        }
    }
}

fn canceled() -> HttpResponse {
    HttpResponse::failed(Canceled::new().into())
}
