//! Deferred results and their combinators.
//!
//! A [`Promise`] is a handle to exactly one asynchronous computation. It is
//! immutable once built: every combinator returns a new promise wrapping a
//! new derived computation, scheduled on the same [`Executor`].
//!
//! # Example
//!
//! ```
//! use evently_promise::Promise;
//!
//! let seats = Promise::of(10)
//!     .then(|x| Promise::of(x * 2))
//!     .map(|x| x + 1);
//! assert_eq!(seats.wait().unwrap(), 21);
//! ```

mod aggregate;
mod completion;
mod optional;

pub use completion::{Completer, PromiseFuture};
pub use optional::OptionalPromise;

use std::fmt;
use std::future::{Future, IntoFuture};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use completion::Completion;

use crate::error::{BoxError, Error, Result};
use crate::executor::{default_executor, Executor};

/// A value or error that becomes available later.
///
/// Cloning a promise yields another handle to the same computation; it is
/// never run twice. Values are cloned out to each observer, so wrap large
/// values in an `Arc`.
pub struct Promise<T> {
    cell: Arc<Completion<T>>,
    executor: Arc<dyn Executor>,
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// An already successful promise.
    pub fn of(value: T) -> Self {
        Self::resolved_on(default_executor(), Ok(value))
    }

    /// An already failed promise.
    pub fn failed(error: Error) -> Self {
        Self::resolved_on(default_executor(), Err(error))
    }

    /// A promise completed through the returned [`Completer`].
    pub fn pending() -> (Self, Completer<T>) {
        Self::pending_on(default_executor())
    }

    /// Like [`pending`](Self::pending), with continuations on `executor`.
    pub fn pending_on(executor: Arc<dyn Executor>) -> (Self, Completer<T>) {
        let cell = Arc::new(Completion::pending());
        let completer = Completer::new(cell.clone());
        (Self { cell, executor }, completer)
    }

    fn resolved_on(executor: Arc<dyn Executor>, result: Result<T>) -> Self {
        Self {
            cell: Arc::new(Completion::ready(result)),
            executor,
        }
    }

    /// Lift an external asynchronous task.
    ///
    /// The task starts immediately on the default executor. Construction
    /// never fails; the promise fails later with whatever error the task
    /// reports.
    ///
    /// ```
    /// use evently_promise::Promise;
    ///
    /// let profile = Promise::from_external(async { Ok::<_, std::io::Error>("organizer") });
    /// assert_eq!(profile.wait().unwrap(), "organizer");
    /// ```
    pub fn from_external<F, E>(task: F) -> Self
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::from_external_on(default_executor(), task)
    }

    /// Lift an external task, running it on `executor`.
    pub fn from_external_on<F, E>(executor: Arc<dyn Executor>, task: F) -> Self
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        tracing::debug!(executor = executor.name(), "starting external task");
        Self::spawn_on(executor, async move { task.await.map_err(Error::failed) })
    }

    fn spawn_on<Fut>(executor: Arc<dyn Executor>, future: Fut) -> Self
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (promise, completer) = Self::pending_on(executor);
        promise.executor.spawn(Box::pin(async move {
            // A panicking task or callback fails its promise; the unwind
            // never reaches the executor's worker.
            let result = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(Error::from_panic(payload)),
            };
            tracing::trace!(ok = result.is_ok(), "promise completed");
            completer.complete(result);
        }));
        promise
    }

    fn derive<R, Fut>(&self, future: Fut) -> Promise<R>
    where
        R: Clone + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Promise::spawn_on(self.executor.clone(), future)
    }

    fn observe(&self) -> PromiseFuture<T> {
        PromiseFuture::new(self.cell.clone())
    }

    /// Transform the value with a synchronous function.
    ///
    /// If this promise fails, the result fails with the same error and `f`
    /// is never invoked. If `f` panics, the result fails with the panic
    /// message. Use [`then`](Self::then) when the next step is
    /// itself asynchronous.
    pub fn map<R, F>(&self, f: F) -> Promise<R>
    where
        R: Clone + Send + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        let upstream = self.observe();
        self.derive(async move { upstream.await.map(f) })
    }

    /// Transform the value with a fallible function.
    ///
    /// An error returned by `f` fails the resulting promise.
    pub fn try_map<R, E, F>(&self, f: F) -> Promise<R>
    where
        R: Clone + Send + 'static,
        E: Into<BoxError>,
        F: FnOnce(T) -> std::result::Result<R, E> + Send + 'static,
    {
        let upstream = self.observe();
        self.derive(async move { upstream.await.and_then(|v| f(v).map_err(Error::failed)) })
    }

    /// Chain a dependent asynchronous step.
    ///
    /// On success `f` is invoked with the value and the returned promise's
    /// outcome becomes this one's. On failure `f` is never invoked.
    pub fn then<R, F>(&self, f: F) -> Promise<R>
    where
        R: Clone + Send + 'static,
        F: FnOnce(T) -> Promise<R> + Send + 'static,
    {
        let upstream = self.observe();
        self.derive(async move {
            let value = upstream.await?;
            f(value).await
        })
    }

    /// Combine with another promise, waiting on each in turn.
    ///
    /// Waits for `self`, then for `other`, then adopts the outcome of
    /// `f(v, u)`. A failure of `self` is reported even if `other` failed
    /// first. See [`compose_concurrent`](Self::compose_concurrent) for the
    /// fail-fast variant.
    pub fn compose<U, R, F>(&self, other: &Promise<U>, f: F) -> Promise<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce(T, U) -> Promise<R> + Send + 'static,
    {
        let first = self.observe();
        let second = other.observe();
        self.derive(async move {
            let v = first.await?;
            let u = second.await?;
            f(v, u).await
        })
    }

    /// Combine with another promise, waiting on both at once.
    ///
    /// Fails with whichever failure is observed first.
    pub fn compose_concurrent<U, R, F>(&self, other: &Promise<U>, f: F) -> Promise<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce(T, U) -> Promise<R> + Send + 'static,
    {
        let first = self.observe();
        let second = other.observe();
        self.derive(async move {
            let (v, u) = futures::future::try_join(first, second).await?;
            f(v, u).await
        })
    }

    /// Observe failure.
    ///
    /// Every registered handler runs once, in registration order. A handler
    /// registered on an already failed promise runs immediately.
    pub fn on_error<H>(&self, handler: H) -> &Self
    where
        H: FnOnce(Error) + Send + 'static,
    {
        self.cell.on_error(Box::new(handler));
        self
    }

    /// Observe success, with the same ordering rules as
    /// [`on_error`](Self::on_error).
    pub fn on_success<H>(&self, handler: H) -> &Self
    where
        H: FnOnce(T) + Send + 'static,
    {
        self.cell.on_success(Box::new(handler));
        self
    }

    /// Block the calling thread until the outcome is known.
    ///
    /// Must not be called from an async task: it parks the thread and can
    /// starve the runtime that is supposed to complete the promise.
    pub fn wait(&self) -> Result<T> {
        warn_if_async_context();
        self.cell.wait()
    }

    /// Block for at most `timeout`.
    ///
    /// Returns [`Error::TimedOut`] if the deadline passes first. The timeout
    /// is reported to this caller only; `on_error` handlers do not see it and
    /// the computation keeps running.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T> {
        warn_if_async_context();
        self.cell.wait_timeout(timeout)
    }

    /// The outcome, if already known.
    pub fn peek(&self) -> Option<Result<T>> {
        self.cell.peek()
    }

    /// Returns `true` once the promise has an outcome.
    pub fn is_complete(&self) -> bool {
        self.cell.is_complete()
    }

    /// The executor continuations of this promise run on.
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }
}

impl<T: Clone + Send + 'static> Promise<Option<T>> {
    /// Narrow to an [`OptionalPromise`] for presence branching.
    pub fn into_optional(self) -> OptionalPromise<T> {
        OptionalPromise::new(self)
    }
}

// Blocking-pool threads (`spawn_blocking`) see a runtime handle too, but
// are not running a task.
fn in_runtime_task() -> bool {
    tokio::task::try_id().is_some()
}

fn warn_if_async_context() {
    if in_runtime_task() {
        tracing::warn!("blocking wait on a promise from inside an async runtime");
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> IntoFuture for Promise<T> {
    type Output = Result<T>;
    type IntoFuture = PromiseFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.observe()
    }
}

impl<T: Clone + Send + 'static> IntoFuture for &Promise<T> {
    type Output = Result<T>;
    type IntoFuture = PromiseFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.observe()
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("cell", &self.cell)
            .field("executor", &self.executor.name())
            .finish()
    }
}
