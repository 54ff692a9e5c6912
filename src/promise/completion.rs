//! Single-assignment result slot shared by a promise and its completer.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, ReentrantMutex};

use crate::error::{panic_message, Error, Result};

type ErrorHandler = Box<dyn FnOnce(Error) + Send>;
type SuccessHandler<T> = Box<dyn FnOnce(T) + Send>;

enum Slot<T> {
    Pending {
        wakers: Vec<Waker>,
        on_error: Vec<ErrorHandler>,
        on_success: Vec<SuccessHandler<T>>,
    },
    Ready(Result<T>),
}

/// The eventual outcome of one computation.
///
/// Completed at most once. Observers registered before completion run in
/// registration order on the completing thread; observers registered after
/// completion run immediately on the registering thread.
pub(crate) struct Completion<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
    // Serializes observer dispatch so late registrations cannot overtake
    // handlers still being invoked by `complete`. Reentrant so a handler may
    // register further handlers on the same cell.
    dispatch: ReentrantMutex<()>,
}

impl<T: Clone + Send + 'static> Completion<T> {
    pub(crate) fn pending() -> Self {
        Self::with_slot(Slot::Pending {
            wakers: Vec::new(),
            on_error: Vec::new(),
            on_success: Vec::new(),
        })
    }

    pub(crate) fn ready(result: Result<T>) -> Self {
        Self::with_slot(Slot::Ready(result))
    }

    fn with_slot(slot: Slot<T>) -> Self {
        Self {
            slot: Mutex::new(slot),
            ready: Condvar::new(),
            dispatch: ReentrantMutex::new(()),
        }
    }

    /// Store the outcome. Returns `false` if the cell was already complete.
    pub(crate) fn complete(&self, result: Result<T>) -> bool {
        let _dispatch = self.dispatch.lock();
        let previous = {
            let mut slot = self.slot.lock();
            if matches!(*slot, Slot::Ready(_)) {
                return false;
            }
            std::mem::replace(&mut *slot, Slot::Ready(result.clone()))
        };
        self.ready.notify_all();

        if let Slot::Pending {
            wakers,
            on_error,
            on_success,
        } = previous
        {
            for waker in wakers {
                waker.wake();
            }
            match result {
                Ok(value) => {
                    for handler in on_success {
                        let value = value.clone();
                        notify("on_success", move || handler(value));
                    }
                },
                Err(err) => {
                    for handler in on_error {
                        let err = err.clone();
                        notify("on_error", move || handler(err));
                    }
                },
            }
        }
        true
    }

    pub(crate) fn on_error(&self, handler: ErrorHandler) {
        let _dispatch = self.dispatch.lock();
        let failure = {
            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Pending { on_error, .. } => {
                    on_error.push(handler);
                    return;
                },
                Slot::Ready(Ok(_)) => return,
                Slot::Ready(Err(err)) => err.clone(),
            }
        };
        notify("on_error", move || handler(failure));
    }

    pub(crate) fn on_success(&self, handler: SuccessHandler<T>) {
        let _dispatch = self.dispatch.lock();
        let value = {
            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Pending { on_success, .. } => {
                    on_success.push(handler);
                    return;
                },
                Slot::Ready(Err(_)) => return,
                Slot::Ready(Ok(value)) => value.clone(),
            }
        };
        notify("on_success", move || handler(value));
    }

    pub(crate) fn peek(&self) -> Option<Result<T>> {
        match &*self.slot.lock() {
            Slot::Ready(result) => Some(result.clone()),
            Slot::Pending { .. } => None,
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Ready(_))
    }

    pub(crate) fn wait(&self) -> Result<T> {
        let mut slot = self.slot.lock();
        loop {
            if let Slot::Ready(result) = &*slot {
                return result.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Result<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        loop {
            if let Slot::Ready(result) = &*slot {
                return result.clone();
            }
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                return match &*slot {
                    Slot::Ready(result) => result.clone(),
                    Slot::Pending { .. } => Err(Error::TimedOut(timeout)),
                };
            }
        }
    }

    fn poll_result(&self, cx: &mut Context<'_>) -> Poll<Result<T>> {
        let mut slot = self.slot.lock();
        match &mut *slot {
            Slot::Ready(result) => Poll::Ready(result.clone()),
            Slot::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            },
        }
    }
}

// Observers fire independently: a panicking handler is logged and the
// remaining handlers still run.
fn notify(kind: &'static str, handler: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(handler)) {
        tracing::error!(
            handler = kind,
            panic = panic_message(payload.as_ref()),
            "promise observer panicked"
        );
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.lock() {
            Slot::Pending { .. } => "pending",
            Slot::Ready(Ok(_)) => "succeeded",
            Slot::Ready(Err(_)) => "failed",
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}

/// Future resolving to a promise's outcome.
///
/// Returned by awaiting a [`Promise`](crate::Promise). Any number of these
/// may observe the same promise.
pub struct PromiseFuture<T> {
    cell: Arc<Completion<T>>,
}

impl<T> PromiseFuture<T> {
    pub(crate) fn new(cell: Arc<Completion<T>>) -> Self {
        Self { cell }
    }
}

impl<T: Clone + Send + 'static> Future for PromiseFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.cell.poll_result(cx)
    }
}

impl<T> fmt::Debug for PromiseFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseFuture")
            .field("cell", &self.cell)
            .finish()
    }
}

/// Write handle for a pending [`Promise`](crate::Promise).
///
/// Obtained from [`Promise::pending`](crate::Promise::pending). Dropping a
/// completer without completing it fails the promise with
/// [`Error::Abandoned`].
///
/// # Examples
///
/// ```
/// use evently_promise::Promise;
///
/// let (promise, completer) = Promise::<&str>::pending();
/// assert!(!promise.is_complete());
/// assert!(completer.succeed("waitlisted"));
/// assert_eq!(promise.wait().unwrap(), "waitlisted");
/// ```
pub struct Completer<T: Clone + Send + 'static> {
    cell: Arc<Completion<T>>,
}

impl<T: Clone + Send + 'static> Completer<T> {
    pub(crate) fn new(cell: Arc<Completion<T>>) -> Self {
        Self { cell }
    }

    /// Complete with a value. Returns `false` if already complete.
    pub fn succeed(self, value: T) -> bool {
        self.cell.complete(Ok(value))
    }

    /// Complete with a failure. Returns `false` if already complete.
    pub fn fail(self, error: Error) -> bool {
        self.cell.complete(Err(error))
    }

    /// Complete with an outcome. Returns `false` if already complete.
    pub fn complete(self, result: Result<T>) -> bool {
        self.cell.complete(result)
    }

    /// Returns `true` once the promise has an outcome.
    pub fn is_complete(&self) -> bool {
        self.cell.is_complete()
    }
}

impl<T: Clone + Send + 'static> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.cell.complete(Err(Error::Abandoned)) {
            tracing::warn!("promise completer dropped before completion");
        }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("cell", &self.cell)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_first_completion_wins() {
        let cell = Completion::pending();
        assert!(cell.complete(Ok(1)));
        assert!(!cell.complete(Ok(2)));
        assert!(!cell.complete(Err(Error::msg("late"))));
        assert_eq!(cell.wait().unwrap(), 1);
    }

    #[test]
    fn test_handlers_fire_in_registration_order() {
        let cell = Completion::<u8>::pending();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            cell.on_error(Box::new(move |_| order.lock().push(i)));
        }
        cell.complete(Err(Error::msg("boom")));

        // Registered after completion: runs immediately, still last.
        let late = order.clone();
        cell.on_error(Box::new(move |_| late.lock().push(3)));

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_panicking_handler_does_not_skip_later_handlers() {
        let cell = Completion::<u8>::pending();
        let hits = Arc::new(AtomicUsize::new(0));

        cell.on_error(Box::new(|_| panic!("observer bug")));
        let h = hits.clone();
        cell.on_error(Box::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(cell.complete(Err(Error::msg("waitlist full"))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Late registration on the failed cell is isolated the same way.
        cell.on_error(Box::new(|_| panic!("late observer bug")));
        let h = hits.clone();
        cell.on_error(Box::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_success_handler_is_isolated() {
        let cell = Completion::pending();
        let seen = Arc::new(Mutex::new(Vec::new()));

        cell.on_success(Box::new(|_: u32| panic!("observer bug")));
        let s = seen.clone();
        cell.on_success(Box::new(move |v| s.lock().push(v)));

        assert!(cell.complete(Ok(9)));
        assert_eq!(*seen.lock(), vec![9]);
        assert_eq!(cell.wait().unwrap(), 9);
    }

    #[test]
    fn test_success_skips_error_handlers() {
        let cell = Completion::pending();
        let errors = Arc::new(AtomicUsize::new(0));
        let successes = Arc::new(AtomicUsize::new(0));

        let e = errors.clone();
        cell.on_error(Box::new(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        }));
        let s = successes.clone();
        cell.on_success(Box::new(move |v: u32| {
            assert_eq!(v, 7);
            s.fetch_add(1, Ordering::SeqCst);
        }));

        cell.complete(Ok(7));
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_register_on_same_cell() {
        let cell = Arc::new(Completion::<u8>::pending());
        let hits = Arc::new(AtomicUsize::new(0));

        let inner_cell = cell.clone();
        let inner_hits = hits.clone();
        cell.on_error(Box::new(move |_| {
            let h = inner_hits.clone();
            inner_cell.on_error(Box::new(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        cell.complete(Err(Error::msg("boom")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_blocks_until_completed_from_another_thread() {
        let cell = Arc::new(Completion::pending());
        let writer = cell.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.complete(Ok("done"));
        });
        assert_eq!(cell.wait().unwrap(), "done");
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_on_pending_cell() {
        let cell = Completion::<u8>::pending();
        let err = cell.wait_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(err.is_timeout());
        assert!(!cell.is_complete());
    }

    #[test]
    fn test_dropped_completer_abandons() {
        let cell = Arc::new(Completion::<u8>::pending());
        drop(Completer::new(cell.clone()));
        assert!(cell.peek().unwrap().unwrap_err().is_abandoned());
    }

    #[test]
    fn test_completed_completer_drop_is_noop() {
        let cell = Arc::new(Completion::pending());
        let completer = Completer::new(cell.clone());
        assert!(completer.succeed(5));
        assert_eq!(cell.peek().unwrap().unwrap(), 5);
    }

    #[test]
    fn test_debug_reports_state() {
        let cell = Completion::<u8>::pending();
        assert!(format!("{:?}", cell).contains("pending"));
        cell.complete(Ok(1));
        assert!(format!("{:?}", cell).contains("succeeded"));
    }
}
