//! Presence branching for promises of optional values.

use std::future::IntoFuture;
use std::ops::Deref;

use super::{Promise, PromiseFuture};
use crate::error::Result;

/// A [`Promise`] whose value may be absent.
///
/// [`optionally`](Self::optionally) and [`or_else`](Self::or_else) are taps:
/// they never change the wrapped value and return an equivalent promise, so
/// a presence/absence pair reads as one chain. Neither fires if the promise
/// fails; handle that with [`on_error`](Promise::on_error).
///
/// # Examples
///
/// ```
/// use evently_promise::Promise;
///
/// let (tx, rx) = std::sync::mpsc::channel();
/// let absent = tx.clone();
/// Promise::of(Some("Spring Gala"))
///     .into_optional()
///     .optionally(move |name| tx.send(format!("found {}", name)).unwrap())
///     .or_else(move || absent.send("no event".to_string()).unwrap());
/// assert_eq!(rx.recv().unwrap(), "found Spring Gala");
/// ```
pub struct OptionalPromise<T> {
    inner: Promise<Option<T>>,
}

impl<T: Clone + Send + 'static> OptionalPromise<T> {
    /// Wrap a promise of an optional value.
    pub fn new(inner: Promise<Option<T>>) -> Self {
        Self { inner }
    }

    /// Run `action` with the value if one is present.
    pub fn optionally<F>(self, action: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.inner.on_success(move |value| {
            if let Some(value) = value {
                action(value);
            }
        });
        self
    }

    /// Run `action` if the value is absent.
    pub fn or_else<F>(self, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.on_success(move |value| {
            if value.is_none() {
                action();
            }
        });
        self
    }

    /// Widen back to the underlying promise.
    pub fn into_inner(self) -> Promise<Option<T>> {
        self.inner
    }
}

impl<T> Deref for OptionalPromise<T> {
    type Target = Promise<Option<T>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: Clone + Send + 'static> From<Promise<Option<T>>> for OptionalPromise<T> {
    fn from(inner: Promise<Option<T>>) -> Self {
        Self::new(inner)
    }
}

impl<T: Clone + Send + 'static> From<OptionalPromise<T>> for Promise<Option<T>> {
    fn from(optional: OptionalPromise<T>) -> Self {
        optional.inner
    }
}

impl<T> Clone for OptionalPromise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> IntoFuture for OptionalPromise<T> {
    type Output = Result<Option<T>>;
    type IntoFuture = PromiseFuture<Option<T>>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner.into_future()
    }
}

impl<T> std::fmt::Debug for OptionalPromise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OptionalPromise").field(&self.inner).finish()
    }
}
