//! Error types for deferred results.
//!
//! A failed [`Promise`](crate::Promise) carries an [`Error`]. Failures raised
//! by the wrapped computation and failures raised by a combinator callback
//! share the [`Error::Failed`] variant, so downstream links never need to
//! know where a failure started.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error accepted from external tasks and fallible callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a deferred result.
///
/// `Error` is cheap to clone: the same failure is handed to every observer
/// of a promise and to every promise derived from it.
///
/// # Examples
///
/// ```
/// use evently_promise::{Error, Promise};
///
/// let promise: Promise<u32> = Promise::failed(Error::msg("enrollment closed"));
/// let err = promise.wait().unwrap_err();
/// assert!(err.is_failed());
/// assert_eq!(err.to_string(), "enrollment closed");
/// ```
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The wrapped computation or a combinator callback failed.
    #[error(transparent)]
    Failed(SharedError),

    /// The computation was dropped before it produced a result.
    #[error("computation was abandoned before completing")]
    Abandoned,

    /// A bounded wait elapsed before the computation completed.
    #[error("timed out after {0:?} waiting for result")]
    TimedOut(Duration),

    /// An executor could not be constructed.
    #[error("executor error: {0}")]
    Executor(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap any error as a failure of the computation.
    ///
    /// An [`Error`] passed through here is returned as-is instead of being
    /// nested inside another `Failed`.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        match err.into().downcast::<Error>() {
            Ok(err) => *err,
            Err(other) => Self::Failed(SharedError(Arc::from(other))),
        }
    }

    /// Create a failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::failed(Message(message.into()))
    }

    /// Convert a caught panic into a failure carrying its message.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::msg(format!("callback panicked: {}", panic_message(payload.as_ref())))
    }

    /// Returns `true` for upstream and callback failures.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns `true` if a bounded wait gave up.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// Returns `true` if the computation was dropped before completing.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Abandoned)
    }

    /// Downcast the underlying failure to a concrete error type.
    ///
    /// ```
    /// use evently_promise::Error;
    ///
    /// let err = Error::failed(std::io::Error::other("offline"));
    /// assert!(err.downcast_ref::<std::io::Error>().is_some());
    /// ```
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failed(shared) => shared.0.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("TOML parse error: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Reference-counted failure shared between observers.
#[derive(Clone)]
pub struct SharedError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl SharedError {
    /// Borrow the original error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

// Transparent: the wrapped error's own source is the next link in the chain.
impl std::error::Error for SharedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Text of a panic payload, for `&str` and `String` payloads.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Quota(u32);

    impl fmt::Display for Quota {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "quota exceeded: {}", self.0)
        }
    }

    impl std::error::Error for Quota {}

    #[test]
    fn test_failed_preserves_original_error() {
        let err = Error::failed(Quota(3));
        assert!(err.is_failed());
        assert_eq!(err.to_string(), "quota exceeded: 3");
        assert_eq!(err.downcast_ref::<Quota>(), Some(&Quota(3)));
    }

    #[test]
    fn test_failed_does_not_nest_crate_errors() {
        let err = Error::failed(Error::Abandoned);
        assert!(err.is_abandoned());

        let err = Error::failed(Error::msg("closed"));
        assert!(err.is_failed());
        assert!(err.downcast_ref::<Error>().is_none());
        assert_eq!(err.to_string(), "closed");
    }

    #[test]
    fn test_clone_shares_failure() {
        let err = Error::failed(Quota(1));
        let copy = err.clone();
        match (&err, &copy) {
            (Error::Failed(a), Error::Failed(b)) => assert!(Arc::ptr_eq(&a.0, &b.0)),
            _ => panic!("Expected Failed variants"),
        }
    }

    #[test]
    fn test_wait_only_variants() {
        let err = Error::TimedOut(Duration::from_millis(50));
        assert!(err.is_timeout());
        assert!(!err.is_failed());
        assert!(err.to_string().contains("50ms"));
        assert!(err.downcast_ref::<Quota>().is_none());

        assert!(Error::Abandoned.is_abandoned());
        assert!(Error::Abandoned.to_string().contains("abandoned"));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("enrollment rejected")]
    struct Rejected(#[source] std::io::Error);

    #[test]
    fn test_source_chain_does_not_repeat_message() {
        let err = Error::msg("closed");
        assert_eq!(err.to_string(), "closed");
        assert!(std::error::Error::source(&err).is_none());

        let err = Error::failed(Rejected(std::io::Error::other("seat limit")));
        assert_eq!(err.to_string(), "enrollment rejected");
        let source = std::error::Error::source(&err).expect("wrapped error's source");
        assert_eq!(source.to_string(), "seat limit");
        assert!(std::error::Error::source(source).is_none());
    }

    #[test]
    fn test_from_panic_keeps_message() {
        let err = Error::from_panic(Box::new("seat map missing"));
        assert!(err.is_failed());
        assert_eq!(err.to_string(), "callback panicked: seat map missing");

        let err = Error::from_panic(Box::new(String::from("owned")));
        assert!(err.to_string().ends_with("owned"));

        let err = Error::from_panic(Box::new(7u8));
        assert!(err.to_string().contains("non-string"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
