//! "All must succeed" aggregation.

use futures::future::try_join_all;

use super::Promise;
use crate::executor::default_executor;

impl<T: Clone + Send + 'static> Promise<T> {
    /// Combine promises into one that succeeds only if all succeed.
    ///
    /// Values keep the input order. The first failure observed fails the
    /// result; when several inputs fail, which one is reported is not
    /// specified. Inputs are joined concurrently. An empty input succeeds
    /// with an empty vector.
    ///
    /// Continuations run on the first input's executor.
    ///
    /// ```
    /// use evently_promise::Promise;
    ///
    /// let all = Promise::all(vec![Promise::of(1), Promise::of(2), Promise::of(3)]);
    /// assert_eq!(all.wait().unwrap(), vec![1, 2, 3]);
    /// ```
    pub fn all<I>(promises: I) -> Promise<Vec<T>>
    where
        I: IntoIterator<Item = Promise<T>>,
    {
        let promises: Vec<Promise<T>> = promises.into_iter().collect();
        let executor = promises
            .first()
            .map(|p| p.executor.clone())
            .unwrap_or_else(default_executor);
        if promises.is_empty() {
            return Promise::resolved_on(executor, Ok(Vec::new()));
        }

        tracing::debug!(count = promises.len(), "aggregating promises");
        let observers: Vec<_> = promises.iter().map(Promise::observe).collect();
        Promise::spawn_on(executor, try_join_all(observers))
    }
}

/// Combine a fixed list of promises; see [`Promise::all`].
///
/// ```
/// use evently_promise::{promise_all, Promise};
///
/// let entrants = promise_all!(Promise::of("ana"), Promise::of("ben"));
/// assert_eq!(entrants.wait().unwrap(), vec!["ana", "ben"]);
/// ```
#[macro_export]
macro_rules! promise_all {
    ($($promise:expr),+ $(,)?) => {
        $crate::Promise::all(::std::vec![$($promise),+])
    };
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::Promise;

    #[test]
    fn test_empty_input_succeeds() {
        let all = Promise::<u8>::all(Vec::new());
        assert!(all.is_complete());
        assert_eq!(all.wait().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_order_follows_input_not_completion() {
        let (slow, slow_done) = Promise::pending();
        let (fast, fast_done) = Promise::pending();
        let all = Promise::all([slow, fast]);
        fast_done.succeed("second");
        slow_done.succeed("first");
        assert_eq!(all.wait().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_single_failure_fails_all() {
        let (never, _completer) = Promise::<u8>::pending();
        let all = promise_all![never, Promise::failed(Error::msg("lottery closed"))];
        assert_eq!(all.wait().unwrap_err().to_string(), "lottery closed");
    }
}
