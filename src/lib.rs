//! Deferred-result composition for the Evently client.
//!
//! This crate wraps asynchronous backend calls (enrollment, waitlist and
//! lottery lookups, profile fetches) in a [`Promise`]: a handle to one
//! in-flight computation with combinators for mapping, sequencing,
//! composition, aggregation and terminal error handling.
//!
//! # Overview
//!
//! - [`Promise`] - the deferred result and its combinators
//! - [`OptionalPromise`] - presence/absence taps for `Promise<Option<T>>`
//! - [`Promise::all`] / [`promise_all!`] - "all must succeed" aggregation
//! - [`Executor`] - the scheduling seam, with tokio, thread-pool and
//!   thread-per-task adapters
//! - [`ExecutorConfig`] - TOML/environment configuration of the default
//!   executor
//!
//! # Example
//!
//! ```
//! use evently_promise::{Error, Promise};
//!
//! fn entrant_count(event_id: u32) -> Promise<usize> {
//!     Promise::from_external(async move {
//!         if event_id == 0 {
//!             return Err(Error::msg("unknown event"));
//!         }
//!         Ok(12)
//!     })
//! }
//!
//! let total = entrant_count(7)
//!     .compose(&entrant_count(8), |a, b| Promise::of(a + b));
//! total.on_error(|err| eprintln!("could not load entrants: {}", err));
//! assert_eq!(total.wait().unwrap(), 24);
//! ```

pub mod config;
pub mod error;
pub mod executor;
#[cfg(feature = "logging")]
pub mod logging;
pub mod promise;

pub use config::{ExecutorConfig, ExecutorKind};
pub use error::{BoxError, Error, Result, SharedError};
pub use executor::{
    default_executor, Executor, ThreadPerTaskExecutor, ThreadPoolExecutor, TokioExecutor,
};
#[cfg(feature = "logging")]
pub use logging::{init_logging, init_logging_with_filter};
pub use promise::{Completer, OptionalPromise, Promise, PromiseFuture};
