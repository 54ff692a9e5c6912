//! Organizer Entrant Lists
//!
//! This demo loads the four entrant tabs an organizer sees (waiting,
//! selected, enrolled, cancelled) in parallel, aggregates them with
//! `Promise::all`, and blocks on the result from a plain thread. No async
//! runtime is involved: the default executor is configured from the
//! environment.
//!
//! Features demonstrated:
//! - `tracing-subscriber` setup via `init_logging`
//! - `ExecutorConfig::from_env` and an explicit executor
//! - Aggregation with `Promise::all` and `promise_all!`
//! - Bounded blocking waits with `wait_timeout`
//!
//! Run with:
//! ```bash
//! RUST_LOG=evently_promise=debug cargo run --example d02_entrant_lists
//! ```

use std::thread;
use std::time::Duration;

use evently_promise::{init_logging, promise_all, Error, ExecutorConfig, Promise};

const TABS: [&str; 4] = ["waiting", "selected", "enrolled", "cancelled"];

fn main() -> Result<(), Error> {
    init_logging()?;

    let config = ExecutorConfig::from_env();
    tracing::info!(kind = ?config.kind, "building executor");
    let executor = config.build()?;

    let tabs: Vec<Promise<(String, Vec<String>)>> = TABS
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let tab = tab.to_string();
            Promise::from_external_on(executor.clone(), async move {
                // Simulated document query.
                thread::sleep(Duration::from_millis(10 * (4 - i as u64)));
                let entrants: Vec<String> =
                    (0..=i).map(|n| format!("{}-entrant-{}", tab, n)).collect();
                Ok::<_, Error>((tab, entrants))
            })
        })
        .collect();

    let lists = Promise::all(tabs).wait_timeout(Duration::from_secs(5))?;
    for (tab, entrants) in &lists {
        println!("{:>10}: {}", tab, entrants.join(", "));
    }

    let counts = promise_all!(
        Promise::of(lists[0].1.len()),
        Promise::of(lists[1].1.len()),
        Promise::<usize>::failed(Error::msg("cancelled list is restricted")),
    );
    counts.on_error(|err| tracing::warn!(error = %err, "count query failed"));
    match counts.wait() {
        Ok(counts) => println!("Counts: {:?}", counts),
        Err(err) => println!("Counts unavailable: {}", err),
    }

    Ok(())
}
