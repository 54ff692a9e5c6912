//! Waitlist Enrollment Chain
//!
//! This demo walks an entrant through signing in, loading an event, joining
//! its waitlist and checking whether the lottery selected them. Each backend
//! call is simulated with a tokio timer and wrapped in a `Promise`.
//!
//! Features demonstrated:
//! - Lifting external async calls with `Promise::from_external`
//! - Sequencing dependent steps with `then` and `map`
//! - Joining two independent lookups with `compose`
//! - Presence branching with `into_optional().optionally(..).or_else(..)`
//! - Terminal error handling with `on_error`
//!
//! Run with:
//! ```bash
//! cargo run --example d01_enrollment_chain
//! ```

use std::time::Duration;

use evently_promise::{Error, Promise};

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
}

#[derive(Debug, Clone)]
struct Event {
    id: u32,
    title: String,
    capacity: usize,
}

#[derive(Debug, Clone)]
struct Enrollment {
    event_id: u32,
    position: usize,
}

async fn backend_latency() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

fn sign_in(user: &str) -> Promise<Session> {
    let user_id = user.to_string();
    Promise::from_external(async move {
        backend_latency().await;
        Ok::<_, Error>(Session { user_id })
    })
}

fn load_event(id: u32) -> Promise<Event> {
    Promise::from_external(async move {
        backend_latency().await;
        if id == 0 {
            return Err(Error::msg("event 0 was cancelled by its organizer"));
        }
        Ok(Event {
            id,
            title: format!("Community Swim #{}", id),
            capacity: 25,
        })
    })
}

fn join_waitlist(session: Session, event: Event) -> Promise<Enrollment> {
    Promise::from_external(async move {
        backend_latency().await;
        tracing::info!(user = %session.user_id, event = event.id, "joined waitlist");
        Ok::<_, Error>(Enrollment {
            event_id: event.id,
            position: 12,
        })
    })
}

fn lottery_result(enrollment: &Enrollment, capacity: usize) -> Promise<Option<usize>> {
    let position = enrollment.position;
    Promise::from_external(async move {
        backend_latency().await;
        // Selected entrants receive a seat number; others stay on the list.
        Ok::<_, Error>((position <= capacity).then_some(position))
    })
}

fn enroll(user: &str, event_id: u32) -> Promise<Option<usize>> {
    let event = load_event(event_id);
    sign_in(user)
        .compose(&event, |session, event| {
            let capacity = event.capacity;
            println!("Enrolling {} in '{}'", session.user_id, event.title);
            join_waitlist(session, event).map(move |enrollment| (enrollment, capacity))
        })
        .then(|(enrollment, capacity)| {
            println!(
                "Waitlist position {} for event {}",
                enrollment.position, enrollment.event_id
            );
            lottery_result(&enrollment, capacity)
        })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let selected = enroll("ana@evently.app", 7).into_optional();
    let selected = selected
        .optionally(|seat| println!("Selected by lottery, seat {}", seat))
        .or_else(|| println!("Not selected this round"));
    selected.on_error(|err| eprintln!("Enrollment failed: {}", err));
    selected.into_inner().await?;

    let cancelled = enroll("ben@evently.app", 0);
    cancelled.on_error(|err| eprintln!("Enrollment failed: {}", err));
    if cancelled.await.is_err() {
        println!("Second enrollment reported its failure through on_error");
    }

    Ok(())
}
