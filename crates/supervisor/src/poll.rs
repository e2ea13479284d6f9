//! Bounded Polling
//!
//! Deadline arithmetic shared by every wait loop in the supervisor.

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// A monotonic point in time after which a bounded wait is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        Instant::now() > self.0
    }
}

/// Fixed-interval poller bounded by a deadline.
///
/// Callers run their checks first and then call [`Poller::tick`], which
/// reports `false` once the deadline has passed and otherwise sleeps one
/// interval. A loop that never observes success therefore terminates within
/// one interval past the deadline.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    deadline: Deadline,
}

impl Poller {
    pub fn new(interval: Duration, deadline: Deadline) -> Self {
        Self { interval, deadline }
    }

    /// Sleep until the next poll iteration. Returns `false` when the
    /// deadline has passed and the caller should give up.
    pub async fn tick(&self) -> bool {
        if self.deadline.expired() {
            return false;
        }
        sleep(self.interval).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticks_until_deadline_then_stops() {
        let started = std::time::Instant::now();
        let poller = Poller::new(
            Duration::from_millis(10),
            Deadline::after(Duration::from_millis(50)),
        );

        let mut ticks = 0;
        while poller.tick().await {
            ticks += 1;
        }

        let elapsed = started.elapsed();
        assert!(ticks >= 1);
        assert!(elapsed >= Duration::from_millis(50));
        // Bounded by one interval past the deadline, plus scheduling slack.
        assert!(elapsed < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn expired_deadline_refuses_to_tick() {
        let poller = Poller::new(
            Duration::from_secs(60),
            Deadline::after(Duration::ZERO),
        );
        sleep(Duration::from_millis(5)).await;
        assert!(!poller.tick().await);
    }

    #[tokio::test]
    async fn deadline_expiry_is_observable() {
        let deadline = Deadline::after(Duration::from_millis(20));
        assert!(!deadline.expired());
        sleep(Duration::from_millis(30)).await;
        assert!(deadline.expired());
    }
}
