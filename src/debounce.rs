//! Trailing-edge debounce timer
//!
//! A single pending deadline. Scheduling again replaces the previous deadline,
//! so a steady stream of triggers closer together than the delay keeps
//! pushing the firing point back.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Arms the timer `delay` from now, replacing any pending deadline
    pub fn schedule(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Completes when the pending deadline passes, then returns to idle
    ///
    /// Never completes while idle. Cancel-safe: dropping the future keeps the
    /// deadline armed, which is what `tokio::select!` loops rely on.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}
