//! Delayed delivery of timer events into the dashboard loop

use std::time::Duration;

/// Runs `deliver` once `delay` has passed. Implementations must not call
/// `deliver` synchronously from `schedule`.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, deliver: Box<dyn FnOnce() + Send>);
}

/// Timers on the tokio runtime the caller is running in
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, deliver: Box<dyn FnOnce() + Send>) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            deliver();
        });
    }
}
