//! Polling parameters for [`FastPollingMutex`](crate::FastPollingMutex).

use std::time::Duration;

use keel_core::Timeout;

/// How a waiter polls for the lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum time to wait. Default: [`Timeout::Infinite`].
    pub timeout: Timeout,
    /// Sleep between failed polls. `None` spins with a CPU hint only.
    /// Default: `None`.
    pub sleep: Option<Duration>,
}

impl PollConfig {
    /// Poll with the given timeout and no sleep.
    pub fn with_timeout(timeout: Timeout) -> Self {
        Self {
            timeout,
            sleep: None,
        }
    }

    /// Add a sleep between polls.
    pub fn sleeping(mut self, sleep: Duration) -> Self {
        self.sleep = Some(sleep);
        self
    }
}
