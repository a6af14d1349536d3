//! Bounded-wait timeouts.

use std::fmt;
use std::time::{Duration, Instant};

/// How long a blocking operation may wait.
///
/// The default is [`Timeout::Infinite`]. Cancellation is expressed only
/// through expiry: there is no asynchronous cancel channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Wait until the operation succeeds.
    #[default]
    Infinite,
    /// Give up after the given duration.
    Finite(Duration),
}

impl Timeout {
    /// Do not wait at all: a single attempt.
    pub const NO_WAIT: Self = Self::Finite(Duration::ZERO);

    /// A finite timeout in milliseconds.
    pub const fn millis(ms: u64) -> Self {
        Self::Finite(Duration::from_millis(ms))
    }

    /// Whether this timeout never expires.
    pub const fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Deadline relative to `start`, or `None` for an infinite wait.
    ///
    /// A duration too large to add to `start` is treated as infinite.
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        match self {
            Self::Infinite => None,
            Self::Finite(d) => start.checked_add(*d),
        }
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infinite => write!(f, "infinite"),
            Self::Finite(d) => write!(f, "{} ms", d.as_millis()),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Finite(d)
    }
}
