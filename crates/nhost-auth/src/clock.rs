//! Injectable time source.

use chrono::{DateTime, Utc};

/// Time source for expiry arithmetic.
///
/// The client never calls `Utc::now()` directly; tests inject a manual
/// clock to pin down refresh timing.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
