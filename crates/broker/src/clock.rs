//! Clock abstraction so staleness checks can run against a fake clock in
//! tests instead of real delays.

use chrono::{DateTime, Utc};

/// Source of "now" for every place staleness is computed.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside of tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
