//! Rate limiter: at most one call per interval, with one trailing call
//! deferred to the end of the window.

use std::time::Duration;
use tokio::time::Instant;

/// What the caller should do with a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Run it now.
    Now,
    /// Run it at the given instant (schedule a trailing call).
    Deferred(Instant),
    /// A trailing call is already pending; drop this one.
    Coalesced,
}

#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            pending: false,
        }
    }

    pub fn admit(&mut self, now: Instant) -> Admission {
        match self.last {
            Some(last) if now < last + self.interval => {
                if self.pending {
                    Admission::Coalesced
                } else {
                    self.pending = true;
                    Admission::Deferred(last + self.interval)
                }
            }
            _ => {
                self.last = Some(now);
                self.pending = false;
                Admission::Now
            }
        }
    }

    /// Claim the pending trailing call. Returns false when nothing is pending
    /// (for example after [`Throttle::reset`]).
    pub fn fire_pending(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.last = Some(now);
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_first_call_runs_immediately() {
        let mut t = Throttle::new(800 * MS);
        assert_eq!(t.admit(Instant::now()), Admission::Now);
    }

    #[test]
    fn test_burst_collapses_to_one_trailing_call() {
        let start = Instant::now();
        let mut t = Throttle::new(800 * MS);
        assert_eq!(t.admit(start), Admission::Now);
        assert_eq!(t.admit(start + 100 * MS), Admission::Deferred(start + 800 * MS));
        assert_eq!(t.admit(start + 200 * MS), Admission::Coalesced);
        assert!(t.fire_pending(start + 800 * MS));
        assert!(!t.fire_pending(start + 801 * MS));
        // window restarts from the trailing call
        assert_eq!(t.admit(start + 900 * MS), Admission::Deferred(start + 1600 * MS));
    }

    #[test]
    fn test_after_interval_runs_again() {
        let start = Instant::now();
        let mut t = Throttle::new(800 * MS);
        t.admit(start);
        assert_eq!(t.admit(start + 800 * MS), Admission::Now);
    }

    #[test]
    fn test_reset_drops_pending() {
        let start = Instant::now();
        let mut t = Throttle::new(800 * MS);
        t.admit(start);
        t.admit(start + 10 * MS);
        assert!(t.is_pending());
        t.reset();
        assert!(!t.fire_pending(start + 800 * MS));
        assert_eq!(t.admit(start + 20 * MS), Admission::Now);
    }
}
