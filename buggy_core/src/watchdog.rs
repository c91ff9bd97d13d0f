//! Command liveness watchdog.

/// Counts milliseconds without a well-formed frame and reports expiry.
///
/// Expiry repeats once per timeout period for as long as the link stays
/// silent. A timeout of 0 disables the watchdog.
#[derive(Debug, Clone)]
pub struct CommandWatchdog {
    timeout_ms: u32,
    idle_ms: u32,
    trips: u32,
}

impl CommandWatchdog {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            idle_ms: 0,
            trips: 0,
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
        self.idle_ms = 0;
    }

    pub fn is_enabled(&self) -> bool {
        self.timeout_ms > 0
    }

    /// A frame arrived.
    pub fn feed(&mut self) {
        self.idle_ms = 0;
    }

    /// Advance by `elapsed_ms`; true when the timeout was reached.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.idle_ms = self.idle_ms.saturating_add(elapsed_ms);
        if self.idle_ms >= self.timeout_ms {
            self.idle_ms = 0;
            self.trips += 1;
            true
        } else {
            false
        }
    }

    /// Number of expiries so far.
    pub fn trips(&self) -> u32 {
        self.trips
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_timeout_and_repeats() {
        let mut w = CommandWatchdog::new(3);
        assert!(!w.tick(1));
        assert!(!w.tick(1));
        assert!(w.tick(1));
        assert!(!w.tick(1));
        assert!(!w.tick(1));
        assert!(w.tick(1));
        assert_eq!(w.trips(), 2);
    }

    #[test]
    fn feed_postpones_expiry() {
        let mut w = CommandWatchdog::new(3);
        w.tick(2);
        w.feed();
        assert!(!w.tick(2));
        assert!(w.tick(1));
    }

    #[test]
    fn zero_disables() {
        let mut w = CommandWatchdog::new(0);
        assert!(!w.tick(u32::MAX));
        assert!(!w.is_enabled());
    }
}
