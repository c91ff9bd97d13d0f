//! Millisecond tick cascade.
//!
//! `poll` turns wall-clock milliseconds into callbacks: every millisecond,
//! every tenth millisecond, every tenth of a second (with its index 0..=9) and
//! every second. Within one millisecond the callbacks fire in that order.

/// Receiver of scheduler ticks. All methods default to no-ops.
pub trait Ticker {
    fn every_milli(&mut self) {}
    fn every_10ms(&mut self) {}
    fn every_tenth(&mut self, tenth: u8) {
        let _ = tenth;
    }
    fn every_second(&mut self) {}
}

/// Default bound on how many missed milliseconds one `poll` replays.
pub const DEFAULT_MAX_CATCH_UP_MS: u32 = 100;

#[derive(Debug, Clone)]
pub struct Scheduler {
    previous_ms: Option<u64>,
    ms: u8,
    ten_ms: u8,
    tenth: u8,
    ticks: u64,
    skipped_ms: u64,
    max_catch_up: u32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CATCH_UP_MS)
    }
}

impl Scheduler {
    /// `max_catch_up` caps the milliseconds replayed per poll; older ones are dropped.
    pub fn new(max_catch_up: u32) -> Self {
        Self {
            previous_ms: None,
            ms: 0,
            ten_ms: 0,
            tenth: 0,
            ticks: 0,
            skipped_ms: 0,
            max_catch_up: max_catch_up.max(1),
        }
    }

    /// Total millisecond ticks dispatched.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Milliseconds dropped because a poll fell too far behind.
    pub fn skipped_ms(&self) -> u64 {
        self.skipped_ms
    }

    /// Dispatch every millisecond elapsed since the previous poll. The first
    /// call only establishes the time base. Returns the ticks dispatched.
    pub fn poll<T: Ticker + ?Sized>(&mut self, now_ms: u64, ticker: &mut T) -> u32 {
        let Some(previous) = self.previous_ms else {
            self.previous_ms = Some(now_ms);
            return 0;
        };
        let behind = now_ms.saturating_sub(previous);
        if behind == 0 {
            return 0;
        }
        let replay = behind.min(u64::from(self.max_catch_up));
        if behind > replay {
            self.skipped_ms += behind - replay;
            tracing::debug!(behind_ms = behind, replay_ms = replay, "scheduler catching up");
        }
        self.previous_ms = Some(now_ms);
        for _ in 0..replay {
            self.tick(ticker);
        }
        replay as u32
    }

    fn tick<T: Ticker + ?Sized>(&mut self, ticker: &mut T) {
        self.ticks += 1;
        ticker.every_milli();
        self.ms += 1;
        if self.ms < 10 {
            return;
        }
        self.ms = 0;
        ticker.every_10ms();
        self.ten_ms += 1;
        if self.ten_ms < 10 {
            return;
        }
        self.ten_ms = 0;
        ticker.every_tenth(self.tenth);
        self.tenth += 1;
        if self.tenth < 10 {
            return;
        }
        self.tenth = 0;
        ticker.every_second();
    }
}
