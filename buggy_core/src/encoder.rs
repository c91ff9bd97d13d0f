//! Quadrature encoder: interrupt-side edge accounting and main-loop rate sync.
//!
//! The edge handler and `sync()` share one packed `AtomicU64` so the count can
//! be read and cleared in a single atomic step:
//!
//! ```text
//! bit 63      : reverse sense (1 = backwards)
//! bits 32..63 : pulse count (saturating, 31 bits)
//! bits 0..32  : last edge interval in µs (saturating)
//! ```

use buggy_traits::{Channel, EdgeSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::util::MICROS_PER_SEC;

const INTERVAL_MASK: u64 = 0xFFFF_FFFF;
const COUNT_SHIFT: u32 = 32;
const COUNT_MAX: u64 = 0x7FFF_FFFF;
const COUNT_BITS: u64 = COUNT_MAX << COUNT_SHIFT;
const REVERSE_BIT: u64 = 1 << 63;

/// Snapshot taken by [`EncoderState::take`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeSample {
    /// Edges since the previous take.
    pub count: u32,
    /// Time between the two most recent edges, µs.
    pub interval_us: u32,
    /// `+1` forwards, `-1` backwards.
    pub sense: i8,
}

/// Interrupt-side encoder state. `on_edge` is O(1) and lock-free.
#[derive(Debug, Default)]
pub struct EncoderState {
    packed: AtomicU64,
    /// Only written by the edge handler.
    last_edge_us: AtomicU64,
}

impl EncoderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reference time for the first edge interval.
    pub fn arm(&self, now_us: u64) {
        self.last_edge_us.store(now_us, Ordering::Relaxed);
    }

    /// Record one edge.
    pub fn record_edge(&self, forward: bool, now_us: u64) {
        let prev = self.last_edge_us.swap(now_us, Ordering::Relaxed);
        let interval = now_us.wrapping_sub(prev).min(INTERVAL_MASK);
        let _ = self
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                let count = ((p & COUNT_BITS) >> COUNT_SHIFT).saturating_add(1).min(COUNT_MAX);
                let sense = if forward { 0 } else { REVERSE_BIT };
                Some(sense | (count << COUNT_SHIFT) | interval)
            });
    }

    /// Read and reset the pulse count in one atomic step. Interval and sense are kept.
    pub fn take(&self) -> EdgeSample {
        let p = self.packed.fetch_and(!COUNT_BITS, Ordering::AcqRel);
        Self::unpack(p)
    }

    /// Current values without resetting.
    pub fn peek(&self) -> EdgeSample {
        Self::unpack(self.packed.load(Ordering::Acquire))
    }

    fn unpack(p: u64) -> EdgeSample {
        EdgeSample {
            count: ((p & COUNT_BITS) >> COUNT_SHIFT) as u32,
            interval_us: (p & INTERVAL_MASK) as u32,
            sense: if p & REVERSE_BIT == 0 { 1 } else { -1 },
        }
    }
}

impl EdgeSink for EncoderState {
    fn on_edge(&self, channel: Channel, a: bool, b: bool, now_us: u64) {
        let forward = match channel {
            Channel::A => a == b,
            Channel::B => a != b,
        };
        self.record_edge(forward, now_us);
    }
}

/// Convert a sample into revolutions per second.
///
/// `dt_us` is the time since the previous sync. Fewer than two pulses, or a
/// zero time base, yield 0.
pub fn rate_rev_s(sample: EdgeSample, dt_us: u64, cpr: u32) -> f32 {
    if sample.count < 2 || cpr == 0 {
        return 0.0;
    }
    let sense = f32::from(sample.sense);
    let cpr = cpr as f32;
    if u64::from(sample.count) > u64::from(sample.interval_us) {
        if dt_us == 0 {
            return 0.0;
        }
        sense * sample.count as f32 * MICROS_PER_SEC as f32 / (cpr * dt_us as f32)
    } else {
        if sample.interval_us == 0 {
            return 0.0;
        }
        sense * MICROS_PER_SEC as f32 / (cpr * sample.interval_us as f32)
    }
}

/// Main-loop view of one encoder.
#[derive(Debug)]
pub struct QuadratureEncoder {
    state: Arc<EncoderState>,
    cpr: u32,
    mount_sign: f32,
    last_sync_us: Option<u64>,
    rev_s: f32,
}

impl QuadratureEncoder {
    /// `ppr` is pulses per revolution per channel; counts per revolution is `4 * ppr`.
    /// `clockwise` encoders count forward rotation as positive; pass `false` for a
    /// mirrored mounting.
    pub fn new(state: Arc<EncoderState>, ppr: u32, clockwise: bool) -> Self {
        Self {
            state,
            cpr: ppr.saturating_mul(4),
            mount_sign: if clockwise { 1.0 } else { -1.0 },
            last_sync_us: None,
            rev_s: 0.0,
        }
    }

    pub fn state(&self) -> &Arc<EncoderState> {
        &self.state
    }

    pub fn counts_per_rev(&self) -> u32 {
        self.cpr
    }

    /// Set the sync reference time (and the edge reference) without sampling.
    pub fn start(&mut self, now_us: u64) {
        self.state.arm(now_us);
        self.last_sync_us = Some(now_us);
        let _ = self.state.take();
        self.rev_s = 0.0;
    }

    /// Sample the edge state and update the speed estimate (rev/s).
    pub fn sync(&mut self, now_us: u64) -> f32 {
        let dt = self
            .last_sync_us
            .replace(now_us)
            .map_or(0, |prev| now_us.wrapping_sub(prev));
        let sample = self.state.take();
        self.rev_s = rate_rev_s(sample, dt, self.cpr) * self.mount_sign;
        self.rev_s
    }

    /// Speed from the most recent sync (rev/s).
    pub fn latest(&self) -> f32 {
        self.rev_s
    }
}
