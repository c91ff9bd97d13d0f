//! Simulated drive plant.
//!
//! Each driven wheel is a first-order system: its speed relaxes towards
//! `command / command_limit * max_wheel_rev_s` with time constant `tau`.
//! Wheel rotation is integrated into encoder counts and every whole count
//! is delivered to an [`EdgeSink`] as a quadrature edge with an
//! interpolated timestamp. Optional idler wheels follow the vehicle's
//! ground speed, which is the mean driven-wheel surface speed minus slip.

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use buggy_traits::{Channel, EdgeSink, Motors};

/// Quadrature levels `(a, b)` in forward order.
const SEQUENCE: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];

/// Upper bound on edges emitted by one `advance` per wheel.
const MAX_EDGES_PER_ADVANCE: u32 = 20_000;

/// Latest motor levels, shared between [`SimulatedMotors`] and [`SimPlant`].
#[derive(Debug, Default)]
pub struct MotorLevels {
    left: AtomicI32,
    right: AtomicI32,
    writes: AtomicU64,
}

impl MotorLevels {
    pub fn get(&self) -> (i32, i32) {
        (
            self.left.load(Ordering::Relaxed),
            self.right.load(Ordering::Relaxed),
        )
    }

    /// Number of `set` calls seen.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

/// Motors that record their levels (clamped to `±limit`).
#[derive(Debug, Clone)]
pub struct SimulatedMotors {
    levels: Arc<MotorLevels>,
    limit: i32,
}

impl SimulatedMotors {
    pub fn new(limit: i32) -> Self {
        Self {
            levels: Arc::new(MotorLevels::default()),
            limit: limit.max(1),
        }
    }

    pub fn levels(&self) -> Arc<MotorLevels> {
        self.levels.clone()
    }
}

impl Motors for SimulatedMotors {
    fn set(&mut self, left: i32, right: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let l = left.clamp(-self.limit, self.limit);
        let r = right.clamp(-self.limit, self.limit);
        self.levels.left.store(l, Ordering::Relaxed);
        self.levels.right.store(r, Ordering::Relaxed);
        self.levels.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Physical parameters of the simulated buggy.
#[derive(Debug, Clone)]
pub struct PlantParams {
    pub ppr: u32,
    pub wheel_diameter_m: f32,
    pub idler_diameter_m: f32,
    /// Wheel speed at full command, rev/s.
    pub max_wheel_rev_s: f32,
    pub time_constant_s: f32,
    /// Fraction of wheel surface speed lost before the ground (0..1).
    pub slip: f32,
    pub command_limit: i32,
    /// Encoder mounting; a counter-clockwise encoder sees forward rotation backwards.
    pub left_clockwise: bool,
    pub right_clockwise: bool,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            ppr: 256,
            wheel_diameter_m: 0.065,
            idler_diameter_m: 0.04,
            max_wheel_rev_s: 6.0,
            time_constant_s: 0.08,
            slip: 0.0,
            command_limit: 127,
            left_clockwise: true,
            right_clockwise: false,
        }
    }
}

/// One rotating shaft with an encoder.
struct SimWheel {
    sink: Arc<dyn EdgeSink + Send + Sync>,
    /// Encoder mounted mirrored: forward rotation produces backward edges.
    mirrored: bool,
    rev_s: f64,
    /// Position in counts; edges fire when it crosses an integer.
    position: f64,
    phase: usize,
}

impl core::fmt::Debug for SimWheel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimWheel")
            .field("rev_s", &self.rev_s)
            .field("position", &self.position)
            .finish()
    }
}

impl SimWheel {
    fn new(sink: Arc<dyn EdgeSink + Send + Sync>, mirrored: bool) -> Self {
        Self {
            sink,
            mirrored,
            rev_s: 0.0,
            position: 0.0,
            phase: 0,
        }
    }

    /// Rotate at `rev_s` for `[t0, t0 + dt]` µs, emitting edges.
    fn rotate(&mut self, rev_s: f64, cpr: f64, t0_us: u64, dt_us: u64) {
        self.rev_s = rev_s;
        let start = self.position;
        let end = start + rev_s * cpr * dt_us as f64 / 1e6;
        self.position = end;

        let (from, to) = (start.floor() as i64, end.floor() as i64);
        let crossings = (to - from).unsigned_abs().min(u64::from(MAX_EDGES_PER_ADVANCE));
        let span = end - start;
        for k in 1..=crossings as i64 {
            let boundary = if to > from { from + k } else { from - k + 1 };
            let frac = if span == 0.0 {
                0.0
            } else {
                ((boundary as f64 - start) / span).clamp(0.0, 1.0)
            };
            let t = t0_us + (frac * dt_us as f64) as u64;
            self.step(to > from, t);
        }
    }

    fn step(&mut self, forward: bool, t_us: u64) {
        let forward = forward != self.mirrored;
        let next = if forward {
            (self.phase + 1) % 4
        } else {
            (self.phase + 3) % 4
        };
        let (a0, _) = SEQUENCE[self.phase];
        let (a, b) = SEQUENCE[next];
        let channel = if a != a0 { Channel::A } else { Channel::B };
        self.phase = next;
        self.sink.on_edge(channel, a, b, t_us);
    }
}

/// First-order model of a two-wheel-drive buggy.
#[derive(Debug)]
pub struct SimPlant {
    params: PlantParams,
    levels: Arc<MotorLevels>,
    left: SimWheel,
    right: SimWheel,
    idlers: Option<[SimWheel; 2]>,
    last_us: Option<u64>,
}

impl SimPlant {
    pub fn new(
        params: PlantParams,
        levels: Arc<MotorLevels>,
        left: Arc<dyn EdgeSink + Send + Sync>,
        right: Arc<dyn EdgeSink + Send + Sync>,
    ) -> Self {
        Self {
            left: SimWheel::new(left, !params.left_clockwise),
            right: SimWheel::new(right, !params.right_clockwise),
            params,
            levels,
            idlers: None,
            last_us: None,
        }
    }

    pub fn with_idlers(
        mut self,
        left: Arc<dyn EdgeSink + Send + Sync>,
        right: Arc<dyn EdgeSink + Send + Sync>,
    ) -> Self {
        self.idlers = Some([
            SimWheel::new(left, !self.params.left_clockwise),
            SimWheel::new(right, !self.params.right_clockwise),
        ]);
        self
    }

    /// Driven wheel speeds, rev/s.
    pub fn wheel_rev_s(&self) -> (f32, f32) {
        (self.left.rev_s as f32, self.right.rev_s as f32)
    }

    /// Ground speed, m/s.
    pub fn vehicle_mps(&self) -> f32 {
        let d = f64::from(self.params.wheel_diameter_m);
        let surface = (self.left.rev_s + self.right.rev_s) / 2.0 * PI * d;
        (surface * (1.0 - f64::from(self.params.slip))) as f32
    }

    /// Integrate the plant up to `now_us` and emit the edges that occurred.
    pub fn advance(&mut self, now_us: u64) {
        let Some(prev) = self.last_us.replace(now_us) else {
            return;
        };
        let dt_us = now_us.saturating_sub(prev);
        if dt_us == 0 {
            return;
        }
        let p = &self.params;
        let cpr = f64::from(p.ppr) * 4.0;
        let tau = f64::from(p.time_constant_s).max(1e-6);
        let alpha = 1.0 - (-(dt_us as f64) / 1e6 / tau).exp();
        let limit = f64::from(p.command_limit.max(1));
        let max = f64::from(p.max_wheel_rev_s);

        let (l_cmd, r_cmd) = self.levels.get();
        let target = |cmd: i32| f64::from(cmd).clamp(-limit, limit) / limit * max;
        let l = self.left.rev_s + (target(l_cmd) - self.left.rev_s) * alpha;
        let r = self.right.rev_s + (target(r_cmd) - self.right.rev_s) * alpha;
        self.left.rotate(l, cpr, prev, dt_us);
        self.right.rotate(r, cpr, prev, dt_us);

        let ground = f64::from(self.vehicle_mps());
        let idler_d = f64::from(self.params.idler_diameter_m);
        if let Some(idlers) = self.idlers.as_mut() {
            let rev_s = if idler_d > 0.0 { ground / (PI * idler_d) } else { 0.0 };
            for w in idlers {
                w.rotate(rev_s, cpr, prev, dt_us);
            }
        }
    }
}
