//! Cooperative main loop: polls the scheduler against the vehicle's clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use buggy_traits::{Motors, Transport};

use crate::error::{Result, StopReason};
use crate::scheduler::{DEFAULT_MAX_CATCH_UP_MS, Scheduler};
use crate::status::Telemetry;
use crate::vehicle::Vehicle;

/// Loop parameters.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Stop after this many milliseconds; `None` runs until shutdown.
    pub max_run_ms: Option<u64>,
    /// Sleep when a poll dispatched nothing.
    pub idle_sleep: Duration,
    /// Upper bound on milliseconds replayed per poll.
    pub max_catch_up_ms: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_run_ms: None,
            idle_sleep: Duration::from_micros(200),
            max_catch_up_ms: DEFAULT_MAX_CATCH_UP_MS,
        }
    }
}

/// Callbacks around each poll. Both default to no-ops.
pub trait RunHooks {
    /// Called before every poll with the vehicle time in µs (drive a plant here).
    fn before_poll(&mut self, now_us: u64) {
        let _ = now_us;
    }

    /// Called after each speed report with the latest telemetry.
    fn on_report(&mut self, telemetry: &Telemetry) {
        let _ = telemetry;
    }
}

impl RunHooks for () {}

/// Outcome of [`run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub elapsed_ms: u64,
    pub ticks: u64,
    pub skipped_ms: u64,
    pub frames: u64,
    pub watchdog_trips: u32,
    pub last: Telemetry,
}

/// Run `vehicle` until `shutdown` is set or `max_run_ms` elapses.
///
/// Motors are stopped on every exit path. A hardware or transport fault ends
/// the run with an error.
pub fn run<T, M, H>(
    vehicle: &mut Vehicle<T, M>,
    shutdown: &AtomicBool,
    opts: &RunOptions,
    hooks: &mut H,
) -> Result<RunSummary>
where
    T: Transport,
    M: Motors,
    H: RunHooks + ?Sized,
{
    let mut scheduler = Scheduler::new(opts.max_catch_up_ms);
    vehicle.start();
    tracing::info!(max_run_ms = ?opts.max_run_ms, "run start");
    let mut seen_reports = vehicle.reports();

    let reason = loop {
        if shutdown.load(Ordering::Relaxed) {
            break StopReason::Shutdown;
        }
        let now_ms = vehicle.elapsed_ms();
        if opts.max_run_ms.is_some_and(|cap| now_ms >= cap) {
            break StopReason::MaxRuntime;
        }

        hooks.before_poll(vehicle.elapsed_us());
        let dispatched = scheduler.poll(now_ms, vehicle);

        if let Some(fault) = vehicle.take_fault() {
            tracing::error!(error = %fault, "run aborted");
            if let Err(e) = vehicle.shutdown(StopReason::Shutdown) {
                tracing::warn!(error = %e, "shutdown after fault failed");
            }
            return Err(eyre::Report::new(fault));
        }
        if vehicle.reports() != seen_reports {
            seen_reports = vehicle.reports();
            hooks.on_report(vehicle.telemetry());
        }
        if dispatched == 0 {
            vehicle.clock().sleep(opts.idle_sleep);
        }
    };

    vehicle.shutdown(reason)?;
    let summary = RunSummary {
        reason,
        elapsed_ms: vehicle.elapsed_ms(),
        ticks: scheduler.ticks(),
        skipped_ms: scheduler.skipped_ms(),
        frames: vehicle.commander().frames_received(),
        watchdog_trips: vehicle.drive().watchdog().trips(),
        last: *vehicle.telemetry(),
    };
    tracing::info!(
        %reason,
        elapsed_ms = summary.elapsed_ms,
        frames = summary.frames,
        watchdog_trips = summary.watchdog_trips,
        "run end"
    );
    Ok(summary)
}
