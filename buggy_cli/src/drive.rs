//! Simulated drive: config mapping, plant assembly and the run itself.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use buggy_config::Config;
use buggy_core::runner::{RunHooks, RunOptions, RunSummary, run};
use buggy_core::util::pack_f32;
use buggy_core::{DriveStatus, EncoderCfg, EncoderState, Encoders, StopReason, Telemetry};
use buggy_core::{VehicleSettings, build_vehicle};
use buggy_hardware::{
    MemoryHandle, MemoryTransport, PlantParams, SimPlant, SimulatedMotors, StreamTransport,
};
use buggy_traits::{TextMode, Transport};
use buggy_traits::clock::test_clock::TestClock;
use buggy_traits::clock::{Clock, MonotonicClock};
use eyre::WrapErr;
use serde::Serialize;

/// Cap for simulated-time runs that set no limit of their own.
pub const DEFAULT_SIM_RUN_MS: u64 = 5_000;

#[derive(Debug, Clone, Default)]
pub struct DriveArgs {
    pub duration_ms: Option<u64>,
    pub script: Option<String>,
    pub target_mps: Option<f32>,
    pub keepalive_ms: Option<u64>,
    pub telemetry: Option<PathBuf>,
    pub stdio: bool,
    pub realtime: bool,
}

#[derive(Debug)]
pub struct DriveOutcome {
    pub summary: RunSummary,
    /// Ground speed of the simulated plant at the end of the run, m/s.
    pub plant_mps: f32,
    /// Everything the vehicle sent (empty for `--stdio`).
    pub tx: Vec<u8>,
    pub telemetry_rows: u64,
}

pub fn status_name(status: DriveStatus) -> &'static str {
    match status {
        DriveStatus::Idle => "idle",
        DriveStatus::Driving => "driving",
        DriveStatus::Stopped(StopReason::Watchdog) => "stopped:watchdog",
        DriveStatus::Stopped(StopReason::Command) => "stopped:command",
        DriveStatus::Stopped(StopReason::Shutdown) => "stopped:shutdown",
        DriveStatus::Stopped(StopReason::MaxRuntime) => "stopped:max_runtime",
    }
}

#[derive(Serialize)]
struct TelemetryRow {
    t_ms: u64,
    status: &'static str,
    target_mps: f32,
    vehicle_mps: f32,
    left_mps: f32,
    right_mps: f32,
    wheel_target_mps: f32,
    left_cmd: i32,
    right_cmd: i32,
    plant_mps: f32,
}

pub fn plant_params(cfg: &Config) -> PlantParams {
    let e = EncoderCfg::from(&cfg.encoders);
    PlantParams {
        ppr: e.ppr,
        wheel_diameter_m: e.wheel_diameter_m,
        idler_diameter_m: e.idler_diameter_m,
        max_wheel_rev_s: cfg.sim.max_wheel_rev_s,
        time_constant_s: cfg.sim.time_constant_ms / 1000.0,
        slip: cfg.sim.slip,
        command_limit: cfg.sim.command_limit,
        left_clockwise: e.left_clockwise,
        right_clockwise: e.right_clockwise,
    }
}

/// Frames pushed at start (and on every keepalive) for a scripted run.
pub fn script_bytes(script: Option<&str>, target_mps: Option<f32>) -> Vec<u8> {
    let mut out = script.unwrap_or_default().as_bytes().to_vec();
    if let Some(t) = target_mps {
        out.extend_from_slice(format!("v{},", pack_f32(t)).as_bytes());
    }
    out
}

struct SimHooks {
    plant: SimPlant,
    remote: Option<MemoryHandle>,
    script: Vec<u8>,
    keepalive_us: Option<u64>,
    next_push_us: Option<u64>,
    csv: Option<csv::Writer<File>>,
    csv_error: Option<csv::Error>,
    rows: u64,
}

impl RunHooks for SimHooks {
    fn before_poll(&mut self, now_us: u64) {
        self.plant.advance(now_us);
        let Some(remote) = &self.remote else {
            return;
        };
        if self.script.is_empty() || self.next_push_us.is_some_and(|at| now_us < at) {
            return;
        }
        remote.push(&self.script);
        self.next_push_us = Some(match self.keepalive_us {
            Some(period) => now_us + period,
            None => u64::MAX,
        });
    }

    fn on_report(&mut self, t: &Telemetry) {
        let Some(writer) = self.csv.as_mut() else {
            return;
        };
        let row = TelemetryRow {
            t_ms: t.t_ms,
            status: status_name(t.status),
            target_mps: t.target,
            vehicle_mps: t.vehicle_speed,
            left_mps: t.left_speed,
            right_mps: t.right_speed,
            wheel_target_mps: t.wheel_target,
            left_cmd: t.left_cmd,
            right_cmd: t.right_cmd,
            plant_mps: self.plant.vehicle_mps(),
        };
        match writer.serialize(row) {
            Ok(()) => self.rows += 1,
            Err(e) => {
                tracing::warn!(error = %e, "telemetry row not written; disabling telemetry");
                self.csv = None;
                self.csv_error.get_or_insert(e);
            }
        }
    }
}

/// Build the simulated buggy from `cfg` and run it until the run cap or `shutdown`.
pub fn run_drive(
    cfg: &Config,
    args: &DriveArgs,
    shutdown: &AtomicBool,
) -> eyre::Result<DriveOutcome> {
    let settings = VehicleSettings::from(cfg);
    let mut opts = RunOptions::from(&cfg.runner);
    if let Some(ms) = args.duration_ms {
        opts.max_run_ms = Some(ms);
    }
    let simulated_time = !(args.realtime || args.stdio);
    if simulated_time && opts.max_run_ms.is_none() {
        tracing::info!(max_run_ms = DEFAULT_SIM_RUN_MS, "no run limit; using default");
        opts.max_run_ms = Some(DEFAULT_SIM_RUN_MS);
    }
    let clock: Arc<dyn Clock + Send + Sync> = if simulated_time {
        Arc::new(TestClock::new())
    } else {
        Arc::new(MonotonicClock::new())
    };

    let left = Arc::new(EncoderState::new());
    let right = Arc::new(EncoderState::new());
    let mut encoders = Encoders::new(&settings.encoder, left.clone(), right.clone());
    let motors = SimulatedMotors::new(cfg.sim.command_limit);
    let mut plant = SimPlant::new(plant_params(cfg), motors.levels(), left, right);
    if cfg.encoders.idlers {
        let (l, r) = (Arc::new(EncoderState::new()), Arc::new(EncoderState::new()));
        encoders = encoders.with_idlers(&settings.encoder, l.clone(), r.clone());
        plant = plant.with_idlers(l, r);
    }

    let eol = cfg.transport.eol.as_str();
    let mode = if cfg.transport.chained_text {
        TextMode::Chained
    } else {
        TextMode::Ui
    };
    let name = cfg.transport.name.clone();
    let (transport, remote): (Box<dyn Transport>, Option<MemoryHandle>) = if args.stdio {
        let t = StreamTransport::spawn(
            name,
            std::io::stdin(),
            std::io::stdout(),
            cfg.transport.queue_depth,
        )
        .with_eol(eol)
        .with_text_mode(mode);
        (Box::new(t), None)
    } else {
        let (t, handle) = MemoryTransport::new(name);
        (Box::new(t.with_eol(eol).with_text_mode(mode)), Some(handle))
    };

    let csv = match &args.telemetry {
        Some(path) => Some(
            csv::Writer::from_path(path)
                .wrap_err_with(|| format!("open telemetry file {}", path.display()))?,
        ),
        None => None,
    };

    let mut vehicle = build_vehicle(transport, motors, encoders, settings, Some(clock))?;
    let mut hooks = SimHooks {
        plant,
        remote,
        script: script_bytes(args.script.as_deref(), args.target_mps),
        keepalive_us: args.keepalive_ms.map(|ms| ms.max(1) * 1_000),
        next_push_us: None,
        csv,
        csv_error: None,
        rows: 0,
    };

    let summary = run(&mut vehicle, shutdown, &opts, &mut hooks)?;

    if let Some(e) = hooks.csv_error.take() {
        return Err(eyre::Report::new(e).wrap_err("write telemetry"));
    }
    if let Some(mut writer) = hooks.csv.take() {
        writer.flush().wrap_err("flush telemetry")?;
    }
    let tx = hooks
        .remote
        .as_ref()
        .map(MemoryHandle::take_output)
        .unwrap_or_default();
    Ok(DriveOutcome {
        summary,
        plant_mps: hooks.plant.vehicle_mps(),
        tx,
        telemetry_rows: hooks.rows,
    })
}
