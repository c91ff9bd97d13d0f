//! The vehicle: command dispatch, control updates and telemetry on one tick.
//!
//! [`Vehicle`] pairs a [`Commander`] with a [`Drive`]. The commander parses
//! inbound frames and hands them to the drive (a [`Responder`]); the
//! scheduler calls into the vehicle through [`Ticker`]:
//!
//! - every millisecond: receive, dispatch, feed/tick the command watchdog;
//! - every 10 ms: encoder sync, cascade update, motor output, outbound drain;
//! - every tenth of a second: speed report frames;
//! - every second: optional UI status line.

use std::sync::Arc;
use std::time::Instant;

use buggy_traits::{Clock, Motors, Transport};

use crate::cascade::{CascadeController, Measured};
use crate::codec::Command;
use crate::commander::{Commander, Responder};
use crate::config::{ControlCfg, EncoderCfg, MotorEnable, ReportCfg, Tunables};
use crate::encoder::{EncoderState, QuadratureEncoder};
use crate::error::{BuggyError, StopReason};
use crate::hw_error::map_hw_error;
use crate::scheduler::Ticker;
use crate::status::{DriveStatus, Telemetry};
use crate::util::{byte_to_norm, norm_to_byte, rev_s_to_mps, unpack_f32};
use crate::watchdog::CommandWatchdog;

/// Frame codes understood and produced by the vehicle.
pub mod codes {
    /// Emergency stop.
    pub const STOP: char = 'Q';
    /// Target speed as a normalized byte (127 = stand still).
    pub const TARGET: char = 'y';
    /// Target speed in m/s as packed `f32`.
    pub const TARGET_F32: char = 'v';
    pub const VEHICLE_P: char = 'P';
    pub const VEHICLE_I: char = 'I';
    pub const VEHICLE_D: char = 'D';
    pub const MOTOR_P: char = 'K';
    pub const MOTOR_I: char = 'L';
    pub const MOTOR_D: char = 'M';
    /// Slip tolerance in m/s as packed `f32`.
    pub const SLIP: char = 'S';
    /// Motor enable mask, bit 0 left and bit 1 right.
    pub const ENABLE: char = 'E';
    /// Watchdog timeout in ms, 0 disables.
    pub const WATCHDOG: char = 'W';
    /// Status request.
    pub const STATUS: char = 'R';

    /// Reported vehicle speed (normalized byte).
    pub const REPORT_VEHICLE: char = 'x';
    pub const REPORT_LEFT: char = 'l';
    pub const REPORT_RIGHT: char = 'r';
}

/// Control period the first update assumes, seconds.
pub const NOMINAL_DT_S: f32 = 0.01;

/// Driven wheel encoders plus optional idler (free-wheel) encoders.
#[derive(Debug)]
pub struct Encoders {
    pub left: QuadratureEncoder,
    pub right: QuadratureEncoder,
    pub idlers: Option<[QuadratureEncoder; 2]>,
}

impl Encoders {
    pub fn new(cfg: &EncoderCfg, left: Arc<EncoderState>, right: Arc<EncoderState>) -> Self {
        Self {
            left: QuadratureEncoder::new(left, cfg.ppr, cfg.left_clockwise),
            right: QuadratureEncoder::new(right, cfg.ppr, cfg.right_clockwise),
            idlers: None,
        }
    }

    /// Add idler encoders, mounted the same way as the driven wheels on each side.
    pub fn with_idlers(
        mut self,
        cfg: &EncoderCfg,
        left: Arc<EncoderState>,
        right: Arc<EncoderState>,
    ) -> Self {
        self.idlers = Some([
            QuadratureEncoder::new(left, cfg.ppr, cfg.left_clockwise),
            QuadratureEncoder::new(right, cfg.ppr, cfg.right_clockwise),
        ]);
        self
    }

    fn start(&mut self, now_us: u64) {
        self.left.start(now_us);
        self.right.start(now_us);
        if let Some(idlers) = self.idlers.as_mut() {
            for e in idlers {
                e.start(now_us);
            }
        }
    }

    /// Sync every encoder and convert to linear speeds.
    fn sync(&mut self, now_us: u64, cfg: &EncoderCfg) -> Measured {
        let left = rev_s_to_mps(self.left.sync(now_us), cfg.wheel_diameter_m);
        let right = rev_s_to_mps(self.right.sync(now_us), cfg.wheel_diameter_m);
        let vehicle = match self.idlers.as_mut() {
            Some([l, r]) => {
                let rev_s = (l.sync(now_us) + r.sync(now_us)) / 2.0;
                rev_s_to_mps(rev_s, cfg.idler_diameter_m)
            }
            None => (left + right) / 2.0,
        };
        Measured {
            vehicle,
            left,
            right,
        }
    }
}

/// Everything the dispatcher and the control update share.
#[derive(Debug)]
pub struct Drive<M> {
    motors: M,
    encoders: Encoders,
    encoder_cfg: EncoderCfg,
    control: ControlCfg,
    cascade: CascadeController,
    tunables: Tunables,
    watchdog: CommandWatchdog,
    stop: Option<StopReason>,
    status_requested: bool,
    last_control_us: Option<u64>,
    telemetry: Telemetry,
    fault: Option<BuggyError>,
    notices: u64,
}

impl<M: Motors> Drive<M> {
    pub(crate) fn new(
        motors: M,
        encoders: Encoders,
        encoder_cfg: EncoderCfg,
        control: ControlCfg,
        watchdog: CommandWatchdog,
    ) -> Self {
        let tunables = Tunables::from(&control);
        Self {
            motors,
            encoders,
            encoder_cfg,
            cascade: CascadeController::new(&tunables),
            tunables,
            control,
            watchdog,
            stop: None,
            status_requested: false,
            last_control_us: None,
            telemetry: Telemetry::default(),
            fault: None,
            notices: 0,
        }
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    pub fn watchdog(&self) -> &CommandWatchdog {
        &self.watchdog
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }

    /// Chained-text lines received so far.
    pub fn notices(&self) -> u64 {
        self.notices
    }

    /// Zero the target and hold the motors at zero until the next target command.
    pub fn emergency_stop(&mut self, reason: StopReason) {
        if self.stop != Some(reason) {
            tracing::warn!(%reason, "emergency stop");
        }
        self.tunables.target_speed = 0.0;
        self.stop = Some(reason);
        if let Err(e) = self.motors.stop() {
            tracing::warn!(error = %e, "motor stop failed");
            self.fault.get_or_insert(map_hw_error(&*e));
        }
    }

    fn set_target(&mut self, speed: f32) {
        let max = self.control.max_speed_mps;
        self.tunables.target_speed = speed.clamp(-max, max);
        if self.stop.take().is_some() {
            tracing::info!(target = self.tunables.target_speed, "resuming after stop");
        }
    }

    fn float_arg(cmd: Command) -> Option<f32> {
        let v = unpack_f32(cmd.value);
        if v.is_finite() {
            Some(v)
        } else {
            tracing::warn!(code = %cmd.code, bits = cmd.value, "non-finite value ignored");
            None
        }
    }

    fn gain_arg(cmd: Command) -> Option<f32> {
        Self::float_arg(cmd).filter(|g| {
            let ok = *g >= 0.0;
            if !ok {
                tracing::warn!(code = %cmd.code, gain = g, "negative gain ignored");
            }
            ok
        })
    }

    /// Apply one inbound command.
    pub fn dispatch(&mut self, cmd: Command) {
        tracing::debug!(code = %cmd.code, value = cmd.value, "dispatch");
        match cmd.code {
            codes::STOP => self.emergency_stop(StopReason::Command),
            codes::TARGET => {
                self.set_target(byte_to_norm(cmd.value) * self.control.max_speed_mps);
            }
            codes::TARGET_F32 => {
                if let Some(v) = Self::float_arg(cmd) {
                    self.set_target(v);
                }
            }
            codes::VEHICLE_P | codes::VEHICLE_I | codes::VEHICLE_D => {
                if let Some(g) = Self::gain_arg(cmd) {
                    let gains = &mut self.tunables.vehicle_gains;
                    match cmd.code {
                        codes::VEHICLE_P => gains.p = g,
                        codes::VEHICLE_I => gains.i = g,
                        _ => gains.d = g,
                    }
                }
            }
            codes::MOTOR_P | codes::MOTOR_I | codes::MOTOR_D => {
                if let Some(g) = Self::gain_arg(cmd) {
                    let gains = &mut self.tunables.motor_gains;
                    match cmd.code {
                        codes::MOTOR_P => gains.p = g,
                        codes::MOTOR_I => gains.i = g,
                        _ => gains.d = g,
                    }
                }
            }
            codes::SLIP => {
                if let Some(s) = Self::float_arg(cmd).filter(|s| *s >= 0.0) {
                    self.tunables.slip_tolerance = s;
                }
            }
            codes::ENABLE => self.tunables.enable = MotorEnable::from_mask(cmd.value),
            codes::WATCHDOG => self.watchdog.set_timeout(cmd.value),
            codes::STATUS => self.status_requested = true,
            other => tracing::debug!(code = %other, "unhandled command"),
        }
    }

    /// Encoder sync, cascade update and motor output for one control period.
    ///
    /// A step at the same timestamp as the previous one (catch-up replay) is skipped.
    pub fn control_step(&mut self, now_us: u64) {
        let dt = match self.last_control_us {
            Some(prev) if now_us == prev => return,
            Some(prev) if now_us > prev => (now_us - prev) as f32 / 1e6,
            _ => NOMINAL_DT_S,
        };
        self.last_control_us = Some(now_us);
        let measured = self.encoders.sync(now_us, &self.encoder_cfg);
        let mut out = self.cascade.update(&self.tunables, measured, dt);
        if self.stop.is_some() {
            out.left = 0;
            out.right = 0;
        }
        if let Err(e) = self.motors.set(out.left, out.right) {
            tracing::warn!(error = %e, "motor set failed");
            self.fault.get_or_insert(map_hw_error(&*e));
        }

        let status = match self.stop {
            Some(reason) => DriveStatus::Stopped(reason),
            None if self.tunables.target_speed == 0.0 => DriveStatus::Idle,
            None => DriveStatus::Driving,
        };
        self.telemetry = Telemetry {
            t_ms: now_us / 1_000,
            updates: self.telemetry.updates + 1,
            status,
            target: self.tunables.target_speed,
            vehicle_speed: measured.vehicle,
            left_speed: measured.left,
            right_speed: measured.right,
            wheel_target: out.wheel_target,
            left_cmd: out.left,
            right_cmd: out.right,
        };
        tracing::trace!(
            v = measured.vehicle,
            l = measured.left,
            r = measured.right,
            wheel_target = out.wheel_target,
            left_cmd = out.left,
            right_cmd = out.right,
            "control"
        );
    }
}

impl<M: Motors> Responder for Drive<M> {
    fn command(&mut self, cmd: Command) {
        self.dispatch(cmd);
    }

    fn notify(&mut self, message: &str) {
        self.notices += 1;
        tracing::info!(text = message, "remote notice");
    }
}

/// A transport, a drive, and the clock that times them.
pub struct Vehicle<T, M> {
    commander: Commander<T>,
    drive: Drive<M>,
    report: ReportCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    reports: u64,
}

impl<T: Transport, M: Motors> core::fmt::Debug for Vehicle<T, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Vehicle")
            .field("commander", &self.commander)
            .field("telemetry", &self.drive.telemetry)
            .field("stop", &self.drive.stop)
            .field("reports", &self.reports)
            .finish()
    }
}

impl<T: Transport, M: Motors> Vehicle<T, M> {
    pub(crate) fn from_parts(
        commander: Commander<T>,
        drive: Drive<M>,
        report: ReportCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let epoch = clock.now();
        Self {
            commander,
            drive,
            report,
            clock,
            epoch,
            reports: 0,
        }
    }

    /// Reset the time base and encoder references to now.
    pub fn start(&mut self) {
        self.epoch = self.clock.now();
        self.drive.last_control_us = None;
        self.drive.encoders.start(0);
        tracing::info!(transport = self.commander.name(), "vehicle started");
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    pub fn elapsed_us(&self) -> u64 {
        self.clock.us_since(self.epoch)
    }

    pub fn drive(&self) -> &Drive<M> {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut Drive<M> {
        &mut self.drive
    }

    pub fn commander(&self) -> &Commander<T> {
        &self.commander
    }

    pub fn commander_mut(&mut self) -> &mut Commander<T> {
        &mut self.commander
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.drive.telemetry
    }

    /// Speed report batches sent so far.
    pub fn reports(&self) -> u64 {
        self.reports
    }

    /// Take the first hardware or transport fault since the last call.
    pub fn take_fault(&mut self) -> Option<BuggyError> {
        self.drive.fault.take()
    }

    /// Queue `x`, `l` and `r` speed frames.
    pub fn send_report(&mut self) {
        let max = self.drive.control.max_speed_mps;
        let t = self.drive.telemetry;
        let norm = |v: f32| if max > 0.0 { norm_to_byte(v / max) } else { 127 };
        self.commander.send(codes::REPORT_VEHICLE, norm(t.vehicle_speed));
        self.commander.send(codes::REPORT_LEFT, norm(t.left_speed));
        self.commander.send(codes::REPORT_RIGHT, norm(t.right_speed));
        self.reports += 1;
    }

    /// Queue a one-line human-readable status.
    pub fn send_status(&mut self) {
        let t = self.drive.telemetry;
        let state = match t.status {
            DriveStatus::Idle => "idle",
            DriveStatus::Driving => "driving",
            DriveStatus::Stopped(StopReason::Watchdog) => "stopped(watchdog)",
            DriveStatus::Stopped(_) => "stopped",
        };
        self.commander.print_fmt(format_args!(
            "t={}ms {} v={:.2} target={:.2} L={} R={}",
            t.t_ms, state, t.vehicle_speed, t.target, t.left_cmd, t.right_cmd
        ));
    }

    /// Stop the motors and flush what is queued.
    pub fn shutdown(&mut self, reason: StopReason) -> crate::error::Result<()> {
        tracing::info!(%reason, "vehicle shutting down");
        self.drive.tunables.target_speed = 0.0;
        self.drive.stop = Some(reason);
        self.drive
            .motors
            .stop()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        self.commander.flush()?;
        Ok(())
    }

    fn record_fault(&mut self, e: &eyre::Report) {
        let fault = e
            .downcast_ref::<BuggyError>()
            .cloned()
            .unwrap_or_else(|| BuggyError::Transport(e.to_string()));
        tracing::warn!(error = %fault, "transport fault");
        self.drive.fault.get_or_insert(fault);
    }
}

impl<T: Transport, M: Motors> Ticker for Vehicle<T, M> {
    fn every_milli(&mut self) {
        let before = self.commander.frames_received();
        if let Err(e) = self.commander.update(&mut self.drive) {
            self.record_fault(&e);
        }
        if self.commander.frames_received() != before {
            self.drive.watchdog.feed();
        }
        if self.drive.watchdog.tick(1) {
            self.drive.emergency_stop(StopReason::Watchdog);
        }
        if std::mem::take(&mut self.drive.status_requested) {
            self.send_report();
            self.send_status();
        }
    }

    fn every_10ms(&mut self) {
        let now = self.elapsed_us();
        self.drive.control_step(now);
        if let Err(e) = self.commander.flush() {
            self.record_fault(&e);
        }
    }

    fn every_tenth(&mut self, tenth: u8) {
        let every = self.report.every_tenths;
        if every > 0 && tenth % every == 0 {
            self.send_report();
        }
    }

    fn every_second(&mut self) {
        if self.report.ui_status {
            self.send_status();
        }
    }
}
