//! Closed-loop runs against the simulated plant on a manual clock.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use buggy_core::builder::{VehicleSettings, build_vehicle};
use buggy_core::config::WatchdogCfg;
use buggy_core::runner::{RunHooks, RunOptions, RunSummary, run};
use buggy_core::util::pack_f32;
use buggy_core::{Command, DriveStatus, EncoderState, Encoders, StopReason, Telemetry, Vehicle};
use buggy_hardware::{MemoryHandle, MemoryTransport, MotorLevels, PlantParams, SimPlant, SimulatedMotors};
use buggy_traits::clock::test_clock::TestClock;

struct Rig {
    plant: SimPlant,
    handle: MemoryHandle,
    /// `(at_us, bytes)` pushed once the vehicle clock passes `at_us`
    script: Vec<(u64, Vec<u8>)>,
    keepalive: Option<(u64, Vec<u8>)>,
    next_keepalive_us: u64,
    reports: Vec<Telemetry>,
}

impl RunHooks for Rig {
    fn before_poll(&mut self, now_us: u64) {
        self.plant.advance(now_us);
        while self.script.first().is_some_and(|(at, _)| *at <= now_us) {
            let (_, bytes) = self.script.remove(0);
            self.handle.push(&bytes);
        }
        if let Some((period, frame)) = &self.keepalive {
            if now_us >= self.next_keepalive_us {
                self.handle.push(frame);
                self.next_keepalive_us = now_us + period;
            }
        }
    }

    fn on_report(&mut self, telemetry: &Telemetry) {
        self.reports.push(*telemetry);
    }
}

struct Setup {
    vehicle: Vehicle<MemoryTransport, SimulatedMotors>,
    rig: Rig,
    levels: Arc<MotorLevels>,
}

fn setup(settings: VehicleSettings) -> Setup {
    let clock = TestClock::new();
    let (transport, handle) = MemoryTransport::new("mem");
    let motors = SimulatedMotors::new(127);
    let levels = motors.levels();
    let left = Arc::new(EncoderState::new());
    let right = Arc::new(EncoderState::new());
    let e = &settings.encoder;
    let params = PlantParams {
        ppr: e.ppr,
        wheel_diameter_m: e.wheel_diameter_m,
        left_clockwise: e.left_clockwise,
        right_clockwise: e.right_clockwise,
        ..PlantParams::default()
    };
    let plant = SimPlant::new(params, levels.clone(), left.clone(), right.clone());
    let encoders = Encoders::new(&settings.encoder, left, right);
    let vehicle = build_vehicle(transport, motors, encoders, settings, Some(Arc::new(clock)))
        .expect("valid settings");
    Setup {
        vehicle,
        rig: Rig {
            plant,
            handle,
            script: Vec::new(),
            keepalive: None,
            next_keepalive_us: 0,
            reports: Vec::new(),
        },
        levels,
    }
}

fn run_for(s: &mut Setup, ms: u64) -> RunSummary {
    let opts = RunOptions {
        max_run_ms: Some(ms),
        idle_sleep: Duration::from_millis(1),
        ..RunOptions::default()
    };
    run(&mut s.vehicle, &AtomicBool::new(false), &opts, &mut s.rig).expect("run ok")
}

fn output(s: &Setup) -> String {
    String::from_utf8(s.rig.handle.take_output()).expect("ascii output")
}

#[test]
fn drives_to_commanded_speed() {
    let mut s = setup(VehicleSettings::default());
    let frame = format!("v{},", pack_f32(0.5));
    s.rig.keepalive = Some((100_000, frame.into_bytes()));

    let summary = run_for(&mut s, 5_000);
    assert_eq!(summary.reason, StopReason::MaxRuntime);
    assert_eq!(summary.watchdog_trips, 0);

    let tail = &s.rig.reports[s.rig.reports.len() - 10..];
    let mean = tail.iter().map(|t| t.vehicle_speed).sum::<f32>() / tail.len() as f32;
    assert!((mean - 0.5).abs() < 0.05, "mean vehicle speed {mean}");
    assert!((s.rig.plant.vehicle_mps() - 0.5).abs() < 0.05);
    assert!(tail.iter().all(|t| t.status == DriveStatus::Driving));
}

#[test]
fn replayed_control_tick_is_skipped() {
    let mut s = setup(VehicleSettings::default());
    let drive = s.vehicle.drive_mut();
    drive.dispatch(Command::new('y', 254));
    drive.control_step(10_000);
    let first = *drive.telemetry();
    assert_eq!(first.updates, 1);
    drive.control_step(10_000);
    assert_eq!(*drive.telemetry(), first);
    drive.control_step(20_000);
    assert_eq!(drive.telemetry().updates, 2);
}

#[test]
fn silent_link_trips_the_watchdog() {
    let mut settings = VehicleSettings::default();
    settings.watchdog = WatchdogCfg { timeout_ms: 300 };
    let mut s = setup(settings);
    s.rig.script.push((0, b"y254,".to_vec()));

    let summary = run_for(&mut s, 1_500);
    assert!(summary.watchdog_trips >= 1);
    assert_eq!(summary.last.status, DriveStatus::Stopped(StopReason::Watchdog));
    assert_eq!(summary.last.target, 0.0);
    assert_eq!(s.levels.get(), (0, 0));
    assert!(s.rig.plant.vehicle_mps().abs() < 0.01);
}

#[test]
fn stop_command_holds_until_the_next_target() {
    let mut s = setup(VehicleSettings::default());
    s.rig.script.push((0, b"y254,".to_vec()));
    s.rig.script.push((400_000, b"Q,".to_vec()));
    let summary = run_for(&mut s, 800);
    assert_eq!(summary.last.status, DriveStatus::Stopped(StopReason::Command));
    assert_eq!((summary.last.left_cmd, summary.last.right_cmd), (0, 0));
    // reached some speed before the stop
    assert!(s.rig.reports.iter().any(|t| t.vehicle_speed > 0.2));
}

#[test]
fn enable_mask_disables_one_side() {
    let mut s = setup(VehicleSettings::default());
    s.rig.script.push((0, b"E1,y254,".to_vec()));
    let summary = run_for(&mut s, 300);
    assert_ne!(summary.last.left_cmd, 0);
    assert_eq!(summary.last.right_cmd, 0);
    assert_eq!(s.levels.get().1, 0);
}

#[test]
fn speed_reports_every_tenth() {
    let mut s = setup(VehicleSettings::default());
    let _ = run_for(&mut s, 1_005);
    let out = output(&s);
    let x_frames = out.matches("x127,").count();
    assert!((9..=11).contains(&x_frames), "{x_frames} reports in {out:?}");
    assert!(out.contains("l127,") && out.contains("r127,"));
}

#[test]
fn status_request_gets_a_ui_line() {
    let mut s = setup(VehicleSettings::default());
    s.rig.script.push((50_000, b"R,".to_vec()));
    let _ = run_for(&mut s, 80);
    let out = output(&s);
    assert!(out.contains("\nt="), "{out:?}");
    assert!(out.contains("idle v=0.00"), "{out:?}");
}

#[test]
fn chained_text_becomes_a_notice() {
    let mut s = setup(VehicleSettings::default());
    s.rig.script.push((0, b"p104,p105,p,".to_vec()));
    let summary = run_for(&mut s, 20);
    assert_eq!(s.vehicle.drive().notices(), 1);
    assert_eq!(summary.frames, 3);
}

#[test]
fn gains_and_slip_arrive_as_packed_floats() {
    let mut s = setup(VehicleSettings::default());
    let script = format!(
        "P{},L{},S{},W0,",
        pack_f32(1.5),
        pack_f32(250.0),
        pack_f32(0.0)
    );
    s.rig.script.push((0, script.into_bytes()));
    let _ = run_for(&mut s, 20);
    let t = s.vehicle.drive().tunables();
    assert_eq!(t.vehicle_gains.p, 1.5);
    assert_eq!(t.motor_gains.i, 250.0);
    assert_eq!(t.slip_tolerance, 0.0);
    assert!(!s.vehicle.drive().watchdog().is_enabled());
}

#[test]
fn closed_link_ends_the_run_with_an_error() {
    let mut s = setup(VehicleSettings::default());
    s.rig.handle.close();
    let opts = RunOptions {
        max_run_ms: Some(100),
        idle_sleep: Duration::from_millis(1),
        ..RunOptions::default()
    };
    let err = run(&mut s.vehicle, &AtomicBool::new(false), &opts, &mut s.rig)
        .expect_err("disconnect is fatal");
    match err.downcast_ref::<buggy_core::BuggyError>() {
        Some(buggy_core::BuggyError::Disconnected) => {}
        other => panic!("expected Disconnected, got {other:?}"),
    }
}

#[test]
fn shutdown_flag_stops_immediately() {
    let mut s = setup(VehicleSettings::default());
    let flag = AtomicBool::new(true);
    let summary = run(&mut s.vehicle, &flag, &RunOptions::default(), &mut ()).expect("run ok");
    assert_eq!(summary.reason, StopReason::Shutdown);
    assert_eq!(summary.ticks, 0);
}
