//! `From` implementations bridging `buggy_config` types to `buggy_core` types.

use crate::builder::VehicleSettings;
use crate::config::{ControlCfg, EncoderCfg, ReportCfg, WatchdogCfg};
use crate::pid::Gains;
use crate::runner::RunOptions;

impl From<&buggy_config::GainsCfg> for Gains {
    fn from(g: &buggy_config::GainsCfg) -> Self {
        Gains::new(g.p, g.i, g.d)
    }
}

impl From<&buggy_config::EncodersCfg> for EncoderCfg {
    fn from(c: &buggy_config::EncodersCfg) -> Self {
        Self {
            ppr: c.ppr,
            wheel_diameter_m: c.wheel_diameter_mm / 1000.0,
            idler_diameter_m: c.idler_diameter_mm / 1000.0,
            left_clockwise: c.left_clockwise,
            right_clockwise: c.right_clockwise,
        }
    }
}

impl From<&buggy_config::ControlCfg> for ControlCfg {
    fn from(c: &buggy_config::ControlCfg) -> Self {
        Self {
            max_speed_mps: c.max_speed_mps,
            vehicle_gains: Gains::from(&c.vehicle_gains),
            motor_gains: Gains::from(&c.motor_gains),
            slip_tolerance_mps: c.slip_tolerance_mps,
        }
    }
}

impl From<&buggy_config::WatchdogCfg> for WatchdogCfg {
    fn from(c: &buggy_config::WatchdogCfg) -> Self {
        Self {
            timeout_ms: if c.enabled { c.timeout_ms } else { 0 },
        }
    }
}

impl From<&buggy_config::RunnerCfg> for ReportCfg {
    fn from(c: &buggy_config::RunnerCfg) -> Self {
        Self {
            every_tenths: c.report_every_tenths,
            ui_status: c.ui_status,
        }
    }
}

impl From<&buggy_config::RunnerCfg> for RunOptions {
    fn from(c: &buggy_config::RunnerCfg) -> Self {
        Self {
            max_run_ms: (c.max_run_ms > 0).then_some(c.max_run_ms),
            idle_sleep: std::time::Duration::from_micros(c.idle_sleep_us),
            max_catch_up_ms: c.max_catch_up_ms,
        }
    }
}

impl From<&buggy_config::Config> for VehicleSettings {
    fn from(c: &buggy_config::Config) -> Self {
        Self {
            encoder: EncoderCfg::from(&c.encoders),
            control: ControlCfg::from(&c.control),
            watchdog: WatchdogCfg::from(&c.watchdog),
            report: ReportCfg::from(&c.runner),
        }
    }
}
