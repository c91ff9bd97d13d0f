//! Runtime configuration types for the vehicle.
//!
//! These are separate from the TOML-deserialized config in `buggy_config`;
//! see `conversions` for the mapping.

use crate::pid::Gains;

/// Encoder geometry.
#[derive(Debug, Clone)]
pub struct EncoderCfg {
    /// Pulses per revolution on one channel (counts per revolution is 4x).
    pub ppr: u32,
    /// Driven wheel diameter in metres.
    pub wheel_diameter_m: f32,
    /// Idler wheel diameter in metres (used only when idler encoders are fitted).
    pub idler_diameter_m: f32,
    /// Mounting direction: a clockwise encoder reads forward as positive, the
    /// mirrored (counter-clockwise) side reads negated.
    pub left_clockwise: bool,
    pub right_clockwise: bool,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            ppr: 256,
            wheel_diameter_m: 0.065,
            idler_diameter_m: 0.04,
            left_clockwise: true,
            right_clockwise: false,
        }
    }
}

/// Control loop settings.
#[derive(Debug, Clone)]
pub struct ControlCfg {
    /// Speed that a full-scale normalized command maps to, m/s.
    pub max_speed_mps: f32,
    pub vehicle_gains: Gains,
    pub motor_gains: Gains,
    /// Wheel targets stay within this distance of vehicle speed; 0 disables.
    pub slip_tolerance_mps: f32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            max_speed_mps: 1.0,
            vehicle_gains: Gains::new(0.5, 4.0, 0.0),
            motor_gains: Gains::new(100.0, 1000.0, 0.0),
            slip_tolerance_mps: 0.3,
        }
    }
}

/// Command watchdog.
#[derive(Debug, Clone)]
pub struct WatchdogCfg {
    /// 0 disables.
    pub timeout_ms: u32,
}

impl Default for WatchdogCfg {
    fn default() -> Self {
        Self { timeout_ms: 1_000 }
    }
}

/// Outbound telemetry.
#[derive(Debug, Clone)]
pub struct ReportCfg {
    /// Send speed report frames every N tenths of a second (0 disables).
    pub every_tenths: u8,
    /// Emit a human-readable status line once per second.
    pub ui_status: bool,
}

impl Default for ReportCfg {
    fn default() -> Self {
        Self {
            every_tenths: 1,
            ui_status: false,
        }
    }
}

/// Per-motor enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorEnable {
    pub left: bool,
    pub right: bool,
}

impl MotorEnable {
    pub const fn both() -> Self {
        Self {
            left: true,
            right: true,
        }
    }

    /// Bit 0 is the left motor, bit 1 the right.
    pub fn from_mask(mask: u32) -> Self {
        Self {
            left: mask & 0b01 != 0,
            right: mask & 0b10 != 0,
        }
    }

    pub fn mask(self) -> u32 {
        u32::from(self.left) | (u32::from(self.right) << 1)
    }
}

impl Default for MotorEnable {
    fn default() -> Self {
        Self::both()
    }
}

/// Values changed by the command dispatcher and read at the start of every
/// control update.
#[derive(Debug, Clone, PartialEq)]
pub struct Tunables {
    /// m/s
    pub target_speed: f32,
    pub vehicle_gains: Gains,
    pub motor_gains: Gains,
    /// m/s, 0 disables the clamp
    pub slip_tolerance: f32,
    pub enable: MotorEnable,
}

impl From<&ControlCfg> for Tunables {
    fn from(c: &ControlCfg) -> Self {
        Self {
            target_speed: 0.0,
            vehicle_gains: c.vehicle_gains,
            motor_gains: c.motor_gains,
            slip_tolerance: c.slip_tolerance_mps,
            enable: MotorEnable::both(),
        }
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::from(&ControlCfg::default())
    }
}
