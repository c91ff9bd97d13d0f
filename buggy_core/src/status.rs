//! Drive status and per-update telemetry.

use crate::error::StopReason;

/// What the drive is doing after a control update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveStatus {
    /// No target set.
    #[default]
    Idle,
    /// Tracking a non-zero target.
    Driving,
    /// Held at zero until the next target command.
    Stopped(StopReason),
}

/// Snapshot of the most recent control update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Telemetry {
    /// Milliseconds since the vehicle started.
    pub t_ms: u64,
    /// Control updates so far.
    pub updates: u64,
    pub status: DriveStatus,
    /// m/s
    pub target: f32,
    pub vehicle_speed: f32,
    pub left_speed: f32,
    pub right_speed: f32,
    /// Wheel target after the slip clamp, m/s.
    pub wheel_target: f32,
    pub left_cmd: i32,
    pub right_cmd: i32,
}
