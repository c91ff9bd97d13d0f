//! Two-layer speed control: vehicle loop feeding two wheel loops.

use buggy_traits::Motors;

use crate::config::Tunables;
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::pid::{SpeedController, to_command};

/// Limit `demand` to `actual ± tolerance`. A tolerance of zero (or less)
/// passes `demand` through unchanged.
#[inline]
pub fn slip_clamp(demand: f32, actual: f32, tolerance: f32) -> f32 {
    if tolerance > 0.0 {
        demand.clamp(actual - tolerance, actual + tolerance)
    } else {
        demand
    }
}

/// Measured speeds for one control step, m/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measured {
    pub vehicle: f32,
    pub left: f32,
    pub right: f32,
}

/// Result of one control step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CascadeOutput {
    /// Raw outer loop output.
    pub demand: f32,
    /// Wheel target after the slip clamp.
    pub wheel_target: f32,
    pub left: i32,
    pub right: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CascadeController {
    vehicle: SpeedController,
    left: SpeedController,
    right: SpeedController,
}

impl CascadeController {
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            vehicle: SpeedController::new(tunables.vehicle_gains),
            left: SpeedController::new(tunables.motor_gains),
            right: SpeedController::new(tunables.motor_gains),
        }
    }

    /// Run both layers; gains are taken from `tunables` at the start of the step.
    pub fn update(&mut self, tunables: &Tunables, measured: Measured, dt: f32) -> CascadeOutput {
        self.vehicle.set_gains(tunables.vehicle_gains);
        self.left.set_gains(tunables.motor_gains);
        self.right.set_gains(tunables.motor_gains);

        let demand = self
            .vehicle
            .update(tunables.target_speed, measured.vehicle, dt);
        let wheel_target = slip_clamp(demand, measured.vehicle, tunables.slip_tolerance);

        let left = to_command(self.left.update(wheel_target, measured.left, dt));
        let right = to_command(self.right.update(wheel_target, measured.right, dt));

        CascadeOutput {
            demand,
            wheel_target,
            left: if tunables.enable.left { left } else { 0 },
            right: if tunables.enable.right { right } else { 0 },
        }
    }

    /// [`update`](Self::update) and push the result to `motors`.
    pub fn drive<M: Motors + ?Sized>(
        &mut self,
        motors: &mut M,
        tunables: &Tunables,
        measured: Measured,
        dt: f32,
    ) -> Result<CascadeOutput> {
        let out = self.update(tunables, measured, dt);
        motors
            .set(out.left, out.right)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        Ok(out)
    }

    pub fn vehicle_loop(&self) -> &SpeedController {
        &self.vehicle
    }

    pub fn wheel_loops(&self) -> (&SpeedController, &SpeedController) {
        (&self.left, &self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorEnable;
    use crate::pid::Gains;

    fn tunables() -> Tunables {
        Tunables {
            target_speed: 1.0,
            vehicle_gains: Gains::new(1.0, 0.0, 0.0),
            motor_gains: Gains::new(10.0, 0.0, 0.0),
            slip_tolerance: 0.2,
            enable: MotorEnable::both(),
        }
    }

    #[test]
    fn wheel_target_is_clamped_near_vehicle_speed() {
        let mut c = CascadeController::new(&tunables());
        let out = c.update(
            &tunables(),
            Measured {
                vehicle: 0.0,
                left: 0.0,
                right: 0.0,
            },
            0.01,
        );
        assert_eq!(out.demand, 1.0);
        assert!((out.wheel_target - 0.2).abs() < 1e-6);
        assert_eq!(out.left, 2);
        assert_eq!(out.right, 2);
    }

    #[test]
    fn disabled_motor_gets_zero() {
        let mut t = tunables();
        t.enable.right = false;
        let mut c = CascadeController::new(&t);
        let out = c.update(&t, Measured::default(), 0.01);
        assert_ne!(out.left, 0);
        assert_eq!(out.right, 0);
    }
}
