//! Discrete PID speed controller.

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gains {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl Gains {
    pub const fn new(p: f32, i: f32, d: f32) -> Self {
        Self { p, i, d }
    }

    pub fn is_finite(&self) -> bool {
        self.p.is_finite() && self.i.is_finite() && self.d.is_finite()
    }
}

/// One PID loop. The integral uses trapezoidal integration of the error.
///
/// State is only reset by constructing a new controller; the output is not
/// clamped and the integral has no anti-windup.
#[derive(Debug, Clone, Default)]
pub struct SpeedController {
    gains: Gains,
    previous_error: f32,
    integral: f32,
    output: f32,
}

impl SpeedController {
    pub fn new(gains: Gains) -> Self {
        Self {
            gains,
            ..Self::default()
        }
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
    }

    /// Advance the loop by `dt` seconds and return the raw output.
    ///
    /// A non-positive (or non-finite) `dt` contributes neither derivative nor integral.
    pub fn update(&mut self, target: f32, actual: f32, dt: f32) -> f32 {
        let error = target - actual;
        let (rate, step) = if dt > 0.0 && dt.is_finite() {
            (
                (error - self.previous_error) / dt,
                (error + self.previous_error) / 2.0 * dt,
            )
        } else {
            (0.0, 0.0)
        };
        self.integral += step;
        self.output = self.gains.p * error + self.gains.i * self.integral + self.gains.d * rate;
        self.previous_error = error;
        self.output
    }

    /// Most recent raw output.
    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> f32 {
        self.previous_error
    }
}

/// Round a controller output to an actuator level; non-finite outputs map to 0.
#[inline]
pub fn to_command(output: f32) -> i32 {
    if !output.is_finite() {
        return 0;
    }
    let r = output.round();
    if r >= i32::MAX as f32 {
        i32::MAX
    } else if r <= i32::MIN as f32 {
        i32::MIN
    } else {
        r as i32
    }
}
