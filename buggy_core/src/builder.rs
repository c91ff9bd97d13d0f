//! Type-state builder for `Vehicle` and the generic `build_vehicle` constructor.
//!
//! The builder enforces at compile time that a transport, motors and encoders
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use buggy_traits::clock::{Clock, MonotonicClock};
use buggy_traits::{Motors, Transport};

use crate::commander::Commander;
use crate::config::{ControlCfg, EncoderCfg, ReportCfg, WatchdogCfg};
use crate::error::{BuildError, Result};
use crate::vehicle::{Drive, Encoders, Vehicle};
use crate::watchdog::CommandWatchdog;

/// Vehicle over boxed transport and motors, as produced by [`VehicleBuilder`].
pub type DynVehicle = Vehicle<Box<dyn Transport>, Box<dyn Motors>>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Optional settings shared by the builder and [`build_vehicle`].
#[derive(Debug, Clone, Default)]
pub struct VehicleSettings {
    pub encoder: EncoderCfg,
    pub control: ControlCfg,
    pub watchdog: WatchdogCfg,
    pub report: ReportCfg,
}

/// Builder for `DynVehicle`.
pub struct VehicleBuilder<T, M, E> {
    transport: Option<Box<dyn Transport>>,
    motors: Option<Box<dyn Motors>>,
    encoders: Option<Encoders>,
    settings: VehicleSettings,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _t: PhantomData<T>,
    _m: PhantomData<M>,
    _e: PhantomData<E>,
}

impl Default for VehicleBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            transport: None,
            motors: None,
            encoders: None,
            settings: VehicleSettings::default(),
            clock: None,
            _t: PhantomData,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

impl DynVehicle {
    /// Start building a vehicle.
    pub fn builder() -> VehicleBuilder<Missing, Missing, Missing> {
        VehicleBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(settings: &VehicleSettings, encoders: &Encoders) -> Result<()> {
    let e = &settings.encoder;
    let c = &settings.control;
    if e.ppr == 0 {
        return Err(invalid("ppr must be > 0"));
    }
    if !(e.wheel_diameter_m.is_finite() && e.wheel_diameter_m > 0.0) {
        return Err(invalid("wheel diameter must be > 0"));
    }
    if encoders.idlers.is_some() && !(e.idler_diameter_m.is_finite() && e.idler_diameter_m > 0.0)
    {
        return Err(invalid("idler diameter must be > 0"));
    }
    if !(c.max_speed_mps.is_finite() && c.max_speed_mps > 0.0) {
        return Err(invalid("max speed must be > 0"));
    }
    if !c.slip_tolerance_mps.is_finite() || c.slip_tolerance_mps < 0.0 {
        return Err(invalid("slip tolerance must be >= 0"));
    }
    if !c.vehicle_gains.is_finite() || !c.motor_gains.is_finite() {
        return Err(invalid("gains must be finite"));
    }
    Ok(())
}

/// Validate settings and construct a vehicle over concrete transport and motors.
pub fn build_vehicle<T: Transport, M: Motors>(
    transport: T,
    motors: M,
    encoders: Encoders,
    settings: VehicleSettings,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<Vehicle<T, M>> {
    validate(&settings, &encoders)?;
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(c) => c,
        None => Arc::new(MonotonicClock::new()),
    };
    let VehicleSettings {
        encoder,
        control,
        watchdog,
        report,
    } = settings;
    let drive = Drive::new(
        motors,
        encoders,
        encoder,
        control,
        CommandWatchdog::new(watchdog.timeout_ms),
    );
    Ok(Vehicle::from_parts(
        Commander::new(transport),
        drive,
        report,
        clock,
    ))
}

impl<T, M, E> VehicleBuilder<T, M, E> {
    /// Fallible build available in any type-state; names the first missing piece.
    pub fn try_build(self) -> Result<DynVehicle> {
        let transport = self
            .transport
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTransport))?;
        let motors = self
            .motors
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotors))?;
        let encoders = self
            .encoders
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoders))?;
        build_vehicle(transport, motors, encoders, self.settings, self.clock)
    }

    /// Chainable setters that do not affect type-state.
    pub fn with_encoder_cfg(mut self, cfg: EncoderCfg) -> Self {
        self.settings.encoder = cfg;
        self
    }
    pub fn with_control(mut self, cfg: ControlCfg) -> Self {
        self.settings.control = cfg;
        self
    }
    pub fn with_watchdog(mut self, cfg: WatchdogCfg) -> Self {
        self.settings.watchdog = cfg;
        self
    }
    pub fn with_report(mut self, cfg: ReportCfg) -> Self {
        self.settings.report = cfg;
        self
    }
    pub fn with_settings(mut self, settings: VehicleSettings) -> Self {
        self.settings = settings;
        self
    }
    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<M, E> VehicleBuilder<Missing, M, E> {
    pub fn with_transport(self, transport: impl Transport + 'static) -> VehicleBuilder<Set, M, E> {
        VehicleBuilder {
            transport: Some(Box::new(transport)),
            motors: self.motors,
            encoders: self.encoders,
            settings: self.settings,
            clock: self.clock,
            _t: PhantomData,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

impl<T, E> VehicleBuilder<T, Missing, E> {
    pub fn with_motors(self, motors: impl Motors + 'static) -> VehicleBuilder<T, Set, E> {
        VehicleBuilder {
            transport: self.transport,
            motors: Some(Box::new(motors)),
            encoders: self.encoders,
            settings: self.settings,
            clock: self.clock,
            _t: PhantomData,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

impl<T, M> VehicleBuilder<T, M, Missing> {
    pub fn with_encoders(self, encoders: Encoders) -> VehicleBuilder<T, M, Set> {
        VehicleBuilder {
            transport: self.transport,
            motors: self.motors,
            encoders: Some(encoders),
            settings: self.settings,
            clock: self.clock,
            _t: PhantomData,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

impl VehicleBuilder<Set, Set, Set> {
    /// Build once all required pieces are present.
    pub fn build(self) -> Result<DynVehicle> {
        self.try_build()
    }
}
