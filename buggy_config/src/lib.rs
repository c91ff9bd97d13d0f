#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the buggy.
//!
//! `Config` and its sections are deserialized from TOML and checked with
//! [`Config::validate`]. Only `[encoders]` is required; every other section
//! has defaults.
use serde::Deserialize;
use serde::de::Deserializer;

#[derive(Debug, Deserialize, Clone)]
pub struct EncodersCfg {
    /// Pulses per revolution on one channel
    pub ppr: u32,
    pub wheel_diameter_mm: f32,
    /// Free-wheel encoders measuring vehicle speed directly
    #[serde(default)]
    pub idlers: bool,
    #[serde(default = "default_idler_diameter_mm")]
    pub idler_diameter_mm: f32,
    /// Clockwise encoders read forward as positive; the right side is
    /// normally mirrored
    #[serde(default = "default_true")]
    pub left_clockwise: bool,
    #[serde(default)]
    pub right_clockwise: bool,
}

fn default_idler_diameter_mm() -> f32 {
    40.0
}

fn default_true() -> bool {
    true
}

impl Default for EncodersCfg {
    fn default() -> Self {
        Self {
            ppr: 256,
            wheel_diameter_mm: 65.0,
            idlers: false,
            idler_diameter_mm: default_idler_diameter_mm(),
            left_clockwise: true,
            right_clockwise: false,
        }
    }
}

/// PID gains; accepts `[p, i, d]` or `{ p = .., i = .., d = .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GainsCfg {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GainsToml {
    Tuple((f32, f32, f32)),
    Table {
        p: f32,
        #[serde(default)]
        i: f32,
        #[serde(default)]
        d: f32,
    },
}

fn de_gains<'de, D>(deserializer: D) -> Result<GainsCfg, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match GainsToml::deserialize(deserializer)? {
        GainsToml::Tuple((p, i, d)) | GainsToml::Table { p, i, d } => GainsCfg { p, i, d },
    })
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlCfg {
    /// Speed that a full-scale normalized command maps to (m/s)
    pub max_speed_mps: f32,
    /// 0 disables the slip clamp
    pub slip_tolerance_mps: f32,
    #[serde(deserialize_with = "de_gains")]
    pub vehicle_gains: GainsCfg,
    #[serde(deserialize_with = "de_gains")]
    pub motor_gains: GainsCfg,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            max_speed_mps: 1.0,
            slip_tolerance_mps: 0.3,
            vehicle_gains: GainsCfg {
                p: 0.5,
                i: 4.0,
                d: 0.0,
            },
            motor_gains: GainsCfg {
                p: 100.0,
                i: 1000.0,
                d: 0.0,
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WatchdogCfg {
    pub enabled: bool,
    /// Stop when no well-formed frame arrives for this long
    pub timeout_ms: u32,
}

impl Default for WatchdogCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 1_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Eol {
    #[default]
    Lf,
    Crlf,
}

impl Eol {
    pub fn as_str(self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::Crlf => "\r\n",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TransportCfg {
    /// Name used in logs
    pub name: String,
    /// Line terminator between UI text and frames
    pub eol: Eol,
    /// Send text as chained `'p'` frames instead of UI lines
    pub chained_text: bool,
    /// Inbound channel depth for stream transports (chunks)
    pub queue_depth: usize,
}

impl Default for TransportCfg {
    fn default() -> Self {
        Self {
            name: "s0".to_string(),
            eol: Eol::Lf,
            chained_text: false,
            queue_depth: 64,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerCfg {
    /// 0 runs until interrupted
    pub max_run_ms: u64,
    /// Sleep between idle polls (µs)
    pub idle_sleep_us: u64,
    /// Most missed milliseconds replayed per poll
    pub max_catch_up_ms: u32,
    /// Speed reports every N tenths of a second (0 disables)
    pub report_every_tenths: u8,
    /// Once-per-second UI status line
    pub ui_status: bool,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            max_run_ms: 0,
            idle_sleep_us: 200,
            max_catch_up_ms: 100,
            report_every_tenths: 1,
            ui_status: false,
        }
    }
}

/// Simulated drive plant used by `buggy drive` and `self-check`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Free-running wheel speed at full command (rev/s)
    pub max_wheel_rev_s: f32,
    /// First-order response time constant (ms)
    pub time_constant_ms: f32,
    /// Fraction of driven-wheel speed lost before the idlers (0..1)
    pub slip: f32,
    /// Largest motor command accepted; larger values are clamped
    pub command_limit: i32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            max_wheel_rev_s: 6.0,
            time_constant_ms: 80.0,
            slip: 0.0,
            command_limit: 127,
        }
    }
}

/// BCM pin numbers for GPIO encoders (hardware builds).
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pins {
    pub left_a: u8,
    pub left_b: u8,
    pub right_a: u8,
    pub right_b: u8,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub encoders: EncodersCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub watchdog: WatchdogCfg,
    #[serde(default)]
    pub transport: TransportCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub sim: SimCfg,
    /// GPIO encoder pins; only read by hardware builds
    #[serde(default)]
    pub pins: Option<Pins>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn positive(x: f32) -> bool {
    x.is_finite() && x > 0.0
}

fn gains_ok(g: &GainsCfg) -> bool {
    [g.p, g.i, g.d].iter().all(|v| v.is_finite() && *v >= 0.0)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Encoders
        if self.encoders.ppr == 0 {
            eyre::bail!("encoders.ppr must be > 0");
        }
        if !positive(self.encoders.wheel_diameter_mm) {
            eyre::bail!("encoders.wheel_diameter_mm must be > 0");
        }
        if self.encoders.idlers && !positive(self.encoders.idler_diameter_mm) {
            eyre::bail!("encoders.idler_diameter_mm must be > 0 when idlers are fitted");
        }

        // Control
        if !positive(self.control.max_speed_mps) {
            eyre::bail!("control.max_speed_mps must be > 0");
        }
        if !self.control.slip_tolerance_mps.is_finite() || self.control.slip_tolerance_mps < 0.0 {
            eyre::bail!("control.slip_tolerance_mps must be >= 0");
        }
        if !gains_ok(&self.control.vehicle_gains) {
            eyre::bail!("control.vehicle_gains must be finite and >= 0");
        }
        if !gains_ok(&self.control.motor_gains) {
            eyre::bail!("control.motor_gains must be finite and >= 0");
        }

        // Watchdog
        if self.watchdog.enabled && self.watchdog.timeout_ms < 10 {
            eyre::bail!("watchdog.timeout_ms must be >= 10 when enabled");
        }

        // Transport
        if self.transport.name.trim().is_empty() {
            eyre::bail!("transport.name must not be empty");
        }
        if self.transport.queue_depth == 0 {
            eyre::bail!("transport.queue_depth must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref() {
            if !matches!(r, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly");
            }
        }

        // Runner
        if self.runner.report_every_tenths > 10 {
            eyre::bail!("runner.report_every_tenths must be in 0..=10");
        }
        if self.runner.max_catch_up_ms == 0 {
            eyre::bail!("runner.max_catch_up_ms must be >= 1");
        }
        if self.runner.idle_sleep_us > 100_000 {
            eyre::bail!("runner.idle_sleep_us is unreasonably large (>100ms)");
        }

        // Sim
        if !positive(self.sim.max_wheel_rev_s) {
            eyre::bail!("sim.max_wheel_rev_s must be > 0");
        }
        if !positive(self.sim.time_constant_ms) {
            eyre::bail!("sim.time_constant_ms must be > 0");
        }
        if !(0.0..1.0).contains(&self.sim.slip) {
            eyre::bail!("sim.slip must be in [0.0, 1.0)");
        }
        if self.sim.command_limit <= 0 {
            eyre::bail!("sim.command_limit must be > 0");
        }

        Ok(())
    }
}
