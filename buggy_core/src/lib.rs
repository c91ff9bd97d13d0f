#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Buggy control core (hardware-agnostic).
//!
//! All hardware goes through `buggy_traits::Transport`, `buggy_traits::Motors`
//! and `buggy_traits::EdgeSink`.
//!
//! ## Architecture
//!
//! - **Wire protocol**: `ring_buffer`, `codec` and `commander` turn a fragmented
//!   byte stream into `(code, value)` commands and queue outbound frames/text
//! - **Feedback**: `encoder` counts quadrature edges and syncs them into rev/s
//! - **Control**: `pid` and `cascade` (vehicle loop, slip clamp, two wheel loops)
//! - **Timing**: `scheduler` (ms / 10 ms / tenth / second ticks), `watchdog`
//! - **Assembly**: `vehicle` (dispatch + control on ticks), `builder`, `runner`

pub mod builder;
pub mod cascade;
pub mod codec;
pub mod commander;
pub mod config;
pub mod conversions;
pub mod encoder;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod pid;
pub mod ring_buffer;
pub mod runner;
pub mod scheduler;
pub mod status;
pub mod util;
pub mod vehicle;
pub mod watchdog;

pub use builder::{DynVehicle, Missing, Set, VehicleBuilder, VehicleSettings, build_vehicle};
pub use cascade::{CascadeController, CascadeOutput, Measured, slip_clamp};
pub use codec::{Command, FrameParser, ParseState, TextAssembler, encode_frame};
pub use commander::{Commander, Responder};
pub use config::{ControlCfg, EncoderCfg, MotorEnable, ReportCfg, Tunables, WatchdogCfg};
pub use encoder::{EdgeSample, EncoderState, QuadratureEncoder};
pub use error::{BuggyError, BuildError, Result, StopReason};
pub use pid::{Gains, SpeedController};
pub use ring_buffer::RingBuffer;
pub use runner::{RunHooks, RunOptions, RunSummary, run};
pub use scheduler::{Scheduler, Ticker};
pub use status::{DriveStatus, Telemetry};
pub use vehicle::{Drive, Encoders, Vehicle, codes};
pub use watchdog::CommandWatchdog;
