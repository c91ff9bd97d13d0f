//! Drivers behind the `buggy_traits` seams.
//!
//! - `sim`: simulated drive plant and motors producing real quadrature edges
//! - `transport`: in-memory and `Read`/`Write` stream transports
//! - `gpio_encoder` (feature `hardware`): interrupt-driven encoder inputs on a Raspberry Pi

pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio_encoder;
pub mod sim;
pub mod transport;

pub use error::HwError;
pub use sim::{MotorLevels, PlantParams, SimPlant, SimulatedMotors};
pub use transport::{MemoryHandle, MemoryTransport, StreamTransport};
