use thiserror::Error;

/// Why the vehicle stopped driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No well-formed frame arrived within the watchdog timeout.
    Watchdog,
    /// An explicit stop frame was received.
    Command,
    /// The run loop was asked to shut down.
    Shutdown,
    /// The configured run time elapsed.
    MaxRuntime,
}

impl core::fmt::Display for StopReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            StopReason::Watchdog => "command watchdog expired",
            StopReason::Command => "stop command",
            StopReason::Shutdown => "shutdown requested",
            StopReason::MaxRuntime => "max run time exceeded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuggyError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("transport disconnected")]
    Disconnected,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("stopped: {0}")]
    Stop(StopReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing transport")]
    MissingTransport,
    #[error("missing motors")]
    MissingMotors,
    #[error("missing encoders")]
    MissingEncoders,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
