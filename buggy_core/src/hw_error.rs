//! Maps `Box<dyn Error>` from trait boundaries to typed `BuggyError`.
//!
//! The traits in `buggy_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `buggy_hardware::HwError` downcasting.

use crate::error::BuggyError;

/// Map a motor-side error to a typed `BuggyError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> BuggyError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<buggy_hardware::error::HwError>() {
            return match hw {
                buggy_hardware::error::HwError::Disconnected => BuggyError::Disconnected,
                other => BuggyError::Hardware(other.to_string()),
            };
        }
    }

    BuggyError::Hardware(e.to_string())
}

/// Map a transport-side error to a typed `BuggyError`.
///
/// Falls back to string heuristics for drivers that don't use `HwError`.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> BuggyError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<buggy_hardware::error::HwError>() {
            return match hw {
                buggy_hardware::error::HwError::Disconnected => BuggyError::Disconnected,
                other => BuggyError::Transport(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        if matches!(
            io.kind(),
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::UnexpectedEof
        ) {
            return BuggyError::Disconnected;
        }
    }
    let s = e.to_string();
    if s.to_lowercase().contains("disconnect") {
        BuggyError::Disconnected
    } else {
        BuggyError::Transport(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_is_disconnect() {
        let e = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert!(matches!(map_transport_error(&e), BuggyError::Disconnected));
    }

    #[test]
    fn other_errors_keep_message() {
        let e = std::io::Error::other("uart framing");
        match map_hw_error(&e) {
            BuggyError::Hardware(msg) => assert!(msg.contains("uart framing")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
