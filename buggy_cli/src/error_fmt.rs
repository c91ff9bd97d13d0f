//! Human-readable error descriptions and structured JSON error formatting.

use buggy_core::error::{BuggyError, BuildError, StopReason};

pub fn stop_reason_name(r: StopReason) -> &'static str {
    match r {
        StopReason::Watchdog => "Watchdog",
        StopReason::Command => "Command",
        StopReason::Shutdown => "Shutdown",
        StopReason::MaxRuntime => "MaxRuntime",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingTransport => {
                "What happened: No transport was provided to the vehicle.\nLikely causes: The link failed to open or was not wired into the builder.\nHow to fix: Ensure the transport is created successfully and passed via with_transport(...).".to_string()
            }
            BuildError::MissingMotors => {
                "What happened: No motors were provided to the vehicle.\nLikely causes: The motor driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the motors are created successfully and passed via with_motors(...).".to_string()
            }
            BuildError::MissingEncoders => {
                "What happened: No encoders were provided to the vehicle.\nLikely causes: Encoder inputs failed to initialize.\nHow to fix: Check the [pins] section and pass the encoders via with_encoders(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuggyError>() {
        return match be {
            BuggyError::Stop(StopReason::Watchdog) => "What happened: The command watchdog stopped the vehicle.\nLikely causes: The controller went quiet for longer than watchdog.timeout_ms.\nHow to fix: Send commands more often (e.g. --keepalive-ms), or raise or disable the watchdog.".to_string(),
            BuggyError::Stop(reason) => format!("What happened: The vehicle stopped ({reason})."),
            BuggyError::Disconnected => "What happened: The command link was closed.\nLikely causes: The remote end exited or the cable was unplugged.\nHow to fix: Reconnect and start a new run.".to_string(),
            BuggyError::Hardware(msg) => format!(
                "What happened: Hardware fault ({msg}).\nLikely causes: Wiring, power or GPIO permissions.\nHow to fix: Check the [pins] values and that the process may access GPIO."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("must be") || lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: An out-of-range value in the TOML.\nHow to fix: Edit the named key and try again."
        );
    }

    if lower.contains("missing field") || lower.contains("parse config") {
        return format!(
            "What happened: The config file could not be parsed.\nLikely causes: A missing [encoders] section or a typo in a key.\nHow to fix: Compare the file against the documented sections. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Watchdog stops map to 3; everything else that fails is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<BuggyError>() {
        Some(BuggyError::Stop(StopReason::Watchdog)) => 3,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(BuggyError::Stop(reason)) = err.downcast_ref::<BuggyError>() {
        return json!({
            "reason": stop_reason_name(*reason),
            "message": humanize(err),
        })
        .to_string();
    }

    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
