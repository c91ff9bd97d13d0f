mod cli;
mod codec_cmd;
mod drive;
mod error_fmt;
#[cfg(feature = "hardware")]
mod hw;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use buggy_config::{Config, Logging};
use buggy_core::error::{BuggyError, StopReason};
use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE, json_mode};
use crate::drive::{DriveArgs, DriveOutcome, run_drive, status_name};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize, stop_reason_name};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    if let Err(err) = real_main(cli) {
        if json_mode() {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        tracing::debug!(error = ?err, "exiting with error");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(&cli.log_level, cli.json, &cfg.logging)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    match cli.cmd {
        Commands::Drive {
            duration_ms,
            script,
            target_mps,
            keepalive_ms,
            telemetry,
            stdio,
            realtime,
            show_tx,
            fail_on_watchdog,
        } => {
            let args = DriveArgs {
                duration_ms,
                script,
                target_mps,
                keepalive_ms,
                telemetry,
                stdio,
                realtime,
            };
            let outcome = run_drive(&cfg, &args, &shutdown)?;
            report_drive(&outcome, show_tx, stdio);
            if fail_on_watchdog && outcome.summary.watchdog_trips > 0 {
                return Err(BuggyError::Stop(StopReason::Watchdog).into());
            }
            Ok(())
        }
        Commands::Decode { input } => codec_cmd::run_decode(input.as_deref(), cli.json),
        Commands::Encode {
            commands,
            text,
            chained,
        } => codec_cmd::run_encode(&commands, text.as_deref(), chained),
        Commands::SelfCheck => self_check(&cfg, &shutdown),
        #[cfg(feature = "hardware")]
        Commands::Encoders { period_ms, samples } => {
            hw::run_encoders(&cfg, period_ms, samples, cli.json, &shutdown)
        }
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text =
        fs::read_to_string(path).wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = buggy_config::load_toml(&text).wrap_err("parse config")?;
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(level: &str, json: bool, logging: &Logging) -> eyre::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or_else(|| path.as_os_str());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
            .wrap_err("invalid logging.level")?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}

fn report_drive(outcome: &DriveOutcome, show_tx: bool, to_stderr: bool) {
    let s = &outcome.summary;
    let t = &s.last;
    let text = if json_mode() {
        serde_json::json!({
            "reason": stop_reason_name(s.reason),
            "elapsed_ms": s.elapsed_ms,
            "ticks": s.ticks,
            "skipped_ms": s.skipped_ms,
            "frames": s.frames,
            "watchdog_trips": s.watchdog_trips,
            "status": status_name(t.status),
            "target_mps": t.target,
            "vehicle_mps": t.vehicle_speed,
            "left_mps": t.left_speed,
            "right_mps": t.right_speed,
            "left_cmd": t.left_cmd,
            "right_cmd": t.right_cmd,
            "plant_mps": outcome.plant_mps,
            "telemetry_rows": outcome.telemetry_rows,
        })
        .to_string()
    } else {
        format!(
            "drive ended: {} after {} ms (frames={}, watchdog_trips={})\n\
             status={} target={:.2} m/s vehicle={:.2} m/s L={:.2} R={:.2} cmd L={} R={}",
            s.reason,
            s.elapsed_ms,
            s.frames,
            s.watchdog_trips,
            status_name(t.status),
            t.target,
            t.vehicle_speed,
            t.left_speed,
            t.right_speed,
            t.left_cmd,
            t.right_cmd,
        )
    };
    if to_stderr {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }
    if show_tx && !outcome.tx.is_empty() {
        print!("{}", String::from_utf8_lossy(&outcome.tx));
        println!();
    }
}

/// Config loads and a short simulated run reaches a commanded speed.
fn self_check(cfg: &Config, shutdown: &AtomicBool) -> eyre::Result<()> {
    let target = (cfg.control.max_speed_mps * 0.3).min(0.5);
    let args = DriveArgs {
        duration_ms: Some(2_000),
        target_mps: Some(target),
        keepalive_ms: Some(100),
        ..DriveArgs::default()
    };
    let outcome = run_drive(cfg, &args, shutdown)?;
    let v = outcome.summary.last.vehicle_speed;
    if outcome.summary.frames == 0 || outcome.tx.is_empty() {
        return Err(BuggyError::State("no frames exchanged during self-check".into()).into());
    }
    if (v - target).abs() > target * 0.5 {
        return Err(BuggyError::State(format!(
            "simulated vehicle reached {v:.2} m/s, expected about {target:.2} m/s"
        ))
        .into());
    }
    if json_mode() {
        println!(
            "{}",
            serde_json::json!({ "self_check": "ok", "target_mps": target, "vehicle_mps": v })
        );
    } else {
        println!("self-check ok: vehicle {v:.2} m/s for target {target:.2} m/s");
    }
    Ok(())
}
