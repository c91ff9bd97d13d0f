//! Live encoder readout on a Raspberry Pi (feature `hardware`).

use std::sync::atomic::AtomicBool;

use buggy_config::Config;

#[cfg(target_os = "linux")]
pub fn run_encoders(
    cfg: &Config,
    period_ms: u64,
    samples: u64,
    json: bool,
    shutdown: &AtomicBool,
) -> eyre::Result<()> {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    use buggy_core::util::{MICROS_PER_SEC, rev_s_to_mps};
    use buggy_core::{BuggyError, EncoderCfg, EncoderState, QuadratureEncoder};
    use buggy_hardware::gpio_encoder::GpioEncoder;

    let Some(pins) = cfg.pins else {
        eyre::bail!("[pins] section is required for the encoders command");
    };
    let enc = EncoderCfg::from(&cfg.encoders);
    let epoch = Instant::now();
    let (ls, rs) = (Arc::new(EncoderState::new()), Arc::new(EncoderState::new()));
    let hw = |e: buggy_hardware::HwError| eyre::Report::new(BuggyError::Hardware(e.to_string()));
    let _left = GpioEncoder::new(pins.left_a, pins.left_b, ls.clone(), epoch).map_err(hw)?;
    let _right = GpioEncoder::new(pins.right_a, pins.right_b, rs.clone(), epoch).map_err(hw)?;

    let mut left = QuadratureEncoder::new(ls, enc.ppr, enc.left_clockwise);
    let mut right = QuadratureEncoder::new(rs, enc.ppr, enc.right_clockwise);
    let now_us = || epoch.elapsed().as_micros().min(u128::from(u64::MAX)) as u64;
    left.start(now_us());
    right.start(now_us());

    let period = Duration::from_millis(period_ms.max(1));
    let mut n = 0u64;
    while !shutdown.load(Ordering::Relaxed) && (samples == 0 || n < samples) {
        std::thread::sleep(period);
        let t = now_us();
        let l = rev_s_to_mps(left.sync(t), enc.wheel_diameter_m);
        let r = rev_s_to_mps(right.sync(t), enc.wheel_diameter_m);
        if json {
            println!(
                "{}",
                serde_json::json!({ "t_s": t as f64 / MICROS_PER_SEC as f64, "left_mps": l, "right_mps": r })
            );
        } else {
            println!("L={l:+.3} m/s  R={r:+.3} m/s");
        }
        n += 1;
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn run_encoders(
    _cfg: &Config,
    _period_ms: u64,
    _samples: u64,
    _json: bool,
    _shutdown: &AtomicBool,
) -> eyre::Result<()> {
    eyre::bail!("GPIO encoders are only supported on Linux")
}
