#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    if let Ok(cfg) = buggy_config::load_toml(data) {
        let validated: eyre::Result<()> = cfg.validate();
        if validated.is_ok() {
            // anything that validates maps to runtime settings without panicking
            let _ = buggy_core::VehicleSettings::from(&cfg);
            let _ = buggy_core::RunOptions::from(&cfg.runner);
        }
    }
});
