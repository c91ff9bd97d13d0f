//! Quadrature encoder on two Raspberry Pi GPIO inputs.
//!
//! Both pins raise interrupts on either edge. Each callback updates its own
//! level, reads the other channel's last level and forwards the edge to the
//! sink with a microsecond timestamp from `epoch`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use buggy_traits::{Channel, EdgeSink};
use rppal::gpio::{Gpio, InputPin, Level, Trigger};

use crate::error::HwError;

pub struct GpioEncoder {
    // Keep the pins alive; dropping them cancels the interrupts.
    _a: InputPin,
    _b: InputPin,
}

fn us_since(epoch: Instant) -> u64 {
    epoch.elapsed().as_micros().min(u128::from(u64::MAX)) as u64
}

impl GpioEncoder {
    pub fn new(
        pin_a: u8,
        pin_b: u8,
        sink: Arc<dyn EdgeSink + Send + Sync>,
        epoch: Instant,
    ) -> Result<Self, HwError> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut a = gpio
            .get(pin_a)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input_pullup();
        let mut b = gpio
            .get(pin_b)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input_pullup();

        let level_a = Arc::new(AtomicBool::new(a.is_high()));
        let level_b = Arc::new(AtomicBool::new(b.is_high()));

        {
            let (level_a, level_b, sink) = (level_a.clone(), level_b.clone(), sink.clone());
            a.set_async_interrupt(Trigger::Both, move |level: Level| {
                let high = level == Level::High;
                level_a.store(high, Ordering::Relaxed);
                let other = level_b.load(Ordering::Relaxed);
                sink.on_edge(Channel::A, high, other, us_since(epoch));
            })
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        }
        {
            let (level_a, level_b) = (level_a.clone(), level_b.clone());
            b.set_async_interrupt(Trigger::Both, move |level: Level| {
                let high = level == Level::High;
                level_b.store(high, Ordering::Relaxed);
                let other = level_a.load(Ordering::Relaxed);
                sink.on_edge(Channel::B, other, high, us_since(epoch));
            })
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        }

        tracing::info!(pin_a, pin_b, "gpio encoder armed");
        Ok(Self { _a: a, _b: b })
    }
}
