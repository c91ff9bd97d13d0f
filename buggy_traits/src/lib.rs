pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// How a transport carries human-readable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// Printable bytes interleaved with frames, split by the line terminator.
    #[default]
    Ui,
    /// Text sent as a run of single-character `'p'` frames (framed radio links).
    Chained,
}

/// A byte link to the controlling station (serial, BLE UART, LoRa, ...).
///
/// Both directions are non-blocking: implementations return what is ready now.
pub trait Transport {
    /// Short identifier used in logs and notices.
    fn name(&self) -> &str;

    /// Move received bytes into `buf`; returns the number copied (0 if none are pending).
    fn receive_available(
        &mut self,
        buf: &mut [u8],
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;

    /// Hand bytes to the link; returns how many were accepted.
    fn send_bytes(&mut self, bytes: &[u8])
    -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;

    /// Line terminator used between UI text and command frames.
    fn eol(&self) -> &'static str {
        "\n"
    }

    fn text_mode(&self) -> TextMode {
        TextMode::Ui
    }
}

/// Motor actuation interface for the two driven wheels.
///
/// Commands are signed levels; the implementation clamps them to what the
/// driver accepts (typically -127..=127).
pub trait Motors {
    fn set(&mut self, left: i32, right: i32)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.set(0, 0)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn receive_available(
        &mut self,
        buf: &mut [u8],
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        (**self).receive_available(buf)
    }
    fn send_bytes(
        &mut self,
        bytes: &[u8],
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        (**self).send_bytes(bytes)
    }
    fn eol(&self) -> &'static str {
        (**self).eol()
    }
    fn text_mode(&self) -> TextMode {
        (**self).text_mode()
    }
}

impl<M: Motors + ?Sized> Motors for Box<M> {
    fn set(&mut self, left: i32, right: i32)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set(left, right)
    }
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).stop()
    }
}

/// Quadrature encoder channel that produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
}

/// Receiver of encoder edges, called from interrupt (or interrupt-like) context.
///
/// Implementations must be O(1) and must not block.
pub trait EdgeSink {
    /// `a`/`b` are the channel levels sampled at the edge; `now_us` is a
    /// free-running microsecond timestamp (wrapping is allowed).
    fn on_edge(&self, channel: Channel, a: bool, b: bool, now_us: u64);
}

impl<E: EdgeSink + ?Sized> EdgeSink for std::sync::Arc<E> {
    fn on_edge(&self, channel: Channel, a: bool, b: bool, now_us: u64) {
        (**self).on_edge(channel, a, b, now_us)
    }
}
