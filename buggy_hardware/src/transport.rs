//! Byte transports.
//!
//! - [`MemoryTransport`]: in-process queues driven through a [`MemoryHandle`].
//! - [`StreamTransport`]: any `Read` (drained by a background thread into a
//!   bounded channel) plus any `Write`.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use buggy_traits::{TextMode, Transport};
use crossbeam_channel as xch;

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Default)]
struct Shared {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    closed: bool,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-memory transport. The paired [`MemoryHandle`] plays the remote end.
#[derive(Debug)]
pub struct MemoryTransport {
    name: String,
    shared: Arc<Mutex<Shared>>,
    eol: &'static str,
    mode: TextMode,
    /// Accept at most this many bytes per `send_bytes` call.
    max_send: Option<usize>,
}

/// Remote end of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryTransport {
    pub fn new(name: impl Into<String>) -> (Self, MemoryHandle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                name: name.into(),
                shared: shared.clone(),
                eol: "\n",
                mode: TextMode::Ui,
                max_send: None,
            },
            MemoryHandle { shared },
        )
    }

    pub fn with_eol(mut self, eol: &'static str) -> Self {
        self.eol = eol;
        self
    }

    pub fn with_text_mode(mut self, mode: TextMode) -> Self {
        self.mode = mode;
        self
    }

    /// Simulate a slow link that accepts only `n` bytes per send.
    pub fn with_max_send(mut self, n: usize) -> Self {
        self.max_send = Some(n);
        self
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive_available(&mut self, buf: &mut [u8]) -> Result<usize, BoxError> {
        let mut s = lock(&self.shared);
        if s.closed && s.inbound.is_empty() {
            return Err(Box::new(HwError::Disconnected));
        }
        let n = buf.len().min(s.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(s.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<usize, BoxError> {
        let mut s = lock(&self.shared);
        if s.closed {
            return Err(Box::new(HwError::Disconnected));
        }
        let n = self.max_send.map_or(bytes.len(), |m| m.min(bytes.len()));
        s.outbound.extend_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn eol(&self) -> &'static str {
        self.eol
    }

    fn text_mode(&self) -> TextMode {
        self.mode
    }
}

impl MemoryHandle {
    /// Queue bytes for the vehicle to receive.
    pub fn push(&self, bytes: &[u8]) {
        lock(&self.shared).inbound.extend(bytes);
    }

    /// Everything the vehicle has sent since the last call.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut lock(&self.shared).outbound)
    }

    /// Bytes still waiting to be received.
    pub fn pending_inbound(&self) -> usize {
        lock(&self.shared).inbound.len()
    }

    /// Drop the link; further sends fail and receives fail once drained.
    pub fn close(&self) {
        lock(&self.shared).closed = true;
    }
}

/// Transport over a reader/writer pair (stdin/stdout, a tty, a socket).
///
/// Reads happen on a background thread so `receive_available` never blocks.
/// End of input is reported as an empty link, not an error.
pub struct StreamTransport<W: Write> {
    name: String,
    rx: xch::Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    writer: W,
    eol: &'static str,
    mode: TextMode,
    closed: bool,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl<W: Write> core::fmt::Debug for StreamTransport<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("name", &self.name)
            .field("pending", &self.pending.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl<W: Write> StreamTransport<W> {
    /// Spawn the reader thread; `depth` bounds the number of queued chunks.
    pub fn spawn<R: Read + Send + 'static>(
        name: impl Into<String>,
        mut reader: R,
        writer: W,
        depth: usize,
    ) -> Self {
        let (tx, rx) = xch::bounded::<Vec<u8>>(depth.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let name = name.into();
        let thread_name = name.clone();

        let join_handle = std::thread::spawn(move || {
            let mut chunk = [0u8; 256];
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                match reader.read(&mut chunk) {
                    Ok(0) => {
                        tracing::debug!(transport = %thread_name, "end of input");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::warn!(transport = %thread_name, error = %e, "read failed");
                        break;
                    }
                }
            }
            tracing::trace!(transport = %thread_name, "reader thread exiting");
        });

        Self {
            name,
            rx,
            pending: VecDeque::new(),
            writer,
            eol: "\n",
            mode: TextMode::Ui,
            closed: false,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn with_eol(mut self, eol: &'static str) -> Self {
        self.eol = eol;
        self
    }

    pub fn with_text_mode(mut self, mode: TextMode) -> Self {
        self.mode = mode;
        self
    }

    /// True once the reader hit end of input and everything was received.
    pub fn is_closed(&self) -> bool {
        self.closed && self.pending.is_empty()
    }
}

impl<W: Write> Transport for StreamTransport<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive_available(&mut self, buf: &mut [u8]) -> Result<usize, BoxError> {
        while self.pending.len() < buf.len() {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend(chunk),
                Err(xch::TryRecvError::Empty) => break,
                Err(xch::TryRecvError::Disconnected) => {
                    if !self.closed {
                        tracing::info!(transport = %self.name, "input closed");
                        self.closed = true;
                    }
                    break;
                }
            }
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<usize, BoxError> {
        let n = self.writer.write(bytes).map_err(HwError::from)?;
        self.writer.flush().map_err(HwError::from)?;
        Ok(n)
    }

    fn eol(&self) -> &'static str {
        self.eol
    }

    fn text_mode(&self) -> TextMode {
        self.mode
    }
}

impl<W: Write> Drop for StreamTransport<W> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // A reader blocked in read() cannot be woken; only join one that has finished.
        if let Some(handle) = self.join_handle.take() {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    tracing::warn!(?e, "reader thread panicked");
                }
            } else {
                tracing::trace!(transport = %self.name, "detaching blocked reader thread");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip_and_close() {
        let (mut t, h) = MemoryTransport::new("mem");
        h.push(b"x1,");
        let mut buf = [0u8; 8];
        assert_eq!(t.receive_available(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"x1,");
        assert_eq!(t.send_bytes(b"ok").unwrap(), 2);
        assert_eq!(h.take_output(), b"ok");
        h.close();
        assert!(t.receive_available(&mut buf).is_err());
        assert!(t.send_bytes(b"z").is_err());
    }

    #[test]
    fn slow_link_accepts_partial_sends() {
        let (t, h) = MemoryTransport::new("slow");
        let mut t = t.with_max_send(2);
        assert_eq!(t.send_bytes(b"abcd").unwrap(), 2);
        assert_eq!(h.take_output(), b"ab");
    }
}
