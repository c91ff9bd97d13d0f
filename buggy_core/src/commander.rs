//! Transport-agnostic command endpoint.
//!
//! A `Commander` owns one transport plus an inbound and an outbound
//! [`RingBuffer`]. Inbound bytes go through the [`FrameParser`]; outbound
//! frames and UI text are queued and drained to the transport by
//! [`Commander::flush`].

use buggy_traits::{TextMode, Transport};

use crate::codec::{Command, FrameParser, MAX_FRAME_LEN, TextAssembler, encode_frame};
use crate::error::Result;
use crate::hw_error::map_transport_error;
use crate::ring_buffer::RingBuffer;

/// Default inbound backing size (127 usable bytes).
pub const RX_SIZE: usize = 128;
/// Default outbound backing size (255 usable bytes).
pub const TX_SIZE: usize = 256;

/// Receiver of decoded commands and text notices.
pub trait Responder {
    fn command(&mut self, cmd: Command);

    fn notify(&mut self, message: &str) {
        let _ = message;
    }
}

pub struct Commander<T, const RX: usize = RX_SIZE, const TX: usize = TX_SIZE> {
    transport: T,
    rx: RingBuffer<RX>,
    tx: RingBuffer<TX>,
    parser: FrameParser,
    text: TextAssembler,
    /// Inside a run of UI text.
    in_ui: bool,
    /// At the start of a line.
    sol: bool,
    dropped_frames: u64,
}

impl<T: Transport, const RX: usize, const TX: usize> core::fmt::Debug for Commander<T, RX, TX> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Commander")
            .field("transport", &self.transport.name())
            .field("rx", &self.rx)
            .field("tx", &self.tx)
            .field("parser", &self.parser.state())
            .finish()
    }
}

impl<T: Transport, const RX: usize, const TX: usize> Commander<T, RX, TX> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            parser: FrameParser::new(),
            text: TextAssembler::new(),
            in_ui: false,
            sol: true,
            dropped_frames: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.transport.name()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Frames completed by the parser since construction.
    pub fn frames_received(&self) -> u64 {
        self.parser.frames_completed()
    }

    /// Outbound frames dropped because the queue was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Bytes queued for the transport.
    pub fn pending(&self) -> usize {
        self.tx.available()
    }

    pub fn available_to_write(&self) -> usize {
        self.tx.available_to_write()
    }

    // ── receive side ─────────────────────────────────────────────────────────

    /// Move whatever the transport has ready into the inbound queue.
    pub fn receive(&mut self) -> Result<usize> {
        let mut chunk = [0u8; 64];
        let mut total = 0;
        loop {
            let room = self.rx.available_to_write().min(chunk.len());
            if room == 0 {
                break;
            }
            let n = self
                .transport
                .receive_available(&mut chunk[..room])
                .map_err(|e| eyre::Report::new(map_transport_error(&*e)))?;
            if n == 0 {
                break;
            }
            total += self.rx.write(&chunk[..n.min(room)]);
        }
        Ok(total)
    }

    /// Parse queued bytes up to and including the next complete frame.
    pub fn next_command(&mut self) -> Option<Command> {
        while let Some(b) = self.rx.pop() {
            if let Some(cmd) = self.parser.push(b) {
                return Some(cmd);
            }
        }
        None
    }

    /// Receive, hand every complete frame to `responder`, then flush.
    ///
    /// Chained text (`'p'` frames) is reassembled here and delivered through
    /// [`Responder::notify`] once the line is complete. Returns the number of
    /// commands delivered.
    pub fn update<R: Responder + ?Sized>(&mut self, responder: &mut R) -> Result<usize> {
        self.receive()?;
        let mut delivered = 0;
        while let Some(cmd) = self.next_command() {
            tracing::trace!(source = self.transport.name(), %cmd, "command");
            if cmd.code == TextAssembler::CODE {
                if let Some(line) = self.text.push(cmd.value) {
                    responder.notify(line);
                }
                continue;
            }
            responder.command(cmd);
            delivered += 1;
        }
        self.flush()?;
        Ok(delivered)
    }

    // ── transmit side ────────────────────────────────────────────────────────

    /// Queue one frame. A frame that does not fit whole, together with the
    /// terminator of a pending UI line, is dropped and `false` returned.
    pub fn send(&mut self, code: char, value: u32) -> bool {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let frame = encode_frame(code, value, &mut buf);
        let eol_len = if self.in_ui && !self.sol {
            self.transport.eol().len()
        } else {
            0
        };
        if self.tx.available_to_write() < frame.len() + eol_len {
            self.dropped_frames += 1;
            return false;
        }
        if self.in_ui {
            self.ui_flush();
        }
        self.tx.write(frame);
        self.sol = false;
        true
    }

    /// Queue one character of UI text; non-printable bytes are ignored.
    pub fn ui(&mut self, c: u8) {
        self.ui_char(Some(c));
    }

    /// End a pending UI line.
    pub fn ui_flush(&mut self) {
        self.ui_char(None);
    }

    pub fn ui_print(&mut self, text: &str) {
        for b in text.bytes() {
            self.ui(b);
        }
    }

    /// Send `text` as one `'p'` frame per byte followed by a bare `'p'`.
    pub fn command_print(&mut self, text: &str) {
        for b in text.bytes() {
            self.send(TextAssembler::CODE, u32::from(b));
        }
        self.send(TextAssembler::CODE, 0);
    }

    /// Send a line of text the way this transport carries text.
    pub fn print_line(&mut self, text: &str) {
        match self.transport.text_mode() {
            TextMode::Ui => {
                self.ui_print(text);
                self.ui_flush();
            }
            TextMode::Chained => self.command_print(text),
        }
    }

    /// Format a line of text without allocating; see [`print_line`](Self::print_line).
    pub fn print_fmt(&mut self, args: core::fmt::Arguments<'_>) {
        let mut line = LineBuf::new();
        // LineBuf truncates instead of failing
        let _ = core::fmt::write(&mut line, args);
        self.print_line(line.as_str());
    }

    fn ui_char(&mut self, c: Option<u8>) {
        let printable = c.filter(|b| *b == b' ' || b.is_ascii_graphic());
        let breaks = match c {
            None => self.in_ui,
            Some(_) => printable.is_some() && !self.in_ui,
        };
        if breaks && !self.sol {
            let eol = self.transport.eol().as_bytes();
            // the terminator goes out whole or not at all
            if self.tx.available_to_write() >= eol.len() {
                self.tx.write(eol);
            }
            self.in_ui = false;
            self.sol = true;
        }
        if let Some(b) = printable {
            self.tx.push(b);
            self.in_ui = true;
            self.sol = false;
        }
    }

    /// Drain the outbound queue into the transport until it is empty or the
    /// transport stops accepting bytes. Returns the bytes sent.
    pub fn flush(&mut self) -> Result<usize> {
        let mut sent = 0;
        while !self.tx.is_empty() {
            let n = self
                .transport
                .send_bytes(self.tx.peek_contiguous())
                .map_err(|e| eyre::Report::new(map_transport_error(&*e)))?;
            if n == 0 {
                break;
            }
            self.tx.consume(n);
            sent += n;
        }
        Ok(sent)
    }
}

/// Fixed-size line buffer used for formatted status text.
struct LineBuf {
    buf: [u8; 96],
    len: usize,
}

impl LineBuf {
    fn new() -> Self {
        Self {
            buf: [0; 96],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        // only whole UTF-8 sequences are copied in
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl core::fmt::Write for LineBuf {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for ch in s.chars() {
            let mut tmp = [0u8; 4];
            let bytes = ch.encode_utf8(&mut tmp).as_bytes();
            if self.len + bytes.len() > self.buf.len() {
                return Ok(());
            }
            self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
            self.len += bytes.len();
        }
        Ok(())
    }
}
