//! Wire codec for the buggy command protocol.
//!
//! A frame is one ASCII letter, up to ten decimal digits, and a comma:
//!
//! ```text
//! frame := letter digit{0,10} ','
//! ```
//!
//! There is no escaping, length prefix or checksum. Framing relies only on
//! character classes and the terminating comma; anything else silently aborts
//! the token being collected.

/// Frame terminator.
pub const TERMINATOR: u8 = b',';
/// Maximum digits accepted after the code letter.
pub const MAX_DIGITS: usize = 10;
/// Longest encoded frame: letter + ten digits + comma.
pub const MAX_FRAME_LEN: usize = 1 + MAX_DIGITS + 1;

/// One decoded `(code, value)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub code: char,
    pub value: u32,
}

impl Command {
    pub const fn new(code: char, value: u32) -> Self {
        Self { code, value }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let frame = encode_frame(self.code, self.value, &mut buf);
        // encode_frame only emits ASCII
        f.write_str(core::str::from_utf8(frame).unwrap_or(""))
    }
}

/// Where the parser currently is within a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    InLetter,
    InDigits,
}

/// Byte-at-a-time frame parser with a fixed 16-byte token buffer.
#[derive(Debug, Clone)]
pub struct FrameParser {
    buf: [u8; 16],
    len: usize,
    frames: u64,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            buf: [0; 16],
            len: 0,
            frames: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        match self.len {
            0 => ParseState::Idle,
            1 => ParseState::InLetter,
            _ => ParseState::InDigits,
        }
    }

    /// Number of frames completed since construction.
    pub fn frames_completed(&self) -> u64 {
        self.frames
    }

    /// Discard any partial token.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Feed one byte; returns a command when this byte completed a frame.
    pub fn push(&mut self, byte: u8) -> Option<Command> {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' => {
                self.buf[0] = byte;
                self.len = 1;
                None
            }
            b'0'..=b'9' => {
                if (1..=MAX_DIGITS).contains(&self.len) {
                    self.buf[self.len] = byte;
                    self.len += 1;
                } else {
                    self.len = 0;
                }
                None
            }
            TERMINATOR => {
                let cmd = match self.len {
                    0 => None,
                    1 => Some(Command::new(char::from(self.buf[0]), 0)),
                    n => Some(Command::new(
                        char::from(self.buf[0]),
                        parse_decimal(&self.buf[1..n]),
                    )),
                };
                self.len = 0;
                if cmd.is_some() {
                    self.frames = self.frames.wrapping_add(1);
                }
                cmd
            }
            _ => {
                self.len = 0;
                None
            }
        }
    }

    /// Feed a slice, calling `on_command` for every completed frame in order.
    /// Returns the number of commands emitted.
    pub fn feed(&mut self, bytes: &[u8], mut on_command: impl FnMut(Command)) -> usize {
        let mut emitted = 0;
        for &b in bytes {
            if let Some(cmd) = self.push(b) {
                on_command(cmd);
                emitted += 1;
            }
        }
        emitted
    }
}

/// Unsigned decimal parse of ASCII digits; saturates at `u32::MAX`.
fn parse_decimal(digits: &[u8]) -> u32 {
    digits.iter().fold(0u32, |acc, d| {
        acc.saturating_mul(10)
            .saturating_add(u32::from(d.wrapping_sub(b'0')))
    })
}

/// Encode `code` and `value` into `buf` as `"<code><value>,"`; the value is
/// omitted when zero. Returns the used prefix of `buf`.
///
/// `code` is expected to be an ASCII letter; anything else is written as `'?'`
/// so the frame is still ASCII (the receiver will drop it).
pub fn encode_frame(code: char, value: u32, buf: &mut [u8; MAX_FRAME_LEN]) -> &[u8] {
    buf[0] = if code.is_ascii() { code as u8 } else { b'?' };
    let mut len = 1;
    if value != 0 {
        let mut digits = [0u8; MAX_DIGITS];
        let mut n = 0;
        let mut v = value;
        while v > 0 {
            digits[n] = b'0' + (v % 10) as u8;
            v /= 10;
            n += 1;
        }
        for &d in digits[..n].iter().rev() {
            buf[len] = d;
            len += 1;
        }
    }
    buf[len] = TERMINATOR;
    &buf[..=len]
}

/// Reassembles text sent as a run of `'p'` frames (one per character)
/// closed by a bare `'p'`.
#[derive(Debug, Clone)]
pub struct TextAssembler {
    line: [u8; 64],
    len: usize,
    truncated: bool,
}

impl Default for TextAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl TextAssembler {
    pub const CODE: char = 'p';

    pub const fn new() -> Self {
        Self {
            line: [0; 64],
            len: 0,
            truncated: false,
        }
    }

    /// Accept the value of one `'p'` frame. Returns the finished line on the
    /// terminator. Characters beyond the line capacity are dropped.
    pub fn push(&mut self, value: u32) -> Option<&str> {
        if value == 0 {
            let n = self.len;
            self.len = 0;
            self.truncated = false;
            // only printable ASCII is ever stored
            return Some(core::str::from_utf8(&self.line[..n]).unwrap_or(""));
        }
        let byte = u8::try_from(value).ok().filter(|b| (0x20..0x7f).contains(b));
        if let Some(b) = byte {
            if self.len < self.line.len() {
                self.line[self.len] = b;
                self.len += 1;
            } else {
                self.truncated = true;
            }
        }
        None
    }

    /// Whether characters were dropped from the line being collected.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}
