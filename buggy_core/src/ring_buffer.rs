//! Fixed-capacity byte FIFO with wraparound.
//!
//! Every transport owns one of these per direction. The backing array holds `N`
//! bytes but only `N - 1` are usable: one slot always stays empty so that
//! `start == end` unambiguously means "empty". Nothing here allocates.

/// Byte queue backed by `[u8; N]`.
#[derive(Clone)]
pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    /// Index of the oldest byte.
    start: usize,
    /// Index of the next free slot; always writable.
    end: usize,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for RingBuffer<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &Self::CAPACITY)
            .field("available", &self.available())
            .finish()
    }
}

impl<const N: usize> RingBuffer<N> {
    /// Usable bytes; one slot is reserved as the full/empty disambiguator.
    pub const CAPACITY: usize = N - 1;

    pub const fn new() -> Self {
        assert!(N >= 2, "RingBuffer needs at least two slots");
        Self {
            buf: [0; N],
            start: 0,
            end: 0,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        Self::CAPACITY
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Empty the buffer for a fresh start.
    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    /// Bytes waiting to be read.
    #[inline]
    pub fn available(&self) -> usize {
        if self.end >= self.start {
            self.end - self.start
        } else {
            N - self.start + self.end
        }
    }

    /// Bytes that can be written before the buffer is full.
    #[inline]
    pub fn available_to_write(&self) -> usize {
        Self::CAPACITY - self.available()
    }

    /// Append one byte; returns `false` (and drops nothing already queued) when full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.available_to_write() == 0 {
            return false;
        }
        self.buf[self.end] = byte;
        self.end = Self::advance(self.end, 1);
        true
    }

    /// Remove the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buf[self.start];
        self.start = Self::advance(self.start, 1);
        Some(byte)
    }

    /// Write as many of `bytes` as fit; returns the number written.
    ///
    /// A write that runs past the end of the backing array is split in two
    /// contiguous copies, the second one starting at index 0.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if self.is_empty() {
            // nothing queued: rewind so small writes stay contiguous
            self.clear();
        }
        let count = bytes.len().min(self.available_to_write());
        if count == 0 {
            return 0;
        }
        let first = count.min(N - self.end);
        self.buf[self.end..self.end + first].copy_from_slice(&bytes[..first]);
        let rest = count - first;
        if rest > 0 {
            self.buf[..rest].copy_from_slice(&bytes[first..count]);
        }
        self.end = Self::advance(self.end, count);
        count
    }

    /// Read (and remove) up to `out.len()` bytes; returns the number read.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.available());
        if count == 0 {
            return 0;
        }
        let first = count.min(N - self.start);
        out[..first].copy_from_slice(&self.buf[self.start..self.start + first]);
        let rest = count - first;
        if rest > 0 {
            out[first..count].copy_from_slice(&self.buf[..rest]);
        }
        self.start = Self::advance(self.start, count);
        count
    }

    /// The oldest queued bytes that are contiguous in memory (may be shorter than `available()`).
    pub fn peek_contiguous(&self) -> &[u8] {
        if self.end >= self.start {
            &self.buf[self.start..self.end]
        } else {
            &self.buf[self.start..]
        }
    }

    /// Drop `n` bytes from the front (clamped to what is queued).
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.available());
        self.start = Self::advance(self.start, n);
    }

    #[inline]
    fn advance(idx: usize, by: usize) -> usize {
        (idx + by) % N
    }
}
