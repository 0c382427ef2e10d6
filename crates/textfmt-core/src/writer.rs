//! Fixed-capacity output cursor.
//!
//! [`BoundedWriter`] wraps a caller's `&mut [u8]`, keeps the last byte for
//! the NUL terminator, and silently drops whatever does not fit while still
//! counting it, so a finished render knows both what it stored and what an
//! unbounded destination would have needed.

use std::fmt;

/// Outcome of a bounded render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rendered {
    /// Content bytes stored in the destination, terminator excluded.
    pub written: usize,
    /// Content bytes an unbounded destination would have received.
    pub required: usize,
}

impl Rendered {
    /// Whether some output was dropped.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.required > self.written
    }

    /// Smallest destination capacity (terminator included) that renders exactly.
    #[inline]
    pub fn capacity_needed(&self) -> usize {
        self.required + 1
    }
}

/// Writes into a fixed-capacity byte buffer, truncating on overflow.
pub struct BoundedWriter<'d> {
    dst: &'d mut [u8],
    pos: usize,
    required: usize,
}

impl<'d> BoundedWriter<'d> {
    pub fn new(dst: &'d mut [u8]) -> Self {
        Self {
            dst,
            pos: 0,
            required: 0,
        }
    }

    /// Total capacity, terminator included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.dst.len()
    }

    /// Content bytes stored so far.
    #[inline]
    pub fn written(&self) -> usize {
        self.pos
    }

    /// Content bytes produced so far, stored or not.
    #[inline]
    pub fn required(&self) -> usize {
        self.required
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.required > self.pos
    }

    /// Content bytes that can still be stored.
    #[inline]
    pub fn room(&self) -> usize {
        self.dst.len().saturating_sub(1) - self.pos
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.room());
        self.dst[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.pos += n;
        self.required += bytes.len();
    }

    #[inline]
    pub fn push_byte(&mut self, byte: u8) {
        self.push_bytes(&[byte]);
    }

    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    pub fn push_char(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.push_bytes(c.encode_utf8(&mut utf8).as_bytes());
    }

    /// The unused tail of the destination, terminator slot included.
    ///
    /// Callers that write here directly report back through [`Self::advance`].
    pub fn spare(&mut self) -> &mut [u8] {
        &mut self.dst[self.pos..]
    }

    /// Account for `required` bytes produced directly into [`Self::spare`],
    /// of which at most [`Self::room`] were stored.
    pub fn advance(&mut self, required: usize) {
        self.pos += required.min(self.room());
        self.required += required;
    }

    /// NUL-terminate the content and report the totals.
    pub fn finish(self) -> Rendered {
        if let Some(slot) = self.dst.get_mut(self.pos) {
            *slot = 0;
        }
        Rendered {
            written: self.pos,
            required: self.required,
        }
    }
}

impl fmt::Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

/// The NUL-terminated content at the start of `buf`.
pub fn content(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}
