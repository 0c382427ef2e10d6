//! Integer to decimal conversion into fixed-capacity byte buffers.
//!
//! The `copy_*` functions follow `strlcpy` and the `cat_*` functions follow
//! `strlcat`: they store as many characters as fit, NUL-terminate whenever
//! the destination has at least one byte, and return the length the result
//! would have had with an unbounded destination. Truncation is detected by
//! comparing the return value against `dst.len()`.

/// Longest decimal rendering of a 64-bit integer (`-9223372036854775808`).
pub const MAX_DECIMAL_LEN: usize = 20;

/// Renders `magnitude` low-digit-first into the tail of `scratch`, then the
/// optional sign, and returns the populated range in reading order.
fn render_reversed(magnitude: u64, negative: bool, scratch: &mut [u8; MAX_DECIMAL_LEN]) -> &[u8] {
    let mut len = 0;
    let mut n = magnitude;
    loop {
        scratch[len] = b'0' + (n % 10) as u8;
        len += 1;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if negative {
        scratch[len] = b'-';
        len += 1;
    }
    let digits = &mut scratch[..len];
    digits.reverse();
    digits
}

fn store(dst: &mut [u8], offset: usize, text: &[u8]) -> usize {
    let Some(limit) = dst.len().checked_sub(1) else {
        return offset + text.len();
    };
    let room = limit.saturating_sub(offset);
    let n = text.len().min(room);
    dst[offset..offset + n].copy_from_slice(&text[..n]);
    dst[offset + n] = 0;
    offset + text.len()
}

/// Length of the NUL-terminated content of `dst`, or `None` if `dst` holds no NUL.
fn content_len(dst: &[u8]) -> Option<usize> {
    dst.iter().position(|&b| b == 0)
}

/// Write `value` at the start of `dst`.
pub fn copy_i64(dst: &mut [u8], value: i64) -> usize {
    let mut scratch = [0u8; MAX_DECIMAL_LEN];
    let text = render_reversed(value.unsigned_abs(), value < 0, &mut scratch);
    store(dst, 0, text)
}

/// Write `value` at the start of `dst`.
pub fn copy_u64(dst: &mut [u8], value: u64) -> usize {
    let mut scratch = [0u8; MAX_DECIMAL_LEN];
    let text = render_reversed(value, false, &mut scratch);
    store(dst, 0, text)
}

/// Append `value` after the NUL-terminated content already in `dst`.
///
/// When `dst` contains no NUL nothing is written and
/// `dst.len() + digits` is returned.
pub fn cat_i64(dst: &mut [u8], value: i64) -> usize {
    let mut scratch = [0u8; MAX_DECIMAL_LEN];
    let text = render_reversed(value.unsigned_abs(), value < 0, &mut scratch);
    append(dst, text)
}

/// Append `value` after the NUL-terminated content already in `dst`.
pub fn cat_u64(dst: &mut [u8], value: u64) -> usize {
    let mut scratch = [0u8; MAX_DECIMAL_LEN];
    let text = render_reversed(value, false, &mut scratch);
    append(dst, text)
}

fn append(dst: &mut [u8], text: &[u8]) -> usize {
    match content_len(dst) {
        Some(existing) => store(dst, existing, text),
        None => dst.len() + text.len(),
    }
}

/// Number of characters `copy_i64` produces for `value`.
pub fn decimal_len_i64(value: i64) -> usize {
    decimal_len_u64(value.unsigned_abs()) + usize::from(value < 0)
}

/// Number of characters `copy_u64` produces for `value`.
pub fn decimal_len_u64(value: u64) -> usize {
    let mut len = 1;
    let mut n = value / 10;
    while n != 0 {
        len += 1;
        n /= 10;
    }
    len
}
