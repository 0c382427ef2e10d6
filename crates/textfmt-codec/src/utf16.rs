//! UTF-16 in either byte order. Surrogate pairs are combined on import and
//! split on export; unpaired surrogates pass through as single units.

use textfmt_core::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteOrder {
    Little,
    Big,
}

fn read_unit(pair: &[u8], order: ByteOrder) -> u16 {
    match order {
        ByteOrder::Little => u16::from_le_bytes([pair[0], pair[1]]),
        ByteOrder::Big => u16::from_be_bytes([pair[0], pair[1]]),
    }
}

fn is_high(u: u16) -> bool {
    (0xd800..=0xdbff).contains(&u)
}

fn is_low(u: u16) -> bool {
    (0xdc00..=0xdfff).contains(&u)
}

/// Validate `bytes` and count the code points they decode to.
pub(crate) fn count(bytes: &[u8], order: ByteOrder) -> Result<usize, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::Malformed {
            offset: bytes.len() - 1,
        });
    }
    let mut iter = bytes.chunks_exact(2).map(|p| read_unit(p, order)).peekable();
    let mut n = 0;
    while let Some(u) = iter.next() {
        if is_high(u) && iter.peek().is_some_and(|&l| is_low(l)) {
            iter.next();
        }
        n += 1;
    }
    Ok(n)
}

pub(crate) fn decode_into(bytes: &[u8], order: ByteOrder, out: &mut Vec<u32>) {
    let mut iter = bytes.chunks_exact(2).map(|p| read_unit(p, order)).peekable();
    while let Some(u) = iter.next() {
        let low = iter.peek().copied().filter(|&l| is_low(l));
        match low {
            Some(low) if is_high(u) => {
                iter.next();
                out.push(0x1_0000 + ((u32::from(u) - 0xd800) << 10) + (u32::from(low) - 0xdc00));
            }
            _ => out.push(u32::from(u)),
        }
    }
}

/// Bytes needed for `cp`, or `None` above U+10FFFF.
pub(crate) fn encoded_len(cp: u32) -> Option<usize> {
    match cp {
        0..=0xffff => Some(2),
        0x1_0000..=0x10_ffff => Some(4),
        _ => None,
    }
}

pub(crate) fn encode(cp: u32, order: ByteOrder, out: &mut [u8; 6]) -> Option<usize> {
    let put = |u: u16, at: &mut [u8]| {
        let bytes = match order {
            ByteOrder::Little => u.to_le_bytes(),
            ByteOrder::Big => u.to_be_bytes(),
        };
        at[..2].copy_from_slice(&bytes);
    };
    match encoded_len(cp)? {
        2 => {
            put(cp as u16, &mut out[..2]);
            Some(2)
        }
        _ => {
            let v = cp - 0x1_0000;
            put(0xd800 | (v >> 10) as u16, &mut out[..2]);
            put(0xdc00 | (v & 0x3ff) as u16, &mut out[2..4]);
            Some(4)
        }
    }
}
