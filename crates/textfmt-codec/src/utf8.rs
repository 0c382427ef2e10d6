//! UTF-8 with the original 1-6 byte forms (code points up to 31 bits).
//!
//! Overlong forms and surrogates are accepted on import; the round trip is
//! exact for every sequence this decoder accepts in its shortest form.

use textfmt_core::CodecError;

/// Sequence length announced by a lead byte, or 0 for bytes that cannot lead.
const SEQ_LEN: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut b = 0;
    while b < 256 {
        table[b] = match b {
            0x00..=0x7f => 1,
            0x80..=0xbf => 0,
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            0xf8..=0xfb => 5,
            0xfc..=0xfd => 6,
            _ => 0,
        };
        b += 1;
    }
    table
};

/// Payload mask for the lead byte of an n-byte sequence, indexed by n.
const LEAD_MASK: [u8; 7] = [0, 0x7f, 0x1f, 0x0f, 0x07, 0x03, 0x01];

/// Lead-byte marker for an n-byte sequence, indexed by n.
const LEAD_MARK: [u8; 7] = [0, 0x00, 0xc0, 0xe0, 0xf0, 0xf8, 0xfc];

/// Largest code point the 6-byte form can carry.
pub const MAX_CODE_POINT: u32 = 0x7fff_ffff;

/// Validate `bytes` and count the code points they decode to.
pub(crate) fn count(bytes: &[u8]) -> Result<usize, CodecError> {
    let mut i = 0;
    let mut n = 0;
    while i < bytes.len() {
        let len = SEQ_LEN[bytes[i] as usize] as usize;
        if len == 0 || i + len > bytes.len() {
            return Err(CodecError::Malformed { offset: i });
        }
        if let Some(bad) = bytes[i + 1..i + len].iter().position(|&c| c & 0xc0 != 0x80) {
            return Err(CodecError::Malformed {
                offset: i + 1 + bad,
            });
        }
        i += len;
        n += 1;
    }
    Ok(n)
}

/// Decode `bytes`, which [`count`] has already accepted.
pub(crate) fn decode_into(bytes: &[u8], out: &mut Vec<u32>) {
    let mut i = 0;
    while i < bytes.len() {
        let len = SEQ_LEN[bytes[i] as usize] as usize;
        let mut cp = u32::from(bytes[i] & LEAD_MASK[len]);
        for &c in &bytes[i + 1..i + len] {
            cp = (cp << 6) | u32::from(c & 0x3f);
        }
        out.push(cp);
        i += len;
    }
}

/// Bytes needed to encode `cp`, or `None` above [`MAX_CODE_POINT`].
pub(crate) fn encoded_len(cp: u32) -> Option<usize> {
    match cp {
        0..=0x7f => Some(1),
        0x80..=0x7ff => Some(2),
        0x800..=0xffff => Some(3),
        0x1_0000..=0x1f_ffff => Some(4),
        0x20_0000..=0x3ff_ffff => Some(5),
        0x400_0000..=MAX_CODE_POINT => Some(6),
        _ => None,
    }
}

/// Encode `cp` into `out`, high bits first; returns the byte count.
pub(crate) fn encode(cp: u32, out: &mut [u8; 6]) -> Option<usize> {
    let len = encoded_len(cp)?;
    if len == 1 {
        out[0] = cp as u8;
        return Some(1);
    }
    let tail = len - 1;
    out[0] = LEAD_MARK[len] | (cp >> (6 * tail)) as u8;
    for k in 1..len {
        let shift = 6 * (tail - k);
        out[k] = 0x80 | ((cp >> shift) & 0x3f) as u8;
    }
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<Vec<u32>, CodecError> {
        let n = count(bytes)?;
        let mut out = Vec::with_capacity(n);
        decode_into(bytes, &mut out);
        Ok(out)
    }

    #[test]
    fn decodes_each_width() {
        assert_eq!(decode("aé€😀".as_bytes()).unwrap(), vec![0x61, 0xe9, 0x20ac, 0x1f600]);
    }

    #[test]
    fn decodes_five_and_six_byte_forms() {
        assert_eq!(decode(&[0xf8, 0x88, 0x80, 0x80, 0x80]).unwrap(), vec![0x20_0000]);
        assert_eq!(
            decode(&[0xfd, 0xbf, 0xbf, 0xbf, 0xbf, 0xbf]).unwrap(),
            vec![MAX_CODE_POINT]
        );
    }

    #[test]
    fn rejects_bad_lead_bytes() {
        assert_eq!(decode(&[b'a', 0x80]), Err(CodecError::Malformed { offset: 1 }));
        assert_eq!(decode(&[0xfe]), Err(CodecError::Malformed { offset: 0 }));
        assert_eq!(decode(&[0xff, b'a']), Err(CodecError::Malformed { offset: 0 }));
    }

    #[test]
    fn rejects_truncated_and_bad_continuations() {
        assert_eq!(decode(&[0xe2, 0x82]), Err(CodecError::Malformed { offset: 0 }));
        assert_eq!(decode(&[0xe2, 0x41, 0xac]), Err(CodecError::Malformed { offset: 1 }));
    }

    #[test]
    fn encode_lengths_follow_ranges() {
        let mut buf = [0u8; 6];
        for (cp, len) in [
            (0x7f, 1),
            (0x80, 2),
            (0x7ff, 2),
            (0x800, 3),
            (0xffff, 3),
            (0x1_0000, 4),
            (0x1f_ffff, 4),
            (0x20_0000, 5),
            (0x3ff_ffff, 5),
            (0x400_0000, 6),
            (MAX_CODE_POINT, 6),
        ] {
            assert_eq!(encode(cp, &mut buf), Some(len), "code point {cp:#x}");
            assert_eq!(decode(&buf[..len]).unwrap(), vec![cp]);
        }
        assert_eq!(encode(0x8000_0000, &mut buf), None);
    }

    #[test]
    fn encode_matches_std_for_scalars() {
        let mut buf = [0u8; 6];
        for c in ['A', 'ß', 'ह', '€', '𝄞'] {
            let n = encode(c as u32, &mut buf).unwrap();
            let mut expected = [0u8; 4];
            assert_eq!(&buf[..n], c.encode_utf8(&mut expected).as_bytes());
        }
    }
}
