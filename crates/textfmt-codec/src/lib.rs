//! Conversion between byte encodings and UCS-4 code-unit arrays.
//!
//! [`import`] decodes bytes into a zero-terminated [`Ucs4Buffer`];
//! [`export`] encodes code units back into a caller-supplied buffer and
//! reports running out of room as [`CodecError::Overflow`] rather than
//! truncating.
//!
//! Supported encodings are US-ASCII and UTF-8 (in its 1-6 byte form), plus
//! ISO-8859-1, Windows-1252 and UTF-16LE/BE with the `system-encodings`
//! feature.
//!
//! ```
//! use textfmt_codec::{export_to_vec, import};
//!
//! let units = import("UTF-8", "héllo".as_bytes()).unwrap();
//! assert_eq!(units.len(), 5);
//! assert_eq!(export_to_vec("UTF-8", units.units()).unwrap(), "héllo".as_bytes());
//! ```

mod single_byte;
#[cfg(feature = "system-encodings")]
mod utf16;
pub mod utf8;

use std::fmt;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;
pub use textfmt_core::CodecError;

/// Width in bytes of one code unit.
pub const CODE_UNIT_SIZE: usize = std::mem::size_of::<u32>();

// ============================================================================
// Encodings
// ============================================================================

/// A byte encoding the codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Ascii,
    Utf8,
    #[cfg(feature = "system-encodings")]
    Latin1,
    #[cfg(feature = "system-encodings")]
    Windows1252,
    #[cfg(feature = "system-encodings")]
    Utf16Le,
    #[cfg(feature = "system-encodings")]
    Utf16Be,
}

fn aliases() -> &'static FxHashMap<&'static str, Encoding> {
    static ALIASES: OnceLock<FxHashMap<&'static str, Encoding>> = OnceLock::new();
    ALIASES.get_or_init(|| {
        let mut map = FxHashMap::default();
        for name in ["US-ASCII", "ASCII", "ANSI_X3.4-1968", "646"] {
            map.insert(name, Encoding::Ascii);
        }
        for name in ["UTF-8", "UTF8"] {
            map.insert(name, Encoding::Utf8);
        }
        #[cfg(feature = "system-encodings")]
        {
            for name in ["ISO-8859-1", "ISO8859-1", "ISO_8859-1", "LATIN1", "LATIN-1", "L1"] {
                map.insert(name, Encoding::Latin1);
            }
            for name in ["WINDOWS-1252", "CP1252", "X-CP1252"] {
                map.insert(name, Encoding::Windows1252);
            }
            for name in ["UTF-16LE", "UTF16LE"] {
                map.insert(name, Encoding::Utf16Le);
            }
            for name in ["UTF-16BE", "UTF16BE"] {
                map.insert(name, Encoding::Utf16Be);
            }
        }
        map
    })
}

impl Encoding {
    /// Look an encoding up by name, ignoring ASCII case and surrounding space.
    pub fn from_name(name: &str) -> Result<Self, CodecError> {
        let key = name.trim().to_ascii_uppercase();
        aliases()
            .get(key.as_str())
            .copied()
            .ok_or_else(|| CodecError::UnknownEncoding(name.to_owned()))
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Ascii => "US-ASCII",
            Encoding::Utf8 => "UTF-8",
            #[cfg(feature = "system-encodings")]
            Encoding::Latin1 => "ISO-8859-1",
            #[cfg(feature = "system-encodings")]
            Encoding::Windows1252 => "WINDOWS-1252",
            #[cfg(feature = "system-encodings")]
            Encoding::Utf16Le => "UTF-16LE",
            #[cfg(feature = "system-encodings")]
            Encoding::Utf16Be => "UTF-16BE",
        }
    }

    /// Validate `bytes` and count the code units they decode to.
    fn count(&self, bytes: &[u8]) -> Result<usize, CodecError> {
        match self {
            Encoding::Utf8 => utf8::count(bytes),
            #[cfg(feature = "system-encodings")]
            Encoding::Utf16Le => utf16::count(bytes, utf16::ByteOrder::Little),
            #[cfg(feature = "system-encodings")]
            Encoding::Utf16Be => utf16::count(bytes, utf16::ByteOrder::Big),
            _ => Ok(bytes.len()),
        }
    }

    fn decode_into(&self, bytes: &[u8], out: &mut Vec<u32>) {
        match self {
            Encoding::Ascii => single_byte::decode_ascii(bytes, out),
            Encoding::Utf8 => utf8::decode_into(bytes, out),
            // Latin-1 bytes are their own code points.
            #[cfg(feature = "system-encodings")]
            Encoding::Latin1 => single_byte::decode_ascii(bytes, out),
            #[cfg(feature = "system-encodings")]
            Encoding::Windows1252 => single_byte::decode_windows1252(bytes, out),
            #[cfg(feature = "system-encodings")]
            Encoding::Utf16Le => utf16::decode_into(bytes, utf16::ByteOrder::Little, out),
            #[cfg(feature = "system-encodings")]
            Encoding::Utf16Be => utf16::decode_into(bytes, utf16::ByteOrder::Big, out),
        }
    }

    /// Encode one unit into `out`, returning the byte count or `None` when
    /// the unit has no representation.
    fn encode(&self, unit: u32, out: &mut [u8; 6]) -> Option<usize> {
        let single = |b: Option<u8>, out: &mut [u8; 6]| {
            b.map(|b| {
                out[0] = b;
                1
            })
        };
        match self {
            Encoding::Ascii => single(single_byte::encode_ascii(unit), out),
            Encoding::Utf8 => utf8::encode(unit, out),
            #[cfg(feature = "system-encodings")]
            Encoding::Latin1 => single(single_byte::encode_latin1(unit), out),
            #[cfg(feature = "system-encodings")]
            Encoding::Windows1252 => single(single_byte::encode_windows1252(unit), out),
            #[cfg(feature = "system-encodings")]
            Encoding::Utf16Le => utf16::encode(unit, utf16::ByteOrder::Little, out),
            #[cfg(feature = "system-encodings")]
            Encoding::Utf16Be => utf16::encode(unit, utf16::ByteOrder::Big, out),
        }
    }

    /// Bytes needed to encode `units` up to the first zero unit, terminator excluded.
    pub fn encoded_len(&self, units: &[u32]) -> Result<usize, CodecError> {
        let mut scratch = [0u8; 6];
        terminated(units).iter().enumerate().try_fold(0, |total, (index, &unit)| {
            self.encode(unit, &mut scratch)
                .map(|n| total + n)
                .ok_or(CodecError::Unrepresentable { index, unit })
        })
    }

    /// Decode `bytes`. See [`import`].
    pub fn import(&self, bytes: &[u8]) -> Result<Ucs4Buffer, CodecError> {
        let count = self.count(bytes).map_err(|e| failed("import", *self, e))?;
        let mut units = Vec::new();
        units
            .try_reserve_exact(count + 1)
            .map_err(|_| {
                let requested = (count + 1) * CODE_UNIT_SIZE;
                failed("import", *self, CodecError::OutOfMemory { requested })
            })?;
        self.decode_into(bytes, &mut units);
        units.push(0);
        Ok(Ucs4Buffer { units })
    }

    /// Encode `units` into `dst`. See [`export`].
    pub fn export(&self, units: &[u32], dst: &mut [u8]) -> Result<usize, CodecError> {
        let needed = self.encoded_len(units).map_err(|e| failed("export", *self, e))?;
        if needed + 1 > dst.len() {
            let err = CodecError::Overflow {
                needed: needed + 1,
                capacity: dst.len(),
            };
            return Err(failed("export", *self, err));
        }
        let mut scratch = [0u8; 6];
        let mut pos = 0;
        for &unit in terminated(units) {
            // encoded_len already proved every unit representable.
            let n = self.encode(unit, &mut scratch).unwrap_or(0);
            dst[pos..pos + n].copy_from_slice(&scratch[..n]);
            pos += n;
        }
        dst[pos] = 0;
        Ok(pos)
    }

    /// Encode `units` into a new vector (no terminator).
    pub fn export_to_vec(&self, units: &[u32]) -> Result<Vec<u8>, CodecError> {
        let needed = self.encoded_len(units).map_err(|e| failed("export", *self, e))?;
        let mut out = vec![0u8; needed + 1];
        let n = self.export(units, &mut out)?;
        out.truncate(n);
        Ok(out)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `units` up to (not including) the first zero unit.
fn terminated(units: &[u32]) -> &[u32] {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    &units[..end]
}

fn failed(op: &str, encoding: Encoding, err: CodecError) -> CodecError {
    log::warn!("{op} as {encoding} failed: {err}");
    textfmt_core::record(err)
}

// ============================================================================
// UCS-4 buffer
// ============================================================================

/// Decoded text: one `u32` per code point plus a zero terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ucs4Buffer {
    units: Vec<u32>,
}

impl Ucs4Buffer {
    /// Number of decoded code units, terminator excluded.
    pub fn len(&self) -> usize {
        self.units.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the allocation in bytes, terminator included.
    pub fn allocated_bytes(&self) -> usize {
        self.units.len() * CODE_UNIT_SIZE
    }

    /// The decoded units without the terminator.
    pub fn units(&self) -> &[u32] {
        &self.units[..self.len()]
    }

    /// The decoded units followed by the zero terminator.
    pub fn units_with_nul(&self) -> &[u32] {
        &self.units
    }

    /// The units as a `String`, or `None` if any unit is not a Unicode scalar value.
    pub fn to_string_checked(&self) -> Option<String> {
        self.units().iter().map(|&u| char::from_u32(u)).collect()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.units
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Decode `bytes` in the named encoding.
///
/// Counts first, then allocates exactly `count + 1` units. Malformed input
/// yields an error and no partial buffer. Failures are also recorded for
/// [`textfmt_core::last_error`].
pub fn import(encoding: &str, bytes: &[u8]) -> Result<Ucs4Buffer, CodecError> {
    Encoding::from_name(encoding)
        .map_err(textfmt_core::record)?
        .import(bytes)
}

/// [`import`] for text already held in a `&str`.
pub fn import_str(encoding: &str, s: &str) -> Result<Ucs4Buffer, CodecError> {
    import(encoding, s.as_bytes())
}

/// Encode `units` (up to the first zero unit) into `dst`, NUL-terminated.
///
/// Returns the number of content bytes. A destination that cannot hold the
/// whole result plus terminator yields [`CodecError::Overflow`] and is left
/// untouched.
pub fn export(encoding: &str, units: &[u32], dst: &mut [u8]) -> Result<usize, CodecError> {
    Encoding::from_name(encoding)
        .map_err(textfmt_core::record)?
        .export(units, dst)
}

/// Encode `units` into a freshly allocated vector.
pub fn export_to_vec(encoding: &str, units: &[u32]) -> Result<Vec<u8>, CodecError> {
    Encoding::from_name(encoding)
        .map_err(textfmt_core::record)?
        .export_to_vec(units)
}
