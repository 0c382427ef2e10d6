//! One byte per code unit: US-ASCII, and with `system-encodings` ISO-8859-1
//! and Windows-1252.

#[cfg(feature = "system-encodings")]
/// Windows-1252 code points for bytes 0x80..=0x9F. The five bytes the code
/// page leaves undefined map to the C1 control with the same value so that
/// every byte survives a round trip.
const WIN1252_HIGH: [u32; 32] = [
    0x20ac, 0x0081, 0x201a, 0x0192, 0x201e, 0x2026, 0x2020, 0x2021, // 80-87
    0x02c6, 0x2030, 0x0160, 0x2039, 0x0152, 0x008d, 0x017d, 0x008f, // 88-8F
    0x0090, 0x2018, 0x2019, 0x201c, 0x201d, 0x2022, 0x2013, 0x2014, // 90-97
    0x02dc, 0x2122, 0x0161, 0x203a, 0x0153, 0x009d, 0x017e, 0x0178, // 98-9F
];

/// ASCII import widens every byte unchanged.
pub(crate) fn decode_ascii(bytes: &[u8], out: &mut Vec<u32>) {
    out.extend(bytes.iter().map(|&b| u32::from(b)));
}

pub(crate) fn encode_ascii(unit: u32) -> Option<u8> {
    (unit <= 0x7f).then_some(unit as u8)
}

#[cfg(feature = "system-encodings")]
pub(crate) fn encode_latin1(unit: u32) -> Option<u8> {
    u8::try_from(unit).ok()
}

#[cfg(feature = "system-encodings")]
pub(crate) fn decode_windows1252(bytes: &[u8], out: &mut Vec<u32>) {
    out.extend(bytes.iter().map(|&b| match b {
        0x80..=0x9f => WIN1252_HIGH[usize::from(b - 0x80)],
        _ => u32::from(b),
    }));
}

#[cfg(feature = "system-encodings")]
pub(crate) fn encode_windows1252(unit: u32) -> Option<u8> {
    match unit {
        0x00..=0x7f | 0xa0..=0xff => Some(unit as u8),
        _ => WIN1252_HIGH
            .iter()
            .position(|&cp| cp == unit)
            .map(|i| 0x80 + i as u8),
    }
}
