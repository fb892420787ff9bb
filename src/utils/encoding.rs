use std::io::{self, Read, Write};

/// Size of one on-disk offset word.
pub const OFFSET_WORD: usize = 8;

/// Decode a little-endian i64 at `pos`, or `None` if the slice is too short
#[inline]
pub fn i64_at(buf: &[u8], pos: usize) -> Option<i64> {
    let end = pos.checked_add(OFFSET_WORD)?;
    let bytes: [u8; OFFSET_WORD] = buf.get(pos..end)?.try_into().ok()?;
    Some(i64::from_le_bytes(bytes))
}

/// Write an i64 in little-endian format
pub fn write_i64_le<W: Write>(writer: &mut W, value: i64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read an i64 in little-endian format
pub fn read_i64_le<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; OFFSET_WORD];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// Parse the leading decimal integer of `text` the way `atol` does:
/// leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, and text without digits yields 0.
pub fn parse_leading_i64(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }

    if negative { -value } else { value }
}
