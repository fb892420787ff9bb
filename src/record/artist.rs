//! Artist name decoding from the serialized artist mapping column.

use memchr::{memchr, memmem};

const SINGLE_QUOTED: &str = "'artist_name': '";
const DOUBLE_QUOTED: &str = "'artist_name': \"";

/// Return the raw `artist_name` value embedded in `raw`, or all of `raw`
/// when there is no such key (or its value is unterminated).
///
/// Values are normally single-quoted. Names containing an apostrophe are
/// serialized with double quotes instead, so that form is accepted too.
pub fn artist_name(raw: &[u8]) -> &[u8] {
    let single = memmem::find(raw, SINGLE_QUOTED.as_bytes());
    let double = memmem::find(raw, DOUBLE_QUOTED.as_bytes());

    let (start, close) = match (single, double) {
        (Some(s), Some(d)) if d < s => (d + DOUBLE_QUOTED.len(), b'"'),
        (Some(s), _) => (s + SINGLE_QUOTED.len(), b'\''),
        (None, Some(d)) => (d + DOUBLE_QUOTED.len(), b'"'),
        (None, None) => return raw,
    };

    match memchr(close, &raw[start..]) {
        Some(len) => &raw[start..start + len],
        None => raw,
    }
}

/// Display form of [`artist_name`]
pub fn decode_artist(raw: &str) -> String {
    // The markers are ASCII, so the slice stays on character boundaries
    String::from_utf8_lossy(artist_name(raw.as_bytes())).into_owned()
}
