//! Quoted-CSV field extraction for a single record.

/// Default per-field buffer size; one byte is reserved, so fields keep at
/// most `DEFAULT_MAX_FIELD_LEN - 1` bytes.
pub const DEFAULT_MAX_FIELD_LEN: usize = 8192;

/// Pulls individual fields out of a comma-separated record.
#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor {
    max_field_len: usize,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FIELD_LEN)
    }
}

impl FieldExtractor {
    pub fn new(max_field_len: usize) -> Self {
        Self { max_field_len }
    }

    /// Return field `index` (1-based) of `record`, or `None` when the record
    /// has fewer fields.
    ///
    /// A `"` toggles quoting unless the next character is also `"`; that pair
    /// stands for one literal quote and leaves the quoting state alone. The
    /// exception is a field that is exactly `""`, which is empty. Commas
    /// inside quotes belong to the field. A trailing line break on the last
    /// field is dropped. Bytes past the field cap are discarded silently.
    pub fn field(&self, record: &str, index: usize) -> Option<String> {
        self.field_bytes(record.as_bytes(), index).map(into_string)
    }

    /// Byte-level [`FieldExtractor::field`]. Nothing is decoded, and the cap
    /// may split a multi-byte character.
    pub fn field_bytes(&self, record: &[u8], index: usize) -> Option<Vec<u8>> {
        if index == 0 {
            return None;
        }

        let bytes = record;
        let cap = self.max_field_len.saturating_sub(1);
        let mut current = 1usize;
        let mut field_start = 0usize;
        let mut in_quotes = false;
        let mut out: Vec<u8> = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'"' if bytes.get(i + 1) == Some(&b'"') => {
                    let empty_field = i == field_start
                        && matches!(bytes.get(i + 2), None | Some(b',' | b'\n' | b'\r'));
                    if !empty_field && current == index && out.len() < cap {
                        out.push(b'"');
                    }
                    i += 2;
                    continue;
                }
                b'"' => in_quotes = !in_quotes,
                b',' if !in_quotes => {
                    if current == index {
                        return Some(out);
                    }
                    current += 1;
                    field_start = i + 1;
                }
                _ => {
                    if current == index && out.len() < cap {
                        out.push(b);
                    }
                }
            }
            i += 1;
        }

        if current != index {
            return None;
        }

        if out.last() == Some(&b'\n') {
            out.pop();
            if out.last() == Some(&b'\r') {
                out.pop();
            }
        }
        Some(out)
    }
}

/// Extract a field with the default field cap.
pub fn extract_field(record: &str, index: usize) -> Option<String> {
    FieldExtractor::default().field(record, index)
}

/// Quotes are ASCII, so dropping them keeps the bytes valid UTF-8; only the
/// cap can split a character, and that partial tail is cut off here.
fn into_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let valid = e.utf8_error().valid_up_to();
            let mut bytes = e.into_bytes();
            bytes.truncate(valid);
            String::from_utf8(bytes).unwrap_or_default()
        }
    }
}
