#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trackseek::record::{FieldExtractor, artist_name, decode_artist};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    record: &'a str,
    index: u8,
    max_field_len: u16,
}

fuzz_target!(|input: Input| {
    let extractor = FieldExtractor::new(input.max_field_len as usize);
    if let Some(field) = extractor.field(input.record, input.index as usize) {
        // Cap keeps one byte in reserve
        assert!(field.len() < (input.max_field_len as usize).max(1));
        let _ = decode_artist(&field);
    }

    // Same cap on the undecoded path
    if let Some(raw) = extractor.field_bytes(input.record.as_bytes(), input.index as usize) {
        assert!(raw.len() < (input.max_field_len as usize).max(1));
        let name = artist_name(&raw);
        assert!(name.len() <= raw.len());
    }
});
