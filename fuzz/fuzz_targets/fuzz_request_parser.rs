#![no_main]

use libfuzzer_sys::fuzz_target;
use trackseek::server::protocol::{decode_request, encode_request};

fuzz_target!(|data: &[u8]| {
    if let Ok(query) = decode_request(data, '|') {
        assert!(!query.album.is_empty());
        assert!(!query.artist.is_empty());

        // A trailing line break on the last field is eaten by the decoder,
        // anything else must survive the wire format unchanged
        let last = query.song_filter().unwrap_or(query.artist.as_slice());
        if !last.ends_with(b"\n") {
            let again = decode_request(&encode_request(&query, '|'), '|').unwrap();
            assert_eq!(again, query);
        }
    }
});
