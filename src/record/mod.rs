//! Dataset record decoding.
//!
//! A record is one line of the catalogue file. Fields are comma separated and
//! may be double-quoted; the artist column holds a serialized mapping from
//! which the display name is pulled out.

pub mod artist;
pub mod extract;

pub use artist::{artist_name, decode_artist};
pub use extract::{FieldExtractor, extract_field};

/// 1-based positions of the catalogue columns the engine consumes.
pub mod columns {
    pub const ALBUM: usize = 1;
    pub const ARTIST: usize = 4;
    pub const DURATION_MS: usize = 6;
    pub const SONG: usize = 8;
    pub const POPULARITY: usize = 10;
}
