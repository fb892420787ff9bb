//! Query text parsing.
//!
//! A query is `album SEP artist [SEP song]`. Album and artist are required and
//! matched exactly; the song is an optional case-insensitive substring filter.
//! Fields after the song are ignored.

use memchr::memmem;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Why a query text was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("empty query")]
    Empty,
    #[error("album is required")]
    MissingAlbum,
    #[error("artist is required")]
    MissingArtist,
}

/// A validated lookup request.
///
/// Fields hold the bytes exactly as they came off the pipe. The index was
/// built by hashing raw catalogue bytes, so nothing is decoded before the
/// bucket is chosen and the album and artist are compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub album: Vec<u8>,
    pub artist: Vec<u8>,
    /// Empty means no song filter
    pub song: Vec<u8>,
}

impl Query {
    pub fn new(
        album: impl Into<Vec<u8>>,
        artist: impl Into<Vec<u8>>,
        song: impl Into<Vec<u8>>,
    ) -> Result<Self, QueryError> {
        let query = Self {
            album: album.into(),
            artist: artist.into(),
            song: song.into(),
        };
        if query.album.is_empty() {
            return Err(QueryError::MissingAlbum);
        }
        if query.artist.is_empty() {
            return Err(QueryError::MissingArtist);
        }
        Ok(query)
    }

    /// The song filter, if one was given
    pub fn song_filter(&self) -> Option<&[u8]> {
        (!self.song.is_empty()).then_some(self.song.as_slice())
    }

    pub fn album_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.album)
    }

    pub fn artist_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.artist)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.album_text(), self.artist_text())?;
        if let Some(song) = self.song_filter() {
            write!(f, " / {}", String::from_utf8_lossy(song))?;
        }
        Ok(())
    }
}

/// Split raw request bytes on `separator` into a query
pub fn parse_query(text: &[u8], separator: char) -> Result<Query, QueryError> {
    if text.is_empty() {
        return Err(QueryError::Empty);
    }

    let mut sep_buf = [0u8; 4];
    let sep = separator.encode_utf8(&mut sep_buf).as_bytes();

    // album, artist, song; anything after the song is ignored
    let mut fields: [&[u8]; 3] = [&[]; 3];
    let mut rest = Some(text);
    for slot in fields.iter_mut() {
        let Some(current) = rest else { break };
        match memmem::find(current, sep) {
            Some(at) => {
                *slot = &current[..at];
                rest = Some(&current[at + sep.len()..]);
            }
            None => {
                *slot = current;
                rest = None;
            }
        }
    }

    let [album, artist, song] = fields;
    Query::new(album, artist, song)
}
