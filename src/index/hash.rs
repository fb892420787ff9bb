//! Composite-key hashing.
//!
//! Buckets are chosen with djb2 (`hash * 33 + byte`, seed 5381) over the bytes
//! of `album|artist`, reduced modulo the bucket count. The function has to
//! agree bit-for-bit with the one the index was built with, including how
//! bytes above 0x7F are widened.

use serde::{Deserialize, Serialize};

/// djb2 seed
pub const DJB2_SEED: u64 = 5381;

/// Separator between album and artist inside the composite key
pub const KEY_SEPARATOR: u8 = b'|';

/// Default composite key buffer; keys keep at most `DEFAULT_MAX_KEY_LEN - 1` bytes.
pub const DEFAULT_MAX_KEY_LEN: usize = 512;

/// How key bytes are widened before being added to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySigning {
    /// Bytes are sign-extended (builders compiled where `char` is signed)
    #[default]
    Signed,
    /// Bytes are zero-extended
    Unsigned,
}

/// djb2 over raw bytes with 64-bit wrapping arithmetic
#[inline]
pub fn djb2(bytes: &[u8], signing: KeySigning) -> u64 {
    bytes.iter().fold(DJB2_SEED, |hash, &b| {
        let widened = match signing {
            KeySigning::Signed => b as i8 as i64 as u64,
            KeySigning::Unsigned => b as u64,
        };
        hash.wrapping_mul(33).wrapping_add(widened)
    })
}

/// Maps `(album, artist)` pairs to bucket indexes.
#[derive(Debug, Clone, Copy)]
pub struct KeyHasher {
    bucket_count: usize,
    max_key_len: usize,
    signing: KeySigning,
}

impl KeyHasher {
    pub fn new(bucket_count: usize, max_key_len: usize, signing: KeySigning) -> Self {
        Self {
            bucket_count,
            max_key_len,
            signing,
        }
    }

    /// Build the composite key from raw field bytes, truncated to the key
    /// buffer size. Nothing is decoded: the builder hashed the bytes as they
    /// appear in the catalogue.
    pub fn composite_key(&self, album: impl AsRef<[u8]>, artist: impl AsRef<[u8]>) -> Vec<u8> {
        let (album, artist) = (album.as_ref(), artist.as_ref());
        let mut key = Vec::with_capacity(album.len() + artist.len() + 1);
        key.extend_from_slice(album);
        key.push(KEY_SEPARATOR);
        key.extend_from_slice(artist);
        key.truncate(self.max_key_len.saturating_sub(1));
        key
    }

    /// Bucket index in `[0, bucket_count)` for a composite key
    pub fn bucket_for(&self, key: &[u8]) -> usize {
        (djb2(key, self.signing) % self.bucket_count as u64) as usize
    }

    pub fn bucket_for_pair(&self, album: impl AsRef<[u8]>, artist: impl AsRef<[u8]>) -> usize {
        self.bucket_for(&self.composite_key(album, artist))
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }
}
