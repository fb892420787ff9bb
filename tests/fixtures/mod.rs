//! Synthetic catalogues for integration tests.
//!
//! Lays out a dataset and a matching index with the crate's own node/table
//! codec, the same way the external index builder does: a header line that
//! is never indexed, then one line per track, each prepended to its bucket's
//! chain.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use trackseek::index::{BucketTable, ChainNode, END_OF_CHAIN, KeyHasher};
use trackseek::utils::SearchConfig;

static TRACING_INIT: Once = Once::new();

/// Install a test subscriber once per test binary
pub fn init_test_logging() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trackseek=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub const HEADER: &str =
    "album,album_id,release,artists,label,duration_ms,explicit,name,track_number,popularity\n";

#[derive(Debug, Clone)]
pub struct Track {
    pub album: String,
    pub artist: String,
    pub duration_ms: u64,
    pub song: String,
    pub popularity: u32,
}

impl Track {
    pub fn new(album: &str, artist: &str, duration_ms: u64, song: &str, popularity: u32) -> Self {
        Self {
            album: album.to_string(),
            artist: artist.to_string(),
            duration_ms,
            song: song.to_string(),
            popularity,
        }
    }

    /// One catalogue line, quoted the way the export quotes it. Album is
    /// column 1, artists 4, duration 6, song 8 and popularity 10.
    pub fn to_line(&self, id: usize) -> String {
        format!(
            "\"{}\",al{id},2001-01-01,\"[{{'artist_name': '{}', 'artist_id': 'ar{id}'}}]\",Label,{},false,\"{}\",{},{}\n",
            self.album.replace('"', "\"\""),
            self.artist,
            self.duration_ms,
            self.song.replace('"', "\"\""),
            id + 1,
            self.popularity
        )
    }
}

/// A dataset line with the album and artist bytes it is chained under
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub line: Vec<u8>,
    pub album: Vec<u8>,
    pub artist: Vec<u8>,
}

impl RawRecord {
    pub fn new(line: &[u8], album: &[u8], artist: &[u8]) -> Self {
        Self {
            line: line.to_vec(),
            album: album.to_vec(),
            artist: artist.to_vec(),
        }
    }
}

impl Track {
    fn to_raw(&self, id: usize) -> RawRecord {
        RawRecord::new(self.to_line(id).as_bytes(), self.album.as_bytes(), self.artist.as_bytes())
    }
}

/// A dataset + index pair living in a temp directory
pub struct Catalogue {
    pub dir: TempDir,
    pub config: SearchConfig,
}

impl Catalogue {
    /// Build a catalogue. With `forced_bucket`, every track is chained into
    /// that one bucket regardless of its key.
    pub fn build(tracks: &[Track], bucket_count: usize, forced_bucket: Option<usize>) -> Self {
        let records: Vec<RawRecord> = tracks
            .iter()
            .enumerate()
            .map(|(id, track)| track.to_raw(id))
            .collect();
        Self::build_raw(&records, bucket_count, forced_bucket)
    }

    /// Build a catalogue from lines given byte for byte
    pub fn build_raw(records: &[RawRecord], bucket_count: usize, forced_bucket: Option<usize>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = SearchConfig {
            index_path: dir.path().join("catalogue.index"),
            dataset_path: dir.path().join("catalogue.csv"),
            request_pipe: dir.path().join("ui_to_search"),
            response_pipe: dir.path().join("search_to_ui"),
            bucket_count,
            ..SearchConfig::default()
        };
        write_catalogue(&config, records, forced_bucket);
        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn write_catalogue(config: &SearchConfig, records: &[RawRecord], forced_bucket: Option<usize>) {
    let hasher = KeyHasher::new(config.bucket_count, config.max_key_len, config.key_signing);
    let table_bytes = (config.bucket_count * 8) as i64;

    let mut csv = HEADER.as_bytes().to_vec();
    let mut heads = vec![END_OF_CHAIN; config.bucket_count];
    let mut nodes = Vec::with_capacity(records.len());

    for record in records {
        let record_offset = csv.len() as i64;
        csv.extend_from_slice(&record.line);

        let bucket =
            forced_bucket.unwrap_or_else(|| hasher.bucket_for_pair(&record.album, &record.artist));
        let node_offset = table_bytes + (nodes.len() * ChainNode::SIZE) as i64;
        nodes.push(ChainNode::new(record_offset, heads[bucket]));
        heads[bucket] = node_offset;
    }

    let mut index = Vec::new();
    BucketTable::from_heads(heads).write_to(&mut index).unwrap();
    for node in &nodes {
        node.write_to(&mut index).unwrap();
    }
    fs::write(&config.index_path, index).unwrap();
    fs::write(&config.dataset_path, csv).unwrap();
}

/// The small catalogue most tests share
pub fn sample_tracks() -> Vec<Track> {
    vec![
        Track::new("Abbey Road", "The Beatles", 185_000, "Something", 80),
        Track::new("Abbey Road", "The Beatles", 0, "Her Majesty", 41),
        Track::new("A Night at the Opera", "Queen", 354_320, "Bohemian Rhapsody", 91),
        Track::new("Side A, Side B", "The Commas", 61_000, "Quote \"Me\"", 12),
        Track::new("Love Songs", "Crooner", 200_000, "I Love You", 55),
        Track::new("Love Songs", "Crooner", 210_000, "Goodbye", 30),
    ]
}
