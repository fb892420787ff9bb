use crate::error::SearchError;
use crate::index::chain::ChainWalker;
use crate::index::hash::KeyHasher;
use crate::index::types::*;
use crate::utils::SearchConfig;
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Read-only view of the catalogue index: the in-memory bucket table plus
/// the locations of the two files it points into.
///
/// The bucket table is loaded once and never mutated. Chain nodes and
/// records stay on disk and are read through fresh handles per query.
pub struct SearchIndex {
    index_path: PathBuf,
    dataset_path: PathBuf,
    layout: IndexLayout,
    hasher: KeyHasher,
    buckets: BucketTable,
    index_len: u64,
    dataset_len: u64,
}

impl SearchIndex {
    /// Validate `config`, load the bucket table and check that both files
    /// are usable.
    pub fn open(config: &SearchConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let layout = IndexLayout::new(config.bucket_count);
        let hasher = KeyHasher::new(config.bucket_count, config.max_key_len, config.key_signing);

        let index_file = File::open(&config.index_path)
            .with_context(|| format!("Failed to open index {}", config.index_path.display()))?;
        let index_len = index_file.metadata()?.len();
        if index_len < layout.table_bytes() {
            return Err(SearchError::TableTooShort {
                expected: layout.table_bytes(),
                actual: index_len,
            })
            .with_context(|| format!("{} does not match the bucket layout", config.index_path.display()));
        }

        // The file is only read during this call; the decoded copy outlives the map.
        let map = unsafe { Mmap::map(&index_file)? };
        let buckets = BucketTable::decode(&map, layout.bucket_count).ok_or(
            SearchError::TableTooShort {
                expected: layout.table_bytes(),
                actual: map.len() as u64,
            },
        )?;
        drop(map);

        let dataset_file = File::open(&config.dataset_path)
            .with_context(|| format!("Failed to open dataset {}", config.dataset_path.display()))?;
        let dataset_len = dataset_file.metadata()?.len();

        let index = Self {
            index_path: config.index_path.clone(),
            dataset_path: config.dataset_path.clone(),
            layout,
            hasher,
            buckets,
            index_len,
            dataset_len,
        };

        let bounds = index.node_bounds();
        let occupied = index.buckets.occupied().count();
        let invalid = index
            .buckets
            .occupied()
            .filter(|(_, head)| !bounds.contains(*head))
            .count();
        if invalid > 0 {
            warn!(
                invalid,
                "bucket heads point outside the node area; those buckets will read as empty"
            );
        }
        info!(
            buckets = layout.bucket_count,
            occupied,
            index_bytes = index_len,
            dataset_bytes = dataset_len,
            "loaded index {}",
            index.index_path.display()
        );

        Ok(index)
    }

    /// Raw chain head for the bucket `(album, artist)` hashes to
    pub fn chain_head(&self, album: &[u8], artist: &[u8]) -> Option<i64> {
        self.buckets.head(self.hasher.bucket_for_pair(album, artist))
    }

    /// Open the index file and start walking the chain at `head`.
    pub fn walk(&self, head: i64) -> io::Result<ChainWalker<BufReader<File>>> {
        let file = File::open(&self.index_path)?;
        Ok(ChainWalker::new(
            BufReader::with_capacity(ChainNode::SIZE * 4, file),
            self.node_bounds(),
            head,
        ))
    }

    /// Open the dataset for record reads
    pub fn open_dataset(&self) -> io::Result<File> {
        File::open(&self.dataset_path)
    }

    /// Whether `offset` can start a record in the dataset
    pub fn record_in_range(&self, offset: i64) -> bool {
        offset >= 0 && (offset as u64) < self.dataset_len
    }

    pub fn node_bounds(&self) -> NodeBounds {
        self.layout.node_bounds(self.index_len)
    }

    pub fn buckets(&self) -> &BucketTable {
        &self.buckets
    }

    pub fn layout(&self) -> IndexLayout {
        self.layout
    }

    pub fn hasher(&self) -> &KeyHasher {
        &self.hasher
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn index_len(&self) -> u64 {
        self.index_len
    }

    pub fn dataset_len(&self) -> u64 {
        self.dataset_len
    }
}
