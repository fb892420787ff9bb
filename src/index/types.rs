use crate::utils::{OFFSET_WORD, i64_at, read_i64_le, write_i64_le};
use std::io::{self, Read, Write};

/// Byte offset into the index file
pub type NodeOffset = u64;

/// Byte offset into the dataset file
pub type RecordOffset = u64;

/// Sentinel stored in empty buckets and in the last node of a chain
pub const END_OF_CHAIN: i64 = -1;

/// Bucket count the catalogue index is built with
pub const DEFAULT_BUCKET_COUNT: usize = 500_000;

/// One link of a bucket chain: `{ i64 record_offset; i64 next_node_offset }`, little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainNode {
    pub record_offset: i64,
    pub next_node_offset: i64,
}

impl ChainNode {
    /// Size of a chain node in bytes (fixed-size for seeking)
    pub const SIZE: usize = 2 * OFFSET_WORD;

    pub fn new(record_offset: i64, next_node_offset: i64) -> Self {
        Self {
            record_offset,
            next_node_offset,
        }
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let record_offset = read_i64_le(reader)?;
        let next_node_offset = read_i64_le(reader)?;
        Ok(Self::new(record_offset, next_node_offset))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_i64_le(writer, self.record_offset)?;
        write_i64_le(writer, self.next_node_offset)
    }

    pub fn is_last(&self) -> bool {
        self.next_node_offset == END_OF_CHAIN
    }
}

/// Shape of the index file shared with the index builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLayout {
    pub bucket_count: usize,
}

impl Default for IndexLayout {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

impl IndexLayout {
    pub fn new(bucket_count: usize) -> Self {
        Self { bucket_count }
    }

    /// Bytes occupied by the bucket table at the start of the file
    pub fn table_bytes(&self) -> u64 {
        (self.bucket_count * OFFSET_WORD) as u64
    }

    /// Offsets at which a complete node may live in a file of `index_len` bytes.
    pub fn node_bounds(&self, index_len: u64) -> NodeBounds {
        NodeBounds {
            start: self.table_bytes(),
            end: index_len,
        }
    }
}

/// Valid node placement: after the bucket table, fully inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeBounds {
    pub start: u64,
    pub end: u64,
}

impl NodeBounds {
    pub fn contains(&self, offset: i64) -> bool {
        if offset < 0 {
            return false;
        }
        let offset = offset as u64;
        offset >= self.start
            && offset
                .checked_add(ChainNode::SIZE as u64)
                .is_some_and(|end| end <= self.end)
    }
}

/// In-memory copy of the bucket heads. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct BucketTable {
    heads: Vec<i64>,
}

impl BucketTable {
    /// Decode `bucket_count` heads from the start of `bytes`.
    /// Returns `None` if `bytes` is shorter than the table.
    pub fn decode(bytes: &[u8], bucket_count: usize) -> Option<Self> {
        let heads = (0..bucket_count)
            .map(|i| i64_at(bytes, i * OFFSET_WORD))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { heads })
    }

    pub fn from_heads(heads: Vec<i64>) -> Self {
        Self { heads }
    }

    /// Serialize the table in index-file layout
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for &head in &self.heads {
            write_i64_le(writer, head)?;
        }
        Ok(())
    }

    /// Raw head of `bucket`; `None` for an empty bucket or an index past the table.
    pub fn head(&self, bucket: usize) -> Option<i64> {
        self.heads
            .get(bucket)
            .copied()
            .filter(|&h| h != END_OF_CHAIN)
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    pub fn occupied(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.heads
            .iter()
            .enumerate()
            .filter(|(_, h)| **h != END_OF_CHAIN)
            .map(|(i, h)| (i, *h))
    }
}
