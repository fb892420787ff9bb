//! Bucket chain traversal.
//!
//! Chains are linked through file offsets rather than pointers, so every hop
//! is a seek + fixed-size read in the index file. The walker validates each
//! offset before following it and refuses to visit a node twice, which makes
//! any finite index file terminate even if the builder produced a cycle.

use crate::index::types::{ChainNode, END_OF_CHAIN, NodeBounds, NodeOffset};
use rustc_hash::FxHashSet;
use std::io::{Read, Seek, SeekFrom};

/// Why a chain walk stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEnd {
    /// Reached the `-1` sentinel
    Complete,
    /// A `next` pointer led back to an already visited node
    Cycle { offset: NodeOffset },
    /// A pointer was negative, inside the bucket table, or past end of file
    OutOfRange { offset: i64 },
    /// The node could not be read
    Unreadable { offset: NodeOffset, error: String },
}

impl ChainEnd {
    pub fn is_complete(&self) -> bool {
        matches!(self, ChainEnd::Complete)
    }
}

/// Iterator over the nodes of one bucket chain.
pub struct ChainWalker<R> {
    file: R,
    bounds: NodeBounds,
    next: i64,
    visited: FxHashSet<NodeOffset>,
    end: Option<ChainEnd>,
}

impl<R: Read + Seek> ChainWalker<R> {
    /// Start a walk at `head` (a raw bucket head, `-1` for an empty bucket).
    pub fn new(file: R, bounds: NodeBounds, head: i64) -> Self {
        Self {
            file,
            bounds,
            next: head,
            visited: FxHashSet::default(),
            end: None,
        }
    }

    /// How the walk ended, once the iterator is exhausted
    pub fn end(&self) -> Option<&ChainEnd> {
        self.end.as_ref()
    }

    /// Number of nodes read so far
    pub fn visited(&self) -> usize {
        self.visited.len()
    }

    fn read_node(&mut self, offset: NodeOffset) -> std::io::Result<ChainNode> {
        self.file.seek(SeekFrom::Start(offset))?;
        ChainNode::read_from(&mut self.file)
    }
}

impl<R: Read + Seek> Iterator for ChainWalker<R> {
    type Item = ChainNode;

    fn next(&mut self) -> Option<ChainNode> {
        if self.end.is_some() {
            return None;
        }

        let offset = self.next;
        if offset == END_OF_CHAIN {
            self.end = Some(ChainEnd::Complete);
            return None;
        }
        if !self.bounds.contains(offset) {
            self.end = Some(ChainEnd::OutOfRange { offset });
            return None;
        }

        let offset = offset as NodeOffset;
        if !self.visited.insert(offset) {
            self.end = Some(ChainEnd::Cycle { offset });
            return None;
        }

        match self.read_node(offset) {
            Ok(node) => {
                self.next = node.next_node_offset;
                Some(node)
            }
            Err(e) => {
                self.end = Some(ChainEnd::Unreadable {
                    offset,
                    error: e.to_string(),
                });
                None
            }
        }
    }
}
