//! # trackseek - hash-chain lookups over a track catalogue
//!
//! trackseek answers "which tracks are on this album by this artist?" against a
//! large comma-separated catalogue without loading it. A prebuilt index file
//! maps `album|artist` to a chain of record offsets; only the chain for the
//! queried bucket and its candidate records are ever read.
//!
//! ## Architecture
//!
//! - [`index`] - Bucket table, djb2 key hashing, and chain traversal
//! - [`record`] - Quoted-CSV field extraction and artist decoding
//! - [`query`] - Query parsing and the match engine
//! - [`output`] - Result blocks and the bounded response buffer
//! - [`server`] - Named-pipe query server and client
//! - [`utils`] - Configuration and shared helpers
//!
//! ## Quick Start
//!
//! ```ignore
//! use trackseek::index::SearchIndex;
//! use trackseek::query::{Query, QueryExecutor};
//! use trackseek::utils::SearchConfig;
//!
//! let config = SearchConfig::default();
//! let index = SearchIndex::open(&config).unwrap();
//!
//! let query = Query::new("Abbey Road", "The Beatles", "").unwrap();
//! let matches = QueryExecutor::new(&index, &config).execute(&query);
//! println!("{}", matches.results.as_str());
//! ```
//!
//! ## On-disk layout
//!
//! The index file starts with one little-endian `i64` chain head per bucket
//! (`-1` for an empty bucket), followed by 16-byte chain nodes holding a
//! record offset into the dataset and the offset of the next node.

pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod record;
pub mod server;
pub mod utils;
