pub mod chain;
pub mod hash;
pub mod reader;
pub mod stats;
pub mod types;

pub use chain::{ChainEnd, ChainWalker};
pub use hash::{KeyHasher, KeySigning};
pub use reader::SearchIndex;
pub use types::*;
