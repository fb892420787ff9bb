//! Query parsing and execution.
//!
//! - [`parser`] turns request text into a validated [`Query`]
//! - [`executor`] walks the bucket chain for a query and collects matching records

pub mod executor;
pub mod parser;

pub use executor::{MatchSet, QueryExecutor, execute_query, record_matches};
pub use parser::{Query, QueryError, parse_query};
