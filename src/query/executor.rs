//! Match engine
//!
//! For a query, hash `album|artist` to a bucket, walk that bucket's chain,
//! and load each candidate record from the dataset. A candidate matches when
//! its album and decoded artist equal the query's byte for byte; with a song filter
//! the song title must also contain the filter, ignoring case. Hash
//! collisions are therefore harmless: they only cost extra candidate reads.

use crate::index::chain::ChainEnd;
use crate::index::reader::SearchIndex;
use crate::output::{RecordFormatter, ResultBuffer};
use crate::query::parser::Query;
use crate::record::{FieldExtractor, artist_name, columns};
use crate::server::protocol::Response;
use crate::utils::SearchConfig;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Outcome of one query
#[derive(Debug)]
pub struct MatchSet {
    pub results: ResultBuffer,
    /// Records that satisfied the query
    pub matches: usize,
    /// Chain nodes visited
    pub candidates: usize,
    /// Candidates whose record could not be loaded
    pub skipped: usize,
    pub chain_end: ChainEnd,
}

impl MatchSet {
    fn empty(capacity: usize, chain_end: ChainEnd) -> Self {
        Self {
            results: ResultBuffer::new(capacity),
            matches: 0,
            candidates: 0,
            skipped: 0,
            chain_end,
        }
    }

    /// The wire answer: the formatted blocks, or not-found for zero matches
    pub fn into_response(self) -> Response {
        if self.matches == 0 {
            Response::NotFound
        } else {
            Response::Matches(self.results.into_string())
        }
    }
}

/// Decide whether a raw record satisfies `query`
pub fn record_matches(extractor: &FieldExtractor, record: &[u8], query: &Query) -> bool {
    let Some(album) = extractor.field_bytes(record, columns::ALBUM) else {
        return false;
    };
    if album != query.album {
        return false;
    }

    let Some(raw_artist) = extractor.field_bytes(record, columns::ARTIST) else {
        return false;
    };
    if artist_name(&raw_artist) != query.artist.as_slice() {
        return false;
    }

    match query.song_filter() {
        None => true,
        Some(filter) => extractor
            .field_bytes(record, columns::SONG)
            .is_some_and(|song| contains_ignore_case(&song, filter)),
    }
}

/// Case-insensitive substring test used for the song filter
fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    String::from_utf8_lossy(haystack)
        .to_lowercase()
        .contains(&String::from_utf8_lossy(needle).to_lowercase())
}

/// Runs queries against a [`SearchIndex`]
pub struct QueryExecutor<'a> {
    index: &'a SearchIndex,
    extractor: FieldExtractor,
    formatter: RecordFormatter,
    max_record_len: usize,
    response_capacity: usize,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(index: &'a SearchIndex, config: &SearchConfig) -> Self {
        let extractor = FieldExtractor::new(config.max_field_len);
        Self {
            index,
            extractor,
            formatter: RecordFormatter::new(extractor),
            max_record_len: config.max_record_len,
            // One byte of the response buffer is the terminator
            response_capacity: config.max_response_len.saturating_sub(1),
        }
    }

    /// Execute a query. Never fails: file problems end or thin out the
    /// chain walk and are logged, and the caller still gets an answer.
    pub fn execute(&self, query: &Query) -> MatchSet {
        let Some(head) = self.index.chain_head(&query.album, &query.artist) else {
            debug!(%query, "empty bucket");
            return MatchSet::empty(self.response_capacity, ChainEnd::Complete);
        };

        let mut walker = match self.index.walk(head) {
            Ok(w) => w,
            Err(e) => {
                warn!("cannot open index for chain walk: {}", e);
                return MatchSet::empty(
                    self.response_capacity,
                    ChainEnd::Unreadable {
                        offset: head.max(0) as u64,
                        error: e.to_string(),
                    },
                );
            }
        };
        let mut dataset = match self.index.open_dataset() {
            Ok(f) => BufReader::new(f),
            Err(e) => {
                warn!("cannot open dataset: {}", e);
                return MatchSet::empty(
                    self.response_capacity,
                    ChainEnd::Unreadable {
                        offset: head.max(0) as u64,
                        error: e.to_string(),
                    },
                );
            }
        };

        let mut set = MatchSet::empty(self.response_capacity, ChainEnd::Complete);

        for node in walker.by_ref() {
            set.candidates += 1;

            if !self.index.record_in_range(node.record_offset) {
                warn!(offset = node.record_offset, "record offset outside dataset, skipping");
                set.skipped += 1;
                continue;
            }

            let record = match self.read_record(&mut dataset, node.record_offset as u64) {
                Ok(Some(r)) => r,
                Ok(None) => {
                    warn!(offset = node.record_offset, "empty record, skipping");
                    set.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(offset = node.record_offset, "unreadable record, skipping: {}", e);
                    set.skipped += 1;
                    continue;
                }
            };

            if record_matches(&self.extractor, &record, query) {
                set.matches += 1;
                set.results
                    .push_block(&self.formatter.format(&String::from_utf8_lossy(&record)));
            }
        }

        set.chain_end = walker.end().cloned().unwrap_or(ChainEnd::Complete);
        match &set.chain_end {
            ChainEnd::Complete => {}
            ChainEnd::Cycle { offset } => {
                warn!(offset, "chain loops back onto a visited node, stopping walk")
            }
            ChainEnd::OutOfRange { offset } => {
                warn!(offset, "chain pointer outside the node area, stopping walk")
            }
            ChainEnd::Unreadable { offset, error } => {
                warn!(offset, "chain node unreadable, stopping walk: {}", error)
            }
        }

        if set.results.truncated() {
            warn!(
                matches = set.matches,
                kept = set.results.blocks(),
                dropped = set.results.dropped_blocks(),
                capacity = self.response_capacity,
                "response truncated"
            );
        }

        debug!(
            candidates = set.candidates,
            matches = set.matches,
            skipped = set.skipped,
            "query executed"
        );
        set
    }

    /// Read the line starting at `offset`, at most `max_record_len - 1`
    /// bytes. Returns `None` at end of file.
    fn read_record<R: Read + Seek>(
        &self,
        dataset: &mut BufReader<R>,
        offset: u64,
    ) -> io::Result<Option<Vec<u8>>> {
        dataset.seek(SeekFrom::Start(offset))?;

        let limit = self.max_record_len.saturating_sub(1) as u64;
        let mut buf = Vec::new();
        let read = dataset.by_ref().take(limit).read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(buf))
    }
}

/// Run one query and turn the outcome into a wire answer
pub fn execute_query(index: &SearchIndex, config: &SearchConfig, query: &Query) -> Response {
    QueryExecutor::new(index, config).execute(query).into_response()
}
