//! Query server loop
//!
//! Keeps the bucket table in memory and answers requests from the request
//! pipe one at a time.

use crate::index::reader::SearchIndex;
use crate::query::executor::QueryExecutor;
use crate::query::parser::Query;
use crate::server::protocol::{Response, decode_request, read_request, write_response};
use crate::server::{FifoGuard, ShutdownHandle, ensure_fifo, install_signal_handlers};
use crate::utils::SearchConfig;
use anyhow::{Context, Result};
use lru::LruCache;
use std::fs::{File, OpenOptions};
use std::io;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Counters for one server run
#[derive(Debug, Clone)]
pub struct ServerStats {
    start_time: Instant,
    pub queries_served: u64,
    pub requests_dropped: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            queries_served: 0,
            requests_dropped: 0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }
}

impl ServerStats {
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn cache_hit_rate(&self) -> f32 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f32 / total as f32
        }
    }
}

/// Where the server loop is
#[derive(Debug)]
enum ServerState {
    /// Parked on the request pipe
    AwaitRequest,
    /// A valid query is in hand and must be answered
    ServeAndRespond(Query),
    Stopped,
}

/// The named-pipe query server
pub struct QueryServer {
    config: SearchConfig,
    index: SearchIndex,
    cache: Option<LruCache<Query, Response>>,
    stats: ServerStats,
}

impl QueryServer {
    pub fn new(config: SearchConfig, index: SearchIndex) -> Self {
        let cache = NonZeroUsize::new(config.cache_size).map(LruCache::new);
        Self {
            config,
            index,
            cache,
            stats: ServerStats::default(),
        }
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Serve requests until `shutdown` is triggered.
    ///
    /// Both pipes must already exist. Failing to open the request pipe is
    /// fatal; everything that goes wrong with a single request is logged and
    /// the loop carries on.
    pub fn run(&mut self, shutdown: &ShutdownHandle) -> Result<()> {
        info!(
            "serving requests on {}, answering on {}",
            self.config.request_pipe.display(),
            self.config.response_pipe.display()
        );

        let mut state = ServerState::AwaitRequest;
        let outcome = loop {
            state = match state {
                ServerState::AwaitRequest => match self.await_request(shutdown) {
                    Ok(next) => next,
                    Err(e) => break Err(e),
                },
                ServerState::ServeAndRespond(query) => {
                    self.serve_and_respond(&query);
                    ServerState::AwaitRequest
                }
                ServerState::Stopped => break Ok(()),
            };
        };

        shutdown.mark_stopped();
        info!(
            queries = self.stats.queries_served,
            dropped = self.stats.requests_dropped,
            cache_hits = self.stats.cache_hits,
            cache_misses = self.stats.cache_misses,
            uptime_secs = self.stats.uptime().as_secs(),
            "server stopped"
        );
        outcome
    }

    fn await_request(&mut self, shutdown: &ShutdownHandle) -> Result<ServerState> {
        if shutdown.is_requested() {
            return Ok(ServerState::Stopped);
        }

        let mut pipe = open_retrying(|| File::open(&self.config.request_pipe)).with_context(|| {
            format!(
                "Failed to open request pipe {}",
                self.config.request_pipe.display()
            )
        })?;
        let bytes = read_request(&mut pipe, self.config.max_request_len);
        drop(pipe);

        let bytes = match bytes {
            Ok(b) => b,
            Err(e) => {
                warn!("failed to read request: {}", e);
                return Ok(ServerState::AwaitRequest);
            }
        };

        if bytes.is_empty() {
            if shutdown.is_requested() {
                return Ok(ServerState::Stopped);
            }
            debug!("writer closed without a request");
            return Ok(ServerState::AwaitRequest);
        }

        match decode_request(&bytes, self.config.separator) {
            Ok(query) => {
                debug!(%query, "request");
                Ok(ServerState::ServeAndRespond(query))
            }
            Err(e) => {
                self.stats.requests_dropped += 1;
                warn!("dropping request without response: {}", e);
                Ok(ServerState::AwaitRequest)
            }
        }
    }

    fn serve_and_respond(&mut self, query: &Query) {
        let response = self.lookup(query);

        let written = open_retrying(|| {
            OpenOptions::new()
                .write(true)
                .open(&self.config.response_pipe)
        })
        .and_then(|mut pipe| write_response(&mut pipe, &response));

        match written {
            Ok(()) => self.stats.queries_served += 1,
            Err(e) => warn!("failed to deliver response: {}", e),
        }
    }

    /// Answer a query, from the cache when possible
    pub fn lookup(&mut self, query: &Query) -> Response {
        if let Some(cache) = self.cache.as_mut()
            && let Some(cached) = cache.get(query)
        {
            self.stats.cache_hits += 1;
            return cached.clone();
        }

        let response = QueryExecutor::new(&self.index, &self.config)
            .execute(query)
            .into_response();

        if let Some(cache) = self.cache.as_mut() {
            self.stats.cache_misses += 1;
            cache.put(query.clone(), response.clone());
        }
        response
    }
}

/// Retry an open that a signal interrupted
fn open_retrying<T>(mut open: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match open() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Load the index, set up the pipes and serve until SIGINT/SIGTERM.
/// The config is validated when the index is opened.
pub fn run_foreground(config: SearchConfig) -> Result<()> {
    let index = SearchIndex::open(&config)?;

    let mut pipes = Vec::new();
    for path in [&config.request_pipe, &config.response_pipe] {
        ensure_fifo(path).with_context(|| format!("Failed to create pipe {}", path.display()))?;
        pipes.push(path.clone());
    }
    let _guard = FifoGuard::new(pipes);

    let shutdown = ShutdownHandle::new(&config.request_pipe, &config.response_pipe);
    install_signal_handlers(shutdown.clone()).context("Failed to install signal handlers")?;

    QueryServer::new(config, index).run(&shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{BucketTable, ChainNode, END_OF_CHAIN};
    use std::fs;

    fn server_with_cache(dir: &std::path::Path, cache_size: usize) -> QueryServer {
        let config = SearchConfig {
            index_path: dir.join("s.index"),
            dataset_path: dir.join("s.csv"),
            request_pipe: dir.join("req"),
            response_pipe: dir.join("resp"),
            bucket_count: 1,
            cache_size,
            ..SearchConfig::default()
        };
        let mut buf = Vec::new();
        BucketTable::from_heads(vec![8]).write_to(&mut buf).unwrap();
        ChainNode::new(0, END_OF_CHAIN).write_to(&mut buf).unwrap();
        fs::write(&config.index_path, buf).unwrap();
        fs::write(
            &config.dataset_path,
            "Album,x,y,\"[{'artist_name': 'Artist'}]\",z,60000,w,Song,v,1\n",
        )
        .unwrap();
        let index = SearchIndex::open(&config).unwrap();
        QueryServer::new(config, index)
    }

    #[test]
    fn test_lookup_counts_cache_hits() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server_with_cache(dir.path(), 4);
        let q = Query::new("Album", "Artist", "").unwrap();

        let first = server.lookup(&q);
        let second = server.lookup(&q);
        assert_eq!(first, second);
        assert!(matches!(first, Response::Matches(_)));
        assert_eq!(server.stats().cache_misses, 1);
        assert_eq!(server.stats().cache_hits, 1);
        assert!((server.stats().cache_hit_rate() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_lookup_without_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server_with_cache(dir.path(), 0);
        let q = Query::new("Nope", "Artist", "").unwrap();
        assert_eq!(server.lookup(&q), Response::NotFound);
        assert_eq!(server.lookup(&q), Response::NotFound);
        assert_eq!(server.stats().cache_hits, 0);
        assert_eq!(server.stats().cache_misses, 0);
    }

    #[test]
    fn test_foreground_rejects_invalid_config_before_creating_pipes() {
        let dir = tempfile::tempdir().unwrap();
        let config = SearchConfig {
            index_path: dir.path().join("s.index"),
            dataset_path: dir.path().join("s.csv"),
            request_pipe: dir.path().join("req"),
            response_pipe: dir.path().join("resp"),
            bucket_count: 0,
            ..SearchConfig::default()
        };

        let err = run_foreground(config).unwrap_err();
        assert!(format!("{err:#}").contains("bucket_count"));
        assert!(!dir.path().join("req").exists());
        assert!(!dir.path().join("resp").exists());
    }

    #[test]
    fn test_stopped_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server_with_cache(dir.path(), 0);
        let handle = ShutdownHandle::new(dir.path().join("req"), dir.path().join("resp"));
        handle.mark_stopped();
        handle.trigger();
        server.run(&handle).unwrap();
        assert!(handle.is_stopped());
    }
}
