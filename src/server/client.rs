//! Front-end side of the pipe protocol

use crate::query::parser::Query;
use crate::server::is_fifo;
use crate::server::protocol::{Response, encode_request, read_response};
use crate::utils::SearchConfig;
use memchr::memmem;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long to wait for the server to come back to the request pipe
const DEFAULT_WAIT: Duration = Duration::from_secs(1);
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// No server is listening on the request pipe
    #[error("query server is not running (no reader on {})", .0.display())]
    NotRunning(PathBuf),

    /// A field contains the separator and would be split differently
    #[error("{0} contains the request separator")]
    InvalidQuery(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Sends queries to a running server
pub struct QueryClient {
    request_pipe: PathBuf,
    response_pipe: PathBuf,
    separator: char,
    wait: Duration,
}

impl QueryClient {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            request_pipe: config.request_pipe.clone(),
            response_pipe: config.response_pipe.clone(),
            separator: config.separator,
            wait: DEFAULT_WAIT,
        }
    }

    /// How long to keep retrying while no server is reading requests. A
    /// server that just answered needs a moment to reopen the pipe.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Send one query and wait for its answer.
    ///
    /// The request pipe is opened without blocking so a missing server is
    /// reported instead of hanging. Once the request is written, the response
    /// pipe is opened normally and read until the server closes it.
    pub fn send(&self, query: &Query) -> ClientResult<Response> {
        let mut sep_buf = [0u8; 4];
        let sep = self.separator.encode_utf8(&mut sep_buf).as_bytes();
        for (name, value) in [
            ("album", &query.album),
            ("artist", &query.artist),
            ("song", &query.song),
        ] {
            if memmem::find(value, sep).is_some() {
                return Err(ClientError::InvalidQuery(name));
            }
        }

        if !is_fifo(&self.request_pipe) || !is_fifo(&self.response_pipe) {
            return Err(ClientError::NotRunning(self.request_pipe.clone()));
        }

        let mut request = self.open_request_pipe()?;
        // Requests stay under PIPE_BUF, so this write is atomic
        request.write_all(&encode_request(query, self.separator))?;
        drop(request);

        let mut response = File::open(&self.response_pipe)?;
        Ok(read_response(&mut response)?)
    }

    fn open_request_pipe(&self) -> ClientResult<File> {
        let deadline = Instant::now() + self.wait;
        loop {
            match OpenOptions::new()
                .write(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&self.request_pipe)
            {
                Ok(f) => return Ok(f),
                // ENXIO: nobody has the pipe open for reading
                Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {
                    if Instant::now() >= deadline {
                        return Err(ClientError::NotRunning(self.request_pipe.clone()));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
