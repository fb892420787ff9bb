//! Named-pipe query server
//!
//! The front-end and the engine talk through two FIFOs:
//! - the request pipe carries one `album|artist|song` line per query
//! - the response pipe carries the formatted answer, NUL terminated
//!
//! Blocking opens on the FIFOs are the handshake: the server parks in `open`
//! until the other side shows up, so there is no polling anywhere.

mod client;
pub mod daemon;
pub mod protocol;

pub use client::{ClientError, QueryClient};
pub use daemon::{QueryServer, ServerStats, run_foreground};
pub use protocol::Response;

use crate::error::{Result, SearchError};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::ffi::CString;
use std::fs::{self, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Permissions for newly created pipes (before umask)
const FIFO_MODE: libc::mode_t = 0o666;

/// How often and how long a shutdown keeps poking the pipes
const WAKE_INTERVAL: Duration = Duration::from_millis(20);
const WAKE_ATTEMPTS: usize = 100;

/// Whether `path` names an existing FIFO
pub fn is_fifo(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_fifo())
        .unwrap_or(false)
}

/// Create a FIFO at `path` unless one is already there.
///
/// Returns `true` if the pipe was created by this call. Any other kind of
/// file at the path is an error.
pub fn ensure_fifo(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => return Ok(false),
        Ok(_) => return Err(SearchError::NotAFifo(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), FIFO_MODE) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        // Lost a race with another creator
        if err.kind() == io::ErrorKind::AlreadyExists && is_fifo(path) {
            return Ok(false);
        }
        return Err(err.into());
    }

    debug!("created pipe {}", path.display());
    Ok(true)
}

/// Removes the pipes when the server goes away
pub struct FifoGuard {
    paths: Vec<PathBuf>,
}

impl FifoGuard {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
}

impl Drop for FifoGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match fs::remove_file(path) {
                Ok(()) => debug!("removed pipe {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove pipe {}: {}", path.display(), e),
            }
        }
    }
}

struct ShutdownState {
    requested: AtomicBool,
    stopped: AtomicBool,
    request_pipe: PathBuf,
    response_pipe: PathBuf,
}

/// Cloneable stop switch for a running [`QueryServer`]
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<ShutdownState>,
}

impl ShutdownHandle {
    pub fn new(request_pipe: impl Into<PathBuf>, response_pipe: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ShutdownState {
                requested: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                request_pipe: request_pipe.into(),
                response_pipe: response_pipe.into(),
            }),
        }
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Called by the server once its loop has exited
    pub(crate) fn mark_stopped(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
    }

    /// Ask the server to stop, and keep waking it until it does.
    ///
    /// The server may be parked in either FIFO open. Opening the opposite end
    /// without blocking releases it; if nobody is parked yet the open fails
    /// and is retried a little later.
    pub fn trigger(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);

        for _ in 0..WAKE_ATTEMPTS {
            if self.is_stopped() {
                return;
            }
            self.wake();
            thread::sleep(WAKE_INTERVAL);
        }
        if !self.is_stopped() {
            warn!("server did not acknowledge shutdown");
        }
    }

    fn wake(&self) {
        // Writer end: unblocks a server waiting for a request. Fails with
        // ENXIO when no reader is parked, which is fine.
        let _ = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.inner.request_pipe);
        // Reader end: unblocks a server waiting to deliver a response.
        let _ = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.inner.response_pipe);
    }
}

/// Forward SIGINT and SIGTERM to `handle` from a background thread
pub fn install_signal_handlers(handle: ShutdownHandle) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("trackseek-signals".into())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal, "shutdown requested");
                handle.trigger();
            }
        })?;
    Ok(())
}
