//! Platform-specific pipe/socket implementation.
//!
//! - Unix: Unix Domain Socket
//! - Windows: Named Pipe
//!
//! Connecting polls the endpoint until it accepts a client or the timeout
//! expires. "Not there yet" conditions (no such endpoint, all pipe instances
//! busy, connection refused) keep the wait going; anything else is an open
//! failure.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pipefile_client::transport::{Connector, PipeConnector};
//!
//! let pipe = PipeConnector::new().connect("hello", Some(Duration::from_secs(1)))?;
//! ```

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{PipefileError, Result};

/// Pause between availability checks while waiting for an endpoint.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A blocking duplex byte stream.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// Waits for a named endpoint and opens it for bidirectional access.
pub trait Connector: Send + Sync {
    /// Connect to `name`, waiting up to `timeout` (`None` waits forever).
    ///
    /// Fails with [`PipefileError::Busy`] when the wait times out and with
    /// [`PipefileError::OpenPipe`] when the endpoint exists but cannot be opened.
    fn connect(&self, name: &str, timeout: Option<Duration>) -> Result<Box<dyn Transport>>;
}

/// Resolve an endpoint name to a platform path.
///
/// Format:
/// - Unix: `/tmp/{name}.sock`, unless `name` already is a path
/// - Windows: `\\.\pipe\{name}`, unless `name` already has the pipe prefix
pub fn pipe_path(name: &str) -> String {
    #[cfg(unix)]
    {
        if name.contains('/') {
            name.to_string()
        } else {
            format!("/tmp/{}.sock", name)
        }
    }

    #[cfg(windows)]
    {
        if name.starts_with(r"\\.\pipe\") {
            name.to_string()
        } else {
            format!(r"\\.\pipe\{}", name)
        }
    }
}

/// Connector for the platform's named duplex endpoint.
#[derive(Debug, Clone)]
pub struct PipeConnector {
    poll_interval: Duration,
}

impl PipeConnector {
    /// Create a connector with the default poll interval.
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the pause between availability checks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for PipeConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for PipeConnector {
    fn connect(&self, name: &str, timeout: Option<Duration>) -> Result<Box<dyn Transport>> {
        let path = pipe_path(name);
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            match platform::open(&path) {
                Ok(stream) => {
                    tracing::debug!(path = %path, "pipe opened");
                    return Ok(stream);
                }
                Err(e) if platform::is_unavailable(&e) => {
                    if let Some(deadline) = deadline {
                        let now = Instant::now();
                        if now >= deadline {
                            tracing::debug!(path = %path, "pipe not available before timeout");
                            return Err(PipefileError::Busy);
                        }
                        thread::sleep(self.poll_interval.min(deadline - now));
                    } else {
                        thread::sleep(self.poll_interval);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to open pipe {}: {}", path, e);
                    return Err(PipefileError::OpenPipe(e));
                }
            }
        }
    }
}

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod platform {
    use super::*;
    use std::os::unix::net::UnixStream;

    pub(super) fn open(path: &str) -> io::Result<Box<dyn Transport>> {
        Ok(Box::new(UnixStream::connect(path)?))
    }

    pub(super) fn is_unavailable(e: &io::Error) -> bool {
        matches!(
            e.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
        )
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod platform {
    use super::*;
    use std::fs::OpenOptions;

    /// `ERROR_PIPE_BUSY`: every instance of the pipe is in use.
    const ERROR_PIPE_BUSY: i32 = 231;

    pub(super) fn open(path: &str) -> io::Result<Box<dyn Transport>> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Box::new(file))
    }

    pub(super) fn is_unavailable(e: &io::Error) -> bool {
        e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(ERROR_PIPE_BUSY)
    }
}
