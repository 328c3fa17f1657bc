//! Connection context.
//!
//! A [`Context`] owns one transport and the lock that serializes every
//! exchange on it. The transport is a single ordered byte stream, so two
//! commands whose bytes interleaved would corrupt the framing of both; every
//! request/response pair therefore runs with the lock held from the first
//! header byte written to the last result byte read.
//!
//! Lifecycle: **Unconnected → Connected → Unconnected**.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pipefile_client::Context;
//!
//! let ctx = Context::new();
//! ctx.connect("hello", Some(Duration::from_secs(1)))?;
//!
//! let file = ctx.open("test.txt")?;
//! let mut buf = [0u8; 10];
//! let n = file.read(&mut buf)?;
//! file.close()?;
//!
//! ctx.disconnect();
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::{ClientConfig, FlushMode};
use crate::error::{PipefileError, Result};
use crate::file::RemoteFile;
use crate::protocol::command;
use crate::transport::{Connector, PipeConnector, Transport};

/// One connection to a remote file server.
///
/// # Thread Safety
///
/// `Context` is `Sync`; file handles on the same context may be used from
/// several threads. Their commands are strictly serialized, so a slow
/// response on one handle delays every other handle on the context.
pub struct Context {
    connector: Box<dyn Connector>,
    config: ClientConfig,
    /// `None` while unconnected.
    pipe: Mutex<Option<Box<dyn Transport>>>,
}

impl Context {
    /// Create an unconnected context using the platform pipe connector.
    pub fn new() -> Self {
        Self::with_connector(PipeConnector::new())
    }

    /// Create an unconnected context that opens transports through `connector`.
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            config: ClientConfig::default(),
            pipe: Mutex::new(None),
        }
    }

    /// Create an unconnected context using the platform pipe connector and `config`.
    pub fn with_config(config: ClientConfig) -> Self {
        Self::new().config(config)
    }

    /// Replace the configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn client_config(&self) -> &ClientConfig {
        &self.config
    }

    #[inline]
    pub(crate) fn flush_mode(&self) -> FlushMode {
        self.config.flush_mode
    }

    // Poisoning is ignored: a panicked exchange leaves the stream no worse
    // than a transport error does.
    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Transport>>> {
        self.pipe.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait up to `timeout` (`None` waits forever) for the endpoint `name`
    /// and open it.
    ///
    /// The context lock is held for the whole wait. An already open transport
    /// is closed first. On failure the context is left unconnected.
    pub fn connect(&self, name: &str, timeout: Option<Duration>) -> Result<()> {
        let mut pipe = self.lock();

        if pipe.take().is_some() {
            tracing::debug!("Closing previous transport before reconnecting");
        }

        tracing::debug!(name, ?timeout, "connect");
        *pipe = Some(self.connector.connect(name, timeout)?);
        Ok(())
    }

    /// Connect using the configured pipe name and timeout.
    pub fn connect_configured(&self) -> Result<()> {
        self.connect(&self.config.pipe_name, self.config.connect_timeout())
    }

    /// Close the transport if one is open. Idempotent.
    ///
    /// File handles opened before the disconnect fail with
    /// [`PipefileError::NotConnected`] afterwards; after a later reconnect
    /// their ids mean nothing to the new peer session.
    pub fn disconnect(&self) {
        if self.lock().take().is_some() {
            tracing::debug!("disconnected");
        }
    }

    /// Whether a transport is open.
    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Open `path` on the remote peer.
    pub fn open(&self, path: &str) -> Result<RemoteFile<'_>> {
        let handle = self.exchange(|pipe| command::open(pipe, path))?;
        tracing::debug!(path, handle, "file opened");
        Ok(RemoteFile::new(self, handle))
    }

    /// Run one request/response exchange with the lock held throughout.
    pub(crate) fn exchange<T>(&self, f: impl FnOnce(&mut dyn Transport) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let pipe = guard.as_mut().ok_or(PipefileError::NotConnected)?;

        f(&mut **pipe).map_err(|e| {
            if e.is_fatal() {
                tracing::warn!("Fatal protocol error, reconnect required: {}", e);
            }
            e
        })
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}
