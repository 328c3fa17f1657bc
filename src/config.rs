//! Client configuration.
//!
//! All fields have defaults, so a config file only needs the fields it
//! changes:
//!
//! ```
//! use pipefile_client::config::{ClientConfig, FlushMode};
//!
//! let config = ClientConfig::from_json_str(r#"{ "pipe_name": "files", "connect_timeout_ms": 500 }"#).unwrap();
//! assert_eq!(config.pipe_name, "files");
//! assert_eq!(config.connect_timeout().unwrap().as_millis(), 500);
//! assert_eq!(config.flush_mode, FlushMode::Close);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipefileError, Result};

/// Connect timeout value meaning "wait indefinitely".
pub const WAIT_FOREVER: i64 = -1;

/// Default endpoint name.
pub const DEFAULT_PIPE_NAME: &str = "pipefile";

/// Which remote command [`crate::RemoteFile::flush`] sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Send the close command. Existing peers
    /// expect this, and it ends the remote file's lifetime.
    #[default]
    Close,
    /// Send the dedicated flush opcode, leaving the file open.
    Flush,
}

/// Settings for a [`crate::Context`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpoint name, resolved with [`crate::transport::pipe_path`].
    pub pipe_name: String,
    /// Milliseconds to wait for the endpoint; negative waits forever.
    pub connect_timeout_ms: i64,
    /// Remote command used for flush.
    pub flush_mode: FlushMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pipe_name: DEFAULT_PIPE_NAME.to_string(),
            connect_timeout_ms: WAIT_FOREVER,
            flush_mode: FlushMode::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(PipefileError::Io)?;
        Self::from_json_str(&json)
    }

    /// Connect timeout, `None` meaning wait forever.
    pub fn connect_timeout(&self) -> Option<Duration> {
        u64::try_from(self.connect_timeout_ms)
            .ok()
            .map(Duration::from_millis)
    }
}
