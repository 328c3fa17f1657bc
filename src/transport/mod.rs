//! Transport module - the duplex byte stream a context talks through.
//!
//! Provides:
//! - [`Transport`], any blocking `Read + Write` stream
//! - [`Connector`], which waits for and opens a named endpoint
//! - [`PipeConnector`], Unix Domain Sockets (Linux/macOS) or Named Pipes (Windows)

mod pipe;

pub use pipe::{pipe_path, Connector, PipeConnector, Transport, DEFAULT_POLL_INTERVAL};
