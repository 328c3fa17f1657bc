//! # pipefile-client
//!
//! Blocking client for remote file operations over a named-pipe binary
//! RPC protocol.
//!
//! A [`Context`] owns one duplex transport (a Named Pipe on Windows, a Unix
//! Domain Socket elsewhere) and serializes every request/response exchange
//! on it. Files opened through the context are [`RemoteFile`] handles that
//! forward open/read/write/seek/flush/close/length/capability calls to the
//! peer.
//!
//! ## Architecture
//!
//! - **Wire codec**: Little Endian fixed-width integers, length-prefixed bytes
//! - **Framing**: `magic | opcode | handle` requests, `magic | status` responses
//! - **Command set**: one exchange function per remote operation
//! - **Context**: transport ownership, connect/disconnect, the exchange lock
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pipefile_client::{Context, Whence};
//!
//! let ctx = Context::new();
//! ctx.connect("hello", Some(Duration::from_secs(1)))?;
//!
//! let file = ctx.open("test.txt")?;
//! let mut buf = [0u8; 10];
//! let n = file.read(&mut buf)?;
//! let end = file.seek(0, Whence::End)?;
//! file.close()?;
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

mod context;
mod file;

pub use config::{ClientConfig, FlushMode};
pub use context::Context;
pub use error::{PipefileError, Result};
pub use file::{flags, Capabilities, RemoteFile};
pub use protocol::Whence;
