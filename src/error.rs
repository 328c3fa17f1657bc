//! Error types for pipefile-client.

use std::io;

use thiserror::Error;

/// Main error type for all pipefile operations.
#[derive(Debug, Error)]
pub enum PipefileError {
    /// The endpoint did not become available before the connect timeout.
    #[error("Pipe busy: endpoint not available within timeout")]
    Busy,

    /// The endpoint became available but could not be opened.
    #[error("Failed to open pipe: {0}")]
    OpenPipe(#[source] io::Error),

    /// Short or failed read from the transport.
    #[error("Failed to read from pipe: {0}")]
    ReadPipe(#[source] io::Error),

    /// Short or failed write to the transport.
    #[error("Failed to write to pipe: {0}")]
    WritePipe(#[source] io::Error),

    /// The remote peer answered with a non-zero status word.
    #[error("Remote operation failed")]
    OperationFailed,

    /// The response did not start with the protocol magic; the stream is desynchronized.
    #[error("Bad magic: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        /// Magic the client expects.
        expected: u32,
        /// Value actually read from the stream.
        found: u32,
    },

    /// The peer announced more read bytes than were requested.
    #[error("Read response of {returned} bytes exceeds requested {requested}")]
    OversizedRead {
        /// Bytes the client asked for.
        requested: u32,
        /// Bytes the peer announced.
        returned: u32,
    },

    /// A request header carried an opcode outside the protocol.
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u32),

    /// The context has no open transport.
    #[error("Not connected")]
    NotConnected,

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error outside the protocol stream (configuration files).
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl PipefileError {
    /// Whether the error leaves the stream unaligned for every later command.
    ///
    /// There is no resynchronization mechanism; the context must be
    /// disconnected and connected again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BadMagic { .. } | Self::ReadPipe(_) | Self::WritePipe(_) | Self::OversizedRead { .. }
        )
    }
}

impl From<PipefileError> for io::Error {
    fn from(err: PipefileError) -> Self {
        match err {
            PipefileError::OpenPipe(e)
            | PipefileError::ReadPipe(e)
            | PipefileError::WritePipe(e)
            | PipefileError::Io(e) => e,
            PipefileError::NotConnected => io::Error::new(io::ErrorKind::NotConnected, err),
            PipefileError::Busy => io::Error::new(io::ErrorKind::TimedOut, err),
            PipefileError::BadMagic { .. }
            | PipefileError::OversizedRead { .. }
            | PipefileError::UnknownOpcode(_)
            | PipefileError::Config(_) => io::Error::new(io::ErrorKind::InvalidData, err),
            PipefileError::OperationFailed => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

/// Result type alias using PipefileError.
pub type Result<T> = std::result::Result<T, PipefileError>;
