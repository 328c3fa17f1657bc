//! Command framing.
//!
//! Request and response headers:
//! ```text
//! Request:  ┌──────────┬──────────┬──────────────┬───────────┐
//!           │ Magic    │ Opcode   │ Handle ID    │ Payload   │
//!           │ 4 bytes  │ 4 bytes  │ 8 bytes      │ variable  │
//!           └──────────┴──────────┴──────────────┴───────────┘
//! Response: ┌──────────┬──────────┬───────────────────────────┐
//!           │ Magic    │ Status   │ Payload (success only)    │
//!           │ 4 bytes  │ 4 bytes  │ variable                  │
//!           └──────────┴──────────┴───────────────────────────┘
//! ```
//!
//! The open request is the one exception: it addresses no file yet, so the
//! handle id field is omitted and the path follows the opcode directly.

use std::io::{Read, Write};

use super::wire_format::{read_u32, read_u64, write_u32, write_u64};
use crate::error::{PipefileError, Result};

/// Sentinel at the start of every request and every response.
pub const MAGIC: u32 = 0xaa55_aa55;

/// Size of a request header carrying a handle id.
pub const COMMAND_HEADER_SIZE: usize = 16;

/// Size of a response header.
pub const RESPONSE_HEADER_SIZE: usize = 8;

/// Request opcodes.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Disconnect = 0,
    Open = 1,
    Close = 2,
    Read = 3,
    Write = 4,
    Seek = 5,
    GetLength = 6,
    SetLength = 7,
    Flush = 8,
    GetCanSeek = 9,
    GetCanRead = 10,
    GetCanWrite = 11,
}

impl Opcode {
    /// Decode a wire value.
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Disconnect,
            1 => Self::Open,
            2 => Self::Close,
            3 => Self::Read,
            4 => Self::Write,
            5 => Self::Seek,
            6 => Self::GetLength,
            7 => Self::SetLength,
            8 => Self::Flush,
            9 => Self::GetCanSeek,
            10 => Self::GetCanRead,
            11 => Self::GetCanWrite,
            _ => return None,
        })
    }

    /// Whether requests with this opcode carry a handle id field.
    #[inline]
    pub fn has_handle(self) -> bool {
        self != Self::Open
    }
}

/// Response status word.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success = 0,
    Failure = 1,
}

/// Decoded request header (server side view).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub opcode: Opcode,
    /// Zero for requests that carry no handle id.
    pub handle: u64,
}

fn check_magic(found: u32) -> Result<()> {
    if found != MAGIC {
        tracing::warn!("Bad magic {:#010x}, stream desynchronized", found);
        return Err(PipefileError::BadMagic {
            expected: MAGIC,
            found,
        });
    }
    Ok(())
}

/// Write `magic | opcode | handle`.
pub fn write_command_header<W: Write + ?Sized>(stream: &mut W, handle: u64, opcode: Opcode) -> Result<()> {
    tracing::trace!(?opcode, handle, "write command header");
    write_u32(stream, MAGIC)?;
    write_u32(stream, opcode as u32)?;
    write_u64(stream, handle)
}

/// Write `magic | open`, the handle-less header of the open request.
pub fn write_open_header<W: Write + ?Sized>(stream: &mut W) -> Result<()> {
    tracing::trace!(opcode = ?Opcode::Open, "write command header");
    write_u32(stream, MAGIC)?;
    write_u32(stream, Opcode::Open as u32)
}

/// Read and check a response header.
///
/// A wrong magic is reported as [`PipefileError::BadMagic`] and the status
/// word is left unread. A non-zero status is [`PipefileError::OperationFailed`];
/// the caller must not decode any payload in either case.
pub fn read_response_header<R: Read + ?Sized>(stream: &mut R) -> Result<()> {
    check_magic(read_u32(stream)?)?;

    match read_u32(stream)? {
        0 => Ok(()),
        status => {
            tracing::debug!(status, "remote operation failed");
            Err(PipefileError::OperationFailed)
        }
    }
}

/// Read a request header, including the handle id when the opcode has one.
pub fn read_command_header<R: Read + ?Sized>(stream: &mut R) -> Result<CommandHeader> {
    check_magic(read_u32(stream)?)?;

    let raw = read_u32(stream)?;
    let opcode = Opcode::from_u32(raw).ok_or(PipefileError::UnknownOpcode(raw))?;
    let handle = if opcode.has_handle() {
        read_u64(stream)?
    } else {
        0
    };

    Ok(CommandHeader { opcode, handle })
}

/// Write `magic | status`.
pub fn write_response_header<W: Write + ?Sized>(stream: &mut W, status: Status) -> Result<()> {
    write_u32(stream, MAGIC)?;
    write_u32(stream, status as u32)
}
