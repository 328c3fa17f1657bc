//! RPC command set.
//!
//! One function per remote operation. Each is a single request/response
//! exchange: header, request payload, response header, and on success the
//! result payload. The first failing step ends the exchange and its error is
//! returned unchanged, so callers see exactly where the exchange broke.
//!
//! These functions do no locking. [`crate::Context`] holds its lock around
//! every call.
//!
//! | Command        | Request payload             | Success result            |
//! |----------------|-----------------------------|---------------------------|
//! | open           | len-prefixed UTF-16LE path  | handle id (u64)           |
//! | read           | size (u32)                  | size (u32) + bytes        |
//! | write          | size (u32) + bytes          | -                         |
//! | seek           | offset (i64) + whence (i32) | position (i64)            |
//! | close / flush  | -                           | -                         |
//! | get-length     | -                           | length (u64)              |
//! | get-can-*      | -                           | bool (u8)                 |

use std::io::{Read, Write};

use super::frame::{read_response_header, write_command_header, write_open_header, Opcode};
use super::wire_format::{
    encode_utf16le, read_bytes, read_i64, read_u32, read_u64, read_u8, write_bytes, write_i32,
    write_i64, write_length_prefixed_bytes, write_u32,
};
use crate::error::{PipefileError, Result};

/// Seek origin.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// From the start of the file.
    Start = 0,
    /// From the current position.
    Current = 1,
    /// From the end of the file.
    End = 2,
}

/// Largest size a single read or write request can carry.
pub const MAX_TRANSFER: usize = u32::MAX as usize;

/// Open `path` on the remote peer and return its handle id.
pub fn open<S: Read + Write + ?Sized>(stream: &mut S, path: &str) -> Result<u64> {
    tracing::debug!(path, "open");
    write_open_header(stream)?;
    write_length_prefixed_bytes(stream, &encode_utf16le(path))?;

    read_response_header(stream)?;
    read_u64(stream)
}

/// Read up to `buf.len()` bytes (capped at [`MAX_TRANSFER`]) from the remote file.
///
/// Returns the number of bytes the peer delivered, which may be less than
/// requested. A peer that announces more than was requested has broken the
/// framing and yields [`PipefileError::OversizedRead`].
pub fn read<S: Read + Write + ?Sized>(stream: &mut S, handle: u64, buf: &mut [u8]) -> Result<usize> {
    let requested = u32::try_from(buf.len()).unwrap_or(u32::MAX);
    tracing::debug!(handle, requested, "read");

    write_command_header(stream, handle, Opcode::Read)?;
    write_u32(stream, requested)?;

    read_response_header(stream)?;
    let returned = read_u32(stream)?;
    tracing::trace!(handle, returned, "read response");

    if returned > requested {
        tracing::warn!("Peer returned {} bytes for a {} byte read", returned, requested);
        return Err(PipefileError::OversizedRead {
            requested,
            returned,
        });
    }

    let n = returned as usize;
    if n > 0 {
        read_bytes(stream, &mut buf[..n])?;
    }
    Ok(n)
}

/// Write `data` (capped at [`MAX_TRANSFER`] bytes) to the remote file.
///
/// The protocol carries no written-byte count back; a success status means
/// the peer accepted every byte sent, and the returned count is the local
/// size that was sent.
pub fn write<S: Read + Write + ?Sized>(stream: &mut S, handle: u64, data: &[u8]) -> Result<usize> {
    let data = &data[..data.len().min(MAX_TRANSFER)];
    tracing::debug!(handle, size = data.len(), "write");

    write_command_header(stream, handle, Opcode::Write)?;
    write_u32(stream, data.len() as u32)?;
    write_bytes(stream, data)?;

    read_response_header(stream)?;
    Ok(data.len())
}

/// Move the remote cursor and return the new absolute position.
pub fn seek<S: Read + Write + ?Sized>(stream: &mut S, handle: u64, offset: i64, whence: Whence) -> Result<i64> {
    tracing::debug!(handle, offset, ?whence, "seek");
    write_command_header(stream, handle, Opcode::Seek)?;
    write_i64(stream, offset)?;
    write_i32(stream, whence as i32)?;

    read_response_header(stream)?;
    read_i64(stream)
}

/// Issue a command whose request and result carry no payload.
pub fn simple<S: Read + Write + ?Sized>(stream: &mut S, handle: u64, opcode: Opcode) -> Result<()> {
    tracing::debug!(handle, ?opcode, "command");
    write_command_header(stream, handle, opcode)?;
    read_response_header(stream)
}

/// Close the remote file.
pub fn close<S: Read + Write + ?Sized>(stream: &mut S, handle: u64) -> Result<()> {
    simple(stream, handle, Opcode::Close)
}

/// Query the remote file length.
pub fn get_length<S: Read + Write + ?Sized>(stream: &mut S, handle: u64) -> Result<u64> {
    tracing::debug!(handle, "get length");
    write_command_header(stream, handle, Opcode::GetLength)?;
    read_response_header(stream)?;
    read_u64(stream)
}

/// Query one boolean capability (`GetCanSeek`, `GetCanRead` or `GetCanWrite`).
pub fn get_flag<S: Read + Write + ?Sized>(stream: &mut S, handle: u64, opcode: Opcode) -> Result<bool> {
    debug_assert!(matches!(
        opcode,
        Opcode::GetCanSeek | Opcode::GetCanRead | Opcode::GetCanWrite
    ));
    tracing::debug!(handle, ?opcode, "get flag");
    write_command_header(stream, handle, opcode)?;
    read_response_header(stream)?;
    Ok(read_u8(stream)? != 0)
}
