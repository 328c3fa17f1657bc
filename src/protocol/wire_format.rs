//! Wire format encoding and decoding.
//!
//! Every integer on the wire is Little Endian, independent of the host byte
//! order. Only three widths are used by the protocol, each with its own
//! fixed-size function pair:
//!
//! ```text
//! ┌────────┬─────────────────────────────────────┐
//! │ Width  │ Used for                            │
//! ├────────┼─────────────────────────────────────┤
//! │ 1 byte │ capability booleans                 │
//! │ 4 byte │ magic, opcode, status, sizes, whence│
//! │ 8 byte │ handle ids, offsets, lengths        │
//! └────────┴─────────────────────────────────────┘
//! ```
//!
//! Byte strings are a 4-byte length (in bytes) followed by the raw bytes.
//! No terminator, no padding.
//!
//! A short read or write is reported immediately as a transport error.
//! Nothing here retries.

use std::io::{self, Read, Write};

use crate::error::{PipefileError, Result};

fn read_array<R: Read + ?Sized, const N: usize>(stream: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    stream.read_exact(&mut buf).map_err(PipefileError::ReadPipe)?;
    Ok(buf)
}

fn write_array<W: Write + ?Sized>(stream: &mut W, buf: &[u8]) -> Result<()> {
    stream.write_all(buf).map_err(PipefileError::WritePipe)
}

/// Write a single byte.
#[inline]
pub fn write_u8<W: Write + ?Sized>(stream: &mut W, value: u8) -> Result<()> {
    write_array(stream, &[value])
}

/// Read a single byte.
#[inline]
pub fn read_u8<R: Read + ?Sized>(stream: &mut R) -> Result<u8> {
    let [b] = read_array::<R, 1>(stream)?;
    Ok(b)
}

/// Write a 4-byte unsigned integer (LE).
#[inline]
pub fn write_u32<W: Write + ?Sized>(stream: &mut W, value: u32) -> Result<()> {
    write_array(stream, &value.to_le_bytes())
}

/// Read a 4-byte unsigned integer (LE).
#[inline]
pub fn read_u32<R: Read + ?Sized>(stream: &mut R) -> Result<u32> {
    read_array(stream).map(u32::from_le_bytes)
}

/// Write a 4-byte signed integer (LE).
#[inline]
pub fn write_i32<W: Write + ?Sized>(stream: &mut W, value: i32) -> Result<()> {
    write_array(stream, &value.to_le_bytes())
}

/// Read a 4-byte signed integer (LE).
#[inline]
pub fn read_i32<R: Read + ?Sized>(stream: &mut R) -> Result<i32> {
    read_array(stream).map(i32::from_le_bytes)
}

/// Write an 8-byte unsigned integer (LE).
#[inline]
pub fn write_u64<W: Write + ?Sized>(stream: &mut W, value: u64) -> Result<()> {
    write_array(stream, &value.to_le_bytes())
}

/// Read an 8-byte unsigned integer (LE).
#[inline]
pub fn read_u64<R: Read + ?Sized>(stream: &mut R) -> Result<u64> {
    read_array(stream).map(u64::from_le_bytes)
}

/// Write an 8-byte signed integer (LE).
#[inline]
pub fn write_i64<W: Write + ?Sized>(stream: &mut W, value: i64) -> Result<()> {
    write_array(stream, &value.to_le_bytes())
}

/// Read an 8-byte signed integer (LE).
#[inline]
pub fn read_i64<R: Read + ?Sized>(stream: &mut R) -> Result<i64> {
    read_array(stream).map(i64::from_le_bytes)
}

/// Write raw bytes with no length prefix.
#[inline]
pub fn write_bytes<W: Write + ?Sized>(stream: &mut W, bytes: &[u8]) -> Result<()> {
    write_array(stream, bytes)
}

/// Fill `buf` completely from the stream.
#[inline]
pub fn read_bytes<R: Read + ?Sized>(stream: &mut R, buf: &mut [u8]) -> Result<()> {
    stream.read_exact(buf).map_err(PipefileError::ReadPipe)
}

/// Write a 4-byte byte-length followed by the bytes themselves.
///
/// Fails with a write error before touching the stream if `bytes` is longer
/// than a 32-bit length can describe.
pub fn write_length_prefixed_bytes<W: Write + ?Sized>(stream: &mut W, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| {
        PipefileError::WritePipe(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("byte string of {} bytes exceeds 32-bit length", bytes.len()),
        ))
    })?;
    write_u32(stream, len)?;
    write_bytes(stream, bytes)
}

/// Encode a string as UTF-16LE code units, the path encoding of the open command.
///
/// The byte length is always the number of code units times two.
pub fn encode_utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
