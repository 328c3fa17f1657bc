//! Remote file handle.
//!
//! A [`RemoteFile`] is a thin view: a borrowed [`Context`] plus the id the
//! peer issued at open time. Every call runs one exchange (three for
//! [`RemoteFile::capabilities`]) under the context lock.

use std::io;

use bytes::{Bytes, BytesMut};

use crate::config::FlushMode;
use crate::context::Context;
use crate::error::Result;
use crate::protocol::command;
use crate::protocol::{Opcode, Whence, MAX_TRANSFER};

/// Capability bits, matching the peer's flag values.
pub mod flags {
    /// The file supports seeking.
    pub const CAN_SEEK: u32 = 0b001;
    /// The file can be read.
    pub const CAN_READ: u32 = 0b010;
    /// The file can be written.
    pub const CAN_WRITE: u32 = 0b100;
}

/// What a remote file supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_seek: bool,
    pub can_read: bool,
    pub can_write: bool,
}

impl Capabilities {
    /// Combine into a [`flags`] bitmask.
    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.can_seek {
            bits |= flags::CAN_SEEK;
        }
        if self.can_read {
            bits |= flags::CAN_READ;
        }
        if self.can_write {
            bits |= flags::CAN_WRITE;
        }
        bits
    }

    /// Split a [`flags`] bitmask; unknown bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            can_seek: bits & flags::CAN_SEEK != 0,
            can_read: bits & flags::CAN_READ != 0,
            can_write: bits & flags::CAN_WRITE != 0,
        }
    }
}

/// Client-side proxy for a file opened on the remote peer.
///
/// Borrows its context, so it cannot outlive it. After the context
/// disconnects every call fails with
/// [`crate::PipefileError::NotConnected`].
#[derive(Debug)]
pub struct RemoteFile<'ctx> {
    ctx: &'ctx Context,
    handle: u64,
}

impl<'ctx> RemoteFile<'ctx> {
    pub(crate) fn new(ctx: &'ctx Context, handle: u64) -> Self {
        Self { ctx, handle }
    }

    /// Get the peer-issued handle id.
    #[inline]
    pub fn handle_id(&self) -> u64 {
        self.handle
    }

    /// Get the owning context.
    #[inline]
    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    /// Read up to `buf.len()` bytes at the remote cursor.
    ///
    /// A single request carries at most [`MAX_TRANSFER`] bytes. A short count
    /// means end of data or a peer-side limit; use [`RemoteFile::length`] to
    /// tell them apart.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.ctx
            .exchange(|pipe| command::read(pipe, self.handle, buf))
    }

    /// Read up to `max` bytes into a new buffer.
    ///
    /// The buffer is allocated and zeroed at `max` bytes (capped at
    /// [`MAX_TRANSFER`]) before the request is sent, whatever the remote
    /// length. Bound `max` by [`RemoteFile::length`] when reading a whole
    /// file of unknown size.
    pub fn read_bytes(&self, max: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(max.min(MAX_TRANSFER));
        let n = self.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf.freeze())
    }

    /// Write `data` at the remote cursor.
    ///
    /// The peer reports no byte count; success means every byte sent was
    /// accepted. At most [`MAX_TRANSFER`] bytes are sent per call and the
    /// returned count says how many.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.ctx
            .exchange(|pipe| command::write(pipe, self.handle, data))
    }

    /// Move the remote cursor and return the new absolute position.
    pub fn seek(&self, offset: i64, whence: Whence) -> Result<i64> {
        self.ctx
            .exchange(|pipe| command::seek(pipe, self.handle, offset, whence))
    }

    /// Flush the remote file.
    ///
    /// With the default [`FlushMode::Close`] this sends the close command,
    /// exactly like [`RemoteFile::close`]: the remote file is closed and the
    /// handle is spent. [`FlushMode::Flush`] sends the dedicated flush opcode.
    pub fn flush(&self) -> Result<()> {
        let opcode = match self.ctx.flush_mode() {
            FlushMode::Close => Opcode::Close,
            FlushMode::Flush => Opcode::Flush,
        };
        self.ctx
            .exchange(|pipe| command::simple(pipe, self.handle, opcode))
    }

    /// Close the remote file.
    pub fn close(self) -> Result<()> {
        self.ctx.exchange(|pipe| command::close(pipe, self.handle))
    }

    /// Query the remote file length in bytes.
    pub fn length(&self) -> Result<u64> {
        self.ctx
            .exchange(|pipe| command::get_length(pipe, self.handle))
    }

    /// Query seek/read/write support.
    ///
    /// Three separate exchanges, each taking the lock on its own. The set is
    /// not atomic: if the peer's capabilities change between queries, the
    /// result mixes both states.
    pub fn capabilities(&self) -> Result<Capabilities> {
        let can_seek = self.flag(Opcode::GetCanSeek)?;
        let can_write = self.flag(Opcode::GetCanWrite)?;
        let can_read = self.flag(Opcode::GetCanRead)?;

        Ok(Capabilities {
            can_seek,
            can_read,
            can_write,
        })
    }

    fn flag(&self, opcode: Opcode) -> Result<bool> {
        self.ctx
            .exchange(|pipe| command::get_flag(pipe, self.handle, opcode))
    }

    /// Read whole elements of `size` bytes into `buf`, returning the element count.
    ///
    /// Only `buf.len() / size` elements are requested. When the peer delivers
    /// a trailing partial element, the remote cursor is moved back by the
    /// partial byte count, so the remote position reflects only whole
    /// elements delivered. The partial bytes remain in `buf` past the counted
    /// elements.
    ///
    /// A failed rewind is logged and the delivered count still returned,
    /// since the whole elements are already consumed remotely; the remote
    /// cursor then sits past the partial element. A fatal rewind error
    /// propagates.
    pub fn read_elements(&self, buf: &mut [u8], size: usize) -> Result<usize> {
        if size == 0 {
            return Ok(0);
        }

        let total = buf.len() - buf.len() % size;
        let n = self.read(&mut buf[..total])?;

        let partial = n % size;
        if partial != 0 {
            tracing::trace!(handle = self.handle, partial, "rewinding partial element");
            match self.seek(-(partial as i64), Whence::Current) {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Failed to rewind {} partial bytes on handle {}: {}",
                        partial,
                        self.handle,
                        e
                    );
                }
            }
        }

        Ok(n / size)
    }

    /// Write whole elements of `size` bytes from `data`, returning the element count.
    ///
    /// All or nothing: returns the number of elements in `data` when every
    /// byte was sent, otherwise 0.
    pub fn write_elements(&self, data: &[u8], size: usize) -> Result<usize> {
        if size == 0 {
            return Ok(0);
        }

        let total = data.len() - data.len() % size;
        let n = self.write(&data[..total])?;

        Ok(if n == total { total / size } else { 0 })
    }
}

impl io::Read for RemoteFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(RemoteFile::read(self, buf)?)
    }
}

/// `flush` is local-only; the remote flush may close the file. Call
/// [`RemoteFile::flush`] explicitly.
impl io::Write for RemoteFile<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(RemoteFile::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for RemoteFile<'_> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset exceeds i64")
                })?;
                (offset, Whence::Start)
            }
            io::SeekFrom::Current(offset) => (offset, Whence::Current),
            io::SeekFrom::End(offset) => (offset, Whence::End),
        };

        let position = RemoteFile::seek(self, offset, whence)?;
        u64::try_from(position).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("peer returned negative position {}", position),
            )
        })
    }
}
