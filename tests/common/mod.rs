//! In-memory peer for integration tests.
//!
//! [`MemoryPeer`] is both ends of a fake pipe: the client writes requests
//! into it, the peer decodes each one as soon as its last byte arrives and
//! queues the response for the client to read.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};
use pipefile_client::protocol::{
    read_bytes, read_command_header, read_i32, read_i64, read_u32, CommandHeader, Opcode, MAGIC,
};
use pipefile_client::transport::{Connector, Transport};
use pipefile_client::{PipefileError, Result};

#[derive(Debug, Clone)]
struct MemFile {
    path: String,
    pos: i64,
}

#[derive(Debug, Default)]
struct PeerState {
    inbox: BytesMut,
    outbox: BytesMut,
    contents: HashMap<String, Vec<u8>>,
    open: HashMap<u64, MemFile>,
    next_handle: u64,
    requests: Vec<CommandHeader>,
    failing: HashSet<Opcode>,
    caps: (bool, bool, bool),
    max_read: Option<usize>,
    corrupt_responses: bool,
    corrupt: HashSet<Opcode>,
    writer: Option<ThreadId>,
    interleaved: bool,
    desynced: bool,
}

/// Decoded request with its payload.
enum Request {
    Open(String),
    Read(u32),
    Write(Vec<u8>),
    Seek(i64, i32),
    Bare,
}

/// Shared handle to the fake peer. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryPeer {
    state: Arc<Mutex<PeerState>>,
}

impl MemoryPeer {
    pub fn new() -> Self {
        let peer = Self::default();
        peer.state.lock().unwrap().next_handle = 1;
        peer
    }

    pub fn add_file(&self, path: &str, data: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .contents
            .insert(path.to_string(), data.to_vec());
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().contents.get(path).cloned()
    }

    /// Remote cursor of an open handle.
    pub fn position(&self, handle: u64) -> Option<i64> {
        self.state.lock().unwrap().open.get(&handle).map(|f| f.pos)
    }

    pub fn is_open(&self, handle: u64) -> bool {
        self.state.lock().unwrap().open.contains_key(&handle)
    }

    pub fn fail(&self, opcode: Opcode) {
        self.state.lock().unwrap().failing.insert(opcode);
    }

    pub fn set_capabilities(&self, can_seek: bool, can_read: bool, can_write: bool) {
        self.state.lock().unwrap().caps = (can_seek, can_read, can_write);
    }

    /// Deliver at most `n` bytes per read request.
    pub fn limit_reads(&self, n: usize) {
        self.state.lock().unwrap().max_read = Some(n);
    }

    /// Start every following response with a wrong magic.
    pub fn corrupt_responses(&self) {
        self.state.lock().unwrap().corrupt_responses = true;
    }

    /// Start responses to `opcode` with a wrong magic.
    pub fn corrupt(&self, opcode: Opcode) {
        self.state.lock().unwrap().corrupt.insert(opcode);
    }

    pub fn requests(&self) -> Vec<CommandHeader> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn opcodes(&self) -> Vec<Opcode> {
        self.requests().iter().map(|r| r.opcode).collect()
    }

    /// Whether bytes of two requests from different threads were mixed.
    pub fn interleaved(&self) -> bool {
        self.state.lock().unwrap().interleaved
    }

    /// Whether the request stream stopped parsing.
    pub fn desynced(&self) -> bool {
        self.state.lock().unwrap().desynced
    }

    /// Bytes written by the client that do not yet form a whole request.
    pub fn pending_request_bytes(&self) -> usize {
        self.state.lock().unwrap().inbox.len()
    }
}

fn parse_request(buf: &[u8]) -> Result<(CommandHeader, Request, usize)> {
    let mut cursor = Cursor::new(buf);
    let header = read_command_header(&mut cursor)?;

    let request = match header.opcode {
        Opcode::Open => {
            let len = read_u32(&mut cursor)? as usize;
            let mut raw = vec![0u8; len];
            read_bytes(&mut cursor, &mut raw)?;
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            Request::Open(String::from_utf16_lossy(&units))
        }
        Opcode::Read => Request::Read(read_u32(&mut cursor)?),
        Opcode::Write => {
            let len = read_u32(&mut cursor)? as usize;
            let mut data = vec![0u8; len];
            read_bytes(&mut cursor, &mut data)?;
            Request::Write(data)
        }
        Opcode::Seek => {
            let offset = read_i64(&mut cursor)?;
            let whence = read_i32(&mut cursor)?;
            Request::Seek(offset, whence)
        }
        _ => Request::Bare,
    };

    Ok((header, request, cursor.position() as usize))
}

impl PeerState {
    fn process(&mut self) {
        while !self.desynced && !self.inbox.is_empty() {
            match parse_request(&self.inbox) {
                Ok((header, request, consumed)) => {
                    self.inbox.advance(consumed);
                    self.writer = None;
                    self.requests.push(header);
                    self.respond(header, request);
                }
                // Incomplete request; wait for more bytes.
                Err(PipefileError::ReadPipe(_)) => return,
                Err(_) => self.desynced = true,
            }
        }
    }

    fn respond(&mut self, header: CommandHeader, request: Request) {
        let magic = if self.corrupt_responses || self.corrupt.contains(&header.opcode) {
            0xdead_beef
        } else {
            MAGIC
        };
        self.outbox.put_u32_le(magic);

        match self.execute(header, request) {
            Some(payload) => {
                self.outbox.put_u32_le(0);
                self.outbox.put_slice(&payload);
            }
            None => self.outbox.put_u32_le(1),
        }
    }

    /// Result payload on success, `None` on failure.
    fn execute(&mut self, header: CommandHeader, request: Request) -> Option<Vec<u8>> {
        if self.failing.contains(&header.opcode) {
            return None;
        }

        let mut out = Vec::new();
        match (header.opcode, request) {
            (Opcode::Open, Request::Open(path)) => {
                if !self.contents.contains_key(&path) {
                    return None;
                }
                let handle = self.next_handle;
                self.next_handle += 1;
                self.open.insert(handle, MemFile { path, pos: 0 });
                out.put_u64_le(handle);
            }
            (Opcode::Read, Request::Read(requested)) => {
                let max_read = self.max_read;
                let file = self.open.get_mut(&header.handle)?;
                let data = self.contents.get(&file.path)?;
                let start = (file.pos as usize).min(data.len());
                let mut n = (requested as usize).min(data.len() - start);
                if let Some(max) = max_read {
                    n = n.min(max);
                }
                out.put_u32_le(n as u32);
                out.put_slice(&data[start..start + n]);
                file.pos += n as i64;
            }
            (Opcode::Write, Request::Write(bytes)) => {
                let file = self.open.get_mut(&header.handle)?;
                let data = self.contents.get_mut(&file.path)?;
                let start = file.pos as usize;
                if data.len() < start + bytes.len() {
                    data.resize(start + bytes.len(), 0);
                }
                data[start..start + bytes.len()].copy_from_slice(&bytes);
                file.pos += bytes.len() as i64;
            }
            (Opcode::Seek, Request::Seek(offset, whence)) => {
                let file = self.open.get_mut(&header.handle)?;
                let len = self.contents.get(&file.path)?.len() as i64;
                let base = match whence {
                    0 => 0,
                    1 => file.pos,
                    2 => len,
                    _ => return None,
                };
                let pos = base + offset;
                if pos < 0 {
                    return None;
                }
                file.pos = pos;
                out.put_i64_le(pos);
            }
            (Opcode::GetLength, _) => {
                let file = self.open.get(&header.handle)?;
                out.put_u64_le(self.contents.get(&file.path)?.len() as u64);
            }
            (Opcode::GetCanSeek, _) => {
                self.open.get(&header.handle)?;
                out.put_u8(self.caps.0 as u8);
            }
            (Opcode::GetCanRead, _) => {
                self.open.get(&header.handle)?;
                out.put_u8(self.caps.1 as u8);
            }
            (Opcode::GetCanWrite, _) => {
                self.open.get(&header.handle)?;
                out.put_u8(self.caps.2 as u8);
            }
            (Opcode::Close, _) => {
                self.open.remove(&header.handle)?;
            }
            (Opcode::Flush, _) => {
                self.open.get(&header.handle)?;
            }
            _ => return None,
        }
        Some(out)
    }
}

impl Read for MemoryPeer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let n = buf.len().min(state.outbox.len());
        buf[..n].copy_from_slice(&state.outbox[..n]);
        state.outbox.advance(n);
        Ok(n)
    }
}

impl Write for MemoryPeer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let me = thread::current().id();
        if state.writer.is_some_and(|w| w != me) {
            state.interleaved = true;
        }
        state.writer = Some(me);

        state.inbox.extend_from_slice(buf);
        state.process();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Connector that hands out the peer, or reports it busy.
pub struct MemoryConnector {
    peer: MemoryPeer,
    available: bool,
    attempts: Arc<Mutex<u32>>,
}

impl MemoryConnector {
    pub fn new(peer: &MemoryPeer) -> Self {
        Self {
            peer: peer.clone(),
            available: true,
            attempts: Arc::default(),
        }
    }

    pub fn unavailable() -> (Self, Arc<Mutex<u32>>) {
        let attempts = Arc::new(Mutex::new(0));
        let connector = Self {
            peer: MemoryPeer::new(),
            available: false,
            attempts: attempts.clone(),
        };
        (connector, attempts)
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, _name: &str, timeout: Option<Duration>) -> Result<Box<dyn Transport>> {
        *self.attempts.lock().unwrap() += 1;
        if !self.available {
            if let Some(timeout) = timeout {
                thread::sleep(timeout);
            }
            return Err(PipefileError::Busy);
        }
        Ok(Box::new(self.peer.clone()))
    }
}
