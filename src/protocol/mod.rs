//! Protocol module - wire codec, command framing, and the command set.
//!
//! This module implements the binary request/response protocol:
//! - Little Endian fixed-width integer and byte string encoding
//! - Request/response headers with magic and status checking
//! - One exchange function per remote file operation

pub mod command;
mod frame;
mod wire_format;

pub use command::{Whence, MAX_TRANSFER};
pub use frame::{
    read_command_header, read_response_header, write_command_header, write_open_header,
    write_response_header, CommandHeader, Opcode, Status, COMMAND_HEADER_SIZE, MAGIC,
    RESPONSE_HEADER_SIZE,
};
pub use wire_format::{
    encode_utf16le, read_bytes, read_i32, read_i64, read_u32, read_u64, read_u8, write_bytes,
    write_i32, write_i64, write_length_prefixed_bytes, write_u32, write_u64, write_u8,
};
