//! Standard 16-byte message header and stream framing

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use mongotunnel_common::error::ProtocolError;

use crate::codec::get_i32;
use crate::opcode::OpCode;
use crate::ProtocolResult;

/// Size of the standard message header
pub const HEADER_LEN: usize = 16;

/// Largest message a server will accept (maxMessageSizeBytes)
pub const MAX_MESSAGE_SIZE: usize = 48_000_000;

/// Message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
    pub message_length: i32,
    pub request_id: i32,
    pub response_to: i32,
    pub op_code: OpCode,
}

impl MsgHeader {
    pub fn decode(buf: &mut Bytes) -> ProtocolResult<Self> {
        Ok(Self {
            message_length: get_i32(buf)?,
            request_id: get_i32(buf)?,
            response_to: get_i32(buf)?,
            op_code: OpCode::from(get_i32(buf)?),
        })
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.put_i32_le(self.message_length);
        out.put_i32_le(self.request_id);
        out.put_i32_le(self.response_to);
        out.put_i32_le(self.op_code.as_i32());
    }
}

impl fmt::Display for MsgHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<MsgHeader length={} request_id={} response_to={} opcode={}>",
            self.message_length, self.request_id, self.response_to, self.op_code
        )
    }
}

/// Length of the next complete message at the front of `buf`.
///
/// `Ok(None)` means more bytes are needed. A declared length outside
/// `HEADER_LEN..=MAX_MESSAGE_SIZE` means the stream is not MongoDB wire traffic.
pub fn frame_length(buf: &[u8]) -> ProtocolResult<Option<usize>> {
    if buf.len() < 4 {
        return Ok(None);
    }

    let declared = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if declared < HEADER_LEN as i32 || declared as usize > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::LengthOutOfBounds(i64::from(declared)));
    }

    let declared = declared as usize;
    if buf.len() < declared {
        return Ok(None);
    }
    Ok(Some(declared))
}
