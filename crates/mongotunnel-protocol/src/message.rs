//! Whole-message decoding and encoding

use std::fmt;

use bytes::{Bytes, BytesMut};

use mongotunnel_common::error::ProtocolError;

use crate::command::{CommandOp, CommandReplyOp};
use crate::header::{MsgHeader, HEADER_LEN};
use crate::msg::MsgOp;
use crate::opcode::OpCode;
use crate::query::QueryOp;
use crate::reply::ReplyOp;
use crate::ProtocolResult;

/// Decoded message body
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Query(QueryOp),
    Reply(ReplyOp),
    Command(CommandOp),
    CommandReply(CommandReplyOp),
    Msg(MsgOp),
    /// Opcodes this crate does not decode; body kept verbatim
    Other(Bytes),
}

/// One complete wire-protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: MsgHeader,
    pub op: Op,
}

impl Message {
    /// Build a message; `message_length` is filled in by `encode`.
    pub fn new(request_id: i32, response_to: i32, op: Op) -> Self {
        let op_code = match &op {
            Op::Query(_) => OpCode::Query,
            Op::Reply(_) => OpCode::Reply,
            Op::Command(_) => OpCode::Command,
            Op::CommandReply(_) => OpCode::CommandReply,
            Op::Msg(_) => OpCode::Msg,
            Op::Other(_) => OpCode::Unknown(0),
        };

        Self {
            header: MsgHeader {
                message_length: 0,
                request_id,
                response_to,
                op_code,
            },
            op,
        }
    }

    /// Decode a single framed message (header included)
    pub fn decode(frame: Bytes) -> ProtocolResult<Self> {
        let mut cursor = frame.clone();
        let header = MsgHeader::decode(&mut cursor)?;

        if usize::try_from(header.message_length).ok() != Some(frame.len()) {
            return Err(ProtocolError::InvalidFormat(format!(
                "header declares {} bytes but frame holds {}",
                header.message_length,
                frame.len()
            )));
        }

        let body = frame.slice(HEADER_LEN..);
        let op = match header.op_code {
            OpCode::Query => Op::Query(QueryOp::decode(body)?),
            OpCode::Reply => Op::Reply(ReplyOp::decode(body)?),
            OpCode::Command => Op::Command(CommandOp::decode(body)?),
            OpCode::CommandReply => Op::CommandReply(CommandReplyOp::decode(body)?),
            OpCode::Msg => Op::Msg(MsgOp::decode(body)?),
            _ => Op::Other(body),
        };

        Ok(Self { header, op })
    }

    /// Encode with a freshly computed `message_length`
    pub fn encode(&self) -> ProtocolResult<Bytes> {
        let mut body = BytesMut::new();
        match &self.op {
            Op::Query(op) => op.encode(&mut body)?,
            Op::Reply(op) => op.encode(&mut body)?,
            Op::Command(op) => op.encode(&mut body)?,
            Op::CommandReply(op) => op.encode(&mut body)?,
            Op::Msg(op) => op.encode(&mut body)?,
            Op::Other(raw) => body.extend_from_slice(raw),
        }

        let total = HEADER_LEN + body.len();
        let message_length = i32::try_from(total)
            .map_err(|_| ProtocolError::LengthOutOfBounds(total as i64))?;

        let mut out = BytesMut::with_capacity(total);
        MsgHeader {
            message_length,
            ..self.header
        }
        .encode(&mut out);
        out.extend_from_slice(&body);

        Ok(out.freeze())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Query(op) => fmt::Display::fmt(op, f),
            Op::Reply(op) => fmt::Display::fmt(op, f),
            Op::Command(op) => fmt::Display::fmt(op, f),
            Op::CommandReply(op) => fmt::Display::fmt(op, f),
            Op::Msg(op) => fmt::Display::fmt(op, f),
            Op::Other(raw) => write!(f, "<undecoded {} bytes>", raw.len()),
        }
    }
}
