//! MongoDB wire protocol
//!
//! Framing and codecs for the messages a MongoDB driver and server exchange:
//! - standard header and stream framing
//! - OP_QUERY / OP_REPLY (legacy drivers, handshake)
//! - OP_COMMAND / OP_COMMANDREPLY
//! - OP_MSG (current drivers)
//!
//! Plus the command-level helpers the proxy needs: handshake answering,
//! `find` statement parsing and `insert` retargeting.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod command;
pub mod flags;
pub mod header;
pub mod message;
pub mod msg;
pub mod negotiate;
pub mod opcode;
pub mod query;
pub mod reply;
pub mod statement;

pub use command::{CommandOp, CommandReplyOp};
pub use flags::{MsgFlags, QueryFlags, ReplyFlags};
pub use header::{frame_length, MsgHeader, HEADER_LEN, MAX_MESSAGE_SIZE};
pub use message::{Message, Op};
pub use msg::{DocumentSequence, MsgOp, SectionKind};
pub use opcode::OpCode;
pub use query::QueryOp;
pub use reply::ReplyOp;
pub use statement::FindStatement;

use mongotunnel_common::error::ProtocolError;

/// Result type for codec operations
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
