//! Wire protocol opcodes

use std::fmt;

/// MongoDB wire protocol opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Reply to a client request. responseTo is set.
    Reply,
    Update,
    Insert,
    /// Formerly used for OP_GET_BY_OID.
    Reserved,
    Query,
    GetMore,
    Delete,
    KillCursors,
    /// Cluster internal command request.
    Command,
    /// Reply to an OP_COMMAND.
    CommandReply,
    Compressed,
    Msg,
    Unknown(i32),
}

impl OpCode {
    pub fn as_i32(self) -> i32 {
        match self {
            OpCode::Reply => 1,
            OpCode::Update => 2001,
            OpCode::Insert => 2002,
            OpCode::Reserved => 2003,
            OpCode::Query => 2004,
            OpCode::GetMore => 2005,
            OpCode::Delete => 2006,
            OpCode::KillCursors => 2007,
            OpCode::Command => 2010,
            OpCode::CommandReply => 2011,
            OpCode::Compressed => 2012,
            OpCode::Msg => 2013,
            OpCode::Unknown(code) => code,
        }
    }
}

impl From<i32> for OpCode {
    fn from(value: i32) -> Self {
        match value {
            1 => OpCode::Reply,
            2001 => OpCode::Update,
            2002 => OpCode::Insert,
            2003 => OpCode::Reserved,
            2004 => OpCode::Query,
            2005 => OpCode::GetMore,
            2006 => OpCode::Delete,
            2007 => OpCode::KillCursors,
            2010 => OpCode::Command,
            2011 => OpCode::CommandReply,
            2012 => OpCode::Compressed,
            2013 => OpCode::Msg,
            other => OpCode::Unknown(other),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::Reply => "REPLY",
            OpCode::Update => "UPDATE",
            OpCode::Insert => "INSERT",
            OpCode::Reserved => "RESERVED",
            OpCode::Query => "QUERY",
            OpCode::GetMore => "GET_MORE",
            OpCode::Delete => "DELETE",
            OpCode::KillCursors => "KILL_CURSORS",
            OpCode::Command => "COMMAND",
            OpCode::CommandReply => "COMMANDREPLY",
            OpCode::Compressed => "COMPRESSED",
            OpCode::Msg => "MSG",
            OpCode::Unknown(code) => return write!(f, "UNKNOWN({})", code),
        };
        f.write_str(name)
    }
}
