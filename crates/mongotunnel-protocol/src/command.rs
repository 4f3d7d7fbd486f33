//! OP_COMMAND / OP_COMMANDREPLY bodies

use std::fmt;

use bson::Document;
use bytes::{Bytes, BytesMut};

use crate::codec::{read_cstring, read_document, read_documents, write_cstring, write_document};
use crate::ProtocolResult;

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOp {
    pub database: String,
    pub command_name: String,
    pub metadata: Document,
    pub command_args: Document,
    pub input_docs: Vec<Document>,
}

impl CommandOp {
    pub fn decode(mut body: Bytes) -> ProtocolResult<Self> {
        Ok(Self {
            database: read_cstring(&mut body)?,
            command_name: read_cstring(&mut body)?,
            metadata: read_document(&mut body)?,
            command_args: read_document(&mut body)?,
            input_docs: read_documents(&mut body)?,
        })
    }

    pub fn encode(&self, out: &mut BytesMut) -> ProtocolResult<()> {
        write_cstring(out, &self.database);
        write_cstring(out, &self.command_name);
        write_document(out, &self.metadata)?;
        write_document(out, &self.command_args)?;
        for doc in &self.input_docs {
            write_document(out, doc)?;
        }
        Ok(())
    }
}

impl fmt::Display for CommandOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<CommandOp database={:?} command={:?} metadata={} args={} input_docs={}>",
            self.database,
            self.command_name,
            self.metadata,
            self.command_args,
            self.input_docs.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandReplyOp {
    pub metadata: Document,
    pub command_reply: Document,
    pub output_docs: Vec<Document>,
}

impl CommandReplyOp {
    pub fn decode(mut body: Bytes) -> ProtocolResult<Self> {
        Ok(Self {
            metadata: read_document(&mut body)?,
            command_reply: read_document(&mut body)?,
            output_docs: read_documents(&mut body)?,
        })
    }

    pub fn encode(&self, out: &mut BytesMut) -> ProtocolResult<()> {
        write_document(out, &self.metadata)?;
        write_document(out, &self.command_reply)?;
        for doc in &self.output_docs {
            write_document(out, doc)?;
        }
        Ok(())
    }
}

impl fmt::Display for CommandReplyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<CommandReplyOp metadata={} reply={} output_docs={}>",
            self.metadata,
            self.command_reply,
            self.output_docs.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_command_without_input_docs() {
        let mut out = BytesMut::new();
        write_cstring(&mut out, "test");
        write_cstring(&mut out, "find");
        write_document(&mut out, &doc! {}).unwrap();
        write_document(&mut out, &doc! { "find": "people" }).unwrap();

        let op = CommandOp::decode(out.freeze()).unwrap();
        assert_eq!(op.database, "test");
        assert_eq!(op.command_name, "find");
        assert_eq!(op.command_args.get_str("find").unwrap(), "people");
        assert!(op.input_docs.is_empty());
    }

    #[test]
    fn test_command_reply_with_output_docs() {
        let op = CommandReplyOp {
            metadata: doc! {},
            command_reply: doc! { "ok": 1.0 },
            output_docs: vec![doc! { "name": "Steve" }],
        };
        let mut out = BytesMut::new();
        op.encode(&mut out).unwrap();

        let decoded = CommandReplyOp::decode(out.freeze()).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn test_command_missing_args_is_error() {
        let mut out = BytesMut::new();
        write_cstring(&mut out, "test");
        write_cstring(&mut out, "find");
        write_document(&mut out, &doc! {}).unwrap();

        assert!(CommandOp::decode(out.freeze()).is_err());
    }
}
