//! OP_REPLY body

use std::fmt;

use bson::Document;
use bytes::{BufMut, Bytes, BytesMut};

use mongotunnel_common::error::ProtocolError;

use crate::codec::{get_i32, get_i64, get_u32, read_documents, write_document};
use crate::flags::ReplyFlags;
use crate::ProtocolResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplyOp {
    pub flags: ReplyFlags,
    pub cursor_id: i64,
    pub starting_from: i32,
    pub documents: Vec<Document>,
}

impl ReplyOp {
    pub fn decode(mut body: Bytes) -> ProtocolResult<Self> {
        let flags = ReplyFlags(get_u32(&mut body)?);
        let cursor_id = get_i64(&mut body)?;
        let starting_from = get_i32(&mut body)?;
        let number_returned = get_i32(&mut body)?;
        let documents = read_documents(&mut body)?;

        if usize::try_from(number_returned).ok() != Some(documents.len()) {
            return Err(ProtocolError::InvalidFormat(format!(
                "reply announced {} documents but carried {}",
                number_returned,
                documents.len()
            )));
        }

        Ok(Self {
            flags,
            cursor_id,
            starting_from,
            documents,
        })
    }

    pub fn encode(&self, out: &mut BytesMut) -> ProtocolResult<()> {
        out.put_u32_le(self.flags.0);
        out.put_i64_le(self.cursor_id);
        out.put_i32_le(self.starting_from);
        out.put_i32_le(self.number_returned());
        for doc in &self.documents {
            write_document(out, doc)?;
        }
        Ok(())
    }

    pub fn number_returned(&self) -> i32 {
        i32::try_from(self.documents.len()).unwrap_or(i32::MAX)
    }
}

impl fmt::Display for ReplyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<ReplyOp cursor_id={} starting_from={} number_returned={} flags={} documents=[",
            self.cursor_id,
            self.starting_from,
            self.documents.len(),
            self.flags
        )?;
        for (i, doc) in self.documents.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", doc)?;
        }
        f.write_str("]>")
    }
}
