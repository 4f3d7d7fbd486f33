//! OP_QUERY body

use std::fmt;

use bson::Document;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{get_i32, get_u32, read_cstring, read_document, write_cstring, write_document};
use crate::flags::QueryFlags;
use crate::ProtocolResult;

/// Legacy query; drivers of this era also send commands through it against `<db>.$cmd`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOp {
    pub flags: QueryFlags,
    /// "database.collection"
    pub collection: String,
    pub skip: i32,
    pub limit: i32,
    pub query: Document,
    pub selector: Option<Document>,
}

impl QueryOp {
    pub fn decode(mut body: Bytes) -> ProtocolResult<Self> {
        let flags = QueryFlags(get_u32(&mut body)?);
        let collection = read_cstring(&mut body)?;
        let skip = get_i32(&mut body)?;
        let limit = get_i32(&mut body)?;
        let query = read_document(&mut body)?;

        let selector = if body.has_remaining() {
            Some(read_document(&mut body)?)
        } else {
            None
        };

        Ok(Self {
            flags,
            collection,
            skip,
            limit,
            query,
            selector,
        })
    }

    pub fn encode(&self, out: &mut BytesMut) -> ProtocolResult<()> {
        out.put_u32_le(self.flags.0);
        write_cstring(out, &self.collection);
        out.put_i32_le(self.skip);
        out.put_i32_le(self.limit);
        write_document(out, &self.query)?;
        if let Some(selector) = &self.selector {
            write_document(out, selector)?;
        }
        Ok(())
    }

    /// Database part of the namespace
    pub fn database(&self) -> &str {
        self.collection
            .split_once('.')
            .map_or(self.collection.as_str(), |(db, _)| db)
    }
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<QueryOp collection={} skip={} limit={} query={} flags={}",
            self.collection, self.skip, self.limit, self.query, self.flags
        )?;
        if let Some(selector) = &self.selector {
            write!(f, " selector={}", selector)?;
        }
        f.write_str(">")
    }
}
