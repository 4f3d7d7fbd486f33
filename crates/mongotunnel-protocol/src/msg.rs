//! OP_MSG body

use std::fmt;

use bson::Document;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use mongotunnel_common::error::ProtocolError;

use crate::codec::{get_i32, get_u32, get_u8, read_cstring, read_document, write_cstring, write_document};
use crate::flags::MsgFlags;
use crate::ProtocolResult;

/// OP_MSG section types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SectionKind {
    Body = 0,
    DocumentSequence = 1,
}

/// Kind-1 section: a named run of documents that belongs to the body
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSequence {
    pub identifier: String,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MsgOp {
    pub flags: MsgFlags,
    pub body: Document,
    pub sequences: Vec<DocumentSequence>,
}

impl MsgOp {
    pub fn new(body: Document) -> Self {
        Self {
            flags: MsgFlags::default(),
            body,
            sequences: Vec::new(),
        }
    }

    pub fn decode(mut data: Bytes) -> ProtocolResult<Self> {
        let flags = MsgFlags(get_u32(&mut data)?);

        // The CRC-32C trailer is not verified, only skipped.
        if flags.contains(MsgFlags::CHECKSUM_PRESENT) {
            if data.remaining() < 4 {
                return Err(ProtocolError::IncompleteMessage {
                    needed: 4,
                    available: data.remaining(),
                });
            }
            data.truncate(data.len() - 4);
        }

        let mut body = None;
        let mut sequences = Vec::new();

        while data.has_remaining() {
            match get_u8(&mut data)? {
                0 => {
                    if body.is_some() {
                        return Err(ProtocolError::InvalidFormat(
                            "OP_MSG carries more than one body section".to_string(),
                        ));
                    }
                    body = Some(read_document(&mut data)?);
                }
                1 => sequences.push(decode_sequence(&mut data)?),
                kind => {
                    return Err(ProtocolError::InvalidFormat(format!(
                        "Unsupported section kind: {}",
                        kind
                    )))
                }
            }
        }

        let body = body.ok_or_else(|| {
            ProtocolError::InvalidFormat("OP_MSG without a body section".to_string())
        })?;

        Ok(Self {
            flags,
            body,
            sequences,
        })
    }

    /// Encodes without a checksum; the flag bit is cleared accordingly.
    pub fn encode(&self, out: &mut BytesMut) -> ProtocolResult<()> {
        out.put_u32_le(self.flags.0 & !MsgFlags::CHECKSUM_PRESENT);

        out.put_u8(SectionKind::Body as u8);
        write_document(out, &self.body)?;

        for sequence in &self.sequences {
            out.put_u8(SectionKind::DocumentSequence as u8);

            let mut section = BytesMut::new();
            write_cstring(&mut section, &sequence.identifier);
            for doc in &sequence.documents {
                write_document(&mut section, doc)?;
            }

            let size = i32::try_from(section.len() + 4).map_err(|_| {
                ProtocolError::InvalidFormat("document sequence too large".to_string())
            })?;
            out.put_i32_le(size);
            out.put_slice(&section);
        }
        Ok(())
    }

    /// Command name: the first key of the body
    pub fn command_name(&self) -> Option<&str> {
        self.body.keys().next().map(String::as_str)
    }

    /// Target database from the `$db` field
    pub fn database(&self) -> Option<&str> {
        self.body.get_str("$db").ok()
    }
}

fn decode_sequence(data: &mut Bytes) -> ProtocolResult<DocumentSequence> {
    let size = get_i32(data)?;
    let payload_len = usize::try_from(size)
        .ok()
        .and_then(|s| s.checked_sub(4))
        .ok_or_else(|| ProtocolError::InvalidFormat(format!("bad section size {}", size)))?;

    if data.remaining() < payload_len {
        return Err(ProtocolError::IncompleteMessage {
            needed: payload_len,
            available: data.remaining(),
        });
    }

    let mut section = data.split_to(payload_len);
    let identifier = read_cstring(&mut section)?;
    let mut documents = Vec::new();
    while section.has_remaining() {
        documents.push(read_document(&mut section)?);
    }

    Ok(DocumentSequence {
        identifier,
        documents,
    })
}

impl fmt::Display for MsgOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<MsgOp flags={} body={}", self.flags, self.body)?;
        for sequence in &self.sequences {
            write!(
                f,
                " sequence[{}]={} docs",
                sequence.identifier,
                sequence.documents.len()
            )?;
        }
        f.write_str(">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_body_and_sequence() {
        let op = MsgOp {
            flags: MsgFlags::default(),
            body: doc! { "insert": "people", "$db": "test" },
            sequences: vec![DocumentSequence {
                identifier: "documents".to_string(),
                documents: vec![doc! { "name": "Steve" }, doc! { "name": "Ale" }],
            }],
        };
        let mut out = BytesMut::new();
        op.encode(&mut out).unwrap();

        let decoded = MsgOp::decode(out.freeze()).unwrap();
        assert_eq!(decoded, op);
        assert_eq!(decoded.command_name(), Some("insert"));
        assert_eq!(decoded.database(), Some("test"));
    }

    #[test]
    fn test_checksum_trailer_is_skipped() {
        let mut out = BytesMut::new();
        out.put_u32_le(MsgFlags::CHECKSUM_PRESENT);
        out.put_u8(0);
        write_document(&mut out, &doc! { "ping": 1 }).unwrap();
        out.put_u32_le(0xdead_beef);

        let decoded = MsgOp::decode(out.freeze()).unwrap();
        assert_eq!(decoded.body, doc! { "ping": 1 });

        let mut reencoded = BytesMut::new();
        decoded.encode(&mut reencoded).unwrap();
        assert_eq!(u32::from_le_bytes([reencoded[0], reencoded[1], reencoded[2], reencoded[3]]), 0);
    }

    #[test]
    fn test_missing_body_is_error() {
        let mut out = BytesMut::new();
        out.put_u32_le(0);
        assert!(MsgOp::decode(out.freeze()).is_err());
    }

    #[test]
    fn test_unknown_section_kind_is_error() {
        let mut out = BytesMut::new();
        out.put_u32_le(0);
        out.put_u8(7);
        assert!(matches!(
            MsgOp::decode(out.freeze()),
            Err(ProtocolError::InvalidFormat(_))
        ));
    }
}
