//! Little-endian primitives, C strings and embedded BSON documents

use bson::Document;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use mongotunnel_common::error::ProtocolError;

use crate::ProtocolResult;

fn ensure(buf: &Bytes, needed: usize) -> ProtocolResult<()> {
    if buf.remaining() < needed {
        return Err(ProtocolError::IncompleteMessage {
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

pub fn get_u8(buf: &mut Bytes) -> ProtocolResult<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn get_i32(buf: &mut Bytes) -> ProtocolResult<i32> {
    ensure(buf, 4)?;
    Ok(buf.get_i32_le())
}

pub fn get_u32(buf: &mut Bytes) -> ProtocolResult<u32> {
    ensure(buf, 4)?;
    Ok(buf.get_u32_le())
}

pub fn get_i64(buf: &mut Bytes) -> ProtocolResult<i64> {
    ensure(buf, 8)?;
    Ok(buf.get_i64_le())
}

/// Read a NUL-terminated UTF-8 string and consume the terminator
pub fn read_cstring(buf: &mut Bytes) -> ProtocolResult<String> {
    let end = buf
        .iter()
        .position(|b| *b == 0)
        .ok_or(ProtocolError::UnterminatedString)?;

    let raw = buf.split_to(end);
    buf.advance(1);

    String::from_utf8(raw.to_vec())
        .map_err(|e| ProtocolError::InvalidFormat(format!("C string is not UTF-8: {}", e)))
}

pub fn write_cstring(out: &mut BytesMut, value: &str) {
    out.put_slice(value.as_bytes());
    out.put_u8(0);
}

/// Read one length-prefixed BSON document
pub fn read_document(buf: &mut Bytes) -> ProtocolResult<Document> {
    ensure(buf, 4)?;
    let length = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);

    // Smallest valid document is the empty one: length + terminator.
    if length < 5 {
        return Err(ProtocolError::InvalidDocument(format!(
            "declared length {} is too small",
            length
        )));
    }

    let length = length as usize;
    ensure(buf, length)?;
    let raw = buf.split_to(length);

    Document::from_reader(&mut std::io::Cursor::new(&raw[..]))
        .map_err(|e| ProtocolError::InvalidDocument(e.to_string()))
}

/// Read documents until the buffer is exhausted
pub fn read_documents(buf: &mut Bytes) -> ProtocolResult<Vec<Document>> {
    let mut documents = Vec::new();
    while buf.has_remaining() {
        documents.push(read_document(buf)?);
    }
    Ok(documents)
}

pub fn write_document(out: &mut BytesMut, doc: &Document) -> ProtocolResult<()> {
    let mut raw = Vec::new();
    doc.to_writer(&mut raw)
        .map_err(|e| ProtocolError::InvalidDocument(e.to_string()))?;
    out.put_slice(&raw);
    Ok(())
}
