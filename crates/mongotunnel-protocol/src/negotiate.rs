//! Driver handshake detection and the canned server description the proxy can answer with

use bson::{doc, Bson};

use mongotunnel_common::error::ProtocolError;

use crate::flags::ReplyFlags;
use crate::query::QueryOp;
use crate::reply::ReplyOp;
use crate::ProtocolResult;

const HANDSHAKE_NAMESPACE: &str = "admin.$cmd";
const HANDSHAKE_COMMANDS: [&str; 3] = ["isMaster", "ismaster", "hello"];

/// Queries against `admin.$cmd` are connection negotiation
pub fn is_handshake(query: &QueryOp) -> bool {
    query.collection == HANDSHAKE_NAMESPACE
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Int32(v) => *v == 1,
        Bson::Int64(v) => *v == 1,
        Bson::Double(v) => (*v - 1.0).abs() < f64::EPSILON,
        Bson::Boolean(v) => *v,
        _ => false,
    }
}

/// Build the OP_REPLY answering an `isMaster`/`hello` handshake query
pub fn handshake_reply(query: &QueryOp) -> ProtocolResult<ReplyOp> {
    let recognised = HANDSHAKE_COMMANDS
        .iter()
        .any(|name| query.query.get(*name).map_or(false, is_truthy));

    if !is_handshake(query) || !recognised {
        return Err(ProtocolError::UnrecognizedHandshake(query.query.to_string()));
    }

    Ok(ReplyOp {
        flags: ReplyFlags(ReplyFlags::SHARD_CONFIG_STALE),
        cursor_id: 0,
        starting_from: 0,
        documents: vec![doc! {
            "ismaster": true,
            "maxBsonObjectSize": 16_777_216_i32,
            "maxMessageSizeBytes": 48_000_000_i32,
            "maxWriteBatchSize": 1000_i32,
            "localTime": bson::DateTime::now(),
            "maxWireVersion": 5_i32,
            "minWireVersion": 0_i32,
            "readOnly": false,
            "ok": 1_i32,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::QueryFlags;
    use bson::Document;

    fn query(collection: &str, query: Document) -> QueryOp {
        QueryOp {
            flags: QueryFlags::default(),
            collection: collection.to_string(),
            skip: 0,
            limit: -1,
            query,
            selector: None,
        }
    }

    #[test]
    fn test_is_handshake() {
        assert!(is_handshake(&query("admin.$cmd", doc! { "ismaster": 1 })));
        assert!(!is_handshake(&query("test.$cmd", doc! { "ismaster": 1 })));
    }

    #[test]
    fn test_ismaster_reply() {
        let reply = handshake_reply(&query("admin.$cmd", doc! { "ismaster": 1 })).unwrap();
        assert!(reply.flags.contains(ReplyFlags::SHARD_CONFIG_STALE));
        assert_eq!(reply.documents.len(), 1);

        let body = &reply.documents[0];
        assert!(body.get_bool("ismaster").unwrap());
        assert_eq!(body.get_i32("maxWireVersion").unwrap(), 5);
        assert_eq!(body.get_i32("maxBsonObjectSize").unwrap(), 16_777_216);
        assert_eq!(body.get_i32("ok").unwrap(), 1);
    }

    #[test]
    fn test_hello_and_camel_case_are_recognised() {
        assert!(handshake_reply(&query("admin.$cmd", doc! { "isMaster": true })).is_ok());
        assert!(handshake_reply(&query("admin.$cmd", doc! { "hello": 1.0 })).is_ok());
    }

    #[test]
    fn test_other_admin_commands_are_rejected() {
        let err = handshake_reply(&query("admin.$cmd", doc! { "buildInfo": 1 })).unwrap_err();
        assert!(matches!(err, ProtocolError::UnrecognizedHandshake(_)));
        assert!(handshake_reply(&query("admin.$cmd", doc! { "ismaster": 0 })).is_err());
    }
}
