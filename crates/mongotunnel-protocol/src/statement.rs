//! Classification of commands sent to `<db>.$cmd` and parsing of `find` statements

use std::fmt;

use bson::{doc, Bson, Document};

use mongotunnel_common::error::ProtocolError;

use crate::flags::ReplyFlags;
use crate::query::QueryOp;
use crate::reply::ReplyOp;
use crate::ProtocolResult;

/// A command against a user database: `<db>.$cmd` with `<db>` other than `admin`
pub fn is_statement(query: &QueryOp) -> bool {
    !query.collection.starts_with("admin.") && query.collection.ends_with(".$cmd")
}

/// Name of a command document: its first key
pub fn command_name(command: &Document) -> Option<&str> {
    command.keys().next().map(String::as_str)
}

pub fn is_find(query: &QueryOp) -> bool {
    is_statement(query) && command_name(&query.query) == Some("find")
}

/// Collection targeted by an `insert` command document
pub fn insert_target(command: &Document) -> Option<&str> {
    if command_name(command) != Some("insert") {
        return None;
    }
    command.get_str("insert").ok()
}

/// Copy of an `insert` command aimed at another collection; other fields untouched
pub fn retarget_insert(command: &Document, collection: &str) -> Option<Document> {
    insert_target(command)?;
    let mut copy = command.clone();
    copy.insert("insert", collection);
    Some(copy)
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        #[allow(clippy::cast_possible_truncation)]
        Bson::Double(v) if v.fract() == 0.0 => Some(*v as i64),
        _ => None,
    }
}

/// A `find` command, looked up by field name rather than position
#[derive(Debug, Clone, PartialEq)]
pub struct FindStatement {
    pub database: String,
    pub collection: String,
    pub filter: Option<Document>,
    /// -1 when the command carries no limit
    pub limit: i64,
}

impl FindStatement {
    pub fn parse(query: &QueryOp) -> ProtocolResult<Self> {
        if !is_find(query) {
            return Err(ProtocolError::UnsupportedOperation(format!(
                "not a find statement: {}",
                query.collection
            )));
        }
        Self::from_command(query.database(), &query.query)
    }

    pub fn from_command(database: &str, command: &Document) -> ProtocolResult<Self> {
        let collection = command
            .get_str("find")
            .map_err(|_| ProtocolError::InvalidFormat("find target is not a string".to_string()))?;

        let filter = match command.get("filter") {
            None | Some(Bson::Null) => None,
            Some(Bson::Document(filter)) => Some(filter.clone()),
            Some(other) => {
                return Err(ProtocolError::InvalidFormat(format!(
                    "find filter must be a document, got {}",
                    other
                )))
            }
        };

        let limit = command.get("limit").and_then(as_i64).unwrap_or(-1);

        Ok(Self {
            database: database.to_string(),
            collection: collection.to_string(),
            filter,
            limit,
        })
    }

    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

impl fmt::Display for FindStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "query for database={} collection={} with filter=",
            self.database, self.collection
        )?;
        match &self.filter {
            Some(filter) => write!(f, "{}", filter)?,
            None => f.write_str("{}")?,
        }
        write!(f, " and limit={}", self.limit)
    }
}

/// Single-batch cursor reply for a find statement
pub fn find_reply(namespace: &str, rows: Vec<Document>) -> ReplyOp {
    ReplyOp {
        flags: ReplyFlags(ReplyFlags::SHARD_CONFIG_STALE),
        cursor_id: 0,
        starting_from: 0,
        documents: vec![doc! {
            "cursor": {
                "firstBatch": rows,
                "id": 0_i64,
                "ns": namespace,
            },
            "ok": 1_i32,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::QueryFlags;

    fn cmd(collection: &str, query: Document) -> QueryOp {
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
    fn test_statement_classification() {
        assert!(is_statement(&cmd("test.$cmd", doc! { "find": "people" })));
        assert!(!is_statement(&cmd("admin.$cmd", doc! { "find": "people" })));
        assert!(!is_statement(&cmd("test.people", doc! { "name": "Steve" })));

        assert!(is_find(&cmd("test.$cmd", doc! { "find": "people" })));
        assert!(!is_find(&cmd("test.$cmd", doc! { "insert": "people" })));
    }

    #[test]
    fn test_parse_find_with_filter_and_limit() {
        let query = cmd(
            "test.$cmd",
            doc! { "find": "people", "filter": { "name": "Steve" }, "limit": 10 },
        );
        let find = FindStatement::parse(&query).unwrap();
        assert_eq!(find.database, "test");
        assert_eq!(find.collection, "people");
        assert_eq!(find.filter, Some(doc! { "name": "Steve" }));
        assert_eq!(find.limit, 10);
        assert_eq!(find.namespace(), "test.people");
        let line = find.to_string();
        assert!(line.starts_with("query for database=test collection=people with filter="));
        assert!(line.contains("Steve"));
        assert!(line.ends_with(" and limit=10"));
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let query = cmd(
            "test.$cmd",
            doc! { "find": "people", "limit": 3_i64, "filter": { "name": "Steve" } },
        );
        let find = FindStatement::parse(&query).unwrap();
        assert_eq!(find.limit, 3);
        assert!(find.filter.is_some());
    }

    #[test]
    fn test_parse_find_defaults() {
        let find = FindStatement::parse(&cmd("test.$cmd", doc! { "find": "people" })).unwrap();
        assert_eq!(find.filter, None);
        assert_eq!(find.limit, -1);
    }

    #[test]
    fn test_parse_rejects_non_find() {
        assert!(FindStatement::parse(&cmd("test.$cmd", doc! { "drop": "people" })).is_err());
        assert!(FindStatement::parse(&cmd("test.$cmd", doc! { "find": 1 })).is_err());
    }

    #[test]
    fn test_retarget_insert_keeps_order() {
        let command = doc! { "insert": "people", "documents": [{ "name": "Steve" }], "ordered": true };
        assert_eq!(insert_target(&command), Some("people"));

        let mirror = retarget_insert(&command, "employees").unwrap();
        assert_eq!(command_name(&mirror), Some("insert"));
        assert_eq!(insert_target(&mirror), Some("employees"));
        assert_eq!(mirror.get_array("documents").unwrap().len(), 1);

        assert!(retarget_insert(&doc! { "find": "people" }, "employees").is_none());
    }

    #[test]
    fn test_find_reply_shape() {
        let reply = find_reply("test.people", vec![doc! { "name": "Steve" }]);
        let body = &reply.documents[0];
        let cursor = body.get_document("cursor").unwrap();
        assert_eq!(cursor.get_str("ns").unwrap(), "test.people");
        assert_eq!(cursor.get_i64("id").unwrap(), 0);
        assert_eq!(cursor.get_array("firstBatch").unwrap().len(), 1);
        assert_eq!(body.get_i32("ok").unwrap(), 1);
    }
}
