//! Per-message inspection: logging, handshake answering and insert mirroring

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use mongotunnel_protocol::negotiate::{handshake_reply, is_handshake};
use mongotunnel_protocol::statement::{self, insert_target, retarget_insert, FindStatement};
use mongotunnel_protocol::{Message, MsgFlags, MsgOp, Op, QueryOp};

use crate::connection::ProxySettings;

/// Offset added to a request id to form the id of its mirrored copy
pub const MIRROR_REQUEST_ID_OFFSET: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToServer => f.write_str(">>>"),
            Direction::ServerToClient => f.write_str("<<<"),
        }
    }
}

/// What the pipe should do with a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Forward,
    /// Forward the frame, then the mirrored copy
    ForwardWithMirror(Bytes),
    /// Do not forward; write this reply back to the client instead
    Answer(Bytes),
    /// Drop the frame
    Swallow,
}

/// Request ids of mirrored inserts whose replies must not reach the client
#[derive(Debug, Clone, Default)]
pub struct PendingMirrors(Arc<Mutex<HashSet<i32>>>);

impl PendingMirrors {
    pub fn insert(&self, request_id: i32) {
        self.0.lock().insert(request_id);
    }

    /// Remove `response_to` if it was pending
    pub fn take(&self, response_to: i32) -> bool {
        self.0.lock().remove(&response_to)
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Inspector {
    direction: Direction,
    hex: bool,
    mirror_collection: Option<String>,
    answer_handshake: bool,
    pending: PendingMirrors,
    next_reply_id: AtomicI32,
}

impl Inspector {
    pub fn new(direction: Direction, settings: &ProxySettings, pending: PendingMirrors) -> Self {
        Self {
            direction,
            hex: settings.hex,
            mirror_collection: settings.mirror_collection.clone(),
            answer_handshake: settings.answer_handshake,
            pending,
            next_reply_id: AtomicI32::new(1),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn inspect(&self, frame: &Bytes) -> Verdict {
        let arrow = self.direction;

        if self.hex {
            trace!("{} {}", arrow, hex::encode(frame));
        } else {
            trace!("{} {}", arrow, String::from_utf8_lossy(frame));
        }

        let message = match Message::decode(frame.clone()) {
            Ok(message) => message,
            Err(e) => {
                debug!("{} {} bytes, failed to decode: {}", arrow, frame.len(), e);
                return Verdict::Forward;
            }
        };

        debug!("{} {}", arrow, message.header);
        debug!("{} {}", arrow, message.op);

        match self.direction {
            Direction::ClientToServer => self.inspect_request(&message),
            Direction::ServerToClient => {
                if self.pending.take(message.header.response_to) {
                    debug!(
                        "{} swallowing reply to mirrored request {}",
                        arrow, message.header.response_to
                    );
                    Verdict::Swallow
                } else {
                    Verdict::Forward
                }
            }
        }
    }

    fn inspect_request(&self, message: &Message) -> Verdict {
        match &message.op {
            Op::Query(query) => {
                if self.answer_handshake && is_handshake(query) {
                    if let Some(reply) = self.answer(message.header.request_id, query) {
                        return Verdict::Answer(reply);
                    }
                }
                if statement::is_find(query) {
                    log_find(FindStatement::parse(query));
                }
            }
            Op::Msg(msg) if statement::command_name(&msg.body) == Some("find") => {
                log_find(FindStatement::from_command(
                    msg.database().unwrap_or_default(),
                    &msg.body,
                ));
            }
            _ => {}
        }

        match self.mirror(message) {
            Some(mirror) => Verdict::ForwardWithMirror(mirror),
            None => Verdict::Forward,
        }
    }

    fn answer(&self, request_id: i32, query: &QueryOp) -> Option<Bytes> {
        let reply = match handshake_reply(query) {
            Ok(reply) => reply,
            Err(e) => {
                debug!("{}; forwarding to upstream", e);
                return None;
            }
        };

        let reply_id = self.next_reply_id.fetch_add(1, Ordering::Relaxed);
        match Message::new(reply_id, request_id, Op::Reply(reply)).encode() {
            Ok(bytes) => {
                info!("Answered handshake request {} locally", request_id);
                Some(bytes)
            }
            Err(e) => {
                warn!("Failed to encode handshake reply: {}", e);
                None
            }
        }
    }

    /// Copy of an insert command aimed at the mirror collection
    fn mirror(&self, message: &Message) -> Option<Bytes> {
        let target = self.mirror_collection.as_deref()?;

        let (source, op, expects_reply) = match &message.op {
            Op::Query(query) if statement::is_statement(query) => {
                let source = insert_target(&query.query)?.to_string();
                let command = retarget_insert(&query.query, target)?;
                let op = Op::Query(QueryOp {
                    query: command,
                    ..query.clone()
                });
                (source, op, true)
            }
            Op::Msg(msg) => {
                let source = insert_target(&msg.body)?.to_string();
                let body = retarget_insert(&msg.body, target)?;
                let expects_reply = !msg.flags.contains(MsgFlags::MORE_TO_COME);
                let op = Op::Msg(MsgOp {
                    body,
                    ..msg.clone()
                });
                (source, op, expects_reply)
            }
            _ => return None,
        };

        if source == target {
            return None;
        }

        let request_id = message
            .header
            .request_id
            .wrapping_add(MIRROR_REQUEST_ID_OFFSET);

        let bytes = match Message::new(request_id, message.header.response_to, op).encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode mirrored insert: {}", e);
                return None;
            }
        };

        if expects_reply {
            self.pending.insert(request_id);
        }
        debug!(
            "Mirroring insert into {} as request {} against {}",
            source, request_id, target
        );
        Some(bytes)
    }
}

fn log_find(find: mongotunnel_protocol::ProtocolResult<FindStatement>) {
    match find {
        Ok(find) => debug!("{}", find),
        Err(e) => debug!("Failed to parse find statement: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use mongotunnel_protocol::{QueryFlags, ReplyFlags, ReplyOp};

    fn settings(mirror: Option<&str>, answer_handshake: bool) -> ProxySettings {
        ProxySettings {
            upstream: "127.0.0.1:27017".to_string(),
            nodelay: true,
            hex: true,
            mirror_collection: mirror.map(str::to_string),
            answer_handshake,
            tls: None,
        }
    }

    fn query_frame(request_id: i32, collection: &str, query: bson::Document) -> Bytes {
        Message::new(
            request_id,
            0,
            Op::Query(QueryOp {
                flags: QueryFlags::default(),
                collection: collection.to_string(),
                skip: 0,
                limit: -1,
                query,
                selector: None,
            }),
        )
        .encode()
        .unwrap()
    }

    fn reply_frame(response_to: i32) -> Bytes {
        Message::new(
            9,
            response_to,
            Op::Reply(ReplyOp {
                flags: ReplyFlags::default(),
                cursor_id: 0,
                starting_from: 0,
                documents: vec![doc! { "ok": 1, "n": 1 }],
            }),
        )
        .encode()
        .unwrap()
    }

    #[test]
    fn test_plain_traffic_is_forwarded() {
        let pending = PendingMirrors::default();
        let inspector = Inspector::new(Direction::ClientToServer, &settings(None, false), pending.clone());

        let frame = query_frame(1, "test.$cmd", doc! { "insert": "people", "documents": [] });
        assert_eq!(inspector.inspect(&frame), Verdict::Forward);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_insert_query_is_mirrored() {
        let pending = PendingMirrors::default();
        let inspector = Inspector::new(
            Direction::ClientToServer,
            &settings(Some("employees"), false),
            pending.clone(),
        );

        let frame = query_frame(
            5,
            "test.$cmd",
            doc! { "insert": "people", "documents": [{ "name": "Ale" }], "ordered": true },
        );
        let Verdict::ForwardWithMirror(mirror) = inspector.inspect(&frame) else {
            panic!("expected a mirrored insert");
        };

        let mirror = Message::decode(mirror).unwrap();
        assert_eq!(mirror.header.request_id, 105);
        let Op::Query(query) = mirror.op else {
            panic!("mirror must stay an OP_QUERY");
        };
        assert_eq!(query.collection, "test.$cmd");
        assert_eq!(query.query.get_str("insert").unwrap(), "employees");
        assert_eq!(query.query.get_array("documents").unwrap().len(), 1);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_mirror_reply_is_swallowed_once() {
        let pending = PendingMirrors::default();
        pending.insert(105);
        let inspector = Inspector::new(Direction::ServerToClient, &settings(Some("employees"), false), pending.clone());

        assert_eq!(inspector.inspect(&reply_frame(5)), Verdict::Forward);
        assert_eq!(inspector.inspect(&reply_frame(105)), Verdict::Swallow);
        assert_eq!(inspector.inspect(&reply_frame(105)), Verdict::Forward);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_op_msg_insert_is_mirrored() {
        let pending = PendingMirrors::default();
        let inspector = Inspector::new(
            Direction::ClientToServer,
            &settings(Some("employees"), false),
            pending.clone(),
        );

        let frame = Message::new(
            i32::MAX - 10,
            0,
            Op::Msg(MsgOp::new(doc! { "insert": "people", "ordered": true, "$db": "test" })),
        )
        .encode()
        .unwrap();

        let Verdict::ForwardWithMirror(mirror) = inspector.inspect(&frame) else {
            panic!("expected a mirrored insert");
        };
        let mirror = Message::decode(mirror).unwrap();
        assert_eq!(mirror.header.request_id, (i32::MAX - 10).wrapping_add(100));
        let Op::Msg(msg) = mirror.op else {
            panic!("mirror must stay an OP_MSG");
        };
        assert_eq!(msg.body.get_str("insert").unwrap(), "employees");
        assert_eq!(msg.database(), Some("test"));
    }

    #[test]
    fn test_fire_and_forget_mirror_is_not_pending() {
        let pending = PendingMirrors::default();
        let inspector = Inspector::new(
            Direction::ClientToServer,
            &settings(Some("employees"), false),
            pending.clone(),
        );

        let mut msg = MsgOp::new(doc! { "insert": "people", "$db": "test" });
        msg.flags = MsgFlags(MsgFlags::MORE_TO_COME);
        let frame = Message::new(3, 0, Op::Msg(msg)).encode().unwrap();

        assert!(matches!(inspector.inspect(&frame), Verdict::ForwardWithMirror(_)));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_insert_into_mirror_collection_is_not_mirrored() {
        let inspector = Inspector::new(
            Direction::ClientToServer,
            &settings(Some("employees"), false),
            PendingMirrors::default(),
        );
        let frame = query_frame(1, "test.$cmd", doc! { "insert": "employees", "documents": [] });
        assert_eq!(inspector.inspect(&frame), Verdict::Forward);
    }

    #[test]
    fn test_handshake_answered_locally() {
        let inspector = Inspector::new(
            Direction::ClientToServer,
            &settings(None, true),
            PendingMirrors::default(),
        );

        let frame = query_frame(42, "admin.$cmd", doc! { "isMaster": 1 });
        let Verdict::Answer(reply) = inspector.inspect(&frame) else {
            panic!("expected a local answer");
        };

        let reply = Message::decode(reply).unwrap();
        assert_eq!(reply.header.response_to, 42);
        let Op::Reply(reply) = reply.op else {
            panic!("handshake answer must be an OP_REPLY");
        };
        assert!(reply.documents[0].get_bool("ismaster").unwrap());
    }

    #[test]
    fn test_unknown_admin_command_is_forwarded() {
        let inspector = Inspector::new(
            Direction::ClientToServer,
            &settings(None, true),
            PendingMirrors::default(),
        );
        let frame = query_frame(1, "admin.$cmd", doc! { "buildInfo": 1 });
        assert_eq!(inspector.inspect(&frame), Verdict::Forward);
    }

    #[test]
    fn test_undecodable_frame_is_forwarded() {
        let inspector = Inspector::new(
            Direction::ClientToServer,
            &settings(Some("employees"), true),
            PendingMirrors::default(),
        );
        let mut raw = vec![20, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0];
        raw.extend_from_slice(&2004_i32.to_le_bytes());
        raw.extend_from_slice(&[0xff; 4]);
        assert_eq!(inspector.inspect(&Bytes::from(raw)), Verdict::Forward);
    }
}
