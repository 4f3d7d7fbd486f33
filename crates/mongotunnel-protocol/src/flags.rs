//! Flag bitsets carried by OP_QUERY, OP_REPLY and OP_MSG

use std::fmt;

fn write_flag_names(f: &mut fmt::Formatter<'_>, bits: u32, names: &[(u32, &str)]) -> fmt::Result {
    f.write_str("[")?;
    let mut first = true;
    for (bit, name) in names {
        if bits & bit != 0 {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
            first = false;
        }
    }
    f.write_str("]")
}

/// OP_QUERY flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFlags(pub u32);

impl QueryFlags {
    pub const TAILABLE: u32 = 1 << 1;
    pub const SLAVE_OK: u32 = 1 << 2;
    pub const OPLOG_REPLAY: u32 = 1 << 3;
    pub const NO_CURSOR_TIMEOUT: u32 = 1 << 4;
    pub const AWAIT_DATA: u32 = 1 << 5;
    pub const EXHAUST: u32 = 1 << 6;
    pub const PARTIAL: u32 = 1 << 7;

    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

impl fmt::Display for QueryFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flag_names(
            f,
            self.0,
            &[
                (Self::TAILABLE, "tailable"),
                (Self::SLAVE_OK, "slaveOk"),
                (Self::OPLOG_REPLAY, "oplogReplay"),
                (Self::NO_CURSOR_TIMEOUT, "noCursorTimeout"),
                (Self::AWAIT_DATA, "awaitData"),
                (Self::EXHAUST, "exhaust"),
                (Self::PARTIAL, "partial"),
            ],
        )
    }
}

/// OP_REPLY flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyFlags(pub u32);

impl ReplyFlags {
    pub const CURSOR_NOT_FOUND: u32 = 1;
    pub const QUERY_FAILURE: u32 = 1 << 1;
    pub const SHARD_CONFIG_STALE: u32 = 1 << 2;
    pub const AWAIT_CAPABLE: u32 = 1 << 3;

    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

impl fmt::Display for ReplyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flag_names(
            f,
            self.0,
            &[
                (Self::CURSOR_NOT_FOUND, "cursorNotFound"),
                (Self::QUERY_FAILURE, "queryFailure"),
                (Self::SHARD_CONFIG_STALE, "shardConfigStale"),
                (Self::AWAIT_CAPABLE, "awaitCapable"),
            ],
        )
    }
}

/// OP_MSG flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgFlags(pub u32);

impl MsgFlags {
    pub const CHECKSUM_PRESENT: u32 = 1;
    pub const MORE_TO_COME: u32 = 1 << 1;
    pub const EXHAUST_ALLOWED: u32 = 1 << 16;

    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

impl fmt::Display for MsgFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flag_names(
            f,
            self.0,
            &[
                (Self::CHECKSUM_PRESENT, "checksumPresent"),
                (Self::MORE_TO_COME, "moreToCome"),
                (Self::EXHAUST_ALLOWED, "exhaustAllowed"),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_flags_display() {
        let flags = QueryFlags(QueryFlags::TAILABLE | QueryFlags::SLAVE_OK);
        assert_eq!(flags.to_string(), "[tailable, slaveOk]");
        assert_eq!(QueryFlags::default().to_string(), "[]");
    }

    #[test]
    fn test_reply_flags_display() {
        let flags = ReplyFlags(ReplyFlags::SHARD_CONFIG_STALE);
        assert!(flags.contains(ReplyFlags::SHARD_CONFIG_STALE));
        assert!(!flags.contains(ReplyFlags::QUERY_FAILURE));
        assert_eq!(flags.to_string(), "[shardConfigStale]");
    }

    #[test]
    fn test_reserved_query_bit_is_not_named() {
        assert_eq!(QueryFlags(1).to_string(), "[]");
    }
}
