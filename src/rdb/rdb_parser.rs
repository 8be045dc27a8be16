use std::collections::HashMap;

use bytes::Bytes;
use jiff::Timestamp;
use tracing::debug;

use crate::rdb::{
    opcode::{parse_header, parse_opcode, OpCode},
    RdbError, SnapshotEntry, SnapshotExpiry, SnapshotExpiryKind,
};

/// Walks an in-memory RDB image and collects its string entries.
#[derive(Debug, Default)]
pub struct RdbParser {
    pub version: Option<u32>,
    pub metadata: HashMap<Bytes, Bytes>,
    pub database_number: Option<usize>,
    pub entries: Vec<SnapshotEntry>,
}

impl RdbParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(mut self, bytes: &[u8]) -> Result<Vec<SnapshotEntry>, RdbError> {
        let (version, mut cursor) = parse_header(bytes)?;
        self.version = Some(version);

        let mut pending_expiry: Option<SnapshotExpiry> = None;

        loop {
            let (opcode, read) = parse_opcode(bytes, cursor)?;
            cursor += read;

            match opcode {
                OpCode::Metadata { key, value } => {
                    self.metadata.insert(key, value);
                }
                OpCode::ResizeDb {
                    hash_table_size,
                    expiry_hash_table_size,
                } => {
                    debug!(hash_table_size, expiry_hash_table_size, "snapshot resizedb");
                    // Sizes come from the file; never trust them beyond what it can hold.
                    self.entries
                        .reserve(hash_table_size.min(bytes.len().saturating_sub(cursor)));
                }
                OpCode::Database { database_number } => {
                    self.database_number = Some(database_number);
                }
                OpCode::ExpirationSeconds(seconds) => {
                    let unix_time = Timestamp::from_second(seconds as i64)
                        .map_err(|e| RdbError::InvalidTimestamp(e.to_string()))?;

                    pending_expiry = Some(SnapshotExpiry {
                        kind: SnapshotExpiryKind::Ex,
                        unix_time,
                    });
                }
                OpCode::ExpirationMilliseconds(milliseconds) => {
                    let milliseconds = i64::try_from(milliseconds)
                        .map_err(|e| RdbError::InvalidTimestamp(e.to_string()))?;
                    let unix_time = Timestamp::from_millisecond(milliseconds)
                        .map_err(|e| RdbError::InvalidTimestamp(e.to_string()))?;

                    pending_expiry = Some(SnapshotExpiry {
                        kind: SnapshotExpiryKind::Px,
                        unix_time,
                    });
                }
                OpCode::KeyValuePair { key, value } => {
                    self.entries.push(SnapshotEntry {
                        key: String::from_utf8_lossy(&key).into_owned(),
                        value,
                        expiry: pending_expiry.take(),
                    });
                }
                OpCode::EndOfFile => break,
            }
        }

        Ok(self.entries)
    }
}
