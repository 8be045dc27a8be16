//! RDB snapshot decoding.
//!
//! Only string entries are understood. The loader is used once at startup,
//! and the raw snapshot bytes are what a primary ships to a new replica.

mod encoding;
mod opcode;
mod rdb_parser;

use std::{io::ErrorKind, path::Path};

use bytes::Bytes;
use jiff::Timestamp;
use thiserror::Error;
use tracing::info;

pub use rdb_parser::RdbParser;

/// Snapshot of an empty database, sent to replicas when no file exists.
const EMPTY_RDB_HEX: &str = "524544495330303131fa0972656469732d76657205372e322e30fa0a72656469732d62697473c040fa056374696d65c26d08bc65fa08757365642d6d656dc2b0c41000fa08616f662d62617365c000fff06e3bfec0ff5aa2";

#[derive(Error, Debug, PartialEq)]
pub enum RdbError {
    #[error("failed to read snapshot file: {0}")]
    Io(String),
    #[error("unexpected end of snapshot")]
    UnexpectedEof,
    #[error("invalid magic string")]
    InvalidMagicString,
    #[error("invalid RDB version")]
    InvalidVersion,
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpCode(u8),
    #[error("invalid length encoding 0x{0:02X}")]
    InvalidLengthEncoding(u8),
    #[error("LZF compressed strings are not supported")]
    CompressedString,
    #[error("invalid expiry timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid empty snapshot constant: {0}")]
    InvalidEmptySnapshot(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapshotExpiryKind {
    Ex,
    Px,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotExpiry {
    pub kind: SnapshotExpiryKind,
    pub unix_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: Bytes,
    pub expiry: Option<SnapshotExpiry>,
}

impl SnapshotEntry {
    /// Milliseconds left until the entry expires, relative to `now`.
    ///
    /// `Some(0)` or less means the entry is already expired; `None` means it
    /// never expires.
    pub fn remaining_millis(&self, now: Timestamp) -> Option<i64> {
        self.expiry
            .as_ref()
            .map(|expiry| expiry.unix_time.as_millisecond() - now.as_millisecond())
    }
}

pub fn empty_snapshot() -> Result<Vec<u8>, RdbError> {
    hex::decode(EMPTY_RDB_HEX).map_err(|e| RdbError::InvalidEmptySnapshot(e.to_string()))
}

/// Bytes of the snapshot at `path`, or the empty snapshot if there is no file.
pub async fn snapshot_payload(path: &Path) -> Result<Bytes, RdbError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Bytes::from(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Bytes::from(empty_snapshot()?)),
        Err(e) => Err(RdbError::Io(e.to_string())),
    }
}

/// Decodes the snapshot at `path`. A missing or empty file yields no entries.
pub async fn load_snapshot(path: &Path) -> Result<Vec<SnapshotEntry>, RdbError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no snapshot file found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(RdbError::Io(e.to_string())),
    };

    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    let entries = RdbParser::new().parse(&bytes)?;
    info!(path = %path.display(), entries = entries.len(), "loaded snapshot");

    Ok(entries)
}
