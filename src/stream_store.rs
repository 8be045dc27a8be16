//! Append-only stream table.
//!
//! Each stream keeps its records ordered by [`StreamId`] and a last-id
//! watermark that only moves forward. Blocked `XREAD` callers subscribe to the
//! keys they read; an append notifies only the subscribers of its own key.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use bytes::Bytes;
use jiff::Timestamp;
use thiserror::Error;
use tokio::{
    sync::{mpsc, Mutex},
    time::Instant,
};

pub type StreamFields = Vec<(Bytes, Bytes)>;

/// Record identifier: milliseconds plus a sequence number, ordered
/// lexicographically on `(ms, seq)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid stream ID specified as stream command argument")]
pub struct InvalidStreamId;

impl FromStr for StreamId {
    type Err = InvalidStreamId;

    /// Parses a fully explicit `ms-seq` id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ms, seq) = s.split_once('-').ok_or(InvalidStreamId)?;

        Ok(StreamId {
            ms: ms.parse().map_err(|_| InvalidStreamId)?,
            seq: seq.parse().map_err(|_| InvalidStreamId)?,
        })
    }
}

/// The id argument of `XADD` before it is resolved against the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamIdRequest {
    /// `ms-seq`
    Explicit(StreamId),
    /// `ms-*`
    AutoSequence(u64),
    /// `*`
    Auto,
}

impl FromStr for StreamIdRequest {
    type Err = InvalidStreamId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(StreamIdRequest::Auto);
        }

        match s.split_once('-') {
            Some((ms, "*")) => Ok(StreamIdRequest::AutoSequence(
                ms.parse().map_err(|_| InvalidStreamId)?,
            )),
            _ => Ok(StreamIdRequest::Explicit(s.parse()?)),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum StreamAddError {
    #[error("The ID specified in XADD must be greater than 0-0")]
    IdNotGreaterThanZero,
    #[error("The ID specified in XADD is equal or smaller than the target stream top item")]
    IdNotGreaterThanTop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    pub id: StreamId,
    pub fields: StreamFields,
}

#[derive(Debug, Default)]
pub struct Stream {
    last_id: StreamId,
    records: BTreeMap<StreamId, StreamFields>,
}

impl Stream {
    /// Resolves the id request against the watermark without mutating anything.
    fn resolve_id(&self, request: StreamIdRequest) -> Result<StreamId, StreamAddError> {
        let next_sequence = |ms: u64| {
            if ms == self.last_id.ms {
                self.last_id.seq.saturating_add(1)
            } else {
                0
            }
        };

        let candidate = match request {
            StreamIdRequest::Explicit(id) => id,
            StreamIdRequest::AutoSequence(ms) => StreamId::new(ms, next_sequence(ms)),
            StreamIdRequest::Auto => {
                let ms = current_time_millis().max(self.last_id.ms);
                StreamId::new(ms, next_sequence(ms))
            }
        };

        if candidate == StreamId::ZERO {
            return Err(StreamAddError::IdNotGreaterThanZero);
        }

        if candidate <= self.last_id {
            return Err(StreamAddError::IdNotGreaterThanTop);
        }

        Ok(candidate)
    }

    fn records_between(&self, start: StreamId, end: StreamId) -> Vec<StreamRecord> {
        if start > end {
            return Vec::new();
        }

        self.records
            .range(start..=end)
            .map(|(id, fields)| StreamRecord {
                id: *id,
                fields: fields.clone(),
            })
            .collect()
    }

    fn records_after(&self, after: StreamId) -> Vec<StreamRecord> {
        if after == StreamId::MAX {
            return Vec::new();
        }

        let start = if after.seq == u64::MAX {
            StreamId::new(after.ms + 1, 0)
        } else {
            StreamId::new(after.ms, after.seq + 1)
        };

        self.records_between(start, StreamId::MAX)
    }
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    sender: mpsc::Sender<()>,
}

#[derive(Debug, Default)]
struct StreamTable {
    streams: HashMap<String, Stream>,
    subscribers: HashMap<String, Vec<Subscriber>>,
}

impl StreamTable {
    fn read_after(&self, queries: &[(String, StreamId)]) -> Vec<(String, Vec<StreamRecord>)> {
        queries
            .iter()
            .filter_map(|(key, after)| {
                let records = self.streams.get(key)?.records_after(*after);

                if records.is_empty() {
                    None
                } else {
                    Some((key.clone(), records))
                }
            })
            .collect()
    }

    fn unsubscribe(&mut self, keys: &[&String], subscriber_id: u64) {
        for key in keys {
            if let Some(subscribers) = self.subscribers.get_mut(key.as_str()) {
                subscribers.retain(|subscriber| subscriber.id != subscriber_id);

                if subscribers.is_empty() {
                    self.subscribers.remove(key.as_str());
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct StreamStore {
    table: Mutex<StreamTable>,
    next_subscriber_id: AtomicU64,
}

impl StreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record, creating the stream if needed, and wakes readers
    /// blocked on this key.
    pub async fn add(
        &self,
        key: &str,
        request: StreamIdRequest,
        fields: StreamFields,
    ) -> Result<StreamId, StreamAddError> {
        let mut table = self.table.lock().await;

        let id = match table.streams.get(key) {
            Some(stream) => stream.resolve_id(request)?,
            None => Stream::default().resolve_id(request)?,
        };

        let stream = table.streams.entry(key.to_string()).or_default();
        stream.records.insert(id, fields);
        stream.last_id = id;

        if let Some(subscribers) = table.subscribers.get(key) {
            for subscriber in subscribers {
                // A full channel already carries a pending wake-up.
                let _ = subscriber.sender.try_send(());
            }
        }

        Ok(id)
    }

    /// Inclusive range scan. Returns an empty list for a missing key.
    pub async fn range(&self, key: &str, start: StreamId, end: StreamId) -> Vec<StreamRecord> {
        let table = self.table.lock().await;

        table
            .streams
            .get(key)
            .map(|stream| stream.records_between(start, end))
            .unwrap_or_default()
    }

    /// Last id assigned in the stream, or `0-0` for a missing key.
    pub async fn last_id(&self, key: &str) -> StreamId {
        let table = self.table.lock().await;
        table
            .streams
            .get(key)
            .map_or(StreamId::ZERO, |stream| stream.last_id)
    }

    /// Returns, per key, the records with ids strictly greater than the given
    /// id. Keys without matching records are omitted.
    pub async fn read_after(&self, queries: &[(String, StreamId)]) -> Vec<(String, Vec<StreamRecord>)> {
        let table = self.table.lock().await;
        table.read_after(queries)
    }

    /// Like [`StreamStore::read_after`], but waits for an append on one of the
    /// keys when nothing matches yet.
    ///
    /// `timeout` of `None` waits indefinitely. An empty result means the
    /// timeout elapsed without matching data.
    pub async fn blocking_read(
        &self,
        queries: &[(String, StreamId)],
        timeout: Option<Duration>,
    ) -> Vec<(String, Vec<StreamRecord>)> {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let keys = queries.iter().map(|(key, _)| key).collect::<Vec<&String>>();
        let subscriber_id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (sender, mut receiver) = mpsc::channel(1);
        let mut subscribed = false;

        loop {
            {
                let mut table = self.table.lock().await;
                let result = table.read_after(queries);
                let timed_out = deadline.is_some_and(|deadline| Instant::now() >= deadline);

                if !result.is_empty() || timed_out {
                    if subscribed {
                        table.unsubscribe(&keys, subscriber_id);
                    }

                    return result;
                }

                if !subscribed {
                    for key in &keys {
                        table
                            .subscribers
                            .entry(key.to_string())
                            .or_default()
                            .push(Subscriber {
                                id: subscriber_id,
                                sender: sender.clone(),
                            });
                    }
                    subscribed = true;
                }
            }

            match deadline {
                Some(deadline) => {
                    let _ = tokio::time::timeout_at(deadline, receiver.recv()).await;
                }
                None => {
                    receiver.recv().await;
                }
            }
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        let table = self.table.lock().await;
        table.streams.contains_key(key)
    }

    pub async fn remove(&self, key: &str) -> bool {
        let mut table = self.table.lock().await;
        table.streams.remove(key).is_some()
    }
}

fn current_time_millis() -> u64 {
    Timestamp::now().as_millisecond().max(0) as u64
}
