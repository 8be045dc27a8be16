use std::{fmt, sync::Arc, time::Duration};

use bytes::Bytes;
use jiff::Timestamp;
use tracing::debug;

use crate::{
    commands::CommandError,
    config::Config,
    key_value_store::KeyValueStore,
    list_store::ListStore,
    rdb::SnapshotEntry,
    replication::{ReplicationManager, Role},
    stream_store::StreamStore,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyType {
    String,
    List,
    Stream,
    None,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::String => "string",
            KeyType::List => "list",
            KeyType::Stream => "stream",
            KeyType::None => "none",
        };

        write!(f, "{}", name)
    }
}

/// Everything shared by the connections of one server process.
///
/// Each table owns its own lock. Operations that look at more than one table
/// visit them one after the other and never hold two locks at once.
pub struct ServerState {
    pub config: Config,
    pub strings: Arc<KeyValueStore>,
    pub lists: ListStore,
    pub streams: StreamStore,
    pub replication: ReplicationManager,
}

impl ServerState {
    /// Builds the state and spawns the propagation task.
    pub fn new(config: Config) -> Arc<Self> {
        let role = match config.replica_of() {
            Some((host, port)) => Role::Replica {
                host: host.to_string(),
                port,
            },
            None => Role::Master,
        };

        let (replication, propagation) = ReplicationManager::new(role);

        tokio::spawn(propagation.run());

        Arc::new(Self {
            config,
            strings: Arc::new(KeyValueStore::new()),
            lists: ListStore::new(),
            streams: StreamStore::new(),
            replication,
        })
    }

    pub async fn key_type(&self, key: &str) -> KeyType {
        if self.strings.contains(key).await {
            KeyType::String
        } else if self.lists.contains(key).await {
            KeyType::List
        } else if self.streams.contains(key).await {
            KeyType::Stream
        } else {
            KeyType::None
        }
    }

    /// Fails with `WRONGTYPE` when `key` exists with a type other than `expected`.
    pub async fn ensure_type(&self, key: &str, expected: KeyType) -> Result<(), CommandError> {
        match self.key_type(key).await {
            KeyType::None => Ok(()),
            actual if actual == expected => Ok(()),
            _ => Err(CommandError::WrongType),
        }
    }

    /// Writes a string value, replacing a key of any other type.
    pub async fn set_string(&self, key: String, value: Bytes, ttl: Option<Duration>) {
        self.lists.remove(&key).await;
        self.streams.remove(&key).await;
        self.strings.set(key, value, ttl).await;
    }

    /// Replays snapshot entries through the string write path. Entries whose
    /// expiry already passed are skipped.
    pub async fn load_snapshot_entries(&self, entries: Vec<SnapshotEntry>) {
        let now = Timestamp::now();

        for entry in entries {
            let ttl = match entry.remaining_millis(now) {
                None => None,
                Some(remaining) if remaining > 0 => Some(Duration::from_millis(remaining as u64)),
                Some(_) => {
                    debug!(key = %entry.key, "skipping expired snapshot entry");
                    continue;
                }
            };

            self.set_string(entry.key, entry.value, ttl).await;
        }
    }
}
