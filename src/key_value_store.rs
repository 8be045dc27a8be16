//! String keyspace with per-key expiry.
//!
//! Expiry is driven by timer tasks, but every timer is tagged with the
//! generation of the write that armed it: a key rewritten before its old timer
//! fires keeps the newer value. Reads additionally treat an entry past its
//! deadline as absent, so a late timer never makes a stale value visible.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use thiserror::Error;
use tokio::{sync::RwLock, time::Instant};
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum IncrError {
    #[error("value is not an integer")]
    NotAnInteger,
    #[error("increment would overflow")]
    Overflow,
}

#[derive(Debug, Clone)]
pub struct StringEntry {
    pub value: Bytes,
    pub expires_at: Option<Instant>,
    generation: u64,
}

impl StringEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}

#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: RwLock<HashMap<String, StringEntry>>,
    next_generation: AtomicU64,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value and expiry.
    ///
    /// When `ttl` is given a timer task is armed that removes the key once the
    /// duration has elapsed, unless the key has been written again since.
    pub async fn set(self: &Arc<Self>, key: String, value: Bytes, ttl: Option<Duration>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));

        {
            let mut entries = self.entries.write().await;
            entries.insert(
                key.clone(),
                StringEntry {
                    value,
                    expires_at,
                    generation,
                },
            );
        }

        if let Some(ttl) = ttl {
            let store = Arc::clone(self);

            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                store.expire(&key, generation).await;
            });
        }
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read().await;

        entries
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    /// Increments the integer stored at `key`, treating a missing key as zero.
    ///
    /// The expiry of an existing key is preserved. On error the stored value
    /// is left untouched.
    pub async fn incr(&self, key: &str) -> Result<i64, IncrError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let current = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => std::str::from_utf8(&entry.value)
                .ok()
                .and_then(|text| text.parse::<i64>().ok())
                .ok_or(IncrError::NotAnInteger)?,
            _ => 0,
        };

        let incremented = current.checked_add(1).ok_or(IncrError::Overflow)?;
        let value = Bytes::from(incremented.to_string());

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => entry.value = value,
            _ => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                entries.insert(
                    key.to_string(),
                    StringEntry {
                        value,
                        expires_at: None,
                        generation,
                    },
                );
            }
        }

        Ok(incremented)
    }

    /// Returns every live key, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let now = Instant::now();

        let mut keys = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect::<Vec<String>>();
        keys.sort();

        keys
    }

    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().await;

        entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    pub async fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    async fn expire(&self, key: &str, generation: u64) {
        let mut entries = self.entries.write().await;

        if entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(key);
            debug!(key, "expired key");
        }
    }
}
