//! List table with blocking pop.
//!
//! Clients blocked in `BLPOP` park a one-shot channel in a per-key FIFO. A push
//! hands elements directly to parked waiters while it still holds the table
//! lock, one element per waiter, so an element is delivered exactly once and
//! the oldest waiter is served first. The push reports how many elements it
//! handed off, since replicas see those as pops. Empty lists are removed from
//! the table.

use std::{
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use bytes::Bytes;
use tokio::sync::{oneshot, Mutex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListEnd {
    Front,
    Back,
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    sender: oneshot::Sender<Bytes>,
}

#[derive(Debug, Default)]
struct ListTable {
    lists: HashMap<String, VecDeque<Bytes>>,
    waiters: HashMap<String, VecDeque<Waiter>>,
}

impl ListTable {
    /// Hands queued elements of `key` to parked waiters, oldest waiter first,
    /// and returns how many were delivered.
    fn serve_waiters(&mut self, key: &str) -> usize {
        let Some(waiters) = self.waiters.get_mut(key) else {
            return 0;
        };

        let mut handed_off = 0;

        if let Some(list) = self.lists.get_mut(key) {
            while !list.is_empty() {
                let Some(waiter) = waiters.pop_front() else {
                    break;
                };

                let Some(element) = list.pop_front() else {
                    break;
                };

                // A waiter whose receiver is gone gives the element back.
                match waiter.sender.send(element) {
                    Ok(()) => handed_off += 1,
                    Err(element) => list.push_front(element),
                }
            }
        }

        if waiters.is_empty() {
            self.waiters.remove(key);
        }

        self.remove_if_empty(key);

        handed_off
    }

    fn remove_if_empty(&mut self, key: &str) {
        if self.lists.get(key).is_some_and(VecDeque::is_empty) {
            self.lists.remove(key);
        }
    }
}

/// Result of a push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushOutcome {
    /// List length right after the push, before waiters were served.
    pub length: usize,
    /// Elements delivered straight to blocked poppers.
    pub handed_off: usize,
}

/// Result of [`ListStore::pop_or_park`].
#[derive(Debug)]
pub enum FrontPop {
    Ready(Bytes),
    Parked(ParkedPop),
}

/// A registered blocked pop, to be resolved with [`ListStore::wait`].
#[derive(Debug)]
pub struct ParkedPop {
    key: String,
    id: u64,
    receiver: oneshot::Receiver<Bytes>,
}

#[derive(Debug, Default)]
pub struct ListStore {
    table: Mutex<ListTable>,
    next_waiter_id: AtomicU64,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `values` onto one end of the list, then serves parked waiters.
    ///
    /// Values are pushed one at a time, so `LPUSH k a b` leaves `b` at the
    /// front.
    pub async fn push(&self, key: &str, values: Vec<Bytes>, end: ListEnd) -> PushOutcome {
        let mut table = self.table.lock().await;
        let list = table.lists.entry(key.to_string()).or_default();

        for value in values {
            match end {
                ListEnd::Front => list.push_front(value),
                ListEnd::Back => list.push_back(value),
            }
        }

        let length = list.len();
        let handed_off = table.serve_waiters(key);

        PushOutcome { length, handed_off }
    }

    /// Returns the elements between `start` and `end` inclusive.
    ///
    /// Negative indices count from the end of the list.
    pub async fn range(&self, key: &str, start: i64, end: i64) -> Vec<Bytes> {
        let table = self.table.lock().await;

        let Some(list) = table.lists.get(key) else {
            return Vec::new();
        };

        match normalize_range(list.len(), start, end) {
            Some((start, end)) => list.range(start..=end).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub async fn len(&self, key: &str) -> usize {
        let table = self.table.lock().await;
        table.lists.get(key).map_or(0, VecDeque::len)
    }

    pub async fn contains(&self, key: &str) -> bool {
        let table = self.table.lock().await;
        table.lists.contains_key(key)
    }

    pub async fn remove(&self, key: &str) -> bool {
        let mut table = self.table.lock().await;
        table.lists.remove(key).is_some()
    }

    /// Removes up to `count` elements from the front.
    ///
    /// Returns `None` when the key is absent.
    pub async fn pop_front(&self, key: &str, count: usize) -> Option<Vec<Bytes>> {
        let mut table = self.table.lock().await;
        let list = table.lists.get_mut(key)?;

        let amount = count.min(list.len());
        let popped = list.drain(..amount).collect::<Vec<Bytes>>();
        table.remove_if_empty(key);

        Some(popped)
    }

    /// Pops the front element, or registers the caller as a waiter on `key`
    /// when the list is empty. Both happen under one lock, so no push can slip
    /// in between.
    pub async fn pop_or_park(&self, key: &str) -> FrontPop {
        let mut table = self.table.lock().await;

        if let Some(list) = table.lists.get_mut(key) {
            if let Some(element) = list.pop_front() {
                table.remove_if_empty(key);
                return FrontPop::Ready(element);
            }
        }

        let id = self.next_waiter_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        table
            .waiters
            .entry(key.to_string())
            .or_default()
            .push_back(Waiter { id, sender });

        FrontPop::Parked(ParkedPop {
            key: key.to_string(),
            id,
            receiver,
        })
    }

    /// Waits for a push to hand an element to a parked pop.
    ///
    /// `timeout` of `None` waits indefinitely. Returns `None` once the timeout
    /// elapses without an element being delivered.
    pub async fn wait(&self, parked: ParkedPop, timeout: Option<Duration>) -> Option<Bytes> {
        let ParkedPop {
            key,
            id,
            mut receiver,
        } = parked;

        let result = match timeout {
            None => (&mut receiver).await.ok(),
            Some(duration) => tokio::time::timeout(duration, &mut receiver)
                .await
                .ok()
                .and_then(Result::ok),
        };

        if result.is_some() {
            return result;
        }

        // Deregister under the lock. A push that raced with the timeout has
        // either already delivered into the receiver or will no longer see us.
        let mut table = self.table.lock().await;

        if let Some(waiters) = table.waiters.get_mut(&key) {
            waiters.retain(|waiter| waiter.id != id);

            if waiters.is_empty() {
                table.waiters.remove(&key);
            }
        }

        receiver.try_recv().ok()
    }
}

/// Converts possibly negative, possibly out of range indices into an inclusive
/// index pair, or `None` when the range selects nothing.
pub fn normalize_range(length: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    let length = length as i64;

    let start = if start < 0 { (length + start).max(0) } else { start };
    let end = if end < 0 { length + end } else { end.min(length - 1) };

    if start >= length || end < 0 || start > end {
        return None;
    }

    Some((start as usize, end as usize))
}
