//! Primary side of replication.
//!
//! Write commands are serialized once and pushed onto an unbounded queue. A
//! single propagation task owns every replica writer, drains the queue in order
//! and writes each frame to all attached replicas, so the byte stream seen by a
//! replica is exactly the order in which commands were enqueued.
//!
//! A replica's offsets count from the moment it was attached, while the
//! primary's offset counts from startup. Each replica therefore records the
//! primary offset it started at; its progress in primary terms is that start
//! plus what it acknowledged. Progress lives in a `watch` channel: `REPLCONF
//! ACK` updates it and `WAIT` subscribes to it.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        PoisonError,
    },
    time::Duration,
};

use bytes::Bytes;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{mpsc, watch, Mutex, MutexGuard},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::resp::RespValue;

/// Replication id announced in `FULLRESYNC` and `INFO`.
pub const REPLICATION_ID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";

pub type ReplicaWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Master,
    Replica { host: String, port: u16 },
}

/// Where a replica stands, in primary offset terms.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReplicaProgress {
    /// Primary offset when the replica was attached.
    start: u64,
    /// Bytes the replica acknowledged since then.
    acked: u64,
}

impl ReplicaProgress {
    fn reached(&self) -> u64 {
        self.start + self.acked
    }
}

enum Propagation {
    /// `preamble` is written before any command queued after the attach.
    Attach {
        id: u64,
        writer: ReplicaWriter,
        preamble: Bytes,
    },
    Detach(u64),
    Write(Bytes),
}

/// Drains the propagation queue. Spawned once per primary.
pub struct PropagationTask {
    receiver: mpsc::UnboundedReceiver<Propagation>,
    acks: watch::Sender<HashMap<u64, ReplicaProgress>>,
}

impl PropagationTask {
    pub async fn run(mut self) {
        let mut replicas: HashMap<u64, (ReplicaWriter, u64)> = HashMap::new();

        while let Some(message) = self.receiver.recv().await {
            match message {
                Propagation::Attach {
                    id,
                    mut writer,
                    preamble,
                } => match writer.write_all(&preamble).await {
                    Ok(()) => {
                        replicas.insert(id, (writer, 0));
                        info!(replica = id, "replica attached");
                    }
                    Err(e) => {
                        warn!(replica = id, error = %e, "failed to send resync payload");
                        self.forget(id);
                    }
                },
                Propagation::Detach(id) => {
                    if replicas.remove(&id).is_some() {
                        info!(replica = id, "replica detached");
                    }
                }
                Propagation::Write(bytes) => {
                    let mut failed = Vec::new();

                    for (id, (writer, sent)) in replicas.iter_mut() {
                        match writer.write_all(&bytes).await {
                            Ok(()) => {
                                *sent += bytes.len() as u64;
                                debug!(replica = id, offset = *sent, "propagated command");
                            }
                            Err(e) => {
                                warn!(replica = id, error = %e, "failed to write to replica");
                                failed.push(*id);
                            }
                        }
                    }

                    for id in failed {
                        replicas.remove(&id);
                        self.forget(id);
                    }
                }
            }
        }
    }

    fn forget(&self, id: u64) {
        self.acks.send_modify(|acks| {
            acks.remove(&id);
        });
    }
}

pub struct ReplicationManager {
    role: Role,
    sender: mpsc::UnboundedSender<Propagation>,
    /// Propagated bytes on a primary, processed bytes on a replica.
    offset: AtomicU64,
    /// Held while advancing the offset and enqueueing, so a replica's start
    /// offset matches its place in the queue.
    enqueue: std::sync::Mutex<()>,
    acks: watch::Sender<HashMap<u64, ReplicaProgress>>,
    next_replica_id: AtomicU64,
    write_order: Mutex<()>,
}

impl ReplicationManager {
    pub fn new(role: Role) -> (Self, PropagationTask) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (acks, _) = watch::channel(HashMap::new());

        let task = PropagationTask {
            receiver,
            acks: acks.clone(),
        };

        let manager = Self {
            role,
            sender,
            offset: AtomicU64::new(0),
            enqueue: std::sync::Mutex::new(()),
            acks,
            next_replica_id: AtomicU64::new(1),
            write_order: Mutex::new(()),
        };

        (manager, task)
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_replica(&self) -> bool {
        matches!(self.role, Role::Replica { .. })
    }

    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::SeqCst)
    }

    /// Advances the replica's processed offset and returns the new value.
    pub fn add_processed_bytes(&self, bytes: usize) -> u64 {
        self.offset.fetch_add(bytes as u64, Ordering::SeqCst) + bytes as u64
    }

    /// Held while a write command executes and is enqueued, so the propagated
    /// order matches the order in which writes took effect.
    pub async fn write_order(&self) -> MutexGuard<'_, ()> {
        self.write_order.lock().await
    }

    /// Queues a serialized command for every attached replica.
    pub fn propagate(&self, command: Bytes) {
        if self.is_replica() {
            return;
        }

        let _enqueue = self.enqueue.lock().unwrap_or_else(PoisonError::into_inner);
        self.offset.fetch_add(command.len() as u64, Ordering::SeqCst);

        if self.sender.send(Propagation::Write(command)).is_err() {
            warn!("propagation task is not running");
        }
    }

    /// Hands a replica's write half to the propagation task.
    ///
    /// The task writes `preamble` (the resync payload) first, followed by every
    /// command propagated from this point on.
    pub fn attach_replica(&self, writer: ReplicaWriter, preamble: Bytes) -> u64 {
        let id = self.next_replica_id.fetch_add(1, Ordering::Relaxed);

        let _enqueue = self.enqueue.lock().unwrap_or_else(PoisonError::into_inner);
        let start = self.offset();

        self.acks.send_modify(|acks| {
            acks.insert(id, ReplicaProgress { start, acked: 0 });
        });

        let attach = Propagation::Attach {
            id,
            writer,
            preamble,
        };

        if self.sender.send(attach).is_err() {
            warn!(replica = id, "propagation task is not running");
        }

        id
    }

    pub fn detach_replica(&self, id: u64) {
        self.acks.send_modify(|acks| {
            acks.remove(&id);
        });

        let _ = self.sender.send(Propagation::Detach(id));
    }

    pub fn record_ack(&self, id: u64, offset: u64) {
        self.acks.send_if_modified(|acks| match acks.get_mut(&id) {
            Some(progress) => {
                progress.acked = offset;
                true
            }
            None => false,
        });
    }

    pub fn connected_replicas(&self) -> usize {
        self.acks.borrow().len()
    }

    /// Waits until `required` replicas acknowledged every byte propagated so
    /// far, or until `timeout` elapses (`None` waits indefinitely). A replica
    /// attached after those bytes were propagated counts as caught up.
    ///
    /// Returns the number of replicas that acknowledged.
    pub async fn wait_for_acks(&self, required: usize, timeout: Option<Duration>) -> usize {
        let target = self.offset();

        if target == 0 {
            return self.connected_replicas();
        }

        let count_acked = |acks: &HashMap<u64, ReplicaProgress>| {
            acks.values()
                .filter(|progress| progress.reached() >= target)
                .count()
        };

        let mut receiver = self.acks.subscribe();
        let acked = count_acked(&receiver.borrow_and_update());

        if acked >= required {
            return acked;
        }

        self.propagate(RespValue::command(&["REPLCONF", "GETACK", "*"]).encode());

        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        loop {
            let changed = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, receiver.changed())
                    .await
                    .unwrap_or(Ok(())),
                None => receiver.changed().await,
            };

            let acked = count_acked(&receiver.borrow_and_update());
            let timed_out = deadline.is_some_and(|deadline| Instant::now() >= deadline);

            if acked >= required || timed_out || changed.is_err() {
                return acked;
            }
        }
    }

    /// Lines of the `INFO replication` section.
    pub fn info(&self) -> String {
        let mut lines = vec!["# Replication".to_string()];

        match &self.role {
            Role::Master => {
                lines.push("role:master".to_string());
                lines.push(format!("connected_slaves:{}", self.connected_replicas()));
            }
            Role::Replica { host, port } => {
                lines.push("role:slave".to_string());
                lines.push(format!("master_host:{}", host));
                lines.push(format!("master_port:{}", port));
            }
        }

        lines.push(format!("master_replid:{}", REPLICATION_ID));
        lines.push(format!("master_repl_offset:{}", self.offset()));

        lines.join("\r\n")
    }
}
