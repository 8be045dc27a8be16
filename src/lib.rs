//! An in-memory data structure server speaking RESP.
//!
//! Supports string, list and stream keys with expiry, blocking pops and
//! blocking stream reads, MULTI/EXEC transactions, and primary/replica
//! replication with offset acknowledgements. Connections are served
//! concurrently on Tokio.

pub mod commands;
pub mod config;
pub mod connection;
pub mod geo;
pub mod handshake;
pub mod input;
pub mod key_value_store;
pub mod list_store;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
pub mod state;
pub mod stream_store;
