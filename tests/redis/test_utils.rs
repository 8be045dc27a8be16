use std::{collections::HashMap, sync::Arc, time::Duration};

use redis_server::{
    commands::{CommandError, CommandHandler, CommandResult, Origin, TransactionQueue},
    config::Config,
    resp::RespValue,
    state::ServerState,
};
use tokio::{task::JoinHandle, time::timeout};

/// Test utilities for simplifying command tests
pub struct TestUtils;

/// One simulated client connection: the shared server state plus the
/// connection's own transaction queue.
pub struct TestEnv {
    pub state: Arc<ServerState>,
    pub transaction: TransactionQueue,
}

impl TestEnv {
    /// Create a new test environment with a primary server
    pub fn new_master_server() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new test environment with a replica server
    pub fn new_replica_server() -> Self {
        let config = Config::from_values(HashMap::from([
            ("dir".to_string(), ".".to_string()),
            ("dbfilename".to_string(), "dump.rdb".to_string()),
            ("port".to_string(), "6380".to_string()),
            ("replicaof".to_string(), "127.0.0.1 6379".to_string()),
        ]))
        .unwrap();

        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            state: ServerState::new(config),
            transaction: TransactionQueue::new(),
        }
    }

    /// Another client of the same server
    pub fn new_client(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            transaction: TransactionQueue::new(),
        }
    }

    /// Execute a command the way a client connection does
    pub async fn exec_command(&mut self, command: RespValue) -> Result<CommandResult, CommandError> {
        let command_handler = CommandHandler::new(command)?;

        command_handler
            .handle(&self.state, Origin::Client, &mut self.transaction)
            .await
    }

    /// Execute a command and return its reply, errors included
    pub async fn exec_command_reply(&mut self, command: RespValue) -> RespValue {
        match self.exec_command(command).await {
            Ok(CommandResult::Response(response)) => response,
            Ok(other) => panic!("Expected a response, got {:?}", other),
            Err(e) => e.as_resp(),
        }
    }

    /// Execute a command and assert it succeeds with expected result
    pub async fn exec_command_immediate_success_response(
        &mut self,
        command: RespValue,
        expected_response: RespValue,
    ) {
        let result = self.exec_command(command.clone()).await;

        match result {
            Ok(CommandResult::Response(response)) => {
                assert_eq!(response, expected_response, "response to {:?}", command)
            }
            other => panic!("Expected response to {:?}, got {:?}", command, other),
        }
    }

    /// Execute a command and assert it fails
    pub async fn exec_command_immediate_error_response(
        &mut self,
        command: RespValue,
        expected_error: CommandError,
    ) {
        let result = self.exec_command(command.clone()).await;

        match result {
            Err(e) => assert_eq!(e, expected_error, "error for {:?}", command),
            Ok(other) => panic!("Expected {:?} for {:?}, got {:?}", expected_error, command, other),
        }
    }
}

impl TestUtils {
    /// Create any command from its parts
    pub fn command(parts: &[&str]) -> RespValue {
        RespValue::command(parts)
    }

    pub fn ping_command() -> RespValue {
        Self::command(&["PING"])
    }

    pub fn echo_command(message: &str) -> RespValue {
        Self::command(&["ECHO", message])
    }

    pub fn get_command(key: &str) -> RespValue {
        Self::command(&["GET", key])
    }

    pub fn set_command(key: &str, value: &str) -> RespValue {
        Self::command(&["SET", key, value])
    }

    pub fn set_command_with_expiration(key: &str, value: &str, expiration_ms: u64) -> RespValue {
        Self::command(&["SET", key, value, "px", &expiration_ms.to_string()])
    }

    pub fn incr_command(key: &str) -> RespValue {
        Self::command(&["INCR", key])
    }

    pub fn type_command(key: &str) -> RespValue {
        Self::command(&["TYPE", key])
    }

    pub fn rpush_command(key: &str, values: &[&str]) -> RespValue {
        Self::command(&[&["RPUSH", key][..], values].concat())
    }

    pub fn lpush_command(key: &str, values: &[&str]) -> RespValue {
        Self::command(&[&["LPUSH", key][..], values].concat())
    }

    pub fn lrange_command(key: &str, start: i64, stop: i64) -> RespValue {
        Self::command(&["LRANGE", key, &start.to_string(), &stop.to_string()])
    }

    pub fn llen_command(key: &str) -> RespValue {
        Self::command(&["LLEN", key])
    }

    pub fn lpop_command(key: &str) -> RespValue {
        Self::command(&["LPOP", key])
    }

    pub fn lpop_command_multiple_items(key: &str, count: u32) -> RespValue {
        Self::command(&["LPOP", key, &count.to_string()])
    }

    pub fn blpop_command(key: &str, timeout_seconds: &str) -> RespValue {
        Self::command(&["BLPOP", key, timeout_seconds])
    }

    pub fn xadd_command(key: &str, stream_id: &str, entries: &[&str]) -> RespValue {
        Self::command(&[&["XADD", key, stream_id][..], entries].concat())
    }

    pub fn xrange_command(key: &str, start: &str, end: &str) -> RespValue {
        Self::command(&["XRANGE", key, start, end])
    }

    pub fn xread_command(keys: &[&str], start_stream_ids: &[&str]) -> RespValue {
        Self::command(&[&["XREAD", "STREAMS"][..], keys, start_stream_ids].concat())
    }

    pub fn xread_blocking_command(
        timeout_milliseconds: &str,
        keys: &[&str],
        start_stream_ids: &[&str],
    ) -> RespValue {
        Self::command(
            &[
                &["XREAD", "BLOCK", timeout_milliseconds, "STREAMS"][..],
                keys,
                start_stream_ids,
            ]
            .concat(),
        )
    }

    pub fn multi_command() -> RespValue {
        Self::command(&["MULTI"])
    }

    pub fn exec_command() -> RespValue {
        Self::command(&["EXEC"])
    }

    pub fn discard_command() -> RespValue {
        Self::command(&["DISCARD"])
    }

    pub fn expected_simple_string(value: &str) -> RespValue {
        RespValue::SimpleString(value.to_string())
    }

    pub fn expected_bulk_string(value: &str) -> RespValue {
        RespValue::bulk(value.to_string())
    }

    pub fn expected_integer(value: i64) -> RespValue {
        RespValue::Integer(value)
    }

    pub fn expected_bulk_string_array(values: &[&str]) -> RespValue {
        RespValue::Array(values.iter().map(|value| Self::expected_bulk_string(value)).collect())
    }

    /// `[id, [field, value, ...]]` as returned by XRANGE and XREAD
    pub fn expected_stream_entry(id: &str, fields: &[&str]) -> RespValue {
        RespValue::Array(vec![
            Self::expected_bulk_string(id),
            Self::expected_bulk_string_array(fields),
        ])
    }

    /// Run a BLPOP on its own client in the background
    pub fn spawn_blpop_task(
        env: &TestEnv,
        key: &str,
        timeout_seconds: &str,
    ) -> JoinHandle<RespValue> {
        let mut client = env.new_client();
        let command = Self::blpop_command(key, timeout_seconds);

        tokio::spawn(async move { client.exec_command_reply(command).await })
    }

    /// Await a background command, failing the test if it takes too long
    pub async fn wait_for_completion(task: JoinHandle<RespValue>, limit: Duration) -> RespValue {
        timeout(limit, task)
            .await
            .expect("task did not complete in time")
            .expect("task panicked")
    }

    pub async fn sleep_ms(millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
