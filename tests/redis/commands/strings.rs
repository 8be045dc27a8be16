use std::collections::HashMap;

use redis_server::{commands::CommandError, config::Config, resp::RespValue};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_ping_and_echo() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_success_response(
        TestUtils::ping_command(),
        TestUtils::expected_simple_string("PONG"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::command(&["ping", "hello"]),
        TestUtils::expected_bulk_string("hello"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::echo_command("grape"),
        TestUtils::expected_bulk_string("grape"),
    )
    .await;
    env.exec_command_immediate_error_response(
        TestUtils::command(&["ECHO"]),
        CommandError::WrongNumberOfArguments("echo".to_string()),
    )
    .await;
}

#[tokio::test]
async fn test_handle_set_and_get() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_success_response(
        TestUtils::get_command("grape"),
        RespValue::NullBulkString,
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::set_command("grape", "mango"),
        TestUtils::expected_simple_string("OK"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::get_command("grape"),
        TestUtils::expected_bulk_string("mango"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::set_command("grape", "banana"),
        TestUtils::expected_simple_string("OK"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::get_command("grape"),
        TestUtils::expected_bulk_string("banana"),
    )
    .await;
}

#[tokio::test]
async fn test_handle_set_command_with_expiration() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_success_response(
        TestUtils::set_command_with_expiration("grape", "mango", 100),
        TestUtils::expected_simple_string("OK"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::get_command("grape"),
        TestUtils::expected_bulk_string("mango"),
    )
    .await;

    TestUtils::sleep_ms(250).await;

    env.exec_command_immediate_success_response(
        TestUtils::get_command("grape"),
        RespValue::NullBulkString,
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::type_command("grape"),
        TestUtils::expected_simple_string("none"),
    )
    .await;
}

#[tokio::test]
async fn test_overwrite_clears_previous_expiry() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::set_command_with_expiration("grape", "mango", 100))
        .await
        .unwrap();
    env.exec_command(TestUtils::set_command("grape", "banana"))
        .await
        .unwrap();

    TestUtils::sleep_ms(250).await;

    env.exec_command_immediate_success_response(
        TestUtils::get_command("grape"),
        TestUtils::expected_bulk_string("banana"),
    )
    .await;
}

#[tokio::test]
async fn test_handle_set_command_invalid_options() {
    let mut env = TestEnv::new_master_server();

    let test_cases = vec![
        (
            TestUtils::command(&["SET", "grape", "mango", "px", "0"]),
            CommandError::InvalidExpireTime("set".to_string()),
        ),
        (
            TestUtils::command(&["SET", "grape", "mango", "ex", "soon"]),
            CommandError::InvalidExpireTime("set".to_string()),
        ),
        (
            TestUtils::command(&["SET", "grape", "mango", "xx", "10"]),
            CommandError::SyntaxError,
        ),
        (
            TestUtils::command(&["SET", "grape"]),
            CommandError::WrongNumberOfArguments("set".to_string()),
        ),
    ];

    for (command, expected_error) in test_cases {
        env.exec_command_immediate_error_response(command, expected_error)
            .await;
    }

    env.exec_command_immediate_success_response(
        TestUtils::get_command("grape"),
        RespValue::NullBulkString,
    )
    .await;
}

#[tokio::test]
async fn test_handle_incr_command() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_success_response(
        TestUtils::incr_command("counter"),
        TestUtils::expected_integer(1),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::incr_command("counter"),
        TestUtils::expected_integer(2),
    )
    .await;

    env.exec_command(TestUtils::set_command("fruit", "mango"))
        .await
        .unwrap();
    env.exec_command_immediate_error_response(
        TestUtils::incr_command("fruit"),
        CommandError::NotAnInteger,
    )
    .await;

    env.exec_command(TestUtils::set_command("big", &i64::MAX.to_string()))
        .await
        .unwrap();
    env.exec_command_immediate_error_response(
        TestUtils::incr_command("big"),
        CommandError::NotAnInteger,
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::get_command("big"),
        TestUtils::expected_bulk_string(&i64::MAX.to_string()),
    )
    .await;
}

#[tokio::test]
async fn test_handle_keys_command() {
    let mut env = TestEnv::new_master_server();

    for key in ["pear", "peach", "apple"] {
        env.exec_command(TestUtils::set_command(key, "1")).await.unwrap();
    }
    env.exec_command(TestUtils::rpush_command("plums", &["a"]))
        .await
        .unwrap();

    env.exec_command_immediate_success_response(
        TestUtils::command(&["KEYS", "*"]),
        TestUtils::expected_bulk_string_array(&["apple", "peach", "pear"]),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::command(&["KEYS", "pe*"]),
        TestUtils::expected_bulk_string_array(&["peach", "pear"]),
    )
    .await;
}

#[tokio::test]
async fn test_handle_type_command() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::set_command("fruit", "mango"))
        .await
        .unwrap();
    env.exec_command(TestUtils::rpush_command("queue", &["job"]))
        .await
        .unwrap();
    env.exec_command(TestUtils::xadd_command("sensor", "1-1", &["t", "36"]))
        .await
        .unwrap();

    let test_cases = vec![
        ("fruit", "string"),
        ("queue", "list"),
        ("sensor", "stream"),
        ("missing", "none"),
    ];

    for (key, expected_type) in test_cases {
        env.exec_command_immediate_success_response(
            TestUtils::type_command(key),
            TestUtils::expected_simple_string(expected_type),
        )
        .await;
    }
}

#[tokio::test]
async fn test_set_replaces_keys_of_other_types() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::rpush_command("key", &["a", "b"]))
        .await
        .unwrap();
    env.exec_command_immediate_error_response(
        TestUtils::get_command("key"),
        CommandError::WrongType,
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::set_command("key", "value"),
        TestUtils::expected_simple_string("OK"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::type_command("key"),
        TestUtils::expected_simple_string("string"),
    )
    .await;
    env.exec_command_immediate_error_response(
        TestUtils::llen_command("key"),
        CommandError::WrongType,
    )
    .await;
}

#[tokio::test]
async fn test_set_with_out_of_range_expiry_keeps_existing_key() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::rpush_command("key", &["a"]))
        .await
        .unwrap();

    for option in ["EX", "PX"] {
        env.exec_command_immediate_error_response(
            TestUtils::command(&["SET", "key", "value", option, "9223372036854775807"]),
            CommandError::InvalidExpireTime("set".to_string()),
        )
        .await;
    }

    env.exec_command_immediate_success_response(
        TestUtils::lrange_command("key", 0, -1),
        TestUtils::expected_bulk_string_array(&["a"]),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::type_command("key"),
        TestUtils::expected_simple_string("list"),
    )
    .await;
}

#[tokio::test]
async fn test_handle_config_get_command() {
    let config = Config::from_values(HashMap::from([
        ("dir".to_string(), "/tmp/redis-files".to_string()),
        ("dbfilename".to_string(), "dump.rdb".to_string()),
        ("port".to_string(), "6379".to_string()),
    ]))
    .unwrap();
    let mut env = TestEnv::with_config(config);

    env.exec_command_immediate_success_response(
        TestUtils::command(&["CONFIG", "GET", "dir"]),
        TestUtils::expected_bulk_string_array(&["dir", "/tmp/redis-files"]),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::command(&["config", "get", "dbfilename", "unknown"]),
        TestUtils::expected_bulk_string_array(&["dbfilename", "dump.rdb"]),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::command(&["CONFIG", "GET", "maxmemory"]),
        RespValue::Array(Vec::new()),
    )
    .await;
    env.exec_command_immediate_error_response(
        TestUtils::command(&["CONFIG", "RESETSTAT"]),
        CommandError::UnknownSubcommand("RESETSTAT".to_string()),
    )
    .await;
}

#[tokio::test]
async fn test_handle_info_command() {
    let mut env = TestEnv::new_master_server();

    let RespValue::BulkString(info) = env
        .exec_command_reply(TestUtils::command(&["INFO", "replication"]))
        .await
    else {
        panic!("INFO must reply with a bulk string");
    };
    let info = String::from_utf8_lossy(&info).into_owned();

    assert!(info.contains("role:master"), "{}", info);
    assert!(info.contains("master_replid:8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb"));
    assert!(info.contains("master_repl_offset:0"));

    let mut replica = TestEnv::new_replica_server();
    let RespValue::BulkString(info) = replica.exec_command_reply(TestUtils::command(&["INFO"])).await else {
        panic!("INFO must reply with a bulk string");
    };

    assert!(String::from_utf8_lossy(&info).contains("role:slave"));
}

#[tokio::test]
async fn test_unknown_command() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_error_response(
        TestUtils::command(&["FLUSHALL"]),
        CommandError::UnknownCommand("FLUSHALL".to_string()),
    )
    .await;
}
