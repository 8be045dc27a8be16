use std::time::{Duration, Instant};

use redis_server::{commands::CommandError, resp::RespValue};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_push_and_range() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_success_response(
        TestUtils::rpush_command("list", &["a", "b"]),
        TestUtils::expected_integer(2),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::lpush_command("list", &["c", "d"]),
        TestUtils::expected_integer(4),
    )
    .await;

    let test_cases = vec![
        ((0, -1), vec!["d", "c", "a", "b"]),
        ((1, 2), vec!["c", "a"]),
        ((-2, -1), vec!["a", "b"]),
        ((2, 100), vec!["a", "b"]),
        ((-100, 0), vec!["d"]),
        ((3, 1), vec![]),
        ((10, 20), vec![]),
    ];

    for ((start, stop), expected) in test_cases {
        env.exec_command_immediate_success_response(
            TestUtils::lrange_command("list", start, stop),
            TestUtils::expected_bulk_string_array(&expected),
        )
        .await;
    }

    env.exec_command_immediate_success_response(
        TestUtils::lrange_command("missing", 0, -1),
        RespValue::Array(Vec::new()),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::llen_command("list"),
        TestUtils::expected_integer(4),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::llen_command("missing"),
        TestUtils::expected_integer(0),
    )
    .await;
}

#[tokio::test]
async fn test_handle_lpop_command() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::rpush_command("list", &["a", "b", "c", "d"]))
        .await
        .unwrap();

    env.exec_command_immediate_success_response(
        TestUtils::lpop_command("list"),
        TestUtils::expected_bulk_string("a"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::lpop_command_multiple_items("list", 2),
        TestUtils::expected_bulk_string_array(&["b", "c"]),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::lpop_command_multiple_items("list", 0),
        RespValue::Array(Vec::new()),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::lpop_command_multiple_items("list", 10),
        TestUtils::expected_bulk_string_array(&["d"]),
    )
    .await;

    // The list is gone once emptied.
    env.exec_command_immediate_success_response(
        TestUtils::type_command("list"),
        TestUtils::expected_simple_string("none"),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::lpop_command("list"),
        RespValue::NullBulkString,
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::lpop_command_multiple_items("list", 2),
        RespValue::NullArray,
    )
    .await;
}

#[tokio::test]
async fn test_list_commands_reject_other_types() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::set_command("fruit", "mango"))
        .await
        .unwrap();

    let commands = vec![
        TestUtils::rpush_command("fruit", &["a"]),
        TestUtils::lpush_command("fruit", &["a"]),
        TestUtils::lrange_command("fruit", 0, -1),
        TestUtils::llen_command("fruit"),
        TestUtils::lpop_command("fruit"),
        TestUtils::blpop_command("fruit", "0.1"),
    ];

    for command in commands {
        env.exec_command_immediate_error_response(command, CommandError::WrongType)
            .await;
    }

    env.exec_command_immediate_success_response(
        TestUtils::get_command("fruit"),
        TestUtils::expected_bulk_string("mango"),
    )
    .await;
}

#[tokio::test]
async fn test_blpop_returns_available_element_immediately() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::rpush_command("queue", &["first", "second"]))
        .await
        .unwrap();

    env.exec_command_immediate_success_response(
        TestUtils::blpop_command("queue", "0"),
        TestUtils::expected_bulk_string_array(&["queue", "first"]),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::llen_command("queue"),
        TestUtils::expected_integer(1),
    )
    .await;
}

#[tokio::test]
async fn test_blpop_times_out_with_null_array() {
    let mut env = TestEnv::new_master_server();
    let started = Instant::now();

    env.exec_command_immediate_success_response(
        TestUtils::blpop_command("queue", "0.2"),
        RespValue::NullArray,
    )
    .await;

    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_blpop_invalid_timeouts() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_error_response(
        TestUtils::blpop_command("queue", "-1"),
        CommandError::NegativeTimeout,
    )
    .await;
    env.exec_command_immediate_error_response(
        TestUtils::blpop_command("queue", "later"),
        CommandError::InvalidTimeout,
    )
    .await;
}
