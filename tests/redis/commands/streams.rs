use std::time::Duration;

use redis_server::{commands::CommandError, resp::RespValue, stream_store::StreamAddError};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_xadd_command() {
    let mut env = TestEnv::new_master_server();

    let test_cases = vec![
        ("1-1", Ok("1-1")),
        ("1-1", Err(CommandError::StreamAdd(StreamAddError::IdNotGreaterThanTop))),
        ("0-5", Err(CommandError::StreamAdd(StreamAddError::IdNotGreaterThanTop))),
        ("1-*", Ok("1-2")),
        ("3-*", Ok("3-0")),
        ("3-7", Ok("3-7")),
        ("abc", Err(CommandError::InvalidStreamId)),
    ];

    for (id, expected) in test_cases {
        match expected {
            Ok(assigned) => {
                env.exec_command_immediate_success_response(
                    TestUtils::xadd_command("sensor", id, &["temperature", "36"]),
                    TestUtils::expected_bulk_string(assigned),
                )
                .await
            }
            Err(e) => {
                env.exec_command_immediate_error_response(
                    TestUtils::xadd_command("sensor", id, &["temperature", "36"]),
                    e,
                )
                .await
            }
        }
    }
}

#[tokio::test]
async fn test_xadd_zero_ids() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_error_response(
        TestUtils::xadd_command("sensor", "0-0", &["t", "1"]),
        CommandError::StreamAdd(StreamAddError::IdNotGreaterThanZero),
    )
    .await;
    env.exec_command_immediate_success_response(
        TestUtils::xadd_command("sensor", "0-*", &["t", "1"]),
        TestUtils::expected_bulk_string("0-1"),
    )
    .await;
}

#[tokio::test]
async fn test_xadd_auto_ids_increase() {
    let mut env = TestEnv::new_master_server();

    let mut previous = None;

    for _ in 0..3 {
        let RespValue::BulkString(id) = env
            .exec_command_reply(TestUtils::xadd_command("sensor", "*", &["t", "1"]))
            .await
        else {
            panic!("XADD must reply with the id");
        };

        let id = String::from_utf8_lossy(&id).into_owned();
        let (ms, seq) = id.split_once('-').unwrap();
        let id = (ms.parse::<u64>().unwrap(), seq.parse::<u64>().unwrap());

        if let Some(previous) = previous {
            assert!(id > previous, "{:?} must follow {:?}", id, previous);
        }

        previous = Some(id);
    }
}

#[tokio::test]
async fn test_handle_xrange_command() {
    let mut env = TestEnv::new_master_server();

    for (id, value) in [("1-1", "a"), ("1-2", "b"), ("2-0", "c")] {
        env.exec_command(TestUtils::xadd_command("sensor", id, &["v", value]))
            .await
            .unwrap();
    }

    let test_cases = vec![
        (("-", "+"), vec![("1-1", "a"), ("1-2", "b"), ("2-0", "c")]),
        (("1", "1"), vec![("1-1", "a"), ("1-2", "b")]),
        (("1-2", "+"), vec![("1-2", "b"), ("2-0", "c")]),
        (("-", "1-1"), vec![("1-1", "a")]),
        (("3", "+"), vec![]),
    ];

    for ((start, end), expected) in test_cases {
        let expected = RespValue::Array(
            expected
                .into_iter()
                .map(|(id, value)| TestUtils::expected_stream_entry(id, &["v", value]))
                .collect(),
        );

        env.exec_command_immediate_success_response(
            TestUtils::xrange_command("sensor", start, end),
            expected,
        )
        .await;
    }

    env.exec_command_immediate_success_response(
        TestUtils::xrange_command("missing", "-", "+"),
        RespValue::Array(Vec::new()),
    )
    .await;
}

#[tokio::test]
async fn test_handle_xread_command() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::xadd_command("sensor", "1-1", &["t", "36"]))
        .await
        .unwrap();
    env.exec_command(TestUtils::xadd_command("sensor", "1-2", &["t", "37"]))
        .await
        .unwrap();
    env.exec_command(TestUtils::xadd_command("other", "5-0", &["h", "95"]))
        .await
        .unwrap();

    env.exec_command_immediate_success_response(
        TestUtils::xread_command(&["sensor", "other"], &["1-1", "0-0"]),
        RespValue::Array(vec![
            RespValue::Array(vec![
                TestUtils::expected_bulk_string("sensor"),
                RespValue::Array(vec![TestUtils::expected_stream_entry("1-2", &["t", "37"])]),
            ]),
            RespValue::Array(vec![
                TestUtils::expected_bulk_string("other"),
                RespValue::Array(vec![TestUtils::expected_stream_entry("5-0", &["h", "95"])]),
            ]),
        ]),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::xread_command(&["sensor", "missing"], &["1-2", "0-0"]),
        RespValue::NullArray,
    )
    .await;
    env.exec_command_immediate_error_response(
        TestUtils::command(&["XREAD", "STREAMS", "sensor", "other", "0-0"]),
        CommandError::UnbalancedXread,
    )
    .await;
}

#[tokio::test]
async fn test_blocking_xread_wakes_on_xadd() {
    let env = TestEnv::new_master_server();

    let mut reader = env.new_client();
    let read = tokio::spawn(async move {
        reader
            .exec_command_reply(TestUtils::xread_blocking_command("0", &["sensor"], &["$"]))
            .await
    });

    TestUtils::sleep_ms(100).await;

    let mut writer = env.new_client();
    writer
        .exec_command(TestUtils::xadd_command("sensor", "7-0", &["t", "40"]))
        .await
        .unwrap();

    assert_eq!(
        TestUtils::wait_for_completion(read, Duration::from_secs(2)).await,
        RespValue::Array(vec![RespValue::Array(vec![
            TestUtils::expected_bulk_string("sensor"),
            RespValue::Array(vec![TestUtils::expected_stream_entry("7-0", &["t", "40"])]),
        ])])
    );
}

#[tokio::test]
async fn test_blocking_xread_dollar_ignores_existing_records() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::xadd_command("sensor", "1-1", &["t", "36"]))
        .await
        .unwrap();

    env.exec_command_immediate_success_response(
        TestUtils::xread_blocking_command("100", &["sensor"], &["$"]),
        RespValue::NullArray,
    )
    .await;
}

#[tokio::test]
async fn test_stream_commands_reject_other_types() {
    let mut env = TestEnv::new_master_server();

    env.exec_command(TestUtils::rpush_command("queue", &["job"]))
        .await
        .unwrap();

    let commands = vec![
        TestUtils::xadd_command("queue", "*", &["t", "1"]),
        TestUtils::xrange_command("queue", "-", "+"),
        TestUtils::xread_command(&["queue"], &["0-0"]),
    ];

    for command in commands {
        env.exec_command_immediate_error_response(command, CommandError::WrongType)
            .await;
    }
}
