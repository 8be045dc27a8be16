use std::time::Duration;

use redis_server::resp::RespValue;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_blpop_concurrent_clients_simple_blocking() {
    let env = TestEnv::new_master_server();

    // Client tries to BLPOP from an empty list and blocks
    let client_task = TestUtils::spawn_blpop_task(&env, "test_list", "2");

    TestUtils::sleep_ms(100).await;

    let mut pusher = env.new_client();
    pusher
        .exec_command_immediate_success_response(
            TestUtils::rpush_command("test_list", &["item1"]),
            TestUtils::expected_integer(1),
        )
        .await;

    assert_eq!(
        TestUtils::wait_for_completion(client_task, Duration::from_secs(3)).await,
        TestUtils::expected_bulk_string_array(&["test_list", "item1"])
    );

    // The element went to the waiter, not back into the list.
    pusher
        .exec_command_immediate_success_response(
            TestUtils::llen_command("test_list"),
            TestUtils::expected_integer(0),
        )
        .await;
}

#[tokio::test]
async fn test_blpop_concurrent_clients_one_element_one_winner() {
    let env = TestEnv::new_master_server();

    let tasks = (0..3)
        .map(|_| TestUtils::spawn_blpop_task(&env, "test_queue", "1"))
        .collect::<Vec<_>>();

    TestUtils::sleep_ms(100).await;

    let mut pusher = env.new_client();
    pusher
        .exec_command(TestUtils::rpush_command("test_queue", &["single_item"]))
        .await
        .unwrap();

    let mut results = Vec::new();
    for task in tasks {
        results.push(TestUtils::wait_for_completion(task, Duration::from_secs(3)).await);
    }

    let winners = results
        .iter()
        .filter(|result| **result == TestUtils::expected_bulk_string_array(&["test_queue", "single_item"]))
        .count();
    let timeouts = results
        .iter()
        .filter(|result| **result == RespValue::NullArray)
        .count();

    assert_eq!(winners, 1, "only one client may receive the element: {:?}", results);
    assert_eq!(timeouts, 2, "the other clients must time out: {:?}", results);
}

#[tokio::test]
async fn test_blpop_concurrent_clients_first_come_first_served() {
    let env = TestEnv::new_master_server();

    let first = TestUtils::spawn_blpop_task(&env, "fifo", "0");
    TestUtils::sleep_ms(50).await;
    let second = TestUtils::spawn_blpop_task(&env, "fifo", "0");
    TestUtils::sleep_ms(50).await;

    let mut pusher = env.new_client();
    pusher
        .exec_command(TestUtils::rpush_command("fifo", &["one", "two"]))
        .await
        .unwrap();

    assert_eq!(
        TestUtils::wait_for_completion(first, Duration::from_secs(2)).await,
        TestUtils::expected_bulk_string_array(&["fifo", "one"])
    );
    assert_eq!(
        TestUtils::wait_for_completion(second, Duration::from_secs(2)).await,
        TestUtils::expected_bulk_string_array(&["fifo", "two"])
    );
}

#[tokio::test]
async fn test_blpop_timed_out_waiter_does_not_take_later_element() {
    let env = TestEnv::new_master_server();

    let waiter = TestUtils::spawn_blpop_task(&env, "late", "0.1");
    assert_eq!(
        TestUtils::wait_for_completion(waiter, Duration::from_secs(2)).await,
        RespValue::NullArray
    );

    let mut pusher = env.new_client();
    pusher
        .exec_command(TestUtils::rpush_command("late", &["item"]))
        .await
        .unwrap();
    pusher
        .exec_command_immediate_success_response(
            TestUtils::lrange_command("late", 0, -1),
            TestUtils::expected_bulk_string_array(&["item"]),
        )
        .await;
}
