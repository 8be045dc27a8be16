use std::time::Duration;

use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, integer_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::ServerState,
};

pub struct WaitArguments {
    pub number_of_replicas: usize,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl WaitArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("WAIT", arguments, |n| n == 2)?;

        let number_of_replicas = integer_argument::<usize>(&arguments[0])?;
        let timeout = match integer_argument::<u64>(&arguments[1])? {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        };

        Ok(Self {
            number_of_replicas,
            timeout,
        })
    }
}

/// Handles WAIT, replying with the number of replicas that acknowledged every
/// write propagated before the call.
pub async fn wait(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let wait_arguments = WaitArguments::parse(arguments)?;

    if state.replication.is_replica() {
        return Err(CommandError::WaitOnReplica);
    }

    let acknowledged = state
        .replication
        .wait_for_acks(wait_arguments.number_of_replicas, wait_arguments.timeout)
        .await;

    Ok(CommandResult::Response(RespValue::Integer(
        acknowledged as i64,
    )))
}
