use std::time::Duration;

use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument, string_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    list_store::FrontPop,
    state::{KeyType, ServerState},
};

pub struct BlpopArguments {
    key: String,
    /// `None` blocks until an element arrives.
    timeout: Option<Duration>,
}

impl BlpopArguments {
    /// Parses `key timeout`, where the timeout is a possibly fractional
    /// number of seconds and `0` means forever.
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("BLPOP", arguments, |n| n == 2)?;

        let seconds = string_argument(&arguments[1])
            .ok()
            .and_then(|seconds| seconds.parse::<f64>().ok())
            .filter(|seconds| seconds.is_finite())
            .ok_or(CommandError::InvalidTimeout)?;

        if seconds < 0.0 {
            return Err(CommandError::NegativeTimeout);
        }

        let timeout = if seconds == 0.0 {
            None
        } else {
            Some(Duration::try_from_secs_f64(seconds).map_err(|_| CommandError::InvalidTimeout)?)
        };

        Ok(Self {
            key: key_argument(&arguments[0]),
            timeout,
        })
    }
}

/// Handles BLPOP.
///
/// Replies `[key, element]` once an element is available, or a null array
/// when the timeout elapses. With `may_block` unset the command only looks at
/// the current list, which is how it runs inside `EXEC` and on a replica
/// applying the primary's stream.
///
/// An element found in the list is popped under the write-order guard and
/// replicated as `LPOP`. An element handed over by a later push was already
/// replicated by that push.
pub async fn blpop(
    state: &ServerState,
    arguments: &[Bytes],
    may_block: bool,
) -> Result<CommandResult, CommandError> {
    let blpop_arguments = BlpopArguments::parse(arguments)?;
    state.ensure_type(&blpop_arguments.key, KeyType::List).await?;

    let key = blpop_arguments.key.as_str();

    let front = {
        let _write_order = state.replication.write_order().await;

        let front = if may_block {
            state.lists.pop_or_park(key).await
        } else {
            match state.lists.pop_front(key, 1).await.and_then(|popped| popped.into_iter().next()) {
                Some(element) => FrontPop::Ready(element),
                None => {
                    return Ok(CommandResult::Response(RespValue::NullArray));
                }
            }
        };

        if let FrontPop::Ready(_) = front {
            state
                .replication
                .propagate(RespValue::command(&["LPOP", key]).encode());
        }

        front
    };

    let element = match front {
        FrontPop::Ready(element) => Some(element),
        FrontPop::Parked(parked) => state.lists.wait(parked, blpop_arguments.timeout).await,
    };

    let response = match element {
        Some(element) => RespValue::Array(vec![
            RespValue::bulk(blpop_arguments.key),
            RespValue::BulkString(element),
        ]),
        None => RespValue::NullArray,
    };

    Ok(CommandResult::Response(response))
}
