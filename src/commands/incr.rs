use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::{KeyType, ServerState},
};

pub struct IncrArguments {
    key: String,
}

impl IncrArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("INCR", arguments, |n| n == 1)?;

        Ok(Self {
            key: key_argument(&arguments[0]),
        })
    }
}

/// Handles the Redis INCR command.
///
/// A missing key counts as zero. A value that is not a base-10 `i64`, or an
/// increment that would overflow, fails without touching the stored value.
pub async fn incr(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let incr_arguments = IncrArguments::parse(arguments)?;

    state.ensure_type(&incr_arguments.key, KeyType::String).await?;

    let value = state
        .strings
        .incr(&incr_arguments.key)
        .await
        .map_err(|_| CommandError::NotAnInteger)?;

    Ok(CommandResult::Response(RespValue::Integer(value)))
}
