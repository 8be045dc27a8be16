use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::{KeyType, ServerState},
};

pub struct GetArguments {
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("GET", arguments, |n| n == 1)?;

        Ok(Self {
            key: key_argument(&arguments[0]),
        })
    }
}

/// Handles the Redis GET command.
///
/// Returns the stored bytes, or a null bulk string when the key is missing or
/// its expiry has passed.
///
/// # Returns
///
/// * `Ok(CommandResult::Response)` - Bulk string or null bulk string
/// * `Err(CommandError::WrongNumberOfArguments)` - If not exactly one argument is given
/// * `Err(CommandError::WrongType)` - If the key holds a list or a stream
pub async fn get(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let get_arguments = GetArguments::parse(arguments)?;

    match state.strings.get(&get_arguments.key).await {
        Some(value) => Ok(CommandResult::Response(RespValue::BulkString(value))),
        None => {
            state.ensure_type(&get_arguments.key, KeyType::String).await?;
            Ok(CommandResult::Response(RespValue::NullBulkString))
        }
    }
}
