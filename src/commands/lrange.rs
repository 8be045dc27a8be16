use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, integer_argument, key_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::{KeyType, ServerState},
};

pub struct LrangeArguments {
    key: String,
    start: i64,
    end: i64,
}

impl LrangeArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("LRANGE", arguments, |n| n == 3)?;

        Ok(Self {
            key: key_argument(&arguments[0]),
            start: integer_argument(&arguments[1])?,
            end: integer_argument(&arguments[2])?,
        })
    }
}

/// Handles LRANGE with inclusive, possibly negative indices.
pub async fn lrange(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let lrange_arguments = LrangeArguments::parse(arguments)?;
    state.ensure_type(&lrange_arguments.key, KeyType::List).await?;

    let elements = state
        .lists
        .range(&lrange_arguments.key, lrange_arguments.start, lrange_arguments.end)
        .await;

    Ok(CommandResult::Response(RespValue::encode_array_from_strings(
        elements,
    )))
}
