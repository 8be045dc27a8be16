use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::{KeyType, ServerState},
};

pub struct LlenArguments {
    key: String,
}

impl LlenArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("LLEN", arguments, |n| n == 1)?;

        Ok(Self {
            key: key_argument(&arguments[0]),
        })
    }
}

/// Handles LLEN. A missing key has length 0.
pub async fn llen(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let llen_arguments = LlenArguments::parse(arguments)?;
    state.ensure_type(&llen_arguments.key, KeyType::List).await?;

    let length = state.lists.len(&llen_arguments.key).await;

    Ok(CommandResult::Response(RespValue::Integer(length as i64)))
}
