use bytes::Bytes;
use globset::Glob;

use crate::{
    commands::{
        command_utils::{check_arity, string_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::ServerState,
};

pub struct KeysArguments {
    pattern: String,
}

impl KeysArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("KEYS", arguments, |n| n == 1)?;

        Ok(Self {
            pattern: string_argument(&arguments[0])?.to_string(),
        })
    }
}

/// Handles the Redis KEYS command: every live string key matching the glob
/// pattern, in sorted order.
pub async fn keys(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let keys_arguments = KeysArguments::parse(arguments)?;

    let matcher = Glob::new(&keys_arguments.pattern)
        .map_err(|e| CommandError::InvalidPattern(e.to_string()))?
        .compile_matcher();

    let keys = state
        .strings
        .keys()
        .await
        .into_iter()
        .filter(|key| matcher.is_match(key))
        .map(RespValue::bulk)
        .collect();

    Ok(CommandResult::Response(RespValue::Array(keys)))
}
