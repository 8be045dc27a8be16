use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, string_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::ServerState,
};

pub struct ConfigGetArguments {
    names: Vec<String>,
}

impl ConfigGetArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("CONFIG|GET", arguments, |n| n >= 1)?;

        let names = arguments
            .iter()
            .map(|argument| string_argument(argument).map(str::to_lowercase))
            .collect::<Result<Vec<String>, CommandError>>()?;

        Ok(Self { names })
    }
}

/// Handles CONFIG GET: a flat array of name/value pairs for every requested
/// parameter that is set, or an empty array.
pub fn config_get(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let config_get_arguments = ConfigGetArguments::parse(arguments)?;

    let mut response = Vec::new();

    for name in config_get_arguments.names {
        if let Some(value) = state.config.get(&name) {
            response.push(RespValue::bulk(value.to_string()));
            response.insert(response.len() - 1, RespValue::bulk(name));
        }
    }

    Ok(CommandResult::Response(RespValue::Array(response)))
}
