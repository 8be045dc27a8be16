use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::ServerState,
};

pub struct TypeArguments {
    key: String,
}

impl TypeArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("TYPE", arguments, |n| n == 1)?;

        Ok(Self {
            key: key_argument(&arguments[0]),
        })
    }
}

pub async fn type_command(
    state: &ServerState,
    arguments: &[Bytes],
) -> Result<CommandResult, CommandError> {
    let type_arguments = TypeArguments::parse(arguments)?;

    let key_type = state.key_type(&type_arguments.key).await;

    Ok(CommandResult::Response(RespValue::SimpleString(
        key_type.to_string(),
    )))
}
