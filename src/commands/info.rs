use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, string_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::ServerState,
};

pub struct InfoArguments {
    section: Option<String>,
}

impl InfoArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("INFO", arguments, |n| n <= 1)?;

        let section = match arguments.first() {
            Some(section) => Some(string_argument(section)?.to_lowercase()),
            None => None,
        };

        Ok(Self { section })
    }
}

/// Handles INFO. Only the replication section has content; any other section
/// yields an empty bulk string.
pub fn info(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let info_arguments = InfoArguments::parse(arguments)?;

    let body = match info_arguments.section.as_deref() {
        None | Some("replication") | Some("all") | Some("everything") => state.replication.info(),
        Some(_) => String::new(),
    };

    Ok(CommandResult::Response(RespValue::bulk(body)))
}
