use bytes::Bytes;

use crate::{
    commands::{command_utils::check_arity, CommandError, CommandResult},
    resp::RespValue,
};

pub struct PingArguments {
    message: Option<Bytes>,
}

impl PingArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("PING", arguments, |n| n <= 1)?;

        Ok(Self {
            message: arguments.first().cloned(),
        })
    }
}

pub fn ping(arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let ping_arguments = PingArguments::parse(arguments)?;

    match ping_arguments.message {
        Some(message) => Ok(CommandResult::Response(RespValue::BulkString(message))),
        None => Ok(CommandResult::Response(RespValue::SimpleString(
            "PONG".to_string(),
        ))),
    }
}
