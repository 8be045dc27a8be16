use bytes::Bytes;

use crate::{
    commands::{command_utils::check_arity, CommandError, CommandResult},
    resp::RespValue,
};

pub struct EchoArguments {
    message: Bytes,
}

impl EchoArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("ECHO", arguments, |n| n == 1)?;

        Ok(Self {
            message: arguments[0].clone(),
        })
    }
}

/// Handles the Redis ECHO command.
///
/// Returns the argument unchanged as a bulk string, byte for byte.
///
/// # Examples
///
/// ```ignore
/// // ECHO "hello world"
/// let result = echo(&[Bytes::from("hello world")]);
/// // Returns: "$11\r\nhello world\r\n"
/// ```
pub fn echo(arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let echo_arguments = EchoArguments::parse(arguments)?;

    Ok(CommandResult::Response(RespValue::BulkString(
        echo_arguments.message,
    )))
}
