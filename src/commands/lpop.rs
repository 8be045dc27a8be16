use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, integer_argument, key_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::{KeyType, ServerState},
};

pub struct LpopArguments {
    key: String,
    /// `None` when no count was given; the reply is then a single bulk string.
    count: Option<usize>,
}

impl LpopArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("LPOP", arguments, |n| n == 1 || n == 2)?;

        let count = match arguments.get(1) {
            Some(count) => Some(integer_argument::<usize>(count)?),
            None => None,
        };

        Ok(Self {
            key: key_argument(&arguments[0]),
            count,
        })
    }
}

/// Handles LPOP.
///
/// Without a count the reply is the popped element or a null bulk string.
/// With a count it is an array of up to `count` elements, or a null array
/// when the key does not exist.
pub async fn lpop(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let lpop_arguments = LpopArguments::parse(arguments)?;
    state.ensure_type(&lpop_arguments.key, KeyType::List).await?;

    let response = match lpop_arguments.count {
        None => match state.lists.pop_front(&lpop_arguments.key, 1).await {
            Some(mut popped) if !popped.is_empty() => RespValue::BulkString(popped.remove(0)),
            _ => RespValue::NullBulkString,
        },
        Some(0) if state.lists.contains(&lpop_arguments.key).await => RespValue::Array(Vec::new()),
        Some(count) => match state.lists.pop_front(&lpop_arguments.key, count).await {
            Some(popped) => RespValue::encode_array_from_strings(popped),
            None => RespValue::NullArray,
        },
    };

    Ok(CommandResult::Response(response))
}
