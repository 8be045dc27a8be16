use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument},
        CommandError, CommandResult,
    },
    list_store::ListEnd,
    resp::RespValue,
    state::{KeyType, ServerState},
};

pub struct PushArguments {
    key: String,
    values: Vec<Bytes>,
}

impl PushArguments {
    pub fn parse(name: &str, arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity(name, arguments, |n| n >= 2)?;

        Ok(Self {
            key: key_argument(&arguments[0]),
            values: arguments[1..].to_vec(),
        })
    }
}

pub async fn rpush(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    push(state, "RPUSH", arguments, ListEnd::Back).await
}

pub async fn lpush(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    push(state, "LPUSH", arguments, ListEnd::Front).await
}

/// Appends or prepends every value and replies with the list length right
/// after the push.
///
/// Runs under the write-order guard and replicates itself: the push, then one
/// `LPOP` per element handed straight to a blocked client, so replicas end up
/// with the same list.
async fn push(
    state: &ServerState,
    name: &str,
    arguments: &[Bytes],
    end: ListEnd,
) -> Result<CommandResult, CommandError> {
    let push_arguments = PushArguments::parse(name, arguments)?;
    state.ensure_type(&push_arguments.key, KeyType::List).await?;

    let outcome = state
        .lists
        .push(&push_arguments.key, push_arguments.values, end)
        .await;

    let replicated = [&[Bytes::from(name.to_string())][..], arguments].concat();
    state
        .replication
        .propagate(RespValue::encode_array_from_strings(replicated).encode());

    for _ in 0..outcome.handed_off {
        state
            .replication
            .propagate(RespValue::command(&["LPOP", push_arguments.key.as_str()]).encode());
    }

    Ok(CommandResult::Response(RespValue::Integer(outcome.length as i64)))
}
