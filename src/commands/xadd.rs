use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument, string_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::{KeyType, ServerState},
    stream_store::{StreamFields, StreamIdRequest},
};

/// Represents the parsed arguments for the XADD command.
///
/// Format: `XADD key id field value [field value ...]`
pub struct XaddArguments {
    key: String,
    id: StreamIdRequest,
    /// Field/value pairs in argument order. A repeated field keeps the
    /// position of its first occurrence and the value of its last.
    fields: StreamFields,
}

impl XaddArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("XADD", arguments, |n| n >= 4 && n % 2 == 0)?;

        let id = string_argument(&arguments[1])?
            .parse::<StreamIdRequest>()
            .map_err(|_| CommandError::InvalidStreamId)?;

        let mut fields: StreamFields = Vec::with_capacity((arguments.len() - 2) / 2);

        for pair in arguments[2..].chunks_exact(2) {
            match fields.iter_mut().find(|(field, _)| *field == pair[0]) {
                Some((_, value)) => *value = pair[1].clone(),
                None => fields.push((pair[0].clone(), pair[1].clone())),
            }
        }

        Ok(Self {
            key: key_argument(&arguments[0]),
            id,
            fields,
        })
    }
}

/// Handles XADD, replying with the id that was assigned to the record.
///
/// Runs under the write-order guard. Replicas receive the command with the
/// assigned id in place of `*` or `ms-*`, so they store the same id.
pub async fn xadd(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;
    state.ensure_type(&xadd_arguments.key, KeyType::Stream).await?;

    let id = state
        .streams
        .add(&xadd_arguments.key, xadd_arguments.id, xadd_arguments.fields)
        .await?;

    let replicated = [
        &[
            Bytes::from_static(b"XADD"),
            arguments[0].clone(),
            Bytes::from(id.to_string()),
        ][..],
        &arguments[2..],
    ]
    .concat();
    state
        .replication
        .propagate(RespValue::encode_array_from_strings(replicated).encode());

    Ok(CommandResult::Response(RespValue::bulk(id.to_string())))
}
