use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument, string_argument},
        stream_utils::{parse_range_bound, records_to_resp, RangeBound},
        CommandError, CommandResult,
    },
    state::{KeyType, ServerState},
    stream_store::StreamId,
};

pub struct XrangeArguments {
    key: String,
    start: StreamId,
    end: StreamId,
}

impl XrangeArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("XRANGE", arguments, |n| n == 3)?;

        Ok(Self {
            key: key_argument(&arguments[0]),
            start: parse_range_bound(string_argument(&arguments[1])?, RangeBound::Start)?,
            end: parse_range_bound(string_argument(&arguments[2])?, RangeBound::End)?,
        })
    }
}

/// Handles XRANGE. Both bounds are inclusive; a missing key yields an empty
/// array.
pub async fn xrange(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let xrange_arguments = XrangeArguments::parse(arguments)?;
    state.ensure_type(&xrange_arguments.key, KeyType::Stream).await?;

    let records = state
        .streams
        .range(&xrange_arguments.key, xrange_arguments.start, xrange_arguments.end)
        .await;

    Ok(CommandResult::Response(records_to_resp(records)))
}
