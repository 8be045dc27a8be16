use std::time::Duration;

use bytes::Bytes;

use crate::{
    commands::{
        command_utils::{check_arity, integer_argument, key_argument, string_argument},
        stream_utils::{parse_range_bound, records_to_resp, RangeBound},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::{KeyType, ServerState},
    stream_store::StreamId,
};

/// Where reading starts for one stream; records strictly after it are returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadStart {
    After(StreamId),
    /// `$`: the last id of the stream when the command starts.
    Last,
}

/// Represents the parsed arguments for the XREAD command.
///
/// Format: `XREAD [BLOCK milliseconds] STREAMS key [key ...] id [id ...]`
#[derive(Debug, PartialEq)]
pub struct XreadArguments {
    /// `None` for a plain read, `Some(0)` blocks indefinitely.
    block_millis: Option<u64>,
    streams: Vec<(String, ReadStart)>,
}

impl XreadArguments {
    /// Parses command arguments into structured XreadArguments.
    ///
    /// # Returns
    ///
    /// * `Ok(XreadArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - If fewer than 3 arguments are given
    /// * `Err(CommandError::NotAnInteger)` - If the block duration is not a non-negative integer
    /// * `Err(CommandError::SyntaxError)` - If `STREAMS` is missing
    /// * `Err(CommandError::UnbalancedXread)` - If keys and ids do not pair up
    /// * `Err(CommandError::InvalidStreamId)` - If an id is malformed
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // XREAD BLOCK 1000 STREAMS mystream $
    /// let args = XreadArguments::parse(&[
    ///     Bytes::from("BLOCK"),
    ///     Bytes::from("1000"),
    ///     Bytes::from("STREAMS"),
    ///     Bytes::from("mystream"),
    ///     Bytes::from("$"),
    /// ])?;
    /// ```
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("XREAD", arguments, |n| n >= 3)?;

        let (block_millis, rest) = if string_argument(&arguments[0])?.eq_ignore_ascii_case("block") {
            (Some(integer_argument::<u64>(&arguments[1])?), &arguments[2..])
        } else {
            (None, arguments)
        };

        let Some((streams_keyword, rest)) = rest.split_first() else {
            return Err(CommandError::SyntaxError);
        };

        if !string_argument(streams_keyword)?.eq_ignore_ascii_case("streams") {
            return Err(CommandError::SyntaxError);
        }

        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(CommandError::UnbalancedXread);
        }

        let (keys, ids) = rest.split_at(rest.len() / 2);

        let streams = keys
            .iter()
            .zip(ids)
            .map(|(key, id)| {
                let start = match string_argument(id)? {
                    "$" => ReadStart::Last,
                    id => ReadStart::After(parse_range_bound(id, RangeBound::Start)?),
                };

                Ok((key_argument(key), start))
            })
            .collect::<Result<Vec<(String, ReadStart)>, CommandError>>()?;

        Ok(Self {
            block_millis,
            streams,
        })
    }
}

/// Handles XREAD.
///
/// Replies `[[key, [[id, [field, value, ...]], ...]], ...]` for every stream
/// with newer records, or a null array when there are none (after the block
/// timeout, if one was given). With `may_block` unset `BLOCK` is ignored.
pub async fn xread(
    state: &ServerState,
    arguments: &[Bytes],
    may_block: bool,
) -> Result<CommandResult, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;

    let mut queries = Vec::with_capacity(xread_arguments.streams.len());

    for (key, start) in xread_arguments.streams {
        state.ensure_type(&key, KeyType::Stream).await?;

        let after = match start {
            ReadStart::After(id) => id,
            ReadStart::Last => state.streams.last_id(&key).await,
        };

        queries.push((key, after));
    }

    let results = match xread_arguments.block_millis {
        Some(block_millis) if may_block => {
            let timeout = (block_millis > 0).then(|| Duration::from_millis(block_millis));
            state.streams.blocking_read(&queries, timeout).await
        }
        _ => state.streams.read_after(&queries).await,
    };

    if results.is_empty() {
        return Ok(CommandResult::Response(RespValue::NullArray));
    }

    let response = results
        .into_iter()
        .map(|(key, records)| RespValue::Array(vec![RespValue::bulk(key), records_to_resp(records)]))
        .collect::<Vec<RespValue>>();

    Ok(CommandResult::Response(RespValue::Array(response)))
}
