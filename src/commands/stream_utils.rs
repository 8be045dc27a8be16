use crate::{
    commands::CommandError,
    resp::RespValue,
    stream_store::{StreamId, StreamRecord},
};

/// Which end of a range an incomplete id stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeBound {
    Start,
    End,
}

/// Parses a range bound as accepted by XRANGE and XREAD.
///
/// `-` and `+` are the smallest and greatest ids. A bare `ms` takes sequence
/// `0` as a start bound and the largest sequence as an end bound.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_range_bound("5", RangeBound::End), Ok(StreamId::new(5, u64::MAX)));
/// assert_eq!(parse_range_bound("5-3", RangeBound::Start), Ok(StreamId::new(5, 3)));
/// ```
pub fn parse_range_bound(argument: &str, bound: RangeBound) -> Result<StreamId, CommandError> {
    match argument {
        "-" => return Ok(StreamId::ZERO),
        "+" => return Ok(StreamId::MAX),
        _ => {}
    }

    if argument.contains('-') {
        return argument
            .parse::<StreamId>()
            .map_err(|_| CommandError::InvalidStreamId);
    }

    let ms = argument
        .parse::<u64>()
        .map_err(|_| CommandError::InvalidStreamId)?;

    Ok(match bound {
        RangeBound::Start => StreamId::new(ms, 0),
        RangeBound::End => StreamId::new(ms, u64::MAX),
    })
}

/// Converts stream records to the RESP shape shared by XRANGE and XREAD:
/// `[[id, [field, value, ...]], ...]`.
pub fn records_to_resp(records: Vec<StreamRecord>) -> RespValue {
    let entries = records
        .into_iter()
        .map(|record| {
            let fields = record
                .fields
                .into_iter()
                .flat_map(|(field, value)| [RespValue::BulkString(field), RespValue::BulkString(value)])
                .collect::<Vec<RespValue>>();

            RespValue::Array(vec![
                RespValue::bulk(record.id.to_string()),
                RespValue::Array(fields),
            ])
        })
        .collect::<Vec<RespValue>>();

    RespValue::Array(entries)
}
