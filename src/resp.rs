//! Redis Serialization Protocol (RESP) values.
//!
//! Every frame exchanged with clients and between primary and replica is a
//! [`RespValue`]. Decoding works on a borrowed byte slice and reports how many
//! bytes one complete frame occupied, so the caller can keep partial frames
//! buffered until more data arrives.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

const CRLF: &[u8] = b"\r\n";

/// Deepest array nesting accepted from the wire.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Errors produced while decoding a RESP frame.
///
/// Any of these is fatal for the connection that produced the bytes: the codec
/// never tries to resynchronize on a corrupted stream.
#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("unknown RESP type byte {0:#04x}")]
    UnknownRespType(u8),
    #[error("invalid length prefix")]
    InvalidLength,
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("bulk string is not terminated by CRLF")]
    MissingTerminator,
    #[error("arrays nested too deeply")]
    NestingTooDeep,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    NullBulkString,
    Array(Vec<RespValue>),
    NullArray,
}

impl RespValue {
    /// Builds a bulk string from anything that converts into [`Bytes`].
    pub fn bulk<T: Into<Bytes>>(value: T) -> Self {
        RespValue::BulkString(value.into())
    }

    /// Builds a request array (`*N` of bulk strings), the shape every command takes on the wire.
    pub fn command(parts: &[&str]) -> Self {
        RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::bulk(part.to_string()))
                .collect(),
        )
    }

    pub fn encode_array_from_strings<T: Into<Bytes>>(values: Vec<T>) -> Self {
        RespValue::Array(values.into_iter().map(RespValue::bulk).collect())
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Returns the bytes of a bulk or simple string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::BulkString(bytes) => Some(bytes),
            RespValue::SimpleString(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Serializes the value into its wire form.
    pub fn encode(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        self.encode_into(&mut buffer);
        buffer.freeze()
    }

    pub fn encode_into(&self, buffer: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => {
                buffer.put_u8(b'+');
                buffer.put_slice(s.as_bytes());
                buffer.put_slice(CRLF);
            }
            RespValue::Error(e) => {
                buffer.put_u8(b'-');
                buffer.put_slice(e.as_bytes());
                buffer.put_slice(CRLF);
            }
            RespValue::Integer(i) => {
                buffer.put_u8(b':');
                buffer.put_slice(i.to_string().as_bytes());
                buffer.put_slice(CRLF);
            }
            RespValue::BulkString(bytes) => {
                buffer.put_u8(b'$');
                buffer.put_slice(bytes.len().to_string().as_bytes());
                buffer.put_slice(CRLF);
                buffer.put_slice(bytes);
                buffer.put_slice(CRLF);
            }
            RespValue::NullBulkString => buffer.put_slice(b"$-1\r\n"),
            RespValue::Array(elements) => {
                buffer.put_u8(b'*');
                buffer.put_slice(elements.len().to_string().as_bytes());
                buffer.put_slice(CRLF);

                for element in elements {
                    element.encode_into(buffer);
                }
            }
            RespValue::NullArray => buffer.put_slice(b"*-1\r\n"),
        }
    }

    /// Decodes one frame from the front of `buffer`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete frame,
    /// and `Ok(Some((value, consumed)))` once it does.
    pub fn decode(buffer: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
        let mut cursor = 0;

        match Self::decode_at(buffer, &mut cursor, 0)? {
            Some(value) => Ok(Some((value, cursor))),
            None => Ok(None),
        }
    }

    fn decode_at(
        buffer: &[u8],
        cursor: &mut usize,
        depth: usize,
    ) -> Result<Option<RespValue>, RespError> {
        let Some(&type_byte) = buffer.get(*cursor) else {
            return Ok(None);
        };

        let Some(line) = read_line(buffer, *cursor + 1) else {
            return Ok(None);
        };
        let line_end = *cursor + 1 + line.len() + CRLF.len();

        match type_byte {
            b'+' => {
                *cursor = line_end;
                Ok(Some(RespValue::SimpleString(line_to_string(line)?)))
            }
            b'-' => {
                *cursor = line_end;
                Ok(Some(RespValue::Error(line_to_string(line)?)))
            }
            b':' => {
                let value = line_to_string(line)?
                    .parse::<i64>()
                    .map_err(|_| RespError::FailedToParseInteger)?;
                *cursor = line_end;
                Ok(Some(RespValue::Integer(value)))
            }
            b'$' => {
                let length = parse_length(line)?;

                let Some(length) = length else {
                    *cursor = line_end;
                    return Ok(Some(RespValue::NullBulkString));
                };

                let data_end = line_end + length;

                if buffer.len() < data_end + CRLF.len() {
                    return Ok(None);
                }

                if &buffer[data_end..data_end + CRLF.len()] != CRLF {
                    return Err(RespError::MissingTerminator);
                }

                let data = Bytes::copy_from_slice(&buffer[line_end..data_end]);
                *cursor = data_end + CRLF.len();
                Ok(Some(RespValue::BulkString(data)))
            }
            b'*' => {
                let length = parse_length(line)?;

                let Some(length) = length else {
                    *cursor = line_end;
                    return Ok(Some(RespValue::NullArray));
                };

                if depth >= MAX_NESTING_DEPTH {
                    return Err(RespError::NestingTooDeep);
                }

                let mut element_cursor = line_end;
                let mut elements = Vec::with_capacity(length.min(1024));

                for _ in 0..length {
                    match Self::decode_at(buffer, &mut element_cursor, depth + 1)? {
                        Some(element) => elements.push(element),
                        None => return Ok(None),
                    }
                }

                *cursor = element_cursor;
                Ok(Some(RespValue::Array(elements)))
            }
            other => Err(RespError::UnknownRespType(other)),
        }
    }
}

/// Returns the bytes between `start` and the next CRLF, if a CRLF is present.
fn read_line(buffer: &[u8], start: usize) -> Option<&[u8]> {
    if start > buffer.len() {
        return None;
    }

    buffer[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|position| &buffer[start..start + position])
}

fn line_to_string(line: &[u8]) -> Result<String, RespError> {
    std::str::from_utf8(line)
        .map(str::to_string)
        .map_err(|_| RespError::InvalidUtf8)
}

/// Parses a `$`/`*` length prefix. `-1` denotes the null form.
fn parse_length(line: &[u8]) -> Result<Option<usize>, RespError> {
    let text = std::str::from_utf8(line).map_err(|_| RespError::InvalidLength)?;
    let length = text.parse::<i64>().map_err(|_| RespError::InvalidLength)?;

    match length {
        -1 => Ok(None),
        n if n < 0 => Err(RespError::InvalidLength),
        n => Ok(Some(n as usize)),
    }
}
