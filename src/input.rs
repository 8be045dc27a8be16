//! Reading RESP frames from network streams.
//!
//! [`RespReader`] owns the read half of a socket together with a growable
//! buffer. It hands out one complete frame at a time, along with the exact
//! number of bytes that frame occupied on the wire, which is what replication
//! offset accounting is based on.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::resp::{RespError, RespValue};

/// Errors that can occur while reading frames from a network stream.
#[derive(Error, Debug, PartialEq)]
pub enum CommandReadError {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("RESP parse error: {0}")]
    RespParseError(#[from] RespError),
    #[error("invalid response from master: {0}")]
    InvalidResponseFromMaster(String),
}

impl From<std::io::Error> for CommandReadError {
    fn from(err: std::io::Error) -> Self {
        CommandReadError::IoError(err.to_string())
    }
}

/// Buffered frame reader over any async byte source.
#[derive(Debug)]
pub struct RespReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R> RespReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Reads the next complete frame.
    ///
    /// Returns the decoded value and the number of bytes it occupied. A clean
    /// end of stream between frames yields [`CommandReadError::ConnectionClosed`];
    /// an end of stream in the middle of a frame is reported as an I/O error.
    pub async fn read_value(&mut self) -> Result<(RespValue, usize), CommandReadError> {
        loop {
            if let Some((value, consumed)) = RespValue::decode(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok((value, consumed));
            }

            self.fill_buffer().await?;
        }
    }

    /// Reads one CRLF-terminated line, without the terminator.
    pub async fn read_line(&mut self) -> Result<String, CommandReadError> {
        loop {
            if let Some(position) = self.buffer.windows(2).position(|window| window == b"\r\n") {
                let line = self.buffer.split_to(position);
                self.buffer.advance(2);

                return String::from_utf8(line.to_vec())
                    .map_err(|_| CommandReadError::RespParseError(RespError::InvalidUtf8));
            }

            self.fill_buffer().await?;
        }
    }

    /// Reads a snapshot transfer: `$<len>\r\n` followed by exactly `len` raw
    /// bytes with no trailing CRLF.
    pub async fn read_snapshot_payload(&mut self) -> Result<Bytes, CommandReadError> {
        let header = self.read_line().await?;

        let Some(length) = header.strip_prefix('$') else {
            return Err(CommandReadError::InvalidResponseFromMaster(format!(
                "expected snapshot header, got {}",
                header
            )));
        };

        let length = length.parse::<usize>().map_err(|_| {
            CommandReadError::InvalidResponseFromMaster(format!("invalid snapshot length {}", length))
        })?;

        while self.buffer.len() < length {
            self.fill_buffer().await?;
        }

        Ok(self.buffer.split_to(length).freeze())
    }

    async fn fill_buffer(&mut self) -> Result<(), CommandReadError> {
        let number_of_bytes = self.reader.read_buf(&mut self.buffer).await?;

        if number_of_bytes == 0 {
            if self.buffer.is_empty() {
                return Err(CommandReadError::ConnectionClosed);
            }

            return Err(CommandReadError::IoError(
                "connection reset in the middle of a frame".to_string(),
            ));
        }

        Ok(())
    }
}
