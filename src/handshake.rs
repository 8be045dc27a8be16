//! Replica side of the replication handshake.

use regex::Regex;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};
use tracing::info;

use crate::{
    input::{CommandReadError, RespReader},
    resp::RespValue,
};

/// Runs the handshake over a fresh connection to the primary.
///
/// On success the returned halves are positioned right after the snapshot
/// payload, ready for the primary's command stream.
pub async fn handshake(
    stream: TcpStream,
    listening_port: u16,
) -> Result<(RespReader<OwnedReadHalf>, OwnedWriteHalf), CommandReadError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = RespReader::new(reader);

    perform_handshake(&mut reader, &mut writer, listening_port).await?;

    Ok((reader, writer))
}

/// `PING`, `REPLCONF listening-port`, `REPLCONF capa psync2`, `PSYNC ? -1`,
/// then the snapshot, which is read and discarded.
pub async fn perform_handshake<R, W>(
    reader: &mut RespReader<R>,
    writer: &mut W,
    listening_port: u16,
) -> Result<(), CommandReadError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send(writer, &["PING"]).await?;
    expect_simple_string(reader, "PONG").await?;
    info!("handshake: primary answered PING");

    let port = listening_port.to_string();
    send(writer, &["REPLCONF", "listening-port", &port]).await?;
    expect_simple_string(reader, "OK").await?;

    send(writer, &["REPLCONF", "capa", "psync2"]).await?;
    expect_simple_string(reader, "OK").await?;
    info!("handshake: replication settings accepted");

    send(writer, &["PSYNC", "?", "-1"]).await?;

    let (replication_id, offset) = match reader.read_value().await? {
        (RespValue::SimpleString(line), _) => parse_full_resync(&line)?,
        (other, _) => {
            return Err(CommandReadError::InvalidResponseFromMaster(format!(
                "expected FULLRESYNC, got {:?}",
                other
            )))
        }
    };

    let snapshot = reader.read_snapshot_payload().await?;
    info!(
        %replication_id,
        offset,
        snapshot_bytes = snapshot.len(),
        "handshake: full resynchronization received"
    );

    Ok(())
}

/// Parses `FULLRESYNC <replid> <offset>`.
pub fn parse_full_resync(line: &str) -> Result<(String, u64), CommandReadError> {
    let pattern = Regex::new(r"^FULLRESYNC ([a-zA-Z0-9]{40}) (\d+)$")
        .map_err(|e| CommandReadError::InvalidResponseFromMaster(e.to_string()))?;

    let invalid = || CommandReadError::InvalidResponseFromMaster(line.to_string());

    let captures = pattern.captures(line).ok_or_else(invalid)?;
    let offset = captures[2].parse::<u64>().map_err(|_| invalid())?;

    Ok((captures[1].to_string(), offset))
}

async fn send<W>(writer: &mut W, parts: &[&str]) -> Result<(), CommandReadError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&RespValue::command(parts).encode()).await?;
    writer.flush().await?;

    Ok(())
}

async fn expect_simple_string<R>(
    reader: &mut RespReader<R>,
    expected: &str,
) -> Result<(), CommandReadError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_value().await? {
        (RespValue::SimpleString(reply), _) if reply.eq_ignore_ascii_case(expected) => Ok(()),
        (other, _) => Err(CommandReadError::InvalidResponseFromMaster(format!(
            "expected {}, got {:?}",
            expected, other
        ))),
    }
}
