use std::{net::SocketAddr, sync::Arc};

use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};
use tracing::{debug, info, warn};

use crate::{
    commands::{CommandHandler, CommandResult, Origin, TransactionQueue},
    input::{CommandReadError, RespReader},
    resp::RespValue,
    state::ServerState,
};

/// Serves one client until it disconnects.
///
/// A frame that cannot be decoded ends the connection. Command errors are
/// sent back and the connection carries on. A successful PSYNC turns the
/// connection into a replica link for the rest of its life.
pub async fn handle_client_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    state: Arc<ServerState>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = RespReader::new(reader);
    let mut transaction = TransactionQueue::new();

    loop {
        let input = match reader.read_value().await {
            Ok((input, _)) => input,
            Err(CommandReadError::ConnectionClosed) => {
                debug!(%client_address, "client disconnected");
                break;
            }
            Err(e) => {
                warn!(%client_address, error = %e, "closing connection");
                break;
            }
        };

        let result = match CommandHandler::new(input) {
            Ok(command_handler) => {
                command_handler
                    .handle(&state, Origin::Client, &mut transaction)
                    .await
            }
            Err(e) => Err(e),
        };

        let written = match result {
            Ok(CommandResult::Response(response)) => write_response(&mut writer, &response).await,
            Ok(CommandResult::NoResponse) => Ok(()),
            Ok(CommandResult::FullResync(payload)) => {
                serve_replica(reader, writer, payload, client_address, &state).await;
                return;
            }
            Err(e) => write_response(&mut writer, &e.as_resp()).await,
        };

        if let Err(e) = written {
            warn!(%client_address, error = %e, "failed to write response");
            break;
        }
    }
}

/// Hands the write half of a resynchronizing replica to the propagation task,
/// which sends `payload` ahead of any later write, then reads the replica's
/// acknowledgements until the link closes.
async fn serve_replica(
    mut reader: RespReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    payload: Bytes,
    replica_address: SocketAddr,
    state: &ServerState,
) {
    let id = state.replication.attach_replica(Box::new(writer), payload);
    info!(%replica_address, replica = id, "replica synchronized");

    loop {
        let input = match reader.read_value().await {
            Ok((input, _)) => input,
            Err(CommandReadError::ConnectionClosed) => break,
            Err(e) => {
                warn!(%replica_address, error = %e, "replica link failed");
                break;
            }
        };

        let Ok(command) = CommandHandler::new(input) else {
            continue;
        };

        match acknowledged_offset(&command) {
            Some(offset) => {
                debug!(replica = id, offset, "replica acknowledged");
                state.replication.record_ack(id, offset);
            }
            None => debug!(replica = id, command = %command.name, "ignoring replica message"),
        }
    }

    state.replication.detach_replica(id);
}

fn acknowledged_offset(command: &CommandHandler) -> Option<u64> {
    match command.arguments.as_slice() {
        [option, offset] if command.name == "REPLCONF" && option.eq_ignore_ascii_case(b"ack") => {
            std::str::from_utf8(offset).ok()?.parse().ok()
        }
        _ => None,
    }
}

/// Applies the primary's command stream on a replica.
///
/// Every frame advances the processed offset by its encoded size before it
/// runs, so a `REPLCONF GETACK` reports an offset that includes itself. Only
/// GETACK is answered; every other reply is dropped.
pub async fn handle_master_connection<R, W>(
    mut reader: RespReader<R>,
    mut writer: W,
    state: Arc<ServerState>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut transaction = TransactionQueue::new();

    loop {
        let (input, size) = match reader.read_value().await {
            Ok(frame) => frame,
            Err(CommandReadError::ConnectionClosed) => {
                info!("primary closed the replication link");
                break;
            }
            Err(e) => {
                warn!(error = %e, "replication link failed");
                break;
            }
        };

        let offset = state.replication.add_processed_bytes(size);

        let command = match CommandHandler::new(input) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "ignoring malformed command from primary");
                continue;
            }
        };

        let result = command
            .handle(&state, Origin::Master, &mut transaction)
            .await;

        match result {
            Ok(CommandResult::Response(response)) if command.is_getack() => {
                if let Err(e) = write_response(&mut writer, &response).await {
                    warn!(error = %e, "failed to acknowledge offset");
                    break;
                }
            }
            Ok(_) => debug!(command = %command.name, offset, "applied command from primary"),
            Err(e) => warn!(command = %command.name, error = %e, "command from primary failed"),
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &RespValue) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.encode()).await?;
    writer.flush().await
}
