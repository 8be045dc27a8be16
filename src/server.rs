use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::net::{
    tcp::{OwnedReadHalf, OwnedWriteHalf},
    TcpListener, TcpStream,
};
use tracing::{error, info, warn};

use crate::{
    config::Config,
    connection::{handle_client_connection, handle_master_connection},
    handshake::handshake,
    input::RespReader,
    rdb::load_snapshot,
    state::ServerState,
};

const HANDSHAKE_ATTEMPTS: u32 = 5;
const HANDSHAKE_BACKOFF: Duration = Duration::from_millis(100);

pub struct RedisServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl RedisServer {
    /// Binds the listening socket. Port `0` picks a free port.
    pub async fn bind(config: Config) -> anyhow::Result<Self> {
        let address = format!("127.0.0.1:{}", config.port());
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {}", address))?;

        Ok(Self {
            listener,
            state: ServerState::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Loads the snapshot, joins the primary when configured as a replica,
    /// then serves clients until the listener fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let snapshot_path = self.state.config.snapshot_path();
        let entries = load_snapshot(&snapshot_path)
            .await
            .with_context(|| format!("failed to load snapshot {}", snapshot_path.display()))?;
        self.state.load_snapshot_entries(entries).await;

        let local_addr = self.local_addr()?;

        if let Some((host, port)) = self.state.config.replica_of() {
            let (reader, writer) = connect_to_master(host, port, local_addr.port()).await?;
            tokio::spawn(handle_master_connection(reader, writer, self.state()));
        }

        info!(address = %local_addr, role = ?self.state.replication.role(), "server listening");

        loop {
            match self.listener.accept().await {
                Ok((stream, client_address)) => {
                    info!(%client_address, "accepted connection");
                    tokio::spawn(handle_client_connection(stream, client_address, self.state()));
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }
    }
}

/// Dials the primary and completes the handshake, retrying with a growing
/// delay before giving up.
async fn connect_to_master(
    host: &str,
    port: u16,
    listening_port: u16,
) -> anyhow::Result<(RespReader<OwnedReadHalf>, OwnedWriteHalf)> {
    let mut delay = HANDSHAKE_BACKOFF;
    let mut attempt = 1;

    loop {
        let result = match TcpStream::connect((host, port)).await {
            Ok(stream) => handshake(stream, listening_port)
                .await
                .map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e)),
        };

        match result {
            Ok(link) => {
                info!(%host, port, "connected to primary");
                return Ok(link);
            }
            Err(e) if attempt < HANDSHAKE_ATTEMPTS => {
                warn!(%host, port, attempt, error = %e, "handshake with primary failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "could not complete handshake with primary {}:{} after {} attempts",
                        host, port, HANDSHAKE_ATTEMPTS
                    )
                });
            }
        }
    }
}
