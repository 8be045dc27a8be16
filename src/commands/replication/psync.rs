//! PSYNC command implementation for Redis replication synchronization.
//!
//! Only full resynchronization is supported: whatever id and offset the
//! replica announces, it receives `FULLRESYNC` followed by the snapshot.

use bytes::Bytes;
use tracing::{error, info};

use crate::{
    commands::{
        command_utils::{check_arity, string_argument},
        CommandError, CommandResult,
    },
    rdb::snapshot_payload,
    replication::REPLICATION_ID,
    resp::RespValue,
    state::ServerState,
};

/// Represents the parsed arguments for the PSYNC command.
pub struct PsyncArguments {
    /// The replication ID the replica last followed, `?` on a first sync
    replication_id: String,
    /// The replica's offset, `-1` on a first sync
    offset: i64,
}

impl PsyncArguments {
    /// Parses `replication_id offset`.
    ///
    /// # Returns
    ///
    /// * `Ok(PsyncArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - If not exactly 2 arguments
    /// * `Err(CommandError::NotAnInteger)` - If the offset is not an integer
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("PSYNC", arguments, |n| n == 2)?;

        Ok(Self {
            replication_id: string_argument(&arguments[0])?.to_string(),
            offset: string_argument(&arguments[1])?
                .parse::<i64>()
                .map_err(|_| CommandError::NotAnInteger)?,
        })
    }
}

/// Handles the Redis PSYNC command.
///
/// The returned [`CommandResult::FullResync`] carries the `+FULLRESYNC` line
/// and the snapshot bytes. The connection writes both and then hands its
/// write half to the propagation task.
///
/// # Protocol Response
///
/// `+FULLRESYNC <replid> 0\r\n` followed by `$<len>\r\n<snapshot bytes>`
/// without a trailing CRLF.
pub async fn psync(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let psync_arguments = PsyncArguments::parse(arguments)?;

    info!(
        replication_id = %psync_arguments.replication_id,
        offset = psync_arguments.offset,
        "replica requested synchronization"
    );

    let snapshot = match snapshot_payload(&state.config.snapshot_path()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = %e, "failed to read snapshot for full resync");
            return Err(CommandError::SnapshotUnavailable(e.to_string()));
        }
    };

    let mut payload = RespValue::SimpleString(format!("FULLRESYNC {} 0", REPLICATION_ID))
        .encode()
        .to_vec();
    payload.extend_from_slice(format!("${}\r\n", snapshot.len()).as_bytes());
    payload.extend_from_slice(&snapshot);

    Ok(CommandResult::FullResync(Bytes::from(payload)))
}
