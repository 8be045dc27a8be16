use thiserror::Error;

use crate::{resp::RespValue, stream_store::StreamAddError};

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("invalid command")]
    InvalidCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("unknown subcommand '{0}'")]
    UnknownSubcommand(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(String),
    #[error("syntax error")]
    SyntaxError,
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid expire time in '{0}' command")]
    InvalidExpireTime(String),
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("timeout is not a float or out of range")]
    InvalidTimeout,
    #[error("timeout is negative")]
    NegativeTimeout,
    #[error("Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("Invalid stream ID specified as stream command argument")]
    InvalidStreamId,
    #[error(transparent)]
    StreamAdd(#[from] StreamAddError),
    #[error("Unbalanced 'xread' list of streams")]
    UnbalancedXread,
    #[error("MULTI calls can not be nested")]
    NestedMulti,
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("Unrecognized REPLCONF option: {0}")]
    UnknownReplconfOption(String),
    #[error("WAIT cannot be used with replica instances")]
    WaitOnReplica,
    #[error("You can't write against a read only replica")]
    ReadOnlyReplica,
    #[error("failed to read snapshot: {0}")]
    SnapshotUnavailable(String),
}

impl CommandError {
    /// The error reply sent to the client.
    pub fn as_resp(&self) -> RespValue {
        let message = match self {
            CommandError::InvalidCommand => {
                "ERR Protocol error: expected an array of bulk strings".to_string()
            }
            CommandError::UnbalancedXread => "ERR Unbalanced 'xread' list of streams: for each stream key an ID or '$' must be specified.".to_string(),
            CommandError::WrongType => format!("WRONGTYPE {}", self),
            CommandError::ReadOnlyReplica => format!("READONLY {}.", self),
            _ => format!("ERR {}", self),
        };

        RespValue::Error(message)
    }
}
