use bytes::Bytes;

use crate::{
    commands::{
        command_utils::check_arity, transactions::TransactionQueue, CommandError, CommandHandler,
        Origin,
    },
    resp::RespValue,
    state::ServerState,
};

pub struct ExecArguments;

impl ExecArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("EXEC", arguments, |n| n == 0)?;

        Ok(Self)
    }
}

/// Closes the transaction and returns the queued commands.
pub fn exec(
    transaction: &mut TransactionQueue,
    arguments: &[Bytes],
) -> Result<Vec<CommandHandler>, CommandError> {
    ExecArguments::parse(arguments)?;

    transaction.take().ok_or(CommandError::ExecWithoutMulti)
}

/// Runs queued commands in order and collects one reply per command.
///
/// A failing command contributes its error reply and the rest still run.
/// Blocking commands do not block here. Other clients may interleave between
/// the commands.
pub async fn run_transaction_commands(
    state: &ServerState,
    origin: Origin,
    commands: Vec<CommandHandler>,
) -> RespValue {
    let mut responses = Vec::with_capacity(commands.len());

    for command in commands {
        let response = match command.execute(state, origin, false).await {
            Ok(result) => result.into_response().unwrap_or(RespValue::NullBulkString),
            Err(e) => e.as_resp(),
        };

        responses.push(response);
    }

    RespValue::Array(responses)
}
