use bytes::Bytes;

use crate::{
    commands::{
        command_utils::check_arity, transactions::TransactionQueue, CommandError, CommandResult,
    },
    resp::RespValue,
};

pub struct DiscardArguments;

impl DiscardArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("DISCARD", arguments, |n| n == 0)?;

        Ok(Self)
    }
}

/// Drops every queued command without running it.
pub fn discard(
    transaction: &mut TransactionQueue,
    arguments: &[Bytes],
) -> Result<CommandResult, CommandError> {
    DiscardArguments::parse(arguments)?;

    match transaction.take() {
        Some(_) => Ok(CommandResult::Response(RespValue::ok())),
        None => Err(CommandError::DiscardWithoutMulti),
    }
}
