use bytes::Bytes;

use crate::{
    commands::{
        command_utils::check_arity, transactions::TransactionQueue, CommandError, CommandResult,
    },
    resp::RespValue,
};

pub struct MultiArguments;

impl MultiArguments {
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("MULTI", arguments, |n| n == 0)?;

        Ok(Self)
    }
}

/// Opens a transaction. A nested MULTI is an error and leaves the open
/// transaction untouched.
pub fn multi(
    transaction: &mut TransactionQueue,
    arguments: &[Bytes],
) -> Result<CommandResult, CommandError> {
    MultiArguments::parse(arguments)?;

    if !transaction.begin() {
        return Err(CommandError::NestedMulti);
    }

    Ok(CommandResult::Response(RespValue::ok()))
}
