use std::time::Duration;

use bytes::Bytes;
use jiff::Timestamp;
use tokio::time::Instant;

use crate::{
    commands::{
        command_utils::{check_arity, key_argument, string_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::ServerState,
};

/// Represents the parsed arguments for the SET command
pub struct SetArguments {
    /// The key name to store the value under
    key: String,
    /// The value to be stored under the given key
    value: Bytes,
    /// Time to live, if an expiration option was given
    ttl: Option<Duration>,
}

impl SetArguments {
    /// Parses command arguments into a SetArguments structure.
    ///
    /// # Arguments
    ///
    /// * `arguments` - The command arguments, in one of two shapes:
    ///   - `[key, value]` for a value that never expires
    ///   - `[key, value, "EX" | "PX", amount]` for a value that expires after
    ///     `amount` seconds or milliseconds
    ///
    /// # Returns
    ///
    /// * `Ok(SetArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - If fewer than 2 arguments are given
    /// * `Err(CommandError::SyntaxError)` - If the option is not `EX`/`PX` or the shape is wrong
    /// * `Err(CommandError::InvalidExpireTime)` - If the amount is not a positive integer,
    ///   or the resulting deadline does not fit in a timestamp
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // SET mykey hello PX 1000
    /// let result = SetArguments::parse(&[
    ///     Bytes::from("mykey"),
    ///     Bytes::from("hello"),
    ///     Bytes::from("PX"),
    ///     Bytes::from("1000"),
    /// ]);
    /// // Returns: Ok(SetArguments { key: "mykey", value: "hello", ttl: Some(1s) })
    /// ```
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("SET", arguments, |n| n >= 2)?;

        let ttl = match &arguments[2..] {
            [] => None,
            [option, amount] => {
                let invalid_expire_time = || CommandError::InvalidExpireTime("set".to_string());

                let amount = string_argument(amount)
                    .ok()
                    .and_then(|amount| amount.parse::<i64>().ok())
                    .filter(|amount| *amount > 0)
                    .ok_or_else(invalid_expire_time)?;

                let millis = match string_argument(option)?.to_uppercase().as_str() {
                    "EX" => amount.checked_mul(1000).ok_or_else(invalid_expire_time)?,
                    "PX" => amount,
                    _ => return Err(CommandError::SyntaxError),
                };

                // The absolute deadline must be representable.
                Timestamp::now()
                    .as_millisecond()
                    .checked_add(millis)
                    .ok_or_else(invalid_expire_time)?;

                let ttl = Duration::from_millis(millis as u64);
                Instant::now().checked_add(ttl).ok_or_else(invalid_expire_time)?;

                Some(ttl)
            }
            _ => return Err(CommandError::SyntaxError),
        };

        Ok(Self {
            key: key_argument(&arguments[0]),
            value: arguments[1].clone(),
            ttl,
        })
    }
}

/// Handles the Redis SET command.
///
/// Stores the value unconditionally, replacing any previous value, expiry or
/// key of another type.
///
/// # Returns
///
/// * `Ok(CommandResult::Response)` - `+OK`
pub async fn set(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    state
        .set_string(set_arguments.key, set_arguments.value, set_arguments.ttl)
        .await;

    Ok(CommandResult::Response(RespValue::ok()))
}
