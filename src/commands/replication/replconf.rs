//! REPLCONF command implementation for Redis replication configuration.
//!
//! `listening-port` and `capa` are accepted during the handshake. `GETACK`
//! asks a replica for its processed offset. `ACK` carries that offset back to
//! the primary; on a replica link it is consumed by the connection itself, so
//! here it only has to stay silent.

use bytes::Bytes;
use tracing::debug;

use crate::{
    commands::{
        command_utils::{check_arity, integer_argument, string_argument},
        CommandError, CommandResult,
    },
    resp::RespValue,
    state::ServerState,
};

#[derive(Debug, PartialEq)]
pub enum ReplconfOption {
    ListeningPort(u16),
    Capabilities(Vec<String>),
    GetAck,
    Ack(u64),
}

/// Represents the parsed arguments for the REPLCONF command.
pub struct ReplconfArguments {
    pub option: ReplconfOption,
}

impl ReplconfArguments {
    /// Parses `option value [option value ...]`. Only `capa` may be repeated.
    pub fn parse(arguments: &[Bytes]) -> Result<Self, CommandError> {
        check_arity("REPLCONF", arguments, |n| n >= 2 && n % 2 == 0)?;

        let name = string_argument(&arguments[0])?.to_lowercase();

        let option = match name.as_str() {
            "listening-port" if arguments.len() == 2 => {
                ReplconfOption::ListeningPort(integer_argument(&arguments[1])?)
            }
            "capa" => {
                let capabilities = arguments
                    .chunks_exact(2)
                    .map(|pair| match string_argument(&pair[0])?.eq_ignore_ascii_case("capa") {
                        true => Ok(string_argument(&pair[1])?.to_string()),
                        false => Err(CommandError::SyntaxError),
                    })
                    .collect::<Result<Vec<String>, CommandError>>()?;

                ReplconfOption::Capabilities(capabilities)
            }
            "getack" if arguments.len() == 2 => ReplconfOption::GetAck,
            "ack" if arguments.len() == 2 => ReplconfOption::Ack(integer_argument(&arguments[1])?),
            "listening-port" | "getack" | "ack" => return Err(CommandError::SyntaxError),
            _ => return Err(CommandError::UnknownReplconfOption(name)),
        };

        Ok(Self { option })
    }
}

/// Handles the Redis REPLCONF command.
///
/// # Returns
///
/// * `+OK` for `listening-port` and `capa`
/// * `REPLCONF ACK <offset>` for `GETACK`, where the offset is the number of
///   bytes this replica processed from its primary
/// * no reply for `ACK`
pub fn replconf(state: &ServerState, arguments: &[Bytes]) -> Result<CommandResult, CommandError> {
    let replconf_arguments = ReplconfArguments::parse(arguments)?;

    let result = match replconf_arguments.option {
        ReplconfOption::ListeningPort(port) => {
            debug!(port, "replica announced listening port");
            CommandResult::Response(RespValue::ok())
        }
        ReplconfOption::Capabilities(_) => CommandResult::Response(RespValue::ok()),
        ReplconfOption::GetAck => {
            let offset = state.replication.offset().to_string();
            CommandResult::Response(RespValue::command(&["REPLCONF", "ACK", &offset]))
        }
        ReplconfOption::Ack(_) => CommandResult::NoResponse,
    };

    Ok(result)
}
