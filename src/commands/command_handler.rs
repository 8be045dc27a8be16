use bytes::Bytes;

use crate::{
    commands::{
        blpop::{blpop, BlpopArguments},
        config_get::{config_get, ConfigGetArguments},
        echo::{echo, EchoArguments},
        get::{get, GetArguments},
        incr::{incr, IncrArguments},
        info::{info, InfoArguments},
        keys::{keys, KeysArguments},
        llen::{llen, LlenArguments},
        lpop::{lpop, LpopArguments},
        lrange::{lrange, LrangeArguments},
        ping::{ping, PingArguments},
        replication::{psync, replconf, wait, PsyncArguments, ReplconfArguments, WaitArguments},
        rpush_and_lpush::{lpush, rpush, PushArguments},
        set::{set, SetArguments},
        transactions::{
            discard, exec, multi, run_transaction_commands, DiscardArguments, ExecArguments,
            MultiArguments, TransactionQueue,
        },
        type_command::{type_command, TypeArguments},
        xadd::{xadd, XaddArguments},
        xrange::{xrange, XrangeArguments},
        xread::{xread, XreadArguments},
        CommandError,
    },
    resp::RespValue,
    state::ServerState,
};

const WRITE_COMMANDS: [&str; 7] = ["SET", "INCR", "RPUSH", "LPUSH", "LPOP", "BLPOP", "XADD"];

/// Writes whose handlers queue their own replication frames.
const SELF_REPLICATING_COMMANDS: [&str; 3] = ["RPUSH", "LPUSH", "XADD"];

#[derive(Debug)]
pub enum CommandResult {
    NoResponse,
    Response(RespValue),
    /// PSYNC accepted: the `FULLRESYNC` line and snapshot to send before the
    /// connection turns into a replica link.
    FullResync(Bytes),
}

impl CommandResult {
    pub fn into_response(self) -> Option<RespValue> {
        match self {
            CommandResult::Response(response) => Some(response),
            CommandResult::NoResponse | CommandResult::FullResync(_) => None,
        }
    }
}

/// Where a command came from. Commands replayed from a primary are applied
/// even on a read-only replica and never block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Origin {
    Client,
    Master,
}

/// One decoded command: the upper-cased name and its raw arguments.
#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<Bytes>,
    pub input: RespValue,
}

impl CommandHandler {
    /// Builds a command from a request frame, which must be a non-empty array
    /// of bulk strings. `CONFIG GET` becomes a single command name.
    pub fn new(input: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = &input else {
            return Err(CommandError::InvalidCommand);
        };

        let mut parts = Vec::with_capacity(elements.len());

        for element in elements {
            match element {
                RespValue::BulkString(part) => parts.push(part.clone()),
                _ => return Err(CommandError::InvalidCommand),
            }
        }

        let Some((name, rest)) = parts.split_first() else {
            return Err(CommandError::InvalidCommand);
        };

        let name = String::from_utf8_lossy(name).to_uppercase();

        let (name, arguments) = match name.as_str() {
            "CONFIG" => {
                let Some((sub_command, rest)) = rest.split_first() else {
                    return Err(CommandError::WrongNumberOfArguments("config".to_string()));
                };

                let sub_command = String::from_utf8_lossy(sub_command).to_uppercase();

                if sub_command != "GET" {
                    return Err(CommandError::UnknownSubcommand(sub_command));
                }

                ("CONFIG GET".to_string(), rest.to_vec())
            }
            _ => (name, rest.to_vec()),
        };

        Ok(Self {
            name,
            arguments,
            input,
        })
    }

    pub fn is_write_command(&self) -> bool {
        WRITE_COMMANDS.contains(&self.name.as_str())
    }

    /// `REPLCONF GETACK`, the only command a replica answers on its link to
    /// the primary.
    pub fn is_getack(&self) -> bool {
        self.name == "REPLCONF"
            && self
                .arguments
                .first()
                .is_some_and(|option| option.eq_ignore_ascii_case(b"getack"))
    }

    /// Validates the arguments without touching any state.
    pub fn validate_command_arguments(&self) -> Option<CommandError> {
        match self.name.as_str() {
            "PING" => PingArguments::parse(&self.arguments).err(),
            "ECHO" => EchoArguments::parse(&self.arguments).err(),
            "GET" => GetArguments::parse(&self.arguments).err(),
            "SET" => SetArguments::parse(&self.arguments).err(),
            "INCR" => IncrArguments::parse(&self.arguments).err(),
            "KEYS" => KeysArguments::parse(&self.arguments).err(),
            "TYPE" => TypeArguments::parse(&self.arguments).err(),
            "CONFIG GET" => ConfigGetArguments::parse(&self.arguments).err(),
            "INFO" => InfoArguments::parse(&self.arguments).err(),
            "RPUSH" | "LPUSH" => PushArguments::parse(&self.name, &self.arguments).err(),
            "LRANGE" => LrangeArguments::parse(&self.arguments).err(),
            "LLEN" => LlenArguments::parse(&self.arguments).err(),
            "LPOP" => LpopArguments::parse(&self.arguments).err(),
            "BLPOP" => BlpopArguments::parse(&self.arguments).err(),
            "XADD" => XaddArguments::parse(&self.arguments).err(),
            "XRANGE" => XrangeArguments::parse(&self.arguments).err(),
            "XREAD" => XreadArguments::parse(&self.arguments).err(),
            "MULTI" => MultiArguments::parse(&self.arguments).err(),
            "EXEC" => ExecArguments::parse(&self.arguments).err(),
            "DISCARD" => DiscardArguments::parse(&self.arguments).err(),
            "REPLCONF" => ReplconfArguments::parse(&self.arguments).err(),
            "PSYNC" => PsyncArguments::parse(&self.arguments).err(),
            "WAIT" => WaitArguments::parse(&self.arguments).err(),
            _ => Some(CommandError::UnknownCommand(self.name.clone())),
        }
    }

    /// Entry point for a connection: applies transaction rules, then runs the
    /// command.
    ///
    /// While a transaction is open, commands other than MULTI, EXEC and DISCARD
    /// are queued. A command with the wrong number of arguments, or an unknown
    /// one, is rejected right away instead and the transaction stays open.
    pub async fn handle(
        &self,
        state: &ServerState,
        origin: Origin,
        transaction: &mut TransactionQueue,
    ) -> Result<CommandResult, CommandError> {
        match self.name.as_str() {
            "MULTI" => multi(transaction, &self.arguments),
            "EXEC" => {
                let commands = exec(transaction, &self.arguments)?;
                let responses = run_transaction_commands(state, origin, commands).await;

                Ok(CommandResult::Response(responses))
            }
            "DISCARD" => discard(transaction, &self.arguments),
            _ if transaction.is_active() => {
                if let Some(
                    e @ (CommandError::WrongNumberOfArguments(_) | CommandError::UnknownCommand(_)),
                ) = self.validate_command_arguments()
                {
                    return Err(e);
                }

                transaction.push(self.clone());

                Ok(CommandResult::Response(RespValue::SimpleString(
                    "QUEUED".to_string(),
                )))
            }
            _ => self.execute(state, origin, origin == Origin::Client).await,
        }
    }

    /// Runs the command and, for a successful write, queues it for the
    /// replicas.
    ///
    /// Writes hold the replication write-order guard while they run, so
    /// replicas receive them in the order they took effect. Most writes are
    /// replicated as received. Pushes, XADD and BLPOP replicate their
    /// effective form themselves; BLPOP takes the guard on its own since it
    /// may wait for a push.
    pub async fn execute(
        &self,
        state: &ServerState,
        origin: Origin,
        may_block: bool,
    ) -> Result<CommandResult, CommandError> {
        if !self.is_write_command() {
            return self.run(state, may_block).await;
        }

        if origin == Origin::Client && state.replication.is_replica() {
            return Err(CommandError::ReadOnlyReplica);
        }

        if self.name == "BLPOP" {
            return self.run(state, may_block).await;
        }

        let _write_order = state.replication.write_order().await;
        let result = self.run(state, may_block).await?;

        if !SELF_REPLICATING_COMMANDS.contains(&self.name.as_str()) {
            state.replication.propagate(self.input.encode());
        }

        Ok(result)
    }

    async fn run(&self, state: &ServerState, may_block: bool) -> Result<CommandResult, CommandError> {
        let arguments = self.arguments.as_slice();

        match self.name.as_str() {
            "PING" => ping(arguments),
            "ECHO" => echo(arguments),
            "GET" => get(state, arguments).await,
            "SET" => set(state, arguments).await,
            "INCR" => incr(state, arguments).await,
            "KEYS" => keys(state, arguments).await,
            "TYPE" => type_command(state, arguments).await,
            "CONFIG GET" => config_get(state, arguments),
            "INFO" => info(state, arguments),
            "RPUSH" => rpush(state, arguments).await,
            "LPUSH" => lpush(state, arguments).await,
            "LRANGE" => lrange(state, arguments).await,
            "LLEN" => llen(state, arguments).await,
            "LPOP" => lpop(state, arguments).await,
            "BLPOP" => blpop(state, arguments, may_block).await,
            "XADD" => xadd(state, arguments).await,
            "XRANGE" => xrange(state, arguments).await,
            "XREAD" => xread(state, arguments, may_block).await,
            "REPLCONF" => replconf(state, arguments),
            "PSYNC" => psync(state, arguments).await,
            "WAIT" => wait(state, arguments).await,
            _ => Err(CommandError::UnknownCommand(self.name.clone())),
        }
    }
}
