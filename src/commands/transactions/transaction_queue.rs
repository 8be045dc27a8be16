use crate::commands::CommandHandler;

/// Commands deferred between `MULTI` and `EXEC`/`DISCARD`. Owned by a single
/// connection.
#[derive(Debug, Default)]
pub struct TransactionQueue {
    active: bool,
    commands: Vec<CommandHandler>,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `false` if a transaction was already open.
    pub fn begin(&mut self) -> bool {
        !std::mem::replace(&mut self.active, true)
    }

    pub fn push(&mut self, command: CommandHandler) {
        self.commands.push(command);
    }

    /// Closes the transaction and hands back its commands in the order they
    /// were queued, or `None` if no transaction was open.
    pub fn take(&mut self) -> Option<Vec<CommandHandler>> {
        if !std::mem::replace(&mut self.active, false) {
            return None;
        }

        Some(std::mem::take(&mut self.commands))
    }
}
