mod discard;
mod exec;
mod multi;
mod transaction_queue;

pub use discard::{discard, DiscardArguments};
pub use exec::{exec, run_transaction_commands, ExecArguments};
pub use multi::{multi, MultiArguments};
pub use transaction_queue::TransactionQueue;
