//! Transaction workflow, from options to a confirmed receipt

mod options;
mod receipt;
mod sender;

pub use options::{Overrides, TransactionOptions, TransactionOptionsBuilder};
pub use sender::TransactionSubmitter;
