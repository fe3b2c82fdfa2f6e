//! Error types for dymka

use ethers::types::H256;
use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum DymkaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Artifact error: {0}")]
    ArtifactResolution(String),

    #[error("Unknown function {name} in contract ABI")]
    UnknownFunction { name: String },

    #[error("Argument error: {0}")]
    ArgumentParse(String),

    #[error("RPC error during {operation}: {message}")]
    Rpc { operation: String, message: String },

    #[error("No sender account, use -f to choose one")]
    MissingSender,

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Node returned hash {returned:?} for transaction {expected:?}")]
    Integrity { expected: H256, returned: H256 },

    #[error("Timeout waiting {timeout_secs}s for transaction {hash:?}")]
    SubmissionTimeout { hash: H256, timeout_secs: u64 },

    #[error("Transaction {hash:?} not found")]
    TransactionNotFound { hash: H256 },

    #[error("Interrupted")]
    Interrupted,
}

impl DymkaError {
    /// Shorthand for wrapping a node or transport failure
    pub fn rpc(operation: &str, err: impl std::fmt::Display) -> Self {
        DymkaError::Rpc {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for dymka operations
pub type DymkaResult<T> = Result<T, DymkaError>;
