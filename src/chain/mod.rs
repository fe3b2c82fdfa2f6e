//! Chain access - a thin client over the node's JSON-RPC endpoint

pub mod provider;

pub use provider::NodeClient;
