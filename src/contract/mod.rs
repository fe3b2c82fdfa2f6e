//! Contract artifacts, argument parsing and ABI call construction

pub mod artifact;
pub mod call;
pub mod literal;
pub mod tokens;

pub use artifact::ContractArtifactLoader;
pub use call::CallBuilder;
pub use literal::{parse_arguments, ArgValue};
