//! Compiled contract artifacts (`solc --combined-json abi,bin` layout)

use crate::error::{DymkaError, DymkaResult};

use ethers::abi::Abi;
use ethers::types::Bytes;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// ABI and bytecode of one contract entry
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// Fully qualified id of the matched entry, e.g. `Token.sol:Token`
    pub id: String,
    /// File the entry was read from
    pub file: PathBuf,
    pub abi: Abi,
    /// Bytecode as stored in the artifact
    pub bin: String,
}

impl ContractArtifact {
    /// Decoded deployment bytecode
    pub fn bytecode(&self) -> DymkaResult<Bytes> {
        let hex_code = self.bin.trim();
        let hex_code = hex_code.strip_prefix("0x").unwrap_or(hex_code);
        if hex_code.is_empty() {
            return Err(DymkaError::ArtifactResolution(format!(
                "Contract {} in {:?} has no bytecode",
                self.id, self.file
            )));
        }
        hex::decode(hex_code).map(Bytes::from).map_err(|e| {
            DymkaError::ArtifactResolution(format!(
                "Invalid bytecode for {} in {:?}: {}",
                self.id, self.file, e
            ))
        })
    }
}

/// Locates artifact files and picks the requested contract entry
pub struct ContractArtifactLoader {
    root: PathBuf,
}

impl ContractArtifactLoader {
    /// Resolve relative names against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve relative names against the working directory
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    /// Load the contract named (or located at) `name_or_path`
    pub fn load(&self, name_or_path: &str) -> DymkaResult<ContractArtifact> {
        let file = self.resolve_file(name_or_path);
        debug!("Loading contract {} from {:?}", name_or_path, file);

        let raw = std::fs::read_to_string(&file).map_err(|e| {
            DymkaError::ArtifactResolution(format!("Failed to read {:?}: {}", file, e))
        })?;
        let data: Value = serde_json::from_str(&raw).map_err(|e| {
            DymkaError::ArtifactResolution(format!("Failed to parse {:?}: {}", file, e))
        })?;

        let contracts = data
            .get("contracts")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                DymkaError::ArtifactResolution(format!("No contracts section in {:?}", file))
            })?;

        // Suffix match against the requested name, not the resolved file
        let candidates: Vec<&String> = contracts
            .keys()
            .filter(|key| key.ends_with(name_or_path))
            .collect();
        let id = match candidates.as_slice() {
            [single] => (*single).clone(),
            _ => {
                return Err(DymkaError::ArtifactResolution(format!(
                    "Ambiguous contract list {:?} in json {:?}",
                    candidates, file
                )))
            }
        };

        let entry = &contracts[&id];
        let abi = parse_abi(entry.get("abi"), &id, &file)?;
        let bin = entry
            .get("bin")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DymkaError::ArtifactResolution(format!("Contract {} in {:?} has no bin", id, file))
            })?
            .to_string();

        Ok(ContractArtifact { id, file, abi, bin })
    }

    /// `<name>.json` when it exists, else the literal path
    fn resolve_file(&self, name_or_path: &str) -> PathBuf {
        let with_ext = self.root.join(format!("{}.json", name_or_path));
        if with_ext.is_file() {
            with_ext
        } else {
            self.root.join(name_or_path)
        }
    }
}

/// Older compilers emit the ABI as a JSON encoded string
fn parse_abi(value: Option<&Value>, id: &str, file: &Path) -> DymkaResult<Abi> {
    let invalid = |e: serde_json::Error| {
        DymkaError::ArtifactResolution(format!("Invalid abi for {} in {:?}: {}", id, file, e))
    };

    match value {
        Some(Value::String(encoded)) => serde_json::from_str(encoded).map_err(invalid),
        Some(value @ Value::Array(_)) => serde_json::from_value(value.clone()).map_err(invalid),
        _ => Err(DymkaError::ArtifactResolution(format!(
            "Contract {} in {:?} has no abi",
            id, file
        ))),
    }
}
