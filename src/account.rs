//! Named accounts backed by local private keys

use crate::config::Settings;
use crate::error::{DymkaError, DymkaResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::str::FromStr;

/// Resolves account names from the configuration into addresses and wallets
pub struct AccountResolver<'a> {
    settings: &'a Settings,
}

impl<'a> AccountResolver<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Signing wallet for a configured account
    pub fn wallet(&self, name: &str) -> DymkaResult<LocalWallet> {
        let key = self.settings.accounts.get(name).ok_or_else(|| {
            DymkaError::Configuration(format!("Unknown account {}", name))
        })?;

        key.expose().parse::<LocalWallet>().map_err(|e| {
            DymkaError::Configuration(format!("Invalid private key for account {}: {}", name, e))
        })
    }

    /// Address derived from a configured account's key
    pub fn address(&self, name: &str) -> DymkaResult<Address> {
        Ok(self.wallet(name)?.address())
    }

    /// Accepts either an account name or a literal hex address
    pub fn address_or_literal(&self, value: &str) -> DymkaResult<Address> {
        if self.settings.accounts.contains_key(value) {
            return self.address(value);
        }
        Address::from_str(value.trim()).map_err(|_| {
            DymkaError::Configuration(format!(
                "{} is neither a configured account nor an address",
                value
            ))
        })
    }
}

/// EIP-55 checksummed form of an address
pub fn checksummed(address: &Address) -> String {
    to_checksum(address, None)
}
