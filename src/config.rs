//! Validator configuration
//!
//! Loaded from YAML at boot. Anything invalid here is fatal: the node must not
//! start with a bad account id or a reward split that does not add up.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::fee::{Distributor, FeeCalculator, FeeError};
use crate::registry::{AssetMapping, AssetRegistry, NetworkRegistry, RegistryError};
use crate::retry::RetryPolicy;
use crate::types::{AccountId, EntityId, InvalidEntityId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid account id in {field}: {source}")]
    InvalidAccount {
        field: &'static str,
        source: InvalidEntityId,
    },

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Retry max_attempts must be greater than zero")]
    InvalidRetry,

    #[error("Hedera chain id {0} is not a configured network")]
    UnknownHederaNetwork(u64),

    #[error("EVM chain {0} has no RPC endpoints")]
    NoEndpoints(u64),

    #[error("EVM chain {0} max_block_range must be between 1 and {MAX_BLOCK_RANGE}")]
    InvalidBlockRange(u64),
}

#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    pub logging: LogConfig,
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Chain id -> human-readable name
    pub networks: BTreeMap<u64, String>,
    #[serde(default)]
    pub assets: Vec<AssetMapping>,
    #[serde(default)]
    pub evm: Vec<EvmChainConfig>,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    /// `minutely`, `hourly`, `daily`; anything else writes a single file
    pub rotation: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidatorConfig {
    /// Hedera network id as listed under `networks`
    pub hedera_chain_id: u64,
    pub bridge_account: String,
    pub members: Vec<String>,
    pub treasury: String,
    pub validator_percentage: u32,
    pub treasury_percentage: u32,
    /// Hedera asset -> fee percentage (10^5 precision)
    #[serde(default)]
    pub fee_percentages: BTreeMap<String, u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub timeout_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            timeout_ms: policy.timeout.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvmChainConfig {
    pub chain_id: u64,
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub start_block: u64,
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
}

/// Upper bound on blocks requested per `eth_getLogs` call
pub const MAX_BLOCK_RANGE: u64 = 100_000;

fn default_max_block_range() -> u64 {
    1_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    pub poll_interval_ms: u64,
    pub queue_size: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            queue_size: 1_024,
        }
    }
}

/// Parsed validator accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorAccounts {
    pub bridge_account: AccountId,
    pub members: Vec<AccountId>,
    pub treasury: AccountId,
}

impl BridgeConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check everything that would otherwise fail at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry);
        }

        let networks = self.network_registry()?;
        if !networks.contains(self.validator.hedera_chain_id) {
            return Err(ConfigError::UnknownHederaNetwork(
                self.validator.hedera_chain_id,
            ));
        }
        AssetRegistry::new(&self.assets, &networks)?;

        for chain in &self.evm {
            if !networks.contains(chain.chain_id) {
                return Err(RegistryError::UnknownNetwork(chain.chain_id).into());
            }
            if chain.endpoints.is_empty() {
                return Err(ConfigError::NoEndpoints(chain.chain_id));
            }
            if chain.max_block_range == 0 || chain.max_block_range > MAX_BLOCK_RANGE {
                return Err(ConfigError::InvalidBlockRange(chain.chain_id));
            }
        }

        self.fee_calculator()?;
        Ok(())
    }

    pub fn accounts(&self) -> Result<ValidatorAccounts, ConfigError> {
        let v = &self.validator;
        let members = v
            .members
            .iter()
            .map(|m| parse_account("validator.members", m))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatorAccounts {
            bridge_account: parse_account("validator.bridge_account", &v.bridge_account)?,
            members,
            treasury: parse_account("validator.treasury", &v.treasury)?,
        })
    }

    pub fn distributor(&self) -> Result<Distributor, ConfigError> {
        let accounts = self.accounts()?;
        Ok(Distributor::new(
            accounts.members,
            accounts.treasury,
            self.validator.validator_percentage,
            self.validator.treasury_percentage,
        )?)
    }

    pub fn fee_calculator(&self) -> Result<FeeCalculator, ConfigError> {
        let distributor = Arc::new(self.distributor()?);
        let percentages: FxHashMap<String, u32> = self
            .validator
            .fee_percentages
            .iter()
            .map(|(asset, pct)| (asset.clone(), *pct))
            .collect();
        Ok(FeeCalculator::new(percentages, distributor)?)
    }

    pub fn network_registry(&self) -> Result<NetworkRegistry, ConfigError> {
        Ok(NetworkRegistry::new(
            self.networks.iter().map(|(id, name)| (*id, name.clone())),
        )?)
    }

    pub fn asset_registry(&self) -> Result<AssetRegistry, ConfigError> {
        let networks = self.network_registry()?;
        Ok(AssetRegistry::new(&self.assets, &networks)?)
    }
}

fn parse_account(field: &'static str, value: &str) -> Result<AccountId, ConfigError> {
    value
        .parse::<EntityId>()
        .map_err(|source| ConfigError::InvalidAccount { field, source })
}
