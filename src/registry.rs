//! Network and asset registries
//!
//! Built once from configuration at startup and shared by reference.
//! Nothing here is mutated after construction.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{EntityId, is_hbar};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate network name: {0}")]
    DuplicateNetwork(String),

    #[error("Unknown network id: {0}")]
    UnknownNetwork(u64),

    #[error("Duplicate asset mapping on chain {chain_id}: {asset}")]
    DuplicateAsset { chain_id: u64, asset: String },

    #[error("Invalid Hedera asset: {0}")]
    InvalidHederaAsset(String),
}

/// Chain id <-> name lookup
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    by_id: FxHashMap<u64, String>,
    by_name: FxHashMap<String, u64>,
}

impl NetworkRegistry {
    pub fn new<I>(networks: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (u64, String)>,
    {
        let mut registry = Self::default();
        for (id, name) in networks {
            let key = name.to_lowercase();
            if registry.by_name.insert(key, id).is_some() {
                return Err(RegistryError::DuplicateNetwork(name));
            }
            registry.by_id.insert(id, name);
        }
        Ok(registry)
    }

    pub fn name(&self, id: u64) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Case-insensitive lookup
    pub fn id(&self, name: &str) -> Option<u64> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Chain on which an asset is native
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeChain {
    Hedera,
    Evm,
}

/// Correlation between an EVM asset and its Hedera counterpart
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetMapping {
    pub chain_id: u64,
    pub evm_asset: String,
    /// `HBAR` or an HTS token id
    pub hedera_asset: String,
    pub native: NativeChain,
}

/// Lookup of wrapped/native counterparts keyed by (EVM chain, EVM asset)
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    evm_native: FxHashMap<(u64, String), String>,
    hedera_native: FxHashMap<(u64, String), String>,
}

impl AssetRegistry {
    /// Build from mappings. Every chain must be present in `networks`.
    pub fn new(
        mappings: &[AssetMapping],
        networks: &NetworkRegistry,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for m in mappings {
            if !networks.contains(m.chain_id) {
                return Err(RegistryError::UnknownNetwork(m.chain_id));
            }
            if !is_hbar(&m.hedera_asset) && m.hedera_asset.parse::<EntityId>().is_err() {
                return Err(RegistryError::InvalidHederaAsset(m.hedera_asset.clone()));
            }

            let key = (m.chain_id, m.evm_asset.to_lowercase());
            let table = match m.native {
                NativeChain::Evm => &mut registry.evm_native,
                NativeChain::Hedera => &mut registry.hedera_native,
            };
            if table.insert(key, m.hedera_asset.clone()).is_some() {
                return Err(RegistryError::DuplicateAsset {
                    chain_id: m.chain_id,
                    asset: m.evm_asset.clone(),
                });
            }
        }
        Ok(registry)
    }

    /// Hedera token wrapping an asset native to an EVM chain
    pub fn wrapped_on_hedera(&self, chain_id: u64, evm_native: &str) -> Option<&str> {
        self.evm_native
            .get(&(chain_id, evm_native.to_lowercase()))
            .map(String::as_str)
    }

    /// Hedera-native asset represented by a wrapped token on an EVM chain
    pub fn native_on_hedera(&self, chain_id: u64, evm_wrapped: &str) -> Option<&str> {
        self.hedera_native
            .get(&(chain_id, evm_wrapped.to_lowercase()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HBAR;

    fn networks() -> NetworkRegistry {
        NetworkRegistry::new([(296, "Hedera".to_string()), (80001, "Polygon".to_string())])
            .unwrap()
    }

    #[test]
    fn test_network_lookup() {
        let registry = networks();
        assert_eq!(registry.name(296), Some("Hedera"));
        assert_eq!(registry.id("polygon"), Some(80001));
        assert_eq!(registry.id("POLYGON"), Some(80001));
        assert!(registry.name(1).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_network_name() {
        let err = NetworkRegistry::new([(1, "eth".to_string()), (2, "ETH".to_string())])
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateNetwork("ETH".into()));
    }

    #[test]
    fn test_asset_lookup_both_directions() {
        let mappings = vec![
            AssetMapping {
                chain_id: 80001,
                evm_asset: "0xAbC".into(),
                hedera_asset: "0.0.5000".into(),
                native: NativeChain::Evm,
            },
            AssetMapping {
                chain_id: 80001,
                evm_asset: "0xdef".into(),
                hedera_asset: HBAR.into(),
                native: NativeChain::Hedera,
            },
        ];
        let assets = AssetRegistry::new(&mappings, &networks()).unwrap();

        assert_eq!(assets.wrapped_on_hedera(80001, "0xabc"), Some("0.0.5000"));
        assert_eq!(assets.native_on_hedera(80001, "0xDEF"), Some(HBAR));
        assert!(assets.wrapped_on_hedera(80001, "0xdef").is_none());
        assert!(assets.wrapped_on_hedera(1, "0xabc").is_none());
    }

    #[test]
    fn test_asset_registry_rejects_bad_mappings() {
        let unknown_chain = [AssetMapping {
            chain_id: 1,
            evm_asset: "0xabc".into(),
            hedera_asset: "0.0.1".into(),
            native: NativeChain::Evm,
        }];
        assert_eq!(
            AssetRegistry::new(&unknown_chain, &networks()).unwrap_err(),
            RegistryError::UnknownNetwork(1)
        );

        let bad_asset = [AssetMapping {
            chain_id: 296,
            evm_asset: "0xabc".into(),
            hedera_asset: "token".into(),
            native: NativeChain::Evm,
        }];
        assert!(matches!(
            AssetRegistry::new(&bad_asset, &networks()),
            Err(RegistryError::InvalidHederaAsset(_))
        ));
    }
}
