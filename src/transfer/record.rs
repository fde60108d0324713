//! Transfer record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::status::TransferStatus;

/// A Hedera deposit bound for an EVM chain.
///
/// Amounts are kept as decimals in the asset's smallest unit, the way the
/// records are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Hedera transaction id of the deposit
    pub transaction_id: String,
    pub source_chain_id: u64,
    pub target_chain_id: u64,
    pub native_chain_id: u64,
    pub source_asset: String,
    pub target_asset: String,
    pub native_asset: String,
    /// EVM address
    pub receiver: String,
    pub amount: Decimal,
    pub fee: Option<Decimal>,
    pub status: TransferStatus,
    /// NFT serial; `None` for fungible transfers
    pub serial_number: Option<i64>,
    pub metadata: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransferRecord {
    pub fn is_nft(&self) -> bool {
        self.serial_number.is_some()
    }

    /// Amount as smallest-unit integer; `None` if fractional or out of range
    pub fn amount_units(&self) -> Option<i64> {
        if self.amount.fract() != Decimal::ZERO {
            return None;
        }
        self.amount.to_i64()
    }
}

#[cfg(test)]
pub(crate) fn fungible(id: &str, asset: &str, amount: i64) -> TransferRecord {
    TransferRecord {
        transaction_id: id.to_string(),
        source_chain_id: 296,
        target_chain_id: 80001,
        native_chain_id: 296,
        source_asset: asset.to_string(),
        target_asset: "0xwrapped".to_string(),
        native_asset: asset.to_string(),
        receiver: "0x7cfae2deba8bb9b9b37f4ff8ef4e22df8fd3a2ad".to_string(),
        amount: Decimal::from(amount),
        fee: None,
        status: TransferStatus::Initial,
        serial_number: None,
        metadata: None,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_amount_units() {
        let mut record = fungible("0.0.5@1.1", "HBAR", 1_000);
        assert_eq!(record.amount_units(), Some(1_000));

        record.amount = Decimal::from_str("10.5").unwrap();
        assert_eq!(record.amount_units(), None);

        record.amount = Decimal::from_str("100000000000000000000").unwrap();
        assert_eq!(record.amount_units(), None);
    }

    #[test]
    fn test_nft_flag() {
        let mut record = fungible("0.0.5@1.1", "0.0.77", 1);
        assert!(!record.is_nft());
        record.serial_number = Some(12);
        record.metadata = Some("ipfs://meta".into());
        assert!(record.is_nft());
    }
}
