//! Bridge fee calculation
//!
//! The fee is taken as a per-asset percentage of the bridged amount, then
//! rounded down to a value the [`Distributor`] can split exactly. The
//! recipient receives the remainder.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{Distributor, FEE_MAX_PERCENTAGE, FeeError};

/// Fee and remainder of a bridged amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee: i64,
    pub remainder: i64,
}

#[derive(Debug, Clone)]
pub struct FeeCalculator {
    percentages: FxHashMap<String, u32>,
    distributor: Arc<Distributor>,
}

impl FeeCalculator {
    pub fn new(
        percentages: FxHashMap<String, u32>,
        distributor: Arc<Distributor>,
    ) -> Result<Self, FeeError> {
        if let Some(bad) = percentages.values().find(|p| **p > FEE_MAX_PERCENTAGE) {
            return Err(FeeError::InvalidFeePercentage(*bad));
        }
        Ok(Self {
            percentages,
            distributor,
        })
    }

    pub fn distributor(&self) -> &Arc<Distributor> {
        &self.distributor
    }

    /// Compute the fee charged on `amount` of `asset`.
    ///
    /// # Errors
    /// - [`FeeError::UnknownAsset`] if the asset has no configured percentage
    /// - [`FeeError::InsufficientFee`] if the amount is not positive
    pub fn calculate_fee(&self, asset: &str, amount: i64) -> Result<FeeSplit, FeeError> {
        let percentage = *self
            .percentages
            .get(asset)
            .ok_or_else(|| FeeError::UnknownAsset(asset.to_string()))?;

        if amount <= 0 {
            return Err(FeeError::InsufficientFee(amount));
        }

        let fee = (amount as i128 * percentage as i128 / FEE_MAX_PERCENTAGE as i128) as i64;
        let fee = self.distributor.valid_amount(fee);

        Ok(FeeSplit {
            fee,
            remainder: amount - fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityId, HBAR};

    fn calculator(members: u64, percentage: u32) -> FeeCalculator {
        let members = (0..members).map(|i| EntityId::new(0, 0, 10 + i)).collect();
        let distributor = Distributor::new(members, EntityId::new(0, 0, 98), 100, 0).unwrap();
        let mut percentages = FxHashMap::default();
        percentages.insert(HBAR.to_string(), percentage);
        FeeCalculator::new(percentages, Arc::new(distributor)).unwrap()
    }

    #[test]
    fn test_fee_basic() {
        // 1.000% of 100_000 = 1_000, divisible by 4 members
        let calc = calculator(4, 1_000);
        let split = calc.calculate_fee(HBAR, 100_000).unwrap();
        assert_eq!(split, FeeSplit { fee: 1_000, remainder: 99_000 });
    }

    #[test]
    fn test_fee_rounded_down_to_divisible() {
        // 1.000% of 100_100 = 1_001 -> 999 for 3 members
        let calc = calculator(3, 1_000);
        let split = calc.calculate_fee(HBAR, 100_100).unwrap();
        assert_eq!(split.fee, 999);
        assert_eq!(split.remainder, 100_100 - 999);
        assert!(calc.distributor().calculate_member_distribution(split.fee).is_ok());
    }

    #[test]
    fn test_fee_errors() {
        let calc = calculator(3, 1_000);
        assert_eq!(
            calc.calculate_fee("0.0.777", 100).unwrap_err(),
            FeeError::UnknownAsset("0.0.777".into())
        );
        assert_eq!(
            calc.calculate_fee(HBAR, 0).unwrap_err(),
            FeeError::InsufficientFee(0)
        );
    }

    #[test]
    fn test_rejects_percentage_over_max() {
        let distributor =
            Distributor::new(vec![EntityId::new(0, 0, 1)], EntityId::new(0, 0, 2), 100, 0)
                .unwrap();
        let mut percentages = FxHashMap::default();
        percentages.insert(HBAR.to_string(), FEE_MAX_PERCENTAGE + 1);
        assert!(matches!(
            FeeCalculator::new(percentages, Arc::new(distributor)),
            Err(FeeError::InvalidFeePercentage(_))
        ));
    }
}
