//! Fee Distributor
//!
//! Splits a collected fee between the validator members and the treasury,
//! and chunks long transfer lists to fit Hedera's per-transaction limit.

use tracing::debug;

use super::{FeeError, TOTAL_REWARD_PERCENTAGE};
use crate::types::{AccountAmount, AccountId};

/// Hedera caps the positive line-items a single transfer may carry
pub const MAX_POSITIVE_TRANSFERS_PER_TX: usize = 9;

/// Reward distributor for a fixed validator set
#[derive(Debug, Clone)]
pub struct Distributor {
    members: Vec<AccountId>,
    treasury: AccountId,
    validator_percentage: u32,
    treasury_percentage: u32,
}

impl Distributor {
    /// Create a distributor. Percentages must sum to 100 and the member list
    /// must be non-empty.
    pub fn new(
        members: Vec<AccountId>,
        treasury: AccountId,
        validator_percentage: u32,
        treasury_percentage: u32,
    ) -> Result<Self, FeeError> {
        if members.is_empty() {
            return Err(FeeError::NoMembers);
        }
        let total = validator_percentage.checked_add(treasury_percentage);
        if total != Some(TOTAL_REWARD_PERCENTAGE) {
            return Err(FeeError::InvalidPercentages {
                validator: validator_percentage,
                treasury: treasury_percentage,
            });
        }

        Ok(Self {
            members,
            treasury,
            validator_percentage,
            treasury_percentage,
        })
    }

    pub fn members(&self) -> &[AccountId] {
        &self.members
    }

    pub fn treasury(&self) -> AccountId {
        self.treasury
    }

    /// Treasury share: `floor(amount * treasury% / 100)`
    pub fn treasury_amount(&self, amount: i64) -> i64 {
        percentage_of(amount, self.treasury_percentage)
    }

    /// Validator pool: `floor(amount * validator% / 100)`
    pub fn validators_amount(&self, amount: i64) -> i64 {
        percentage_of(amount, self.validator_percentage)
    }

    /// Per-member transfers plus one treasury transfer.
    ///
    /// Fails with [`FeeError::AmountNotDivisible`] if the validator pool
    /// cannot be split evenly between the members. The remainder is never
    /// redistributed here.
    pub fn calculate_member_distribution(
        &self,
        amount: i64,
    ) -> Result<Vec<AccountAmount>, FeeError> {
        if amount < 0 {
            return Err(FeeError::NegativeAmount(amount));
        }

        let count = self.members.len() as i64;
        let pool = self.validators_amount(amount);
        let per_member = pool / count;
        if per_member * count != pool {
            return Err(FeeError::AmountNotDivisible {
                amount,
                members: self.members.len(),
            });
        }

        let mut transfers: Vec<AccountAmount> = self
            .members
            .iter()
            .map(|m| AccountAmount::new(*m, per_member))
            .collect();
        transfers.push(AccountAmount::new(
            self.treasury,
            self.treasury_amount(amount),
        ));

        debug!(
            amount,
            per_member,
            treasury = self.treasury_amount(amount),
            "Calculated member distribution"
        );
        Ok(transfers)
    }

    /// Largest amount `<= amount` whose validator pool divides evenly
    /// between the members.
    pub fn valid_amount(&self, amount: i64) -> i64 {
        if amount <= 0 || self.validator_percentage == 0 {
            return amount.max(0);
        }

        let count = self.members.len() as i64;
        let pool = self.validators_amount(amount);
        let target = pool - pool % count;
        if target == pool {
            return amount;
        }

        // floor(a * v / 100) grows by at most one per unit of `a` since v <= 100,
        // so every pool value is reachable.
        let v = self.validator_percentage as i128;
        let largest = (((target as i128 + 1) * TOTAL_REWARD_PERCENTAGE as i128) - 1) / v;
        (largest as i64).min(amount)
    }

    /// Split `positives` into chunks of at most
    /// [`MAX_POSITIVE_TRANSFERS_PER_TX`] credits, each closed by a debit of
    /// `negative.account` for exactly the chunk's total.
    ///
    /// With `N <= 9` the original `negative` line-item is kept as-is.
    pub fn split_account_amounts(
        positives: &[AccountAmount],
        negative: AccountAmount,
    ) -> Vec<Vec<AccountAmount>> {
        if positives.len() <= MAX_POSITIVE_TRANSFERS_PER_TX {
            let mut chunk = positives.to_vec();
            chunk.push(negative);
            return vec![chunk];
        }

        positives
            .chunks(MAX_POSITIVE_TRANSFERS_PER_TX)
            .map(|credits| {
                let total: i64 = credits.iter().map(|c| c.amount).sum();
                let mut chunk = Vec::with_capacity(credits.len() + 1);
                chunk.extend_from_slice(credits);
                chunk.push(AccountAmount::new(negative.account, -total));
                chunk
            })
            .collect()
    }
}

#[inline]
fn percentage_of(amount: i64, percentage: u32) -> i64 {
    (amount as i128 * percentage as i128 / TOTAL_REWARD_PERCENTAGE as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityId, transfer_sum};

    fn account(num: u64) -> AccountId {
        EntityId::new(0, 0, num)
    }

    fn distributor(members: usize, validator: u32, treasury: u32) -> Distributor {
        let members = (0..members as u64).map(|i| account(100 + i)).collect();
        Distributor::new(members, account(98), validator, treasury).unwrap()
    }

    fn credits(n: usize) -> Vec<AccountAmount> {
        (0..n as u64)
            .map(|i| AccountAmount::new(account(1000 + i), (i as i64 + 1) * 7))
            .collect()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert_eq!(
            Distributor::new(vec![], account(98), 90, 10).unwrap_err(),
            FeeError::NoMembers
        );
        assert_eq!(
            Distributor::new(vec![account(1)], account(98), 90, 20).unwrap_err(),
            FeeError::InvalidPercentages {
                validator: 90,
                treasury: 20
            }
        );
    }

    #[test]
    fn test_new_rejects_overflowing_percentages() {
        // Wraps to 100 without a checked sum
        assert_eq!(
            Distributor::new(vec![account(1)], account(98), u32::MAX, 101).unwrap_err(),
            FeeError::InvalidPercentages {
                validator: u32::MAX,
                treasury: 101
            }
        );
    }

    #[test]
    fn test_member_distribution_exact() {
        let d = distributor(3, 90, 10);
        let transfers = d.calculate_member_distribution(1111).unwrap();

        assert_eq!(transfers.len(), 4);
        assert_eq!(d.treasury_amount(1111), 111);
        assert_eq!(d.validators_amount(1111), 999);
        for t in &transfers[..3] {
            assert_eq!(t.amount, 333);
        }
        assert_eq!(transfers[3], AccountAmount::new(account(98), 111));
        let pool: i64 = transfers[..3].iter().map(|t| t.amount).sum();
        assert_eq!(pool, 999);
    }

    #[test]
    fn test_member_distribution_not_divisible() {
        let d = distributor(3, 100, 0);
        assert_eq!(
            d.calculate_member_distribution(1000).unwrap_err(),
            FeeError::AmountNotDivisible {
                amount: 1000,
                members: 3
            }
        );
        assert!(matches!(
            d.calculate_member_distribution(-3),
            Err(FeeError::NegativeAmount(-3))
        ));
    }

    #[test]
    fn test_valid_amount() {
        let d = distributor(3, 90, 10);
        assert_eq!(d.valid_amount(1111), 1111);
        assert_eq!(d.valid_amount(1000), 1000);
        assert_eq!(d.valid_amount(0), 0);

        let d = distributor(3, 100, 0);
        assert_eq!(d.valid_amount(1001), 999);
        assert_eq!(d.valid_amount(2), 0);

        // Whatever valid_amount returns must distribute cleanly
        let d = distributor(7, 85, 15);
        for amount in [1, 13, 99, 1_000, 123_457, 9_999_999] {
            let valid = d.valid_amount(amount);
            assert!(valid <= amount);
            assert!(d.calculate_member_distribution(valid).is_ok(), "{valid}");
        }
    }

    #[test]
    fn test_split_small_list_keeps_negative() {
        let negative = AccountAmount::new(account(1), -28);
        let chunks = Distributor::split_account_amounts(&credits(1), negative);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[0][1], negative);
    }

    #[test]
    fn test_split_empty_list() {
        let negative = AccountAmount::new(account(1), 0);
        let chunks = Distributor::split_account_amounts(&[], negative);
        assert_eq!(chunks, vec![vec![negative]]);
    }

    #[test]
    fn test_split_invariants() {
        let counterparty = account(1);
        for n in [1usize, 8, 9, 10, 17, 18, 19, 27, 100] {
            let positives = credits(n);
            let total: i64 = positives.iter().map(|p| p.amount).sum();
            let chunks = Distributor::split_account_amounts(
                &positives,
                AccountAmount::new(counterparty, -total),
            );

            assert_eq!(chunks.len(), n.div_ceil(MAX_POSITIVE_TRANSFERS_PER_TX).max(1));
            let items: usize = chunks.iter().map(Vec::len).sum();
            assert_eq!(items, n + chunks.len());

            for chunk in &chunks {
                assert_eq!(transfer_sum(chunk), 0, "n = {n}");
                assert!(chunk.len() <= MAX_POSITIVE_TRANSFERS_PER_TX + 1);
                assert_eq!(chunk.last().unwrap().account, counterparty);
            }
        }
    }

    #[test]
    fn test_split_last_chunk_partial() {
        let positives = credits(20);
        let total: i64 = positives.iter().map(|p| p.amount).sum();
        let chunks =
            Distributor::split_account_amounts(&positives, AccountAmount::new(account(1), -total));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 3);
        assert_eq!(chunks[2][2].amount, -(19 * 7 + 20 * 7));
    }
}
