//! Fee split and chunking properties over a range of validator set sizes

use bridge_validator::fee::{Distributor, FeeError, MAX_POSITIVE_TRANSFERS_PER_TX};
use bridge_validator::types::{AccountAmount, EntityId, transfer_sum};

fn members(n: u64) -> Vec<EntityId> {
    (0..n).map(|i| EntityId::new(0, 0, 1_000 + i)).collect()
}

#[test]
fn test_distribution_sums_to_amount_when_divisible() {
    for n in 1..=30u64 {
        let distributor = Distributor::new(members(n), EntityId::new(0, 0, 98), 100, 0).unwrap();
        let amount = 1_000 * n as i64;
        let transfers = distributor.calculate_member_distribution(amount).unwrap();

        let members_total: i64 = transfers[..n as usize].iter().map(|t| t.amount).sum();
        assert_eq!(members_total, amount, "n = {n}");
        assert!(transfers[..n as usize].iter().all(|t| t.amount == 1_000));
    }
}

#[test]
fn test_valid_amount_always_distributable() {
    for n in 1..=12u64 {
        for validator_pct in [100u32, 90, 70, 33] {
            let distributor = Distributor::new(
                members(n),
                EntityId::new(0, 0, 98),
                validator_pct,
                100 - validator_pct,
            )
            .unwrap();

            for amount in [0i64, 1, 7, 99, 1_111, 123_457] {
                let valid = distributor.valid_amount(amount);
                assert!(valid <= amount);
                assert!(
                    distributor.calculate_member_distribution(valid).is_ok(),
                    "n = {n}, pct = {validator_pct}, amount = {amount}, valid = {valid}"
                );
            }
        }
    }
}

#[test]
fn test_indivisible_amount_is_rejected() {
    let distributor = Distributor::new(members(3), EntityId::new(0, 0, 98), 100, 0).unwrap();
    assert!(matches!(
        distributor.calculate_member_distribution(1_111),
        Err(FeeError::AmountNotDivisible { .. })
    ));
}

#[test]
fn test_split_chunks_balance_and_preserve_order() {
    let bridge = EntityId::new(0, 0, 476139);
    for n in [1usize, 8, 9, 10, 18, 19, 55] {
        let positives: Vec<AccountAmount> = (0..n)
            .map(|i| AccountAmount::new(EntityId::new(0, 0, 10 + i as u64), 1 + i as i64))
            .collect();
        let total: i64 = positives.iter().map(|p| p.amount).sum();

        let chunks = Distributor::split_account_amounts(&positives, AccountAmount::new(bridge, -total));
        assert_eq!(chunks.len(), n.div_ceil(MAX_POSITIVE_TRANSFERS_PER_TX));

        let mut credits = Vec::new();
        for chunk in &chunks {
            assert_eq!(transfer_sum(chunk), 0);
            let (last, rest) = chunk.split_last().unwrap();
            assert_eq!(last.account, bridge);
            assert!(rest.len() <= MAX_POSITIVE_TRANSFERS_PER_TX);
            credits.extend_from_slice(rest);
        }
        assert_eq!(credits, positives);
    }
}
