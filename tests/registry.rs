use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use proptest::prelude::*;
use tally_tree::AccountRegistry;

/// The number of operations to replay in each proptest case.
const TEST_SIZE: usize = 1_000;

fn addr(i: u16) -> Address {
    let mut bytes = [0u8; 20];
    bytes[18..].copy_from_slice(&i.to_be_bytes());
    Address::from(bytes)
}

fn key_strategy() -> impl Strategy<Value = u16> {
    1..100u16
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum RegistryOp {
    Deposit(u16, u64),
    WithdrawAll(u16),
    TopN(usize),
    Balance(u16),
}

fn registry_op_strategy() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        5 => (key_strategy(), 0..1_000u64).prop_map(|(k, d)| RegistryOp::Deposit(k, d)),
        2 => key_strategy().prop_map(RegistryOp::WithdrawAll),
        1 => (0..150usize).prop_map(RegistryOp::TopN),
        1 => key_strategy().prop_map(RegistryOp::Balance),
    ]
}

/// The registry reduced to its observable essence: a balance per account.
fn ranking(balances: &BTreeMap<Address, u128>) -> Vec<Address> {
    let mut order: Vec<(u128, Address)> =
        balances.iter().filter(|&(_, &b)| b > 0).map(|(&k, &b)| (b, k)).collect();
    order.sort();
    order.reverse();
    order.into_iter().map(|(_, k)| k).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Replays random deposit/withdraw sequences against a flat map model
    /// and asserts the ranking, balances, and aggregates stay in lockstep.
    #[test]
    fn registry_matches_model(ops in proptest::collection::vec(registry_op_strategy(), TEST_SIZE)) {
        let mut registry = AccountRegistry::new();
        let mut balances: BTreeMap<Address, u128> = BTreeMap::new();

        for op in &ops {
            match *op {
                RegistryOp::Deposit(k, delta) => {
                    let key = addr(k);
                    registry.deposit(key, u128::from(delta)).unwrap();
                    *balances.entry(key).or_default() += u128::from(delta);
                }
                RegistryOp::WithdrawAll(k) => {
                    let key = addr(k);
                    let expected = balances.get(&key).copied().unwrap_or_default();
                    let withdrawn = registry.withdraw_all(key).unwrap();
                    prop_assert_eq!(withdrawn, expected, "withdraw_all({})", key);
                    if let Some(balance) = balances.get_mut(&key) {
                        *balance = 0;
                    }
                }
                RegistryOp::TopN(n) => {
                    let expected: Vec<Address> = ranking(&balances).into_iter().take(n).collect();
                    prop_assert_eq!(registry.top_n(n), expected, "top_n({})", n);
                }
                RegistryOp::Balance(k) => {
                    let key = addr(k);
                    let expected = balances.get(&key).copied().unwrap_or_default();
                    prop_assert_eq!(registry.balance_of(key), expected, "balance_of({})", key);
                }
            }

            let positive = balances.values().filter(|&&b| b > 0).count();
            prop_assert_eq!(registry.len(), positive);

            let total = balances.values().fold(U256::ZERO, |acc, &b| acc + U256::from(b));
            prop_assert_eq!(registry.total_balance(), total);
        }

        // The final full ranking must match exactly.
        prop_assert_eq!(registry.top_n(balances.len()), ranking(&balances));
    }

    /// `top_n` twice with no intervening mutation returns identical
    /// sequences.
    #[test]
    fn top_n_is_idempotent(
        deposits in proptest::collection::vec((key_strategy(), 1..1_000u64), 1..100),
        n in 0..120usize,
    ) {
        let mut registry = AccountRegistry::new();
        for &(k, delta) in &deposits {
            registry.deposit(addr(k), u128::from(delta)).unwrap();
        }

        prop_assert_eq!(registry.top_n(n), registry.top_n(n));
    }

    /// Active flags follow the deposit/withdraw lifecycle.
    #[test]
    fn activity_tracks_lifecycle(
        deposits in proptest::collection::btree_map(key_strategy(), 1..1_000u64, 1..40)
    ) {
        let mut registry = AccountRegistry::new();
        for (&k, &delta) in &deposits {
            registry.deposit(addr(k), u128::from(delta)).unwrap();
            prop_assert!(registry.is_active(addr(k)));
        }

        for &k in deposits.keys() {
            registry.withdraw_all(addr(k)).unwrap();
            prop_assert!(!registry.is_active(addr(k)));
            prop_assert!(registry.is_registered(addr(k)));
            prop_assert_eq!(registry.balance_of(addr(k)), 0);
        }

        prop_assert!(registry.is_empty());
        prop_assert_eq!(registry.total_balance(), U256::ZERO);
    }
}
