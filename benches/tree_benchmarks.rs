use alloy_primitives::Address;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;
use tally_tree::{AccountMeta, AccountRegistry, BalanceTree};

const N: usize = 10_000;

// ─── Helper functions to generate account workloads ─────────────────────────

fn addr(i: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&i.to_be_bytes());
    Address::from(bytes)
}

fn ordered_balances(n: usize) -> Vec<(Address, u128)> {
    (0..n as u64).map(|i| (addr(i + 1), u128::from(i + 1))).collect()
}

fn random_balances(n: usize) -> Vec<(Address, u128)> {
    // Use a simple LCG for a deterministic pseudo-random sequence.
    let mut entries = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for i in 0..n as u64 {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        entries.push((addr(i + 1), u128::from((x >> 33) | 1)));
    }
    entries
}

// ─── Tree Benchmarks ────────────────────────────────────────────────────────

fn bench_insert_ordered(c: &mut Criterion) {
    let entries = ordered_balances(N);
    let mut group = c.benchmark_group("insert_ordered");

    group.bench_function(BenchmarkId::new("BalanceTree", N), |b| {
        b.iter(|| {
            let mut tree = BalanceTree::with_capacity(N);
            for &(key, balance) in &entries {
                tree.insert(key, AccountMeta { balance, active: true }).unwrap();
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for &(key, balance) in &entries {
                map.insert((balance, key), ());
            }
            map
        });
    });

    group.finish();
}

fn bench_insert_random(c: &mut Criterion) {
    let entries = random_balances(N);
    let mut group = c.benchmark_group("insert_random");

    group.bench_function(BenchmarkId::new("BalanceTree", N), |b| {
        b.iter(|| {
            let mut tree = BalanceTree::with_capacity(N);
            for &(key, balance) in &entries {
                tree.insert(key, AccountMeta { balance, active: true }).unwrap();
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for &(key, balance) in &entries {
                map.insert((balance, key), ());
            }
            map
        });
    });

    group.finish();
}

fn bench_remove_random(c: &mut Criterion) {
    let entries = random_balances(N);
    let mut group = c.benchmark_group("remove_random");

    group.bench_function(BenchmarkId::new("BalanceTree", N), |b| {
        b.iter_batched(
            || {
                let mut tree = BalanceTree::with_capacity(N);
                for &(key, balance) in &entries {
                    tree.insert(key, AccountMeta { balance, active: true }).unwrap();
                }
                tree
            },
            |mut tree| {
                for &(key, _) in &entries {
                    tree.remove(key).unwrap();
                }
                tree
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

// ─── Registry Benchmarks ────────────────────────────────────────────────────

/// Repeated deposits onto existing accounts: every call pays the full
/// remove-modify-reinsert re-sort.
fn bench_deposit_churn(c: &mut Criterion) {
    let entries = random_balances(N);
    let mut group = c.benchmark_group("deposit_churn");

    group.bench_function(BenchmarkId::new("AccountRegistry", N), |b| {
        b.iter_batched(
            || {
                let mut registry = AccountRegistry::with_capacity(N);
                for &(key, balance) in &entries {
                    registry.deposit(key, balance).unwrap();
                }
                registry
            },
            |mut registry| {
                for &(key, balance) in &entries {
                    registry.deposit(key, balance / 2 + 1).unwrap();
                }
                registry
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_top_n(c: &mut Criterion) {
    let entries = random_balances(N);
    let mut registry = AccountRegistry::with_capacity(N);
    for &(key, balance) in &entries {
        registry.deposit(key, balance).unwrap();
    }

    let mut group = c.benchmark_group("top_n");
    for n in [10usize, 100, 1_000] {
        group.bench_function(BenchmarkId::new("AccountRegistry", n), |b| {
            b.iter(|| registry.top_n(n));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_ordered,
    bench_insert_random,
    bench_remove_random,
    bench_deposit_churn,
    bench_top_n,
);
criterion_main!(benches);
