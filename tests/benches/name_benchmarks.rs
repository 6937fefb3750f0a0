//! # Quorum-Names Benchmarks
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | qn-02 Name Records | lookup in a 10k list | < 10µs |
//! | qn-02 Name Records | snapshot encode of 10k records | < 50ms |
//! | qn-04 Name Sync | filter + merge + sign of 1k names | < 200ms |
//! | qn-04 Name Sync | unchanged re-merge of 1k names | < 20ms |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use qn_02_name_records::{encode_snapshot, HotKeyBinding, NameList, NameRecord, SignerId};
use qn_04_name_sync::{authorize, filter_names, AuthorityKeyMap, LedgerName, LocalSigner, MergeJob};
use rand::Rng;
use shared_crypto::Ed25519KeyPair;
use std::time::Duration;

fn name(i: usize) -> String {
    format!("h/name{:05}/", i)
}

fn signed_list(size: usize) -> NameList {
    let hot = Ed25519KeyPair::generate();
    let id = SignerId::new([1; 32]);
    let records = (0..size)
        .map(|i| {
            let mut r = NameRecord::new(&name(i), &name((i + 1) % size), "{}", 0x1000)
                .expect("valid record");
            r.sign(id, &hot);
            r
        })
        .collect();
    NameList::from_records(records)
}

fn local_signer() -> LocalSigner {
    let cold = Ed25519KeyPair::generate();
    let hot = Ed25519KeyPair::generate();
    let binding = HotKeyBinding::create(&cold, hot.public_key());
    LocalSigner::new(SignerId::from(cold.public_key()), hot, binding)
}

fn ledger_listing(zone: &Ed25519KeyPair, size: usize) -> Vec<LedgerName> {
    (0..size)
        .map(|i| LedgerName {
            name: name(i),
            value: format!(r#"{{"ip6":"fc00::1","auth":"{}"}}"#, authorize(zone, &name(i), 10)),
            first_seen: 10,
        })
        .collect()
}

// ============================================================================
// qn-02: Lookup and snapshot
// ============================================================================

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("qn-02-lookup");
    for size in [100, 1_000, 10_000] {
        let list = signed_list(size);
        group.bench_with_input(BenchmarkId::new("present", size), &list, |b, list| {
            b.iter(|| {
                let i = rand::thread_rng().gen_range(0..size);
                black_box(list.lookup(&format!("h/name{:05}", i)))
            })
        });
        group.bench_with_input(BenchmarkId::new("absent", size), &list, |b, list| {
            b.iter(|| black_box(list.lookup("h/zz-not-there")))
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("qn-02-snapshot");
    group.measurement_time(Duration::from_secs(10));
    let list = signed_list(10_000);
    group.bench_function("encode_10k", |b| {
        b.iter(|| black_box(encode_snapshot(list.records()).expect("encodes")))
    });
    group.finish();
}

// ============================================================================
// qn-04: Filter and merge
// ============================================================================

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("qn-04-merge");
    group.measurement_time(Duration::from_secs(10));

    let zone = Ed25519KeyPair::generate();
    let keys: AuthorityKeyMap = [(0, zone.public_key())].into_iter().collect();
    let listing = ledger_listing(&zone, 1_000);
    let signer = local_signer();
    let key_set = signer.initial_key_set();

    group.bench_function("fresh_1k", |b| {
        b.iter_batched(
            || listing.clone(),
            |listing| {
                let outcome = filter_names(listing, &keys);
                let mut list = NameList::new();
                MergeJob::new(outcome.accepted, 0x2000)
                    .run_to_end(&mut list, &signer, &key_set)
                    .expect("merge")
            },
            BatchSize::SmallInput,
        )
    });

    let mut synced = NameList::new();
    MergeJob::new(filter_names(listing.clone(), &keys).accepted, 0x2000)
        .run_to_end(&mut synced, &signer, &key_set)
        .expect("merge");
    group.bench_function("unchanged_1k", |b| {
        b.iter_batched(
            || (filter_names(listing.clone(), &keys).accepted, synced.clone()),
            |(accepted, mut list)| {
                MergeJob::new(accepted, 0x2000)
                    .run_to_end(&mut list, &signer, &key_set)
                    .expect("merge")
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_lookup, bench_snapshot, bench_merge);
criterion_main!(benches);
