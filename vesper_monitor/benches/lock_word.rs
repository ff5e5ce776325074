//! Lock-Word Performance Benchmarks
//!
//! Measures the single-word operations every monitor enter/exit goes
//! through, plus the biased fast paths end to end.
//!
//! # Benchmark Categories
//!
//! 1. **Decode**: shape branch + field extraction
//! 2. **Count Adjustment**: recursion increment/decrement on a word value
//! 3. **Fast Paths**: recursive biased lock/unlock on a header cell
//! 4. **Claim**: CAS acquisition of an anonymous bias
//!
//! # Performance Targets
//!
//! - Decode: a handful of ALU ops, no branches mispredicted in steady state
//! - Recursive lock + unlock pair: two uncontended atomic stores
//! - Anonymous claim: one CAS

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use vesper_core::{ClassId, VmThreadId};
use vesper_monitor::{
    BiasRevoker, BiasedLockEpoch, BiasedWord, HeaderCell, InflatedWord, SerializingScheduler,
};

// =============================================================================
// Word Operations
// =============================================================================

fn bench_word_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock_word");

    group.bench_function("decode_lightweight", |b| {
        let word = BiasedWord::anon_biased_from_hash(0x5EED).as_word();
        b.iter(|| black_box(black_box(word).decode()))
    });

    group.bench_function("decode_inflated", |b| {
        let word = InflatedWord::from_monitor_address(0x7f00_1000 & !7).as_word();
        b.iter(|| black_box(black_box(word).decode()))
    });

    group.bench_function("increment_decrement_count", |b| {
        let word = BiasedWord::anon_biased_from_hash(0)
            .as_biased_and_locked_once_by(VmThreadId::new(7), BiasedLockEpoch::MIN)
            .as_lightweight();
        b.iter(|| {
            let up = black_box(word).increment_count();
            black_box(up.decrement_count())
        })
    });

    group.finish();
}

// =============================================================================
// Fast Paths
// =============================================================================

fn bench_fast_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("bias_fast_path");

    group.bench_function("recursive_lock_unlock", |b| {
        let revoker = BiasRevoker::new(SerializingScheduler::new());
        let cell = HeaderCell::unlocked();
        let class = ClassId::new(1);
        let thread = VmThreadId::new(7);
        revoker.try_biased_lock(&cell, class, thread);

        b.iter(|| {
            black_box(revoker.try_biased_lock(&cell, class, thread));
            black_box(revoker.try_biased_unlock(&cell, thread));
        })
    });

    group.bench_function("claim_anonymous", |b| {
        let revoker = BiasRevoker::new(SerializingScheduler::new());
        let class = ClassId::new(1);
        let thread = VmThreadId::new(7);

        b.iter_batched(
            HeaderCell::unlocked,
            |cell| black_box(revoker.try_biased_lock(&cell, class, thread)),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

// =============================================================================
// Criterion Groups
// =============================================================================

criterion_group!(lock_word_benches, bench_word_ops, bench_fast_paths);
criterion_main!(lock_word_benches);
