//! Assignment path benchmarks
//!
//! Covers the two hot computations: rollout bucketing and weighted variant
//! selection. Store round-trips dominate in production; these establish the
//! in-process baseline.
//!
//! Run with: cargo bench --bench assignment

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use abgate::engine::bucket::bucket_for;
use abgate::engine::selection::pick_by_cumulative_weight;
use abgate::model::Variant;

fn bench_bucketing(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollout_bucketing");

    group.bench_function("short_ids", |b| {
        b.iter(|| bucket_for(black_box("user-12345"), black_box("dark_mode")));
    });

    let long_user = "u".repeat(64);
    let long_feature = "f".repeat(64);
    group.bench_function("long_ids", |b| {
        b.iter(|| bucket_for(black_box(&long_user), black_box(&long_feature)));
    });

    group.finish();
}

fn bench_weighted_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighted_selection");

    for variant_count in [2usize, 8, 32] {
        let variants: Vec<Variant> = (0..variant_count)
            .map(|i| Variant::new(format!("variant-{i}"), 10.0))
            .collect();
        let total = 10.0 * variant_count as f64;

        group.bench_with_input(
            BenchmarkId::new("cumulative_pick", variant_count),
            &variants,
            |b, variants| {
                b.iter(|| pick_by_cumulative_weight(black_box(variants), black_box(total * 0.7)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_bucketing, bench_weighted_selection);
criterion_main!(benches);
