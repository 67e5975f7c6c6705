//! Performance benchmarks for the internet speed tester
//!
//! These benchmarks cover the hot paths that run between network reads:
//! throughput conversion, sample aggregation, run statistics and result
//! table formatting. None of them touch the network.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use internet_speed_tester::{
    models::{AggregateStats, MeasurementResult, RunSummary, Sample, Server},
    output::{FormattingOptions, OutputFormatter, PlainFormatter},
    sampler::megabits_per_second,
    types::TransferDirection,
};
use std::time::Duration;

/// Create a series of per-chunk samples the way a transfer stream records them
fn create_samples(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            Sample::new(
                64 * 1024,
                Duration::from_millis(4 + i as u64 % 7),
                Duration::from_millis(10 * i as u64),
                TransferDirection::Download,
            )
        })
        .collect()
}

/// Create measurement results spread over a plausible range
fn create_results(count: usize) -> Vec<MeasurementResult> {
    (0..count)
        .map(|i| {
            MeasurementResult::new(
                40.0 + (i as f64 * 13.7) % 80.0,
                8.0 + (i as f64 * 3.3) % 20.0,
                12.0 + (i as f64 * 1.9) % 40.0,
            )
        })
        .collect()
}

/// Benchmark the bytes-to-Mbps conversion used once per progress tick
fn benchmark_throughput_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput_conversion");

    group.bench_function("megabits_per_second", |b| {
        b.iter(|| {
            let mbps = megabits_per_second(
                black_box(125_000_000),
                black_box(Duration::from_secs(8)),
            );
            black_box(mbps);
        });
    });

    group.finish();
}

/// Benchmark the warm-up filter and byte aggregation over recorded samples
fn benchmark_sample_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_aggregation");

    for size in [100usize, 1_000, 10_000].iter() {
        let samples = create_samples(*size);
        let warmup = Duration::from_secs(2);

        group.bench_with_input(BenchmarkId::new("stable_window_sum", size), size, |b, _| {
            b.iter(|| {
                let stable: u64 = samples
                    .iter()
                    .filter(|s| s.offset >= warmup)
                    .map(|s| s.bytes)
                    .sum();
                black_box(stable);
            });
        });
    }

    group.finish();
}

/// Benchmark run statistics over series of per-test values
fn benchmark_run_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_statistics");

    for size in [10usize, 100].iter() {
        let values: Vec<f64> = (0..*size).map(|i| 40.0 + (i as f64 * 7.3) % 60.0).collect();

        group.bench_with_input(BenchmarkId::new("aggregate_stats", size), size, |b, _| {
            b.iter(|| {
                let stats = AggregateStats::from_values(black_box(&values));
                black_box(stats);
            });
        });
    }

    group.bench_function("run_summary_accumulation", |b| {
        let results = create_results(100);
        b.iter(|| {
            let mut summary = RunSummary::new();
            for result in &results {
                summary.record_success(result);
            }
            black_box(summary.download_stats());
        });
    });

    group.finish();
}

/// Benchmark result table rendering
fn benchmark_result_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_formatting");

    for size in [1usize, 20].iter() {
        let results = create_results(*size);
        let formatter = PlainFormatter::new(FormattingOptions::default());

        group.bench_with_input(BenchmarkId::new("result_table", size), size, |b, _| {
            b.iter(|| {
                let table = formatter.format_result_table(black_box(&results)).unwrap();
                black_box(table);
            });
        });
    }

    group.finish();
}

/// Benchmark catalog parsing and endpoint derivation
fn benchmark_catalog_handling(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_handling");

    let raw = serde_json::to_string(
        &(1..=20u32)
            .map(|id| {
                Server::new(
                    id,
                    &format!("City {}", id),
                    "Example Networks",
                    "Testland",
                    &format!("https://speedtest{}.example.net/backend", id),
                )
            })
            .collect::<Vec<_>>(),
    )
    .unwrap();

    group.bench_function("parse_catalog_json", |b| {
        b.iter(|| {
            let servers: Vec<Server> = serde_json::from_str(black_box(&raw)).unwrap();
            black_box(servers);
        });
    });

    let server = Server::new(1, "City", "Example Networks", "Testland", "https://speedtest.example.net/backend");
    group.bench_function("derive_endpoint_urls", |b| {
        b.iter(|| {
            let download = server.download_url().unwrap();
            let upload = server.upload_url().unwrap();
            let ping = server.ping_url().unwrap();
            black_box((download, upload, ping));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_throughput_conversion,
    benchmark_sample_aggregation,
    benchmark_run_statistics,
    benchmark_result_formatting,
    benchmark_catalog_handling
);

criterion_main!(benches);
