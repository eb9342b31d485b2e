//! Benchmarks for the analysis pipeline
//!
//! Covers:
//! - The canonical preprocessing recipe (resample, PSC, average, bootstrap fold)
//! - Cross-correlation delay estimation
//! - Quadrature demodulation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fluctus_core::config::QuadratureConfig;
use fluctus_core::delay::find_delay;
use fluctus_core::quadrature::confidence_and_estimates;
use fluctus_core::simulation::{sim_periodic_response, ResponseSpec};
use fluctus_core::{BootstrapConfig, Oscillation, OscillationConfig};

/// `n_channels` channels with staggered delays
fn generate_channels(n_samples: usize, tr: f64, n_channels: usize) -> fluctus_core::TimeSeries {
    let specs: Vec<ResponseSpec> = (0..n_channels)
        .map(|j| ResponseSpec {
            delay: (j % 5) as f64,
            ..ResponseSpec::default()
        })
        .collect();
    sim_periodic_response(n_samples, tr, 10.0, 14.0, &specs, 0.2, Some(42))
}

fn bench_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("Preprocess");
    group.sample_size(20);

    for n_channels in [1, 16, 64].iter() {
        let data = generate_channels(600, 1.0, *n_channels);
        let config = OscillationConfig {
            bootstrap: BootstrapConfig {
                seed: Some(1),
                ..BootstrapConfig::default()
            },
            ..OscillationConfig::default()
        };
        group.bench_with_input(
            BenchmarkId::new("channels", n_channels),
            n_channels,
            |b, _| {
                let mut osc =
                    Oscillation::with_config(data.clone(), 1.0, Some(10.0), config.clone())
                        .unwrap();
                b.iter(|| black_box(osc.preprocess().unwrap()))
            },
        );
    }

    group.finish();
}

fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("Delay");

    for n_channels in [16, 256].iter() {
        let data = generate_channels(1000, 0.1, *n_channels);
        let reference = data.row_means();
        group.bench_with_input(
            BenchmarkId::new("channels", n_channels),
            n_channels,
            |b, _| b.iter(|| black_box(find_delay(&data, &reference, 50, 0.1, true, false).unwrap())),
        );
    }

    group.finish();
}

fn bench_quadrature(c: &mut Criterion) {
    let mut group = c.benchmark_group("Quadrature");
    let config = QuadratureConfig::default();

    for n_samples in [1000, 5000].iter() {
        let data = generate_channels(*n_samples, 0.5, 8);
        group.bench_with_input(
            BenchmarkId::new("samples", n_samples),
            n_samples,
            |b, _| {
                b.iter(|| black_box(confidence_and_estimates(&data, 0.1, 0.5, 14.0, &config).unwrap()))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_preprocess, bench_delay, bench_quadrature);
criterion_main!(benches);
