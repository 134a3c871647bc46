// /benches/dot_product.rs

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gpu_dot_product::cpu::{dot_product_cpu, heavy_calculation_cpu};
use gpu_dot_product::dot_product::DotProductCalculator;
use gpu_dot_product::utils::random_data;
use gpu_dot_product::{GpuContext, RunConfig};
use rand::{rngs::StdRng, SeedableRng};
use tokio::runtime::Runtime;

const SIZES: [usize; 4] = [1_000, 20_000, 300_000, 1_277_944];

fn config(num_elements: usize) -> RunConfig {
    RunConfig {
        num_elements,
        ..RunConfig::dot_product()
    }
}

fn cpu_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dot Product/CPU");

    for &size in &SIZES {
        let data = random_data(&config(size), &mut StdRng::seed_from_u64(1));
        group.bench_with_input(BenchmarkId::new("Size", size), &size, |bencher, &n| {
            bencher.iter(|| dot_product_cpu(&data.source_a[..n], &data.source_b[..n]));
        });
    }
    group.finish();
}

fn heavy_cpu_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Heavy Calculation/CPU");
    let cfg = RunConfig {
        num_elements: 100_000,
        inner_iterations: 32,
        ..RunConfig::heavy_calculation()
    };
    let data = random_data(&cfg, &mut StdRng::seed_from_u64(2));

    for &threads in &[1usize, 4, 24] {
        group.bench_with_input(BenchmarkId::new("Threads", threads), &threads, |bencher, &t| {
            bencher.iter(|| {
                heavy_calculation_cpu(
                    &data.source_a,
                    &data.source_b,
                    cfg.num_elements,
                    cfg.inner_iterations,
                    t,
                )
            });
        });
    }
    group.finish();
}

fn gpu_benchmark(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let context = match runtime.block_on(GpuContext::new()) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("skipping GPU benchmark: {err:#}");
            return;
        }
    };

    let mut group = c.benchmark_group("Dot Product/GPU");
    // Set longer measurement time for GPU to get reliable samples
    group.sample_size(20).measurement_time(std::time::Duration::from_secs(10));

    for &size in &SIZES {
        let cfg = config(size);
        let mut data = random_data(&cfg, &mut StdRng::seed_from_u64(1));
        let calculator = DotProductCalculator::new(cfg);
        group.bench_with_input(BenchmarkId::new("Size", size), &size, |bencher, _| {
            bencher.iter(|| {
                runtime
                    .block_on(calculator.compute_on_device(&context, &mut data))
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, cpu_benchmark, heavy_cpu_benchmark, gpu_benchmark);
criterion_main!(benches);
