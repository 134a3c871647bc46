// /tests/dot_product_tests.rs
use gpu_dot_product::cpu::dot_product_cpu;
use gpu_dot_product::dot_product::DotProductCalculator;
use gpu_dot_product::gpu::split_workgroups;
use gpu_dot_product::utils::{compare_results, random_data};
use gpu_dot_product::{Data, Float4, GpuContext, RunConfig};
use rand::{rngs::StdRng, SeedableRng};
use tokio::runtime::Runtime;

/// Opens the default GPU, or returns `None` on machines without one.
fn gpu_context(runtime: &Runtime) -> Option<GpuContext> {
    match runtime.block_on(GpuContext::new()) {
        Ok(context) => Some(context),
        Err(err) => {
            eprintln!("skipping GPU test: {err:#}");
            None
        }
    }
}

fn small_config(num_elements: usize, local_work_size: usize) -> RunConfig {
    RunConfig {
        num_elements,
        local_work_size,
        ..RunConfig::dot_product()
    }
}

/// Inputs whose products and sums are exact in `f32`.
fn integer_data(cfg: &RunConfig) -> Data {
    let mut data = Data::new(cfg.global_work_size());
    for i in 0..cfg.num_elements {
        let v = (i % 7) as f32;
        data.source_a[i] = Float4::new(v, v + 1.0, 2.0, -1.0);
        data.source_b[i] = Float4::new(3.0, -v, (i % 5) as f32, 4.0);
    }
    data
}

#[test]
fn test_dot_product_integer_inputs_match_exactly() {
    let runtime = Runtime::new().unwrap();
    let Some(context) = gpu_context(&runtime) else { return };

    let cfg = small_config(1000, 256);
    let mut data = integer_data(&cfg);
    let calculator = DotProductCalculator::new(cfg.clone());
    let report = runtime
        .block_on(calculator.run_with(&context, &mut data))
        .expect("dot product run failed");

    assert!(report.matched);
    assert_eq!(report.num_elements, 1000);
    assert_eq!(report.global_work_size, 1024);
}

#[test]
fn test_dot_product_padding_is_left_untouched() {
    let runtime = Runtime::new().unwrap();
    let Some(context) = gpu_context(&runtime) else { return };

    let cfg = small_config(100, 64);
    let mut data = integer_data(&cfg);
    let calculator = DotProductCalculator::new(cfg.clone());
    runtime
        .block_on(calculator.compute_on_device(&context, &mut data))
        .expect("device pass failed");

    let golden = dot_product_cpu(&data.source_a[..100], &data.source_b[..100]);
    compare_results(&golden, &data.results[..100], 0.0).expect("device results differ");
    assert!(data.results[100..].iter().all(|&v| v == 0.0));
}

#[test]
fn test_dot_product_two_dimensional_dispatch() {
    let runtime = Runtime::new().unwrap();
    let Some(context) = gpu_context(&runtime) else { return };

    // 65_536 groups of 2 overflow one dispatch dimension; the last slot is padding.
    let cfg = small_config(131_071, 2);
    let limit = context.device.limits().max_compute_workgroups_per_dimension;
    if cfg.work_groups() as u32 <= limit {
        eprintln!("skipping 2-D dispatch test: device allows {limit} groups per dimension");
        return;
    }
    assert_eq!(split_workgroups(cfg.work_groups() as u32, limit).1, 2);

    let mut data = integer_data(&cfg);
    let calculator = DotProductCalculator::new(cfg.clone());
    let report = runtime
        .block_on(calculator.run_with(&context, &mut data))
        .expect("dot product run failed");

    assert!(report.matched);
    assert_eq!(report.global_work_size, 131_072);
    assert_eq!(data.results[131_071], 0.0);
}

#[test]
fn test_dot_product_random_inputs_within_tolerance() {
    let runtime = Runtime::new().unwrap();
    let Some(context) = gpu_context(&runtime) else { return };

    let cfg = RunConfig {
        epsilon: 1e-5,
        ..small_config(50_000, 256)
    };
    let mut data = random_data(&cfg, &mut StdRng::seed_from_u64(11));
    let calculator = DotProductCalculator::new(cfg);
    let report = runtime
        .block_on(calculator.run_with(&context, &mut data))
        .expect("dot product run failed");

    assert!(report.matched);
}

#[test]
fn test_dot_product_full_run_creates_its_own_context() {
    let runtime = Runtime::new().unwrap();
    // Only checks that a device exists; `run` opens its own inside the total GPU timer.
    if gpu_context(&runtime).is_none() {
        return;
    }

    let cfg = RunConfig {
        epsilon: 1e-5,
        ..small_config(4_000, 128)
    };
    let report = runtime
        .block_on(DotProductCalculator::new(cfg).run())
        .expect("dot product run failed");

    assert!(report.matched);
    assert_eq!(report.global_work_size, 4_096);
}

#[test]
fn test_dot_product_rejects_invalid_config() {
    let runtime = Runtime::new().unwrap();
    let Some(context) = gpu_context(&runtime) else { return };

    let cfg = small_config(0, 256);
    let mut data = Data::new(0);
    let calculator = DotProductCalculator::new(cfg);
    assert!(runtime
        .block_on(calculator.run_with(&context, &mut data))
        .is_err());
}

#[test]
fn test_cpu_dot_product_matches_manual_sum() {
    let cfg = small_config(64, 64);
    let data = random_data(&cfg, &mut StdRng::seed_from_u64(3));
    let golden = dot_product_cpu(&data.source_a, &data.source_b);
    for (i, value) in golden.iter().enumerate() {
        let (a, b) = (data.source_a[i], data.source_b[i]);
        let expected = 0.0 + a.x * b.x + a.y * b.y + a.z * b.z + a.w * b.w;
        assert_eq!(*value, expected);
    }
}
