// heavy_calculator.rs

use anyhow::{anyhow, Result};

use crate::config::RunConfig;
use crate::cpu::heavy_calculation_cpu;
use crate::gpu::{self, GpuContext, KernelParams};
use crate::timer::Timer;
use crate::utils::{compare_prefix, random_data, Data};
use crate::RunReport;

const SHADER: &str = include_str!("../shaders/heavy_calculation.wgsl");
const ENTRY_POINT: &str = "heavy_calculation";
const TOTAL_GPU_TIME: &str = "!!!TOTAL GPU TIME!!!";

/// Trigonometric accumulation kernel whose host reference runs on `num_threads` threads.
pub struct HeavyCalculator {
    config: RunConfig,
}

impl HeavyCalculator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.config.validate().map_err(|e| anyhow!(e))?;
        gpu::report_computation_constants(&self.config);
        let mut data = random_data(&self.config, &mut rand::thread_rng());

        let total = Timer::new(TOTAL_GPU_TIME);
        let context = GpuContext::new().await?;
        context.report_device_info();
        self.dispatch(&context, &mut data).await?;
        drop(total);

        Ok(self.verify(&data))
    }

    pub async fn run_with(&self, context: &GpuContext, data: &mut Data) -> Result<RunReport> {
        self.config.validate().map_err(|e| anyhow!(e))?;
        self.compute_on_device(context, data).await?;
        Ok(self.verify(data))
    }

    pub async fn compute_on_device(&self, context: &GpuContext, data: &mut Data) -> Result<()> {
        let _total = Timer::new(TOTAL_GPU_TIME);
        self.dispatch(context, data).await
    }

    async fn dispatch(&self, context: &GpuContext, data: &mut Data) -> Result<()> {
        let cfg = &self.config;
        gpu::check_local_work_size(&context.device.limits(), cfg.local_work_size)?;

        let program = context
            .build_program(
                &gpu::program_source(SHADER, cfg.local_work_size),
                "HeavyCalculation",
            )
            .await?;
        let buffers = context.create_buffers(cfg.global_work_size())?;
        let kernel = context.create_kernel(&program, ENTRY_POINT, &buffers).await?;

        context.write_inputs(
            &buffers,
            data,
            KernelParams::new(cfg.num_elements, cfg.inner_iterations),
        )?;
        context
            .launch_and_read_back(&kernel, &buffers, cfg.work_groups(), &mut data.results)
            .await
    }

    fn verify(&self, data: &Data) -> RunReport {
        let cfg = &self.config;
        let validation = {
            let _timer = Timer::new("Calculation on CPU");
            heavy_calculation_cpu(
                &data.source_a,
                &data.source_b,
                cfg.num_elements,
                cfg.inner_iterations,
                cfg.num_threads,
            )
        };
        let matched = compare_prefix(&validation, &data.results, cfg.num_elements, cfg.epsilon);
        log::info!("COMPARING STATUS : {matched}");

        RunReport {
            num_elements: cfg.num_elements,
            global_work_size: cfg.global_work_size(),
            matched,
        }
    }
}
