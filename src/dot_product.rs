// dot_product.rs

use anyhow::{anyhow, Result};

use crate::config::RunConfig;
use crate::cpu::dot_product_cpu;
use crate::gpu::{self, GpuContext, KernelParams};
use crate::timer::Timer;
use crate::utils::{compare_prefix, random_data, Data};
use crate::RunReport;

const SHADER: &str = include_str!("../shaders/dot_product.wgsl");
const ENTRY_POINT: &str = "dot_product";
const TOTAL_GPU_TIME: &str = "!!!TOTAL GPU TIME!!!";

/// Per-element dot product of two `Float4` arrays on the GPU, checked against the host.
pub struct DotProductCalculator {
    config: RunConfig,
}

impl DotProductCalculator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Runs the full sample on a fresh device with random inputs.
    ///
    /// Context creation counts toward the total GPU time.
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

    /// Runs the device pass over `data` and compares it with the host reference.
    ///
    /// `data` must be sized to the global work size; its `results` are overwritten.
    pub async fn run_with(&self, context: &GpuContext, data: &mut Data) -> Result<RunReport> {
        self.config.validate().map_err(|e| anyhow!(e))?;
        self.compute_on_device(context, data).await?;
        Ok(self.verify(data))
    }

    /// Uploads `data`, dispatches the kernel and reads the results back into `data.results`.
    pub async fn compute_on_device(&self, context: &GpuContext, data: &mut Data) -> Result<()> {
        let _total = Timer::new(TOTAL_GPU_TIME);
        self.dispatch(context, data).await
    }

    async fn dispatch(&self, context: &GpuContext, data: &mut Data) -> Result<()> {
        let cfg = &self.config;
        gpu::check_local_work_size(&context.device.limits(), cfg.local_work_size)?;

        let program = context
            .build_program(&gpu::program_source(SHADER, cfg.local_work_size), "DotProduct")
            .await?;
        let buffers = context.create_buffers(cfg.global_work_size())?;
        let kernel = context.create_kernel(&program, ENTRY_POINT, &buffers).await?;

        context.write_inputs(&buffers, data, KernelParams::new(cfg.num_elements, 0))?;
        context
            .launch_and_read_back(&kernel, &buffers, cfg.work_groups(), &mut data.results)
            .await
    }

    fn verify(&self, data: &Data) -> RunReport {
        let n = self.config.num_elements;
        let golden = {
            let _timer = Timer::new("Calculation on CPU");
            dot_product_cpu(&data.source_a[..n], &data.source_b[..n])
        };
        let matched = compare_prefix(&golden, &data.results, n, self.config.epsilon);
        log::info!("COMPARING STATUS : {matched}");

        RunReport {
            num_elements: n,
            global_work_size: self.config.global_work_size(),
            matched,
        }
    }
}
