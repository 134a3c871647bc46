// lib.rs

pub mod config;
pub mod cpu;
pub mod dot_product;
pub mod gpu;
pub mod heavy_calculator;
pub mod shader_probe;
pub mod timer;
pub mod utils;

pub use config::RunConfig;
pub use gpu::GpuContext;
pub use timer::Timer;
pub use utils::{Data, Float4};

/// Outcome of one sample run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub num_elements: usize,
    pub global_work_size: usize,
    pub matched: bool,
}

/// Initialises `env_logger` with an `info` default, overridable through `RUST_LOG`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
