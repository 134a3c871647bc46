// compute_shader_probe.rs

use gpu_dot_product::shader_probe::{
    example_defines, probe_compute_shader, EXAMPLE_ENTRY_POINT, EXAMPLE_SHADER_PATH,
};
use gpu_dot_product::GpuContext;

fn main() -> anyhow::Result<()> {
    gpu_dot_product::init_logging();

    let context = GpuContext::new_blocking()?;
    context.report_device_info();

    let _pipeline = pollster::block_on(probe_compute_shader(
        &context,
        EXAMPLE_SHADER_PATH,
        EXAMPLE_ENTRY_POINT,
        &example_defines(),
    ))?;

    println!("Success");
    Ok(())
}
