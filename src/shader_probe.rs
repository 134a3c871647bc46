// shader_probe.rs
//
// Compiles a compute shader from disk and creates its pipeline, without dispatching it.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::gpu::GpuContext;

pub const EXAMPLE_SHADER_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/example_compute.wgsl");
pub const EXAMPLE_ENTRY_POINT: &str = "cs_main";

/// Pipeline-overridable constants passed to the example shader.
pub fn example_defines() -> Vec<(String, f64)> {
    vec![("EXAMPLE_DEFINE".to_string(), 1.0)]
}

/// Loads `path`, compiles it and builds a compute pipeline for `entry_point`.
pub async fn probe_compute_shader(
    context: &GpuContext,
    path: impl AsRef<Path>,
    entry_point: &str,
    defines: &[(String, f64)],
) -> Result<wgpu::ComputePipeline> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed reading shader {}", path.display()))?;
    compile_compute_shader(context, &source, entry_point, defines).await
}

/// Compiles `source` with strict validation and creates the pipeline for `entry_point`.
pub async fn compile_compute_shader(
    context: &GpuContext,
    source: &str,
    entry_point: &str,
    defines: &[(String, f64)],
) -> Result<wgpu::ComputePipeline> {
    let device = &context.device;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Probe Shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    });
    if let Some(err) = device.pop_error_scope().await {
        log::error!("{err}");
        bail!("Failed compiling shader");
    }

    let constants: HashMap<String, f64> = defines.iter().cloned().collect();
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Probe Pipeline"),
        layout: None,
        module: &module,
        entry_point,
        cache: None,
        compilation_options: wgpu::PipelineCompilationOptions {
            constants: &constants,
            ..Default::default()
        },
    });
    if let Some(err) = device.pop_error_scope().await {
        log::error!("{err}");
        bail!("Failed creating compute shader {entry_point}");
    }

    Ok(pipeline)
}
