// gpu.rs

use std::borrow::Cow;

use anyhow::{anyhow, bail, Context, Result};
use bytemuck::{Pod, Zeroable};

use crate::config::RunConfig;
use crate::timer::Timer;
use crate::utils::{Data, Float4};

cfg_if::cfg_if! {
    if #[cfg(debug_assertions)] {
        fn instance_flags() -> wgpu::InstanceFlags {
            wgpu::InstanceFlags::debugging()
        }
    } else {
        fn instance_flags() -> wgpu::InstanceFlags {
            wgpu::InstanceFlags::empty()
        }
    }
}

/// Adapter, device and queue of the selected GPU.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Picks the default adapter and opens a device on it.
    ///
    /// The device is first requested with the default limits; adapters that
    /// cannot provide them are retried with the downlevel limits.
    pub async fn new() -> Result<Self> {
        let _timer = Timer::new("Creating GPU context");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: instance_flags(),
            ..Default::default()
        });

        log::info!("Get the Device info and select Device...");
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("Unable to find a suitable GPU adapter"))?;

        let capabilities = adapter.get_downlevel_capabilities();
        if !capabilities
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            bail!(
                "Compute shaders are not supported by {}",
                adapter.get_info().name
            );
        }

        let (device, queue) = match request_device(&adapter, wgpu::Limits::default()).await {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("Default limits rejected ({err}), retrying with downlevel limits");
                request_device(&adapter, wgpu::Limits::downlevel_defaults())
                    .await
                    .context("Failed creating GPU device")?
            }
        };

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Blocking variant of [`GpuContext::new`].
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    pub fn report_device_info(&self) {
        let info = self.adapter.get_info();
        let limits = self.device.limits();
        log::info!("Using Device: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
        if !info.driver.is_empty() {
            log::info!("Driver = {} {}", info.driver, info.driver_info);
        }
        log::info!(
            "Max work group size = {}",
            limits.max_compute_workgroup_size_x
        );
        log::info!(
            "Max invocations per work group = {}",
            limits.max_compute_invocations_per_workgroup
        );
        log::info!(
            "Max work groups per dimension = {}",
            limits.max_compute_workgroups_per_dimension
        );
    }

    /// Compiles WGSL source. Validation errors are logged and returned.
    pub async fn build_program(&self, source: &str, label: &str) -> Result<wgpu::ShaderModule> {
        let _timer = Timer::new("Build program");
        log::info!("Building program {label}");

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        });
        if let Some(err) = self.device.pop_error_scope().await {
            log::error!("Build log for {label}:\n{err}");
            bail!("Failed compiling shader {label}");
        }
        Ok(module)
    }

    pub fn create_buffers(&self, global_work_size: usize) -> Result<Buffers> {
        let _timer = Timer::new("Create buffers");

        let input_size = (global_work_size * std::mem::size_of::<Float4>()) as u64;
        let output_size = (global_work_size * std::mem::size_of::<f32>()) as u64;
        let limits = self.device.limits();
        let max_binding = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        if input_size > max_binding {
            bail!(
                "Input buffers of {input_size} bytes exceed the device limit of {max_binding} bytes"
            );
        }

        let source_a = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Source Buffer A"),
            size: input_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let source_b = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Source Buffer B"),
            size: input_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let dst = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Destination Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Params"),
            size: std::mem::size_of::<KernelParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Buffers {
            source_a,
            source_b,
            dst,
            staging,
            params,
            len: global_work_size,
        })
    }

    /// Builds the pipeline for `entry_point` and binds `buffers` as its arguments.
    pub async fn create_kernel(
        &self,
        program: &wgpu::ShaderModule,
        entry_point: &str,
        buffers: &Buffers,
    ) -> Result<Kernel> {
        let _timer = Timer::new("Create kernel");
        log::info!("Creating Kernel {entry_point}...");

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Kernel Bind Group Layout"),
                    entries: &[
                        storage_entry(0, true),
                        storage_entry(1, true),
                        storage_entry(2, false),
                        wgpu::BindGroupLayoutEntry {
                            binding: 3,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Kernel Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: program,
                entry_point,
                cache: None,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Kernel Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.source_a.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.source_b.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.dst.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.params.as_entire_binding(),
                },
            ],
        });

        if let Some(err) = self.device.pop_error_scope().await {
            bail!("Failed creating kernel {entry_point}: {err}");
        }

        Ok(Kernel {
            pipeline,
            bind_group,
        })
    }

    /// Queues the uploads of both inputs and the parameter block.
    pub fn write_inputs(&self, buffers: &Buffers, data: &Data, params: KernelParams) -> Result<()> {
        let _timer = Timer::new("Write data to GPU device");
        if data.len() != buffers.len {
            bail!(
                "Host data holds {} elements but the device buffers hold {}",
                data.len(),
                buffers.len
            );
        }
        self.queue
            .write_buffer(&buffers.source_a, 0, bytemuck::cast_slice(&data.source_a));
        self.queue
            .write_buffer(&buffers.source_b, 0, bytemuck::cast_slice(&data.source_b));
        self.queue
            .write_buffer(&buffers.params, 0, bytemuck::bytes_of(&params));
        Ok(())
    }

    /// Dispatches `work_groups` groups of `kernel`, then blocks until the
    /// destination buffer has been copied into `out`.
    pub async fn launch_and_read_back(
        &self,
        kernel: &Kernel,
        buffers: &Buffers,
        work_groups: usize,
        out: &mut [f32],
    ) -> Result<()> {
        let _timer = Timer::new("Run calculation and read back results");
        if out.len() != buffers.len {
            bail!(
                "Result slice holds {} elements but the device buffer holds {}",
                out.len(),
                buffers.len
            );
        }

        let limit = self.device.limits().max_compute_workgroups_per_dimension;
        let (groups_x, groups_y) = split_workgroups(work_groups as u32, limit);
        if groups_y > limit {
            bail!("{work_groups} work groups exceed the dispatch limit of this device");
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Kernel Command Encoder"),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Kernel Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&kernel.pipeline);
            compute_pass.set_bind_group(0, &kernel.bind_group, &[]);
            compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        let size = (buffers.len * std::mem::size_of::<f32>()) as u64;
        encoder.copy_buffer_to_buffer(&buffers.dst, 0, &buffers.staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = buffers.staging.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match receiver.receive().await {
            Some(Ok(())) => {
                let view = slice.get_mapped_range();
                out.copy_from_slice(bytemuck::cast_slice(&view));
                drop(view);
                buffers.staging.unmap();
                Ok(())
            }
            Some(Err(err)) => Err(anyhow!("Failed to map results from GPU: {err}")),
            None => Err(anyhow!("GPU readback was dropped before completing")),
        }
    }
}

async fn request_device(
    adapter: &wgpu::Adapter,
    limits: wgpu::Limits,
) -> std::result::Result<(wgpu::Device, wgpu::Queue), wgpu::RequestDeviceError> {
    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Compute Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        )
        .await
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Device buffers of one run, all sized to the global work size.
pub struct Buffers {
    pub source_a: wgpu::Buffer,
    pub source_b: wgpu::Buffer,
    pub dst: wgpu::Buffer,
    pub staging: wgpu::Buffer,
    pub params: wgpu::Buffer,
    pub len: usize,
}

/// A compute pipeline with its arguments bound.
pub struct Kernel {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group: wgpu::BindGroup,
}

/// Uniform block read by the kernels. Padded to 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    pub num_elements: u32,
    pub iterations: u32,
    pub _pad: [u32; 2],
}

impl KernelParams {
    pub fn new(num_elements: usize, iterations: u32) -> Self {
        Self {
            num_elements: num_elements as u32,
            iterations,
            _pad: [0; 2],
        }
    }
}

/// Prefixes `source` with the `WORKGROUP_SIZE` constant the kernels are declared with.
pub fn program_source(source: &str, local_work_size: usize) -> String {
    format!("const WORKGROUP_SIZE: u32 = {local_work_size}u;\n{source}")
}

/// Fails when the device cannot run work groups of `local_work_size` invocations.
pub fn check_local_work_size(limits: &wgpu::Limits, local_work_size: usize) -> Result<()> {
    let max = limits
        .max_compute_workgroup_size_x
        .min(limits.max_compute_invocations_per_workgroup) as usize;
    if local_work_size > max {
        bail!("Local work size {local_work_size} exceeds the device maximum of {max}");
    }
    Ok(())
}

/// Smallest (x, y) grid covering `total_groups` with neither side above `limit`.
pub fn split_workgroups(total_groups: u32, limit: u32) -> (u32, u32) {
    if total_groups <= limit {
        (total_groups, 1)
    } else {
        (limit, total_groups.div_ceil(limit))
    }
}

pub fn report_computation_constants(cfg: &RunConfig) {
    log::info!("Starting...");
    log::info!("# of float elements per Array \t= {}", cfg.num_elements);
    log::info!("Global Work Size \t\t= {}", cfg.global_work_size());
    log::info!("Local Work Size \t\t= {}", cfg.local_work_size);
    log::info!("# of Work Groups \t\t= {}", cfg.work_groups());
}
