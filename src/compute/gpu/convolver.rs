//! GPU Convolver - device-dispatch convolution strategy.

use super::{GpuContext, GpuError};
use crate::compute::{ConvolutionStrategy, ConvolveError, Grid, Kernel, Sample};

// Embed shader source at compile time
const CONVOLUTION_SHADER: &str = include_str!("shaders/convolution.wgsl");

/// Must match `@workgroup_size` in the shader.
const WORKGROUP_SIZE: u32 = 16;

/// Uniform buffer struct for convolution shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ConvParams {
    width: u32,
    height: u32,
    kernel_size: u32,
    pad: u32,
}

/// Convolution on the GPU using a WebGPU compute shader.
///
/// The pipeline is compiled once; buffers are allocated per call since grid
/// sizes change between calls.
pub struct GpuConvolver {
    context: GpuContext,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuConvolver {
    /// Acquire a device and compile the convolution pipeline.
    pub async fn new() -> Result<Self, GpuError> {
        let context = GpuContext::new().await?;
        Self::with_context(context).await
    }

    /// Compile the convolution pipeline on an existing device.
    pub async fn with_context(context: GpuContext) -> Result<Self, GpuError> {
        let device = &context.device;

        let shader = context
            .compile_shader("Convolution Shader", CONVOLUTION_SHADER)
            .await?;

        let bind_group_layout = create_conv_bind_group_layout(device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Convolution Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            ..Default::default()
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Convolution Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            context,
            pipeline,
            bind_group_layout,
        })
    }

    /// The device this convolver dispatches to.
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Largest grid (in cells) a single storage binding can hold.
    fn max_cells(&self) -> u64 {
        let limits = self.context.device.limits();
        let binding = limits.max_storage_buffer_binding_size as u64;
        binding.min(limits.max_buffer_size) / std::mem::size_of::<f32>() as u64
    }

    /// Reject grids the device cannot bind or dispatch in one pass.
    ///
    /// Returns the workgroup counts along x and y.
    fn check_fits(&self, width: u32, height: u32) -> Result<(u32, u32), GpuError> {
        let too_large = |reason: String| GpuError::GridTooLarge {
            width: width as usize,
            height: height as usize,
            reason,
        };

        let cells = width as u64 * height as u64;
        let limit = self.max_cells();
        if cells > limit {
            return Err(too_large(format!(
                "{} cells exceeds the storage buffer limit of {} cells",
                cells, limit
            )));
        }

        let max_groups = self
            .context
            .device
            .limits()
            .max_compute_workgroups_per_dimension;
        let workgroups_x = width.div_ceil(WORKGROUP_SIZE);
        let workgroups_y = height.div_ceil(WORKGROUP_SIZE);
        if workgroups_x > max_groups || workgroups_y > max_groups {
            return Err(too_large(format!(
                "{}x{} workgroups exceeds the dispatch limit of {} per dimension",
                workgroups_x, workgroups_y, max_groups
            )));
        }

        Ok((workgroups_x, workgroups_y))
    }

    /// Upload, dispatch one invocation per cell, and read the result back.
    fn run(
        &self,
        samples: &[f32],
        width: u32,
        height: u32,
        kernel: &Kernel,
    ) -> Result<Vec<f32>, GpuError> {
        let device = &self.context.device;
        let queue = &self.context.queue;

        let (workgroups_x, workgroups_y) = self.check_fits(width, height)?;

        let grid_bytes = std::mem::size_of_val(samples) as u64;
        let kernel_bytes = std::mem::size_of_val(kernel.weights()) as u64;

        let params = ConvParams {
            width,
            height,
            kernel_size: kernel.size() as u32,
            pad: kernel.pad() as u32,
        };

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Conv Params"),
            size: std::mem::size_of::<ConvParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let input_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Input Buffer"),
            size: grid_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let kernel_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Buffer"),
            size: kernel_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Buffer"),
            size: grid_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: grid_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));
        queue.write_buffer(&input_buffer, 0, bytemuck::cast_slice(samples));
        queue.write_buffer(&kernel_buffer, 0, bytemuck::cast_slice(kernel.weights()));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Conv Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: kernel_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Convolution Encoder"),
        });

        log::debug!(
            "dispatching {}x{} workgroups for {}x{} grid",
            workgroups_x,
            workgroups_y,
            width,
            height
        );

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Convolution Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
        }

        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, grid_bytes);

        queue.submit(std::iter::once(encoder.finish()));

        read_back(device, &staging_buffer)
    }
}

impl ConvolutionStrategy for GpuConvolver {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn convolve<T: Sample>(
        &self,
        input: &Grid<T>,
        kernel: &Kernel,
    ) -> Result<Grid<f32>, ConvolveError> {
        let samples: Vec<f32> = input.as_slice().iter().map(|&v| v.to_f32()).collect();
        let too_large = || GpuError::GridTooLarge {
            width: input.width(),
            height: input.height(),
            reason: "dimensions do not fit in 32 bits".to_string(),
        };
        let width = u32::try_from(input.width()).map_err(|_| too_large())?;
        let height = u32::try_from(input.height()).map_err(|_| too_large())?;

        let data = self.run(&samples, width, height, kernel)?;
        Ok(Grid::with_shape_of(input, data))
    }
}

/// Map a staging buffer and copy its contents out, blocking until the
/// queue has drained.
fn read_back(
    device: &wgpu::Device,
    staging_buffer: &wgpu::Buffer,
) -> Result<Vec<f32>, GpuError> {
    let buffer_slice = staging_buffer.slice(..);

    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device.poll(wgpu::PollType::wait_indefinitely())?;
    rx.recv().map_err(|_| GpuError::ReadbackChannel)??;

    let result = {
        let data = buffer_slice.get_mapped_range();
        bytemuck::cast_slice::<u8, f32>(&data).to_vec()
    };

    staging_buffer.unmap();
    Ok(result)
}

fn create_conv_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Convolution Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            storage(1, true),
            storage(2, true),
            storage(3, false),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{SequentialStrategy, convolve};

    fn gpu_or_skip() -> Option<GpuConvolver> {
        match pollster::block_on(GpuConvolver::new()) {
            Ok(gpu) => Some(gpu),
            Err(GpuError::NoAdapter) => {
                eprintln!("Skipping GPU test: no adapter available");
                None
            }
            Err(e) => panic!("Failed to create GPU convolver: {:?}", e),
        }
    }

    fn noise(width: usize, height: usize) -> Grid<u8> {
        Grid::from_fn(width, height, |x, y| ((x * 31 + y * 17 + x * y) % 256) as u8).unwrap()
    }

    #[test]
    fn test_conv_params_layout() {
        assert_eq!(std::mem::size_of::<ConvParams>(), 16);
    }

    #[test]
    fn test_shader_source_entry_point() {
        assert!(CONVOLUTION_SHADER.contains("@workgroup_size(16, 16, 1)"));
        assert!(CONVOLUTION_SHADER.contains("fn main("));
    }

    #[test]
    fn test_gpu_convolver_creation() {
        let Some(gpu) = gpu_or_skip() else { return };
        assert_eq!(gpu.name(), "gpu");
        assert!(gpu.max_cells() > 0);
    }

    #[test]
    fn test_gpu_cpu_equivalence_exact_kernels() {
        let Some(gpu) = gpu_or_skip() else { return };

        // Sizes that are not multiples of the workgroup size exercise the
        // bounds check in the shader.
        for (w, h) in [(1, 1), (17, 5), (40, 33)] {
            let input = noise(w, h);
            for kernel in [
                Kernel::vertical_edge(),
                Kernel::gaussian_blur(),
                Kernel::identity(),
            ] {
                let cpu = SequentialStrategy.convolve(&input, &kernel).unwrap();
                let out = gpu.convolve(&input, &kernel).unwrap();
                assert_eq!(cpu, out, "{}x{} grid", w, h);
            }
        }
    }

    #[test]
    fn test_gpu_blur_bright_pixel() {
        let Some(gpu) = gpu_or_skip() else { return };

        let mut input = Grid::filled(5, 5, 0u8).unwrap();
        input.set(2, 2, 255);
        let out = gpu.convolve(&input, &Kernel::gaussian_blur()).unwrap();

        assert_eq!(out, convolve(&input, &Kernel::gaussian_blur()));
        assert_eq!(out.get(2, 2), 63.75);
    }

    #[test]
    fn test_gpu_rejects_dispatch_beyond_limit() {
        let Some(gpu) = gpu_or_skip() else { return };

        // One workgroup column too many, while far below the buffer limit.
        let max_groups = gpu
            .context()
            .device
            .limits()
            .max_compute_workgroups_per_dimension as usize;
        let width = (max_groups + 1) * WORKGROUP_SIZE as usize;
        let wide = Grid::filled(width, 1, 1.0f32).unwrap();
        assert!((wide.len() as u64) <= gpu.max_cells());

        match gpu.convolve(&wide, &Kernel::identity()) {
            Err(ConvolveError::Gpu(GpuError::GridTooLarge { width: w, height: 1, .. })) => {
                assert_eq!(w, width)
            }
            other => panic!("expected GridTooLarge, got {:?}", other),
        }

        let tall = Grid::filled(1, width, 1.0f32).unwrap();
        assert!(matches!(
            gpu.convolve(&tall, &Kernel::identity()),
            Err(ConvolveError::Gpu(GpuError::GridTooLarge { .. }))
        ));
    }

    #[test]
    fn test_gpu_dispatch_counts() {
        let Some(gpu) = gpu_or_skip() else { return };
        assert!(gpu.check_fits(16, 16).is_ok());
        assert_eq!(gpu.check_fits(17, 33).unwrap(), (2, 3));
    }

    #[test]
    fn test_gpu_large_kernel() {
        let Some(gpu) = gpu_or_skip() else { return };

        let input = noise(20, 12);
        let kernel = Kernel::new(7, vec![1.0; 49]).unwrap();
        let cpu = convolve(&input, &kernel);
        let out = gpu.convolve(&input, &kernel).unwrap();
        assert_eq!(cpu, out);
    }
}
