//! GPU Compute Backend for gridconv
//!
//! Provides GPU-accelerated convolution using WebGPU (wgpu).

mod convolver;

pub use convolver::GpuConvolver;

/// Error type for GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Shader compilation failed:\n{log}")]
    ShaderCompilation { log: String },

    #[error("Grid {width}x{height} is too large for the device: {reason}")]
    GridTooLarge {
        width: usize,
        height: usize,
        reason: String,
    },

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("Device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("Buffer mapping callback was dropped")]
    ReadbackChannel,
}

/// An acquired adapter, device and queue.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Request a high-performance adapter and open a device on it.
    pub async fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!(
            "using adapter {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gridconv GPU"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;

        Ok(Self {
            device,
            queue,
            info,
        })
    }

    /// Information about the selected adapter.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }

    /// One-line adapter summary.
    pub fn describe(&self) -> String {
        format!(
            "{} (backend: {:?}, type: {:?}, driver: {} {})",
            self.info.name,
            self.info.backend,
            self.info.device_type,
            self.info.driver,
            self.info.driver_info
        )
    }

    /// Compile a WGSL module, surfacing compiler errors verbatim.
    ///
    /// Warnings are logged and do not fail the build.
    pub async fn compile_shader(
        &self,
        label: &str,
        source: &str,
    ) -> Result<wgpu::ShaderModule, GpuError> {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let info = module.get_compilation_info().await;
        let mut errors = Vec::new();
        for message in &info.messages {
            match message.message_type {
                wgpu::CompilationMessageType::Error => errors.push(format_message(message)),
                wgpu::CompilationMessageType::Warning => {
                    log::warn!("{}: {}", label, format_message(message))
                }
                _ => {
                    log::debug!("{}: {}", label, format_message(message))
                }
            }
        }

        if errors.is_empty() {
            Ok(module)
        } else {
            Err(GpuError::ShaderCompilation {
                log: errors.join("\n"),
            })
        }
    }
}

fn format_message(message: &wgpu::CompilationMessage) -> String {
    match &message.location {
        Some(loc) => format!(
            "{}:{}: {}",
            loc.line_number, loc.line_position, message.message
        ),
        None => message.message.clone(),
    }
}
