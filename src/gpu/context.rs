use crate::error::{AnalyzerError, Result};

/// Adapter, device and queue for one run.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
}

impl GpuContext {
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::METAL | wgpu::Backends::VULKAN | wgpu::Backends::DX12,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| AnalyzerError::device("request adapter", "no suitable GPU adapter"))?;

        let info = adapter.get_info();
        log::info!("Using GPU: {}", info.name);
        log::info!("Backend: {:?}", info.backend);

        if !adapter.features().contains(wgpu::Features::SHADER_F64) {
            return Err(AnalyzerError::device(
                "request shader-f64",
                format!("{} has no 64-bit float shader support", info.name),
            ));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("specan_device"),
                    required_features: wgpu::Features::SHADER_F64,
                    required_limits: wgpu::Limits::default(),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| AnalyzerError::device("request device", e))?;

        Ok(Self {
            device,
            queue,
            adapter_name: info.name,
        })
    }

    /// Run `f` inside validation and out-of-memory error scopes so device
    /// errors come back as `Device` instead of reaching the default handler.
    pub fn scoped<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        match validation.or(oom) {
            Some(err) => Err(AnalyzerError::device(operation, err)),
            None => Ok(value),
        }
    }

    /// Submit and block until the queue has drained.
    pub fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) {
        let index = self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::Maintain::WaitForSubmissionIndex(index));
    }

    /// Map `buffer[..len]` for reading, block until mapped and copy it out.
    pub fn read_buffer<T: bytemuck::Pod>(
        &self,
        buffer: &wgpu::Buffer,
        len: usize,
    ) -> Result<Vec<T>> {
        let bytes = (len * std::mem::size_of::<T>()) as wgpu::BufferAddress;
        let slice = buffer.slice(..bytes);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| AnalyzerError::device("map staging buffer", e))?
            .map_err(|e| AnalyzerError::device("map staging buffer", e))?;

        let data = slice.get_mapped_range();
        let values = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        buffer.unmap();
        Ok(values)
    }
}
