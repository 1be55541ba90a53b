use indicatif::ProgressBar;
use rustfft::num_complex::Complex;
use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::kernels::{
    twiddle_table, workgroups, SpectrumKernels, StageParams, STAGE_PARAMS_SIZE,
};
use crate::analysis::{to_db, BinAccumulator, SpectrumResult, WindowPlan};
use crate::error::{AnalyzerError, Result};
use crate::transform::output_len;
use crate::transform::window::WindowFunction;

/// Device buffers, sized once per run.
struct DeviceBuffers {
    block: wgpu::Buffer,
    spectrum: wgpu::Buffer,
    bins: wgpu::Buffer,
    staging: wgpu::Buffer,
    // held for the bind group
    _weights: wgpu::Buffer,
    _twiddles: wgpu::Buffer,
    _stages: wgpu::Buffer,
}

/// Sliding-window spectrum on the GPU. The window+transform, magnitude and
/// dB stages run as compute dispatches in 64-bit floats; accumulation across
/// windows is done on the host. Every device object is owned here and
/// released on drop.
pub struct GpuPipeline {
    gpu: GpuContext,
    kernels: SpectrumKernels,
    buffers: DeviceBuffers,
    bind_group: wgpu::BindGroup,
    stage_stride: u32,
    block_size: usize,
    block: Vec<f64>,
}

impl GpuPipeline {
    pub fn new(block_size: usize, window: WindowFunction) -> Result<Self> {
        if block_size < 2 || !block_size.is_power_of_two() {
            return Err(AnalyzerError::Config(format!(
                "the gpu strategy needs a power-of-two block size, got {}",
                block_size
            )));
        }

        let gpu = GpuContext::new()?;
        let kernels = SpectrumKernels::new(&gpu, block_size)?;

        let stage_stride = gpu
            .device
            .limits()
            .min_uniform_buffer_offset_alignment
            .max(STAGE_PARAMS_SIZE as u32);
        let log2_block = block_size.trailing_zeros() as usize;

        let (buffers, bind_group) = gpu.scoped("allocate device buffers", |device| {
            let weights = window.coefficients(block_size);
            let weights = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("weights_buffer"),
                contents: bytemuck::cast_slice(&weights),
                usage: wgpu::BufferUsages::STORAGE,
            });

            let twiddles = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("twiddle_buffer"),
                contents: bytemuck::cast_slice(&twiddle_table(block_size)),
                usage: wgpu::BufferUsages::STORAGE,
            });

            // one Stage record per butterfly pass, spaced by the offset alignment
            let mut stage_bytes = vec![0u8; stage_stride as usize * log2_block];
            for s in 0..log2_block {
                let params = StageParams {
                    span: 1 << s,
                    ..Default::default()
                };
                let at = s * stage_stride as usize;
                stage_bytes[at..at + STAGE_PARAMS_SIZE as usize]
                    .copy_from_slice(bytemuck::bytes_of(&params));
            }
            let stages = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("stage_buffer"),
                contents: &stage_bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let block = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("block_buffer"),
                size: (block_size * std::mem::size_of::<f64>()) as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let spectrum = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("spectrum_buffer"),
                size: (block_size * std::mem::size_of::<[f64; 2]>()) as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });

            let bins = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("bins_buffer"),
                size: (block_size / 2 * std::mem::size_of::<f64>()) as u64,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            // large enough for either a bins or a spectrum readback
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("staging_buffer"),
                size: (block_size * std::mem::size_of::<[f64; 2]>()) as u64,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("spectrum_bind_group"),
                layout: &kernels.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: block.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: weights.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: twiddles.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: spectrum.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: bins.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: &stages,
                            offset: 0,
                            size: wgpu::BufferSize::new(STAGE_PARAMS_SIZE),
                        }),
                    },
                ],
            });

            let buffers = DeviceBuffers {
                block,
                spectrum,
                bins,
                staging,
                _weights: weights,
                _twiddles: twiddles,
                _stages: stages,
            };
            (buffers, bind_group)
        })?;

        log::info!(
            "GPU pipeline ready on {}: block={}, {} butterfly passes",
            gpu.adapter_name,
            block_size,
            log2_block
        );

        Ok(Self {
            gpu,
            kernels,
            buffers,
            bind_group,
            stage_stride,
            block_size,
            block: vec![0.0; block_size],
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn bins(&self) -> usize {
        self.block_size / 2
    }

    fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        stage: usize,
        items: usize,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("spectrum_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[stage as u32 * self.stage_stride]);
        pass.dispatch_workgroups(workgroups(items), 1, 1);
    }

    fn encoder(&self, label: &'static str) -> wgpu::CommandEncoder {
        self.gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Stage 1: upload the block, weight it and run the log2(N) butterfly
    /// passes. Returns once the device has finished.
    fn transform_block(&mut self, block: &[f64]) -> Result<()> {
        self.block.copy_from_slice(block);
        let gpu = &self.gpu;
        gpu.scoped("window and transform", |_| {
            gpu.queue
                .write_buffer(&self.buffers.block, 0, bytemuck::cast_slice(&self.block));

            let mut encoder = self.encoder("transform_encoder");
            self.dispatch(&mut encoder, &self.kernels.load_block, 0, self.block_size);
            for stage in 0..self.block_size.trailing_zeros() as usize {
                self.dispatch(&mut encoder, &self.kernels.butterfly, stage, self.block_size / 2);
            }
            gpu.submit_and_wait(encoder);
        })
    }

    /// Stage 2: magnitudes of bins `0..N/2`, read back to the host.
    fn magnitudes(&self) -> Result<Vec<f64>> {
        let gpu = &self.gpu;
        let bytes = (self.bins() * std::mem::size_of::<f64>()) as u64;
        gpu.scoped("magnitude", |_| {
            let mut encoder = self.encoder("magnitude_encoder");
            self.dispatch(&mut encoder, &self.kernels.magnitude, 0, self.bins());
            encoder.copy_buffer_to_buffer(&self.buffers.bins, 0, &self.buffers.staging, 0, bytes);
            gpu.submit_and_wait(encoder);
        })?;
        gpu.read_buffer(&self.buffers.staging, self.bins())
    }

    /// Raw transform output `X[0..=N/2]` of the block last run through stage 1.
    pub(crate) fn read_spectrum(&self) -> Result<Vec<Complex<f64>>> {
        let gpu = &self.gpu;
        let len = output_len(self.block_size);
        let bytes = (len * std::mem::size_of::<[f64; 2]>()) as u64;
        gpu.scoped("spectrum readback", |_| {
            let mut encoder = self.encoder("spectrum_readback_encoder");
            encoder.copy_buffer_to_buffer(
                &self.buffers.spectrum,
                0,
                &self.buffers.staging,
                0,
                bytes,
            );
            gpu.submit_and_wait(encoder);
        })?;
        let raw: Vec<[f64; 2]> = gpu.read_buffer(&self.buffers.staging, len)?;
        Ok(raw.into_iter().map(|[re, im]| Complex::new(re, im)).collect())
    }

    pub(crate) fn transform(&mut self, block: &[f64]) -> Result<Vec<Complex<f64>>> {
        self.transform_block(block)?;
        self.read_spectrum()
    }

    /// Stage 3 tail: convert averaged magnitudes to dB on the device.
    fn convert_db(&self, average: &[f64]) -> Result<Vec<f64>> {
        let gpu = &self.gpu;
        let bytes = (self.bins() * std::mem::size_of::<f64>()) as u64;
        gpu.scoped("db conversion", |_| {
            gpu.queue
                .write_buffer(&self.buffers.bins, 0, bytemuck::cast_slice(average));
            let mut encoder = self.encoder("db_encoder");
            self.dispatch(&mut encoder, &self.kernels.to_db, 0, self.bins());
            encoder.copy_buffer_to_buffer(&self.buffers.bins, 0, &self.buffers.staging, 0, bytes);
            gpu.submit_and_wait(encoder);
        })?;
        let db: Vec<f64> = gpu.read_buffer(&self.buffers.staging, self.bins())?;

        // the kernel clamps before the log; exact silence is -inf as on the CPU
        Ok(db
            .into_iter()
            .zip(average)
            .map(|(db, &m)| if m > 0.0 { db } else { to_db(m) })
            .collect())
    }

    /// Run every window of `plan` through the device stages.
    pub fn analyze(
        &mut self,
        samples: &[f64],
        plan: WindowPlan,
        sample_rate: u32,
        progress: &ProgressBar,
    ) -> Result<SpectrumResult> {
        if plan.block_size() != self.block_size {
            return Err(AnalyzerError::Config(format!(
                "pipeline built for block size {}, plan uses {}",
                self.block_size,
                plan.block_size()
            )));
        }

        let mut bins = BinAccumulator::new(plan.bins());
        for k in 0..plan.windows() {
            let offset = plan.offset(k);
            self.transform_block(&samples[offset..offset + self.block_size])?;
            let magnitudes = self.magnitudes()?;
            bins.add_magnitudes(&magnitudes);
            progress.inc(1);
        }

        let average = bins.average(&plan)?;
        let db = self.convert_db(&average)?;
        Ok(SpectrumResult::new(db, self.block_size, sample_rate, bins.windows()))
    }
}
