use super::context::GpuContext;
use crate::error::Result;

pub const WORKGROUP_SIZE: u32 = 64;

const SHADER_SOURCE: &str = include_str!("../../shaders/spectrum.wgsl");

/// Prepend the block geometry as WGSL `const` declarations.
pub fn inject_constants(shader_src: &str, block_size: usize) -> String {
    let mut consts = String::from("// Run parameters\n");
    consts.push_str(&format!("const BLOCK_SIZE: u32 = {}u;\n", block_size));
    consts.push_str(&format!("const LOG2_BLOCK: u32 = {}u;\n", block_size.trailing_zeros()));
    consts.push_str(&format!("const BIN_COUNT: u32 = {}u;\n", block_size / 2));
    consts.push_str(&format!("const WORKGROUP_SIZE: u32 = {}u;\n", WORKGROUP_SIZE));
    consts.push('\n');
    format!("{}{}", consts, shader_src)
}

/// Forward twiddles W_N^k = e^(-2πik/N) for k < N/2.
pub fn twiddle_table(block_size: usize) -> Vec<[f64; 2]> {
    (0..block_size / 2)
        .map(|k| {
            let angle = -2.0 * std::f64::consts::PI * k as f64 / block_size as f64;
            [angle.cos(), angle.sin()]
        })
        .collect()
}

/// Workgroups needed to cover `items` invocations.
pub fn workgroups(items: usize) -> u32 {
    (items as u32).div_ceil(WORKGROUP_SIZE)
}

/// The four compute pipelines of one run, sharing a bind group layout.
pub struct SpectrumKernels {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub load_block: wgpu::ComputePipeline,
    pub butterfly: wgpu::ComputePipeline,
    pub magnitude: wgpu::ComputePipeline,
    pub to_db: wgpu::ComputePipeline,
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

impl SpectrumKernels {
    pub fn new(gpu: &GpuContext, block_size: usize) -> Result<Self> {
        let source = inject_constants(SHADER_SOURCE, block_size);

        gpu.scoped("build spectrum kernels", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("spectrum_shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

            let layout = wgpu::BindGroupLayoutDescriptor {
                label: Some("spectrum_bind_group_layout"),
                entries: &[
                    // @binding(0): raw block
                    storage_entry(0, true),
                    // @binding(1): window coefficients
                    storage_entry(1, true),
                    // @binding(2): twiddle table
                    storage_entry(2, true),
                    // @binding(3): complex work buffer
                    storage_entry(3, false),
                    // @binding(4): per-bin magnitudes / dB
                    storage_entry(4, false),
                    // @binding(5): butterfly stage, selected by dynamic offset
                    wgpu::BindGroupLayoutEntry {
                        binding: 5,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: wgpu::BufferSize::new(STAGE_PARAMS_SIZE),
                        },
                        count: None,
                    },
                ],
            };
            let bind_group_layout = device.create_bind_group_layout(&layout);

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("spectrum_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let make = |entry_point: &str| {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(entry_point),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: Some(entry_point),
                    compilation_options: Default::default(),
                    cache: None,
                })
            };

            Self {
                load_block: make("load_block"),
                butterfly: make("butterfly"),
                magnitude: make("magnitude"),
                to_db: make("to_db"),
                bind_group_layout,
            }
        })
    }
}

/// Size of the `Stage` uniform in bytes.
pub const STAGE_PARAMS_SIZE: u64 = 16;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StageParams {
    pub span: u32,
    pub _padding: [u32; 3],
}
