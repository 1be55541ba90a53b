//! Compute-shader strategy: adapter setup, the spectrum kernels and the
//! per-run pipeline that drives them.

pub mod context;
pub mod kernels;
pub mod pipeline;
pub mod transform;

pub use context::GpuContext;
pub use pipeline::GpuPipeline;
pub use transform::GpuTransform;
