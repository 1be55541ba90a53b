pub mod generator;
pub mod source;

pub use source::SampleBuffer;
