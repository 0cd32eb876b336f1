//! Sampling module - weighted configuration batches drawn from |ψ|².

mod batch;
mod exact;
mod metropolis;
mod sampler;

pub use batch::SampleBatch;
pub use exact::ExactSampler;
pub use metropolis::{MetropolisParams, MetropolisSampler};
pub use sampler::Sampler;
