//! Streaming convolution-activation-pooling pipeline.
//!
//! Four stages connected by bounded in-order channels: three feeders
//! stream the input, weight and bias tensors in the exact order the
//! compute core consumes them; the core accumulates into an arena sized to
//! compile-time maxima, applies ReLU and 2x2 max pooling, and writes the
//! pooled feature-map stack. Two smaller pipelines ride the same channel
//! fabric: streamed vector addition and a streamed 1-NN image classifier.
//!
//! - `geometry`: validated problem dimensions and flat index formulas.
//! - `stream`: bounded FIFO channels with a scalar push/pull interface.
//! - `stages`: the feeders and the compute core.
//! - `pipeline`: stage wiring and the arena-owning [`CnnPipeline`].
//! - `naive`: sequential references the streamed paths are checked against.

pub mod error;
pub mod geometry;
pub mod knn;
pub mod naive;
pub mod pipeline;
pub mod stages;
pub mod stream;
pub mod vadd;

pub use error::Error;
pub use geometry::Geometry;
pub use knn::run_knn;
pub use pipeline::{run_pipeline, CnnPipeline};
pub use vadd::run_vadd;
