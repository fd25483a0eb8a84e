//! Host-side support for the streaming kernels: dataset I/O, synthetic
//! data generation, and output verification. The `cnn-runner` binary wires
//! these around the `cnn-stream` crate.

pub mod data;
pub mod error;
pub mod gen;
pub mod verify;

pub use error::Error;
