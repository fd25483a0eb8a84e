//! Pipeline assembly: the arena-owning handle and the stage wiring.

use std::thread;

use log::debug;

use crate::error::Error;
use crate::geometry::{Geometry, MAX_CHANNELS, MAX_IMAGE_SIZE};
use crate::stages;
use crate::stream::{self, DEFAULT_DEPTH};

/// Cells in the accumulation arena, sized to the compile-time maxima.
const ARENA_CELLS: usize = MAX_CHANNELS * MAX_IMAGE_SIZE * MAX_IMAGE_SIZE;

/// A reusable convolution pipeline.
///
/// Owns the accumulation arena (about 49 MiB of `f32` at the maxima) so
/// repeated invocations do not reallocate it. Every run re-initializes the
/// cells it touches from the bias stream; nothing carries over between
/// runs, and a single handle serves any sequence of geometries up to the
/// maxima.
pub struct CnnPipeline {
    acc: Vec<f32>,
    depth: usize,
}

impl CnnPipeline {
    /// Allocates the arena with the default channel depth.
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }

    /// Allocates the arena with an explicit channel depth. Depth 0 is
    /// treated as 1; correctness does not depend on the choice.
    pub fn with_depth(depth: usize) -> Self {
        CnnPipeline {
            acc: vec![0.0; ARENA_CELLS],
            depth: depth.max(1),
        }
    }

    /// Runs one convolution, activation and pooling pass.
    ///
    /// Buffer lengths are checked against the geometry before any stage
    /// starts. The three feeders run on scoped threads; the compute core
    /// runs on the calling thread, and the call returns once `output` is
    /// fully written and all feeders have exited.
    pub fn run(
        &mut self,
        geom: &Geometry,
        input: &[f32],
        weight: &[f32],
        bias: &[f32],
        output: &mut [f32],
    ) -> Result<(), Error> {
        geom.check_buffers(input.len(), weight.len(), bias.len(), output.len())?;

        debug!(
            "pipeline run: channels={} kernel={} image={} depth={}",
            geom.num_channels(),
            geom.kernel_size(),
            geom.image_size(),
            self.depth
        );

        let acc = &mut self.acc[..];
        thread::scope(|s| {
            let (in_tx, in_rx) = stream::channel(self.depth);
            let (w_tx, w_rx) = stream::channel(self.depth);
            let (b_tx, b_rx) = stream::channel(self.depth);
            s.spawn(move || stages::feed_input(geom, input, in_tx));
            s.spawn(move || stages::feed_weights(geom, weight, w_tx));
            s.spawn(move || stages::feed_bias(geom, bias, b_tx));
            stages::compute_core(geom, acc, in_rx, w_rx, b_rx, output);
        });

        debug!("pipeline run done: {} macs", geom.mac_count());
        Ok(())
    }
}

impl Default for CnnPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot wrapper around [`CnnPipeline::run`] for callers that do not
/// reuse the arena.
pub fn run_pipeline(
    geom: &Geometry,
    input: &[f32],
    weight: &[f32],
    bias: &[f32],
    output: &mut [f32],
) -> Result<(), Error> {
    CnnPipeline::new().run(geom, input, weight, bias, output)
}
