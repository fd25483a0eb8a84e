//! The four pipeline stages.
//!
//! Feeders turn caller tensors into streams in the exact order the compute
//! core consumes them; the core owns the accumulation arena and walks a
//! three-phase state machine (initialize, accumulate, activate-and-pool).
//! Every loop nest below is an ordering contract: element counts and order
//! on each channel are fixed by the geometry, and the core accumulates in
//! the same `(i, j, h, w, p, q)` nesting as the sequential reference, so
//! the two produce bit-identical output.

use crate::geometry::{Geometry, MAX_IMAGE_SIZE, MAX_KERNEL};
use crate::stream::{StreamReader, StreamWriter};

/// Streams the input tensor, one full pass per output channel.
///
/// Emission order per pass: `j` (input channel), then `h`, `w` (window
/// origin), then `p`, `q` (kernel offset), reading `input[j][h+p][w+q]`.
/// The pass repeats `num_channels` times because the consumer's outer loop
/// runs over output channels while input pixels do not depend on them.
pub fn feed_input(geom: &Geometry, input: &[f32], mut out: StreamWriter<f32>) {
    for _i in 0..geom.num_channels() {
        for j in 0..geom.num_channels() {
            for h in 0..geom.image_size() {
                for w in 0..geom.image_size() {
                    for p in 0..geom.kernel_size() {
                        for q in 0..geom.kernel_size() {
                            out.push(input[geom.input_idx(j, h + p, w + q)]);
                        }
                    }
                }
            }
        }
    }
}

/// Streams the weight tensor in `(i, j, p, q)` order, each element exactly
/// once. For the dense layout of `weight_idx` this is the flat slice order.
pub fn feed_weights(geom: &Geometry, weight: &[f32], mut out: StreamWriter<f32>) {
    for i in 0..geom.num_channels() {
        for j in 0..geom.num_channels() {
            for p in 0..geom.kernel_size() {
                for q in 0..geom.kernel_size() {
                    out.push(weight[geom.weight_idx(i, j, p, q)]);
                }
            }
        }
    }
}

/// Streams `bias[i]` broadcast once per accumulator cell of channel `i`,
/// in the order of the core's initialization sweep.
pub fn feed_bias(geom: &Geometry, bias: &[f32], mut out: StreamWriter<f32>) {
    for i in 0..geom.num_channels() {
        for _h in 0..geom.image_size() {
            for _w in 0..geom.image_size() {
                out.push(bias[i]);
            }
        }
    }
}

/// Accumulator cell `(i, h, w)`. The arena uses maxima strides regardless
/// of the runtime geometry.
#[inline]
fn acc_idx(i: usize, h: usize, w: usize) -> usize {
    i * MAX_IMAGE_SIZE * MAX_IMAGE_SIZE + h * MAX_IMAGE_SIZE + w
}

/// Consumes the three streams and writes the pooled output tensor.
///
/// Phases, strictly in sequence:
///
/// 1. initialize every accumulator cell from the bias stream
///    (`num_channels * image_size^2` pulls),
/// 2. accumulate `weight * input` products in `(i, j, h, w, p, q)` order,
///    holding the `kernel_size^2` weights of the active `(i, j)` pair in a
///    fixed local block so the weight stream is pulled exactly once per
///    element,
/// 3. ReLU sweep over the accumulator, then 2x2 max pooling into `output`.
///
/// `acc` is the pipeline's arena; only the `[num_channels, image_size,
/// image_size]` corner indexed through [`acc_idx`] is touched, and every
/// touched cell is written in phase 1 before it is read.
pub fn compute_core(
    geom: &Geometry,
    acc: &mut [f32],
    mut input: StreamReader<f32>,
    mut weights: StreamReader<f32>,
    mut bias: StreamReader<f32>,
    output: &mut [f32],
) {
    let channels = geom.num_channels();
    let img = geom.image_size();
    let kernel = geom.kernel_size();

    for i in 0..channels {
        for h in 0..img {
            for w in 0..img {
                acc[acc_idx(i, h, w)] = bias.pull();
            }
        }
    }

    let mut k_block = [[0.0f32; MAX_KERNEL]; MAX_KERNEL];
    for i in 0..channels {
        for j in 0..channels {
            for p in 0..kernel {
                for q in 0..kernel {
                    k_block[p][q] = weights.pull();
                }
            }
            for h in 0..img {
                for w in 0..img {
                    let cell = &mut acc[acc_idx(i, h, w)];
                    for p in 0..kernel {
                        for q in 0..kernel {
                            *cell += k_block[p][q] * input.pull();
                        }
                    }
                }
            }
        }
    }

    for i in 0..channels {
        for h in 0..img {
            for w in 0..img {
                let cell = &mut acc[acc_idx(i, h, w)];
                *cell = cell.max(0.0);
            }
        }
    }

    for i in 0..channels {
        for h in 0..geom.out_image_size() {
            for w in 0..geom.out_image_size() {
                let pooled = acc[acc_idx(i, 2 * h, 2 * w)]
                    .max(acc[acc_idx(i, 2 * h + 1, 2 * w)])
                    .max(acc[acc_idx(i, 2 * h, 2 * w + 1)])
                    .max(acc[acc_idx(i, 2 * h + 1, 2 * w + 1)]);
                output[geom.output_idx(i, h, w)] = pooled;
            }
        }
    }
}
