//! Naive reference implementations - correct but slow.
//! Use these for testing, output verification and as baseline benchmarks.

use crate::geometry::Geometry;

#[inline]
fn plane_idx(img: usize, i: usize, h: usize, w: usize) -> usize {
    i * img * img + h * img + w
}

/// Sequential convolution-activation-pooling reference.
///
/// Same arithmetic as the streamed pipeline in the same `(i, j, h, w, p, q)`
/// accumulation order, so the two agree bit-for-bit on every cell.
///
/// - `input`:  `[num_channels, in_image_size, in_image_size]`
/// - `weight`: `[num_channels, num_channels, kernel_size, kernel_size]`
/// - `bias`:   `[num_channels]`
/// - `output`: `[num_channels, out_image_size, out_image_size]`
pub fn conv_layer(geom: &Geometry, input: &[f32], weight: &[f32], bias: &[f32], output: &mut [f32]) {
    let channels = geom.num_channels();
    let img = geom.image_size();
    let kernel = geom.kernel_size();

    let mut acc = vec![0.0f32; channels * img * img];

    for i in 0..channels {
        for h in 0..img {
            for w in 0..img {
                acc[plane_idx(img, i, h, w)] = bias[i];
            }
        }
    }

    for i in 0..channels {
        for j in 0..channels {
            for h in 0..img {
                for w in 0..img {
                    for p in 0..kernel {
                        for q in 0..kernel {
                            acc[plane_idx(img, i, h, w)] += weight
                                [geom.weight_idx(i, j, p, q)]
                                * input[geom.input_idx(j, h + p, w + q)];
                        }
                    }
                }
            }
        }
    }

    for cell in acc.iter_mut() {
        *cell = cell.max(0.0);
    }

    for i in 0..channels {
        for h in 0..geom.out_image_size() {
            for w in 0..geom.out_image_size() {
                let pooled = acc[plane_idx(img, i, 2 * h, 2 * w)]
                    .max(acc[plane_idx(img, i, 2 * h + 1, 2 * w)])
                    .max(acc[plane_idx(img, i, 2 * h, 2 * w + 1)])
                    .max(acc[plane_idx(img, i, 2 * h + 1, 2 * w + 1)]);
                output[geom.output_idx(i, h, w)] = pooled;
            }
        }
    }
}

/// Elementwise vector addition reference.
pub fn vadd(a: &[f32], b: &[f32], out: &mut [f32]) {
    for i in 0..out.len() {
        out[i] = a[i] + b[i];
    }
}

/// 1-NN classification reference over flat byte images.
///
/// - `train`: one buffer per class, each holding `train_per_class` images
///   of `image_bytes` bytes
/// - `test`: `test_count` images of `image_bytes` bytes
///
/// Returns one predicted label (class index) per test image. Candidates
/// are scanned training-index outer, class inner, with strict improvement,
/// so distance ties resolve to the earliest candidate in scan order.
pub fn knn_classify(
    train: &[Vec<u8>],
    test: &[u8],
    image_bytes: usize,
    train_per_class: usize,
    test_count: usize,
) -> Vec<u8> {
    let mut labels = Vec::with_capacity(test_count);
    for t in 0..test_count {
        let probe = &test[t * image_bytes..(t + 1) * image_bytes];
        let mut best_label = 0u8;
        let mut best_dist = i32::MAX;
        for tr in 0..train_per_class {
            for (c, class) in train.iter().enumerate() {
                let candidate = &class[tr * image_bytes..(tr + 1) * image_bytes];
                let mut dist: i32 = 0;
                for i in 0..image_bytes {
                    let d = candidate[i] as i32 - probe[i] as i32;
                    dist += d * d;
                }
                if dist < best_dist {
                    best_dist = dist;
                    best_label = c as u8;
                }
            }
        }
        labels.push(best_label);
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conv_layer_matches_hand_computed_case() {
        // One channel, 2x2 kernel with corners [1, 0; 0, 1], bias 0.5.
        let geom = Geometry::new(1, 2, 2).unwrap();
        let input: Vec<f32> = (1..=9).map(|v| v as f32).collect();
        let weight = vec![1.0, 0.0, 0.0, 1.0];
        let bias = vec![0.5];
        let mut output = vec![0.0; geom.output_len()];
        conv_layer(&geom, &input, &weight, &bias, &mut output);
        // Accumulator: [[6.5, 8.5], [12.5, 14.5]]; pooled max is 14.5.
        assert_eq!(output, vec![14.5]);
    }

    #[test]
    fn conv_layer_relu_clamps_negative_planes() {
        let geom = Geometry::new(1, 1, 2).unwrap();
        let input = vec![1.0, 2.0, 3.0, 4.0];
        let weight = vec![1.0];
        let bias = vec![-100.0];
        let mut output = vec![-1.0; geom.output_len()];
        conv_layer(&geom, &input, &weight, &bias, &mut output);
        assert_eq!(output, vec![0.0]);
    }

    #[test]
    fn vadd_sums_elementwise() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![10.0, 20.0, 30.0];
        let mut out = vec![0.0; 3];
        vadd(&a, &b, &mut out);
        assert_eq!(out, vec![11.0, 22.0, 33.0]);
    }

    #[test]
    fn knn_picks_nearest_class() {
        // Three classes of 4-byte images clustered around 0, 100, 200.
        let train = vec![
            vec![0, 0, 0, 0, 1, 1, 1, 1],
            vec![100, 100, 100, 100, 101, 101, 101, 101],
            vec![200, 200, 200, 200, 199, 199, 199, 199],
        ];
        let test = vec![99, 99, 99, 99, 2, 2, 2, 2, 201, 201, 201, 201];
        let labels = knn_classify(&train, &test, 4, 2, 3);
        assert_eq!(labels, vec![1, 0, 2]);
    }

    #[test]
    fn knn_tie_goes_to_earliest_scan_candidate() {
        // Class 2 at training index 0 and class 0 at training index 1 are
        // both at squared distance 400 from the probe; the scan visits
        // (tr=0, c=2) before (tr=1, c=0), so class 2 wins the tie.
        let train = vec![
            vec![255, 255, 255, 255, 40, 40, 40, 40],
            vec![0, 0, 0, 0, 255, 255, 255, 255],
            vec![20, 20, 20, 20, 0, 0, 0, 0],
        ];
        let test = vec![30, 30, 30, 30];
        let labels = knn_classify(&train, &test, 4, 2, 1);
        assert_eq!(labels, vec![2]);
    }
}
