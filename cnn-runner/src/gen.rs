//! Synthetic dataset generation.
//!
//! Deterministic modular ramps stand in for real data, so every invocation
//! of `gen` with the same geometry reproduces the same files byte for byte.
//! The reference output is computed with the sequential kernel.

use std::fs;
use std::path::Path;

use log::info;

use cnn_stream::knn::{IMAGE_BYTES, NUM_CLASSES};
use cnn_stream::{naive, Geometry};

use crate::data::{self, Tensors};
use crate::error::Error;

pub fn synth_input(len: usize) -> Vec<f32> {
    (0..len).map(|i| ((i % 97) as f32) * 0.05 - 2.0).collect()
}

pub fn synth_weight(len: usize) -> Vec<f32> {
    (0..len).map(|i| ((i % 23) as f32) * 0.02 - 0.2).collect()
}

pub fn synth_bias(len: usize) -> Vec<f32> {
    (0..len).map(|i| ((i % 11) as f32) * 0.1 - 0.5).collect()
}

pub fn synth_tensors(geom: &Geometry) -> Tensors {
    Tensors {
        input: synth_input(geom.input_len()),
        weight: synth_weight(geom.weight_len()),
        bias: synth_bias(geom.bias_len()),
    }
}

/// Writes input, weight, bias, and the sequential reference output for
/// `geom` under `dir`, creating the directory if needed.
pub fn generate(dir: &Path, geom: &Geometry) -> Result<(), Error> {
    fs::create_dir_all(dir).map_err(|e| Error::Io(dir.to_path_buf(), e))?;

    let tensors = synth_tensors(geom);
    let mut output = vec![0.0f32; geom.output_len()];
    naive::conv_layer(
        geom,
        &tensors.input,
        &tensors.weight,
        &tensors.bias,
        &mut output,
    );

    data::write_f32(&dir.join(data::INPUT_FILE), &tensors.input)?;
    data::write_f32(&dir.join(data::WEIGHT_FILE), &tensors.weight)?;
    data::write_f32(&dir.join(data::BIAS_FILE), &tensors.bias)?;
    data::write_f32(&dir.join(data::OUTPUT_FILE), &output)?;
    info!("generated dataset under {}", dir.display());
    Ok(())
}

/// Synthetic classifier dataset with known nearest-neighbour structure.
pub struct KnnDataset {
    /// One training buffer per class.
    pub train: Vec<Vec<u8>>,
    /// Concatenated test images.
    pub test: Vec<u8>,
    /// Ground-truth label per test image.
    pub labels: Vec<u8>,
}

fn knn_image(class: usize, jitter: usize) -> Vec<u8> {
    (0..IMAGE_BYTES)
        .map(|i| (class * 24 + jitter + i % 3) as u8)
        .collect()
}

/// Builds a dataset whose labels the classifier can recover exactly. Class
/// patterns sit 24 byte-values apart; training copies of a class use even
/// jitters and each test image uses jitter 1, one value away from the
/// jitter-0 copy of its own class and at least 23 from every other class.
pub fn synth_knn(train_per_class: usize, test_count: usize) -> KnnDataset {
    let mut train = Vec::with_capacity(NUM_CLASSES);
    for class in 0..NUM_CLASSES {
        let mut buf = Vec::with_capacity(train_per_class * IMAGE_BYTES);
        for tr in 0..train_per_class {
            buf.extend_from_slice(&knn_image(class, 2 * tr));
        }
        train.push(buf);
    }

    let mut test = Vec::with_capacity(test_count * IMAGE_BYTES);
    let mut labels = Vec::with_capacity(test_count);
    for t in 0..test_count {
        let class = t % NUM_CLASSES;
        test.extend_from_slice(&knn_image(class, 1));
        labels.push(class as u8);
    }

    KnnDataset {
        train,
        test,
        labels,
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::path::PathBuf;

    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("cnn-runner-gen-{tag}-{}", std::process::id()))
    }

    #[test]
    fn synth_tensors_match_geometry() {
        let geom = Geometry::new(3, 3, 8).unwrap();
        let tensors = synth_tensors(&geom);
        assert_eq!(tensors.input.len(), geom.input_len());
        assert_eq!(tensors.weight.len(), geom.weight_len());
        assert_eq!(tensors.bias.len(), geom.bias_len());
        assert_eq!(synth_input(4), vec![-2.0, -1.95, -1.9, -1.85]);
        assert_eq!(synth_bias(2), vec![-0.5, -0.4]);
    }

    #[test]
    fn generated_reference_loads_back() {
        let dir = scratch_dir("roundtrip");
        let geom = Geometry::new(2, 3, 4).unwrap();
        generate(&dir, &geom).unwrap();

        let tensors = data::load_tensors(&dir, &geom).unwrap();
        let reference = data::load_reference(&dir, &geom).unwrap().unwrap();

        let mut recomputed = vec![0.0f32; geom.output_len()];
        naive::conv_layer(
            &geom,
            &tensors.input,
            &tensors.weight,
            &tensors.bias,
            &mut recomputed,
        );
        assert_eq!(reference, recomputed);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn knn_labels_are_recoverable() {
        let train_per_class = 4;
        let test_count = 12;
        let dataset = synth_knn(train_per_class, test_count);

        assert_eq!(dataset.train.len(), NUM_CLASSES);
        assert_eq!(dataset.test.len(), test_count * IMAGE_BYTES);

        let predicted = naive::knn_classify(
            &dataset.train,
            &dataset.test,
            IMAGE_BYTES,
            train_per_class,
            test_count,
        );
        assert_eq!(predicted, dataset.labels);
    }
}
