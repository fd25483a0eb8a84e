//! Raw binary tensor files.
//!
//! Tensors travel as raw little-endian `f32` arrays in the flat index
//! order of the geometry formulas; classifier images and labels are raw
//! bytes. File names are fixed by convention so a data directory fully
//! describes one problem instance.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use cnn_stream::Geometry;

use crate::error::Error;

pub const INPUT_FILE: &str = "input.bin";
pub const WEIGHT_FILE: &str = "weight.bin";
pub const BIAS_FILE: &str = "bias.bin";
pub const OUTPUT_FILE: &str = "output.bin";

pub const TEST_IMAGE_FILE: &str = "test_image.bin";
pub const TEST_LABEL_FILE: &str = "test_label.bin";

/// Per-class training image file, `train_image_<class>.bin`.
pub fn train_image_file(class: usize) -> String {
    format!("train_image_{class}.bin")
}

/// The three caller-supplied tensors of one convolution problem.
pub struct Tensors {
    pub input: Vec<f32>,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::Missing(path.to_path_buf())),
        Err(e) => Err(Error::Io(path.to_path_buf(), e)),
    }
}

/// Reads a raw little-endian `f32` file of exactly `expected_len` elements.
pub fn load_f32(path: &Path, expected_len: usize) -> Result<Vec<f32>, Error> {
    let bytes = read_bytes(path)?;
    let expected_bytes = expected_len * 4;
    if bytes.len() != expected_bytes {
        return Err(Error::Incomplete {
            path: path.to_path_buf(),
            expected: expected_bytes,
            actual: bytes.len(),
        });
    }
    info!("read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Writes a raw little-endian `f32` file.
pub fn write_f32(path: &Path, values: &[f32]) -> Result<(), Error> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, &bytes).map_err(|e| Error::Io(path.to_path_buf(), e))?;
    info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Reads a whole byte file.
pub fn load_u8(path: &Path) -> Result<Vec<u8>, Error> {
    let bytes = read_bytes(path)?;
    info!("read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Loads input, weight and bias from `dir`, sized by the geometry.
pub fn load_tensors(dir: &Path, geom: &Geometry) -> Result<Tensors, Error> {
    Ok(Tensors {
        input: load_f32(&dir.join(INPUT_FILE), geom.input_len())?,
        weight: load_f32(&dir.join(WEIGHT_FILE), geom.weight_len())?,
        bias: load_f32(&dir.join(BIAS_FILE), geom.bias_len())?,
    })
}

/// Loads the reference output when the file exists; `Ok(None)` when the
/// data directory carries no `output.bin`.
pub fn load_reference(dir: &Path, geom: &Geometry) -> Result<Option<Vec<f32>>, Error> {
    let path: PathBuf = dir.join(OUTPUT_FILE);
    if !path.exists() {
        return Ok(None);
    }
    load_f32(&path, geom.output_len()).map(Some)
}
