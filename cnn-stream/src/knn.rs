//! Streamed 1-NN image classifier.
//!
//! CIFAR-10-shaped byte images travel the channels as packed little-endian
//! `u32` words. Ten per-class feeders each re-emit their training images
//! once per test image (the same re-read pattern the convolution input
//! feeder uses); a test feeder streams every probe once; the classifier
//! core buffers the current probe, accumulates squared byte distance
//! word-by-word per candidate, and keeps the best label. Candidates are
//! scanned training-index outer, class inner, with strict improvement, so
//! ties resolve to the earliest candidate in scan order.

use std::thread;

use crate::error::Error;
use crate::stream::{self, StreamReader, StreamWriter};

/// Classes in the dataset.
pub const NUM_CLASSES: usize = 10;
/// Bytes per image: 32 x 32 pixels, 3 planes.
pub const IMAGE_BYTES: usize = 3072;
/// Packed `u32` words per image.
pub const IMAGE_WORDS: usize = IMAGE_BYTES / 4;

/// Streams a byte buffer as packed little-endian words, `repeats` times
/// over.
fn feed_words(data: &[u8], repeats: usize, mut out: StreamWriter<u32>) {
    for _ in 0..repeats {
        for bytes in data.chunks_exact(4) {
            out.push(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        }
    }
}

/// Squared byte distance between two packed words, summed over the four
/// lanes.
#[inline]
fn word_dist(a: u32, b: u32) -> i32 {
    let mut dist = 0;
    for lane in 0..4 {
        let d = ((a >> (lane * 8)) & 0xFF) as i32 - ((b >> (lane * 8)) & 0xFF) as i32;
        dist += d * d;
    }
    dist
}

/// Classifier core: for each probe, one full sweep over every class
/// stream.
fn classify_core(
    mut train: Vec<StreamReader<u32>>,
    mut test: StreamReader<u32>,
    test_count: usize,
    train_per_class: usize,
    mut labels: StreamWriter<u32>,
) {
    for _t in 0..test_count {
        let mut probe = [0u32; IMAGE_WORDS];
        for word in probe.iter_mut() {
            *word = test.pull();
        }
        let mut best_label = 0u32;
        let mut best_dist = i32::MAX;
        for _tr in 0..train_per_class {
            for (c, class) in train.iter_mut().enumerate() {
                let mut dist = 0;
                for word in probe.iter() {
                    dist += word_dist(class.pull(), *word);
                }
                if dist < best_dist {
                    best_dist = dist;
                    best_label = c as u32;
                }
            }
        }
        labels.push(best_label);
    }
}

/// Runs the streamed classifier and returns one predicted label per test
/// image.
///
/// `train` holds exactly [`NUM_CLASSES`] buffers of
/// `train_per_class * IMAGE_BYTES` bytes each; `test` holds
/// `test_count * IMAGE_BYTES` bytes. Slicing larger datasets down to these
/// lengths is the caller's job.
pub fn run_knn(
    train: &[Vec<u8>],
    test: &[u8],
    test_count: usize,
    train_per_class: usize,
    depth: usize,
) -> Result<Vec<u8>, Error> {
    if train.len() != NUM_CLASSES {
        return Err(Error::BufferLen {
            name: "train",
            expected: NUM_CLASSES,
            actual: train.len(),
        });
    }
    let class_bytes = train_per_class * IMAGE_BYTES;
    for class in train {
        if class.len() != class_bytes {
            return Err(Error::BufferLen {
                name: "train_class",
                expected: class_bytes,
                actual: class.len(),
            });
        }
    }
    if test.len() != test_count * IMAGE_BYTES {
        return Err(Error::BufferLen {
            name: "test",
            expected: test_count * IMAGE_BYTES,
            actual: test.len(),
        });
    }

    let labels = thread::scope(|s| {
        let mut class_readers = Vec::with_capacity(NUM_CLASSES);
        for class in train {
            let data: &[u8] = class;
            let (tx, rx) = stream::channel(depth);
            s.spawn(move || feed_words(data, test_count, tx));
            class_readers.push(rx);
        }

        let (test_tx, test_rx) = stream::channel(depth);
        s.spawn(move || feed_words(test, 1, test_tx));

        let (label_tx, mut label_rx) = stream::channel(depth);
        s.spawn(move || {
            classify_core(class_readers, test_rx, test_count, train_per_class, label_tx)
        });

        let mut labels = Vec::with_capacity(test_count);
        for _ in 0..test_count {
            labels.push(label_rx.pull() as u8);
        }
        labels
    });
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naive;

    /// One image per call: every byte `base + i % step` so classes are
    /// well separated but not constant.
    fn image(base: u8, step: usize) -> Vec<u8> {
        (0..IMAGE_BYTES)
            .map(|i| base.wrapping_add((i % step) as u8))
            .collect()
    }

    fn training_set(train_per_class: usize) -> Vec<Vec<u8>> {
        (0..NUM_CLASSES)
            .map(|c| {
                let mut buf = Vec::with_capacity(train_per_class * IMAGE_BYTES);
                for tr in 0..train_per_class {
                    buf.extend_from_slice(&image((c * 20) as u8 + tr as u8, 5));
                }
                buf
            })
            .collect()
    }

    #[test]
    fn word_dist_sums_byte_lanes() {
        assert_eq!(word_dist(0x0001_0203, 0), 9 + 4 + 1);
        assert_eq!(word_dist(0xFF00_00FF, 0x00FF_FF00), 4 * 255 * 255);
        assert_eq!(word_dist(0xDEAD_BEEF, 0xDEAD_BEEF), 0);
    }

    #[test]
    fn agrees_with_reference_and_recovers_labels() {
        let train = training_set(2);
        let mut test = Vec::new();
        for &c in &[3usize, 0, 9, 7] {
            test.extend_from_slice(&image((c * 20) as u8 + 1, 5));
        }
        let streamed = run_knn(&train, &test, 4, 2, 2).unwrap();
        let reference = naive::knn_classify(&train, &test, IMAGE_BYTES, 2, 4);
        assert_eq!(streamed, reference);
        assert_eq!(streamed, vec![3, 0, 9, 7]);
    }

    #[test]
    fn agrees_with_reference_on_distance_ties() {
        // Classes 4 and 7 hold identical images; any probe is equidistant
        // from both and the streamed scan must break the tie exactly like
        // the reference.
        let mut train = training_set(2);
        train[7] = train[4].clone();
        let test = image(81, 5);
        let streamed = run_knn(&train, &test, 1, 2, 2).unwrap();
        let reference = naive::knn_classify(&train, &test, IMAGE_BYTES, 2, 1);
        assert_eq!(streamed, reference);
        assert_eq!(streamed, vec![4]);
    }

    #[test]
    fn rejects_malformed_datasets() {
        let train = training_set(1);
        let test = image(0, 5);

        let err = run_knn(&train[..3], &test, 1, 1, 2).unwrap_err();
        assert_eq!(
            err,
            Error::BufferLen {
                name: "train",
                expected: NUM_CLASSES,
                actual: 3,
            }
        );

        let err = run_knn(&train, &test, 1, 2, 2).unwrap_err();
        assert!(matches!(err, Error::BufferLen { name: "train_class", .. }));

        let err = run_knn(&train, &test[..100], 1, 1, 2).unwrap_err();
        assert!(matches!(err, Error::BufferLen { name: "test", .. }));
    }
}
