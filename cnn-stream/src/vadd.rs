//! Streamed vector addition over the channel fabric.
//!
//! The smallest pipeline in the crate: two feeders stream the operand
//! vectors, an adder consumes both in lockstep and emits sums, and the
//! caller drains the sum stream into the output slice.

use std::thread;

use crate::error::Error;
use crate::stream::{self, StreamReader, StreamWriter, DEFAULT_DEPTH};

/// Streams a slice element-by-element in index order.
pub fn feed_slice(values: &[f32], mut out: StreamWriter<f32>) {
    for &v in values {
        out.push(v);
    }
}

/// Consumes two equal-length streams in lockstep and emits elementwise
/// sums. `len` is the element count of either operand.
pub fn add_streams(
    len: usize,
    mut a: StreamReader<f32>,
    mut b: StreamReader<f32>,
    mut out: StreamWriter<f32>,
) {
    for _ in 0..len {
        let sum = a.pull() + b.pull();
        out.push(sum);
    }
}

/// Runs the streamed vector addition `out[i] = a[i] + b[i]` with the
/// default channel depth.
pub fn run_vadd(a: &[f32], b: &[f32], out: &mut [f32]) -> Result<(), Error> {
    run_vadd_with_depth(a, b, out, DEFAULT_DEPTH)
}

/// [`run_vadd`] with an explicit channel depth.
pub fn run_vadd_with_depth(
    a: &[f32],
    b: &[f32],
    out: &mut [f32],
    depth: usize,
) -> Result<(), Error> {
    if a.len() != b.len() {
        return Err(Error::OperandLen {
            left: a.len(),
            right: b.len(),
        });
    }
    if out.len() != a.len() {
        return Err(Error::BufferLen {
            name: "output",
            expected: a.len(),
            actual: out.len(),
        });
    }

    let len = out.len();
    thread::scope(|s| {
        let (a_tx, a_rx) = stream::channel(depth);
        let (b_tx, b_rx) = stream::channel(depth);
        let (sum_tx, mut sum_rx) = stream::channel(depth);
        s.spawn(move || feed_slice(a, a_tx));
        s.spawn(move || feed_slice(b, b_tx));
        s.spawn(move || add_streams(len, a_rx, b_rx, sum_tx));
        for slot in out.iter_mut() {
            *slot = sum_rx.pull();
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naive;

    #[test]
    fn matches_reference_across_chunk_boundaries() {
        let n = 3000;
        let a: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let b: Vec<f32> = (0..n).map(|i| 2.0 * i as f32).collect();
        let mut streamed = vec![0.0; n];
        let mut reference = vec![0.0; n];
        run_vadd(&a, &b, &mut streamed).unwrap();
        naive::vadd(&a, &b, &mut reference);
        assert_eq!(streamed, reference);
    }

    #[test]
    fn depth_one_is_correct() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![0.5, 0.5, 0.5];
        let mut out = vec![0.0; 3];
        run_vadd_with_depth(&a, &b, &mut out, 1).unwrap();
        assert_eq!(out, vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn empty_vectors_are_a_no_op() {
        let mut out = vec![];
        run_vadd(&[], &[], &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let mut out = vec![0.0; 2];
        let err = run_vadd(&[1.0, 2.0], &[1.0], &mut out).unwrap_err();
        assert_eq!(err, Error::OperandLen { left: 2, right: 1 });

        let mut short = vec![0.0; 1];
        let err = run_vadd(&[1.0, 2.0], &[1.0, 2.0], &mut short).unwrap_err();
        assert_eq!(
            err,
            Error::BufferLen {
                name: "output",
                expected: 2,
                actual: 1,
            }
        );
    }
}
