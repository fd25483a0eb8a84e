//! Output verification against references.
//!
//! Floating-point outputs are accepted under a dual tolerance: a cell only
//! counts as a mismatch when it fails both the absolute and the relative
//! bound. Classifier labels are compared exactly.

use log::warn;

use cnn_stream::Geometry;

/// True when `a` disagrees with the reference value `b`: relative error
/// above `1e-3` and absolute error above `0.05`. Either bound alone
/// accepts. When `a + b == 0` the relative term is NaN and the comparison
/// fails, so exact opposites are accepted only if they are close in
/// absolute terms.
pub fn is_mismatch(a: f32, b: f32) -> bool {
    ((a - b) / (a + b)).abs() > 1e-3 && (a - b).abs() > 0.05
}

/// One offending cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub index: usize,
    pub got: f32,
    pub want: f32,
}

/// Comparison outcome: mismatch tally plus the first offender.
#[derive(Debug, Clone, Copy, Default)]
pub struct Report {
    pub mismatches: usize,
    pub first: Option<Mismatch>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }

    fn record(&mut self, index: usize, got: f32, want: f32) {
        if is_mismatch(got, want) {
            if self.first.is_none() {
                self.first = Some(Mismatch { index, got, want });
            }
            self.mismatches += 1;
        }
    }
}

/// Compares a pooled output tensor against a reference, sweeping cells in
/// `(i, h, w)` order. The first offender is logged with its coordinates.
pub fn compare_output(got: &[f32], want: &[f32], geom: &Geometry) -> Report {
    let mut report = Report::default();
    for i in 0..geom.num_channels() {
        for h in 0..geom.out_image_size() {
            for w in 0..geom.out_image_size() {
                let idx = geom.output_idx(i, h, w);
                report.record(idx, got[idx], want[idx]);
            }
        }
    }
    if let Some(m) = report.first {
        let out = geom.out_image_size();
        warn!(
            "first mismatch: got {}, expecting {} at i = {}, h = {}, w = {}",
            m.got,
            m.want,
            m.index / (out * out),
            (m.index / out) % out,
            m.index % out
        );
    }
    report
}

/// Flat comparison for vector outputs.
pub fn compare_vectors(got: &[f32], want: &[f32]) -> Report {
    let mut report = Report::default();
    for (idx, (g, w)) in got.iter().zip(want.iter()).enumerate() {
        report.record(idx, *g, *w);
    }
    if let Some(m) = report.first {
        warn!(
            "first mismatch: got {}, expecting {} at index {}",
            m.got, m.want, m.index
        );
    }
    report
}

/// Exact-match label accuracy.
#[derive(Debug, Clone, Copy)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f32 / self.total as f32 * 100.0
    }
}

pub fn label_accuracy(predicted: &[u8], truth: &[u8]) -> Accuracy {
    let total = predicted.len().min(truth.len());
    let correct = (0..total).filter(|&i| predicted[i] == truth[i]).count();
    Accuracy { correct, total }
}
