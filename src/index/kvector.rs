//! K-vector range index over a sorted, roughly linearly distributed key.
//!
//! The sorted keys are bounded by a straight line `z(i) = m * i + q` that starts
//! just below the smallest key and ends just above the largest. For every line
//! position `i` the auxiliary array stores the index of the last key that is
//! `<= z(i)`. A query inverts the line to get two bucket numbers, reads the
//! coarse slice bounds from the auxiliary array, and scans only that slice to
//! trim the exact boundaries.
//!
//! For the catalog pair-angle table this gives near-constant query time instead
//! of a binary search over the full table.

use crate::star::StarAnglePair;

/// Padding used so the envelope strictly brackets the first and last key.
const ENVELOPE_EPS: f64 = 1e-10;

/// Records that carry a sortable key for the K-vector.
pub trait RangeKey {
    fn range_key(&self) -> f64;
}

impl RangeKey for f64 {
    fn range_key(&self) -> f64 {
        *self
    }
}

impl RangeKey for StarAnglePair {
    fn range_key(&self) -> f64 {
        self.angle
    }
}

#[derive(Debug, Clone)]
pub struct KVector<T> {
    data: Vec<T>,
    kvec: Vec<usize>,
    slope: f64,
    intercept: f64,
}

impl<T: RangeKey> KVector<T> {
    /// Build the index. Records are sorted by key; non-finite keys are dropped.
    pub fn new(mut data: Vec<T>) -> Self {
        data.retain(|d| d.range_key().is_finite());
        data.sort_by(|a, b| a.range_key().total_cmp(&b.range_key()));

        let n = data.len();
        if n < 2 {
            return Self {
                data,
                kvec: vec![0; n],
                slope: 0.0,
                intercept: 0.0,
            };
        }

        let min = data[0].range_key();
        let max = data[n - 1].range_key();
        let slope = (max - min + 2.0 * ENVELOPE_EPS) / (n - 1) as f64;
        let intercept = min - slope - ENVELOPE_EPS;

        let mut kvec = vec![0usize; n];
        kvec[n - 1] = n - 1;
        let mut data_idx = 0usize;
        for (i, k) in kvec.iter_mut().enumerate().take(n - 1).skip(1) {
            let z = slope * i as f64 + intercept;
            while data_idx < n && z >= data[data_idx].range_key() {
                data_idx += 1;
            }
            *k = data_idx.saturating_sub(1);
        }

        Self {
            data,
            kvec,
            slope,
            intercept,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All records, sorted by key.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Contiguous slice of every record with `lower <= key <= upper`.
    pub fn query(&self, lower: f64, upper: f64) -> &[T] {
        let n = self.data.len();
        if n == 0 || !(lower <= upper) {
            return &[];
        }
        if lower > self.data[n - 1].range_key() || upper < self.data[0].range_key() {
            return &[];
        }
        if n < 2 {
            return &self.data[..];
        }

        let bucket = |key: f64, round_up: bool| -> usize {
            let pos = (key - self.intercept) / self.slope;
            let pos = if round_up { pos.ceil() } else { pos.floor() };
            pos.clamp(0.0, (n - 1) as f64) as usize
        };

        let jl = if lower > self.data[0].range_key() {
            bucket(lower, false)
        } else {
            0
        };
        let ju = if upper < self.data[n - 1].range_key() {
            bucket(upper, true)
        } else {
            n - 1
        };
        let kstart = self.kvec[jl];
        let kend = self.kvec[ju].max(kstart);

        // Refine inside the coarse window; the outward walks only move when the
        // bucket arithmetic rounded onto a boundary key.
        let mut start = (kstart..=kend)
            .find(|&i| self.data[i].range_key() >= lower)
            .unwrap_or(kend + 1);
        while start > 0 && self.data[start - 1].range_key() >= lower {
            start -= 1;
        }
        while start < n && self.data[start].range_key() < lower {
            start += 1;
        }
        let mut end = start;
        while end < n && self.data[end].range_key() <= upper {
            end += 1;
        }
        &self.data[start.min(end)..end]
    }
}
