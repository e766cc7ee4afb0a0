//! Small-gap-first triple iterator.
//!
//! Yields every index triple `(i, j, k)` with `i < j < k < n` exactly once,
//! ordered by the total span `k - i`, then by the first gap `j - i`, then by
//! the starting index. Early draws therefore slide a compact window across the
//! whole index range instead of exhausting all triples that share index 0.
//!
//! ```text
//! n = 5:  (0,1,2) (1,2,3) (2,3,4)  (0,1,3) (1,2,4)  (0,2,3) (1,3,4)  (0,1,4) (0,2,4) (0,3,4)
//! ```

use std::iter::FusedIterator;

/// Number of 3-combinations of `n` items.
pub fn n_choose_3(n: usize) -> usize {
    if n < 3 {
        0
    } else {
        n * (n - 1) * (n - 2) / 6
    }
}

/// Iterator over index triples in small-gap-first order.
#[derive(Debug, Clone)]
pub struct GapOrderTriples {
    n: usize,
    /// Total span `k - i`
    span: usize,
    /// First gap `j - i`
    first_gap: usize,
    start: usize,
    remaining: usize,
}

impl GapOrderTriples {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            span: 2,
            first_gap: 1,
            start: 0,
            remaining: n_choose_3(n),
        }
    }
}

impl Iterator for GapOrderTriples {
    type Item = (usize, usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.span >= self.n {
                return None;
            }
            if self.first_gap >= self.span {
                self.span += 1;
                self.first_gap = 1;
                self.start = 0;
                continue;
            }
            if self.start + self.span >= self.n {
                self.first_gap += 1;
                self.start = 0;
                continue;
            }

            let i = self.start;
            self.start += 1;
            self.remaining -= 1;
            return Some((i, i + self.first_gap, i + self.span));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for GapOrderTriples {}
impl FusedIterator for GapOrderTriples {}
