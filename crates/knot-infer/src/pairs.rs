//! Lazy enumeration of unordered index pairs.
//!
//! Every pairwise stage walks the upper triangle of an `n × n` matrix. The
//! iterator yields `(i, j)` with `i < j` in row-major order, so `(0, 1)`,
//! `(0, 2)`, ..., `(1, 2)`, ... and never materializes the pair list.

use knot_core::cancel::{CancellationToken, Cancelled};

/// Iterator over `(i, j)` with `0 <= i < j < n`.
#[derive(Debug, Clone)]
pub struct PairIndices {
    n: usize,
    i: usize,
    j: usize,
}

impl PairIndices {
    #[must_use]
    pub const fn new(n: usize) -> Self {
        Self { n, i: 0, j: 1 }
    }

    /// Number of unordered pairs over `n` items: `n·(n−1)/2`.
    #[must_use]
    pub const fn total(n: usize) -> usize {
        n.saturating_mul(n.saturating_sub(1)) / 2
    }

    fn remaining(&self) -> usize {
        if self.i >= self.n || self.j >= self.n {
            return 0;
        }
        // Rest of the current row, plus every full row below it.
        let rest_of_row = self.n - self.j;
        let rows_below = self.n - self.i - 1;
        rest_of_row + Self::total(rows_below)
    }
}

impl Iterator for PairIndices {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.j >= self.n {
            return None;
        }
        let pair = (self.i, self.j);
        self.j += 1;
        if self.j >= self.n {
            self.i += 1;
            self.j = self.i + 1;
        }
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PairIndices {}

/// Visit every pair, checking `cancel` at the start of each row.
///
/// # Errors
///
/// Returns [`Cancelled`] if the token is set before or during the walk. Pairs
/// already visited stay visited; the caller decides whether to discard them.
pub fn scan_pairs<F>(n: usize, cancel: &CancellationToken, mut visit: F) -> Result<(), Cancelled>
where
    F: FnMut(usize, usize),
{
    cancel.check()?;
    for (i, j) in PairIndices::new(n) {
        if j == i + 1 {
            cancel.check()?;
        }
        visit(i, j);
    }
    Ok(())
}
