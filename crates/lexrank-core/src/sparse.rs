//! Compressed sparse row (CSR) matrix with the operators LexRank needs.
//!
//! # Overview
//!
//! [`CsrMatrix`] stores only non-zero entries as three parallel arrays:
//!
//! ```text
//! values      [v0, v1, v2, v3, ...]
//! col_index   [c0, c1, c2, c3, ...]
//! row_offsets [0, r1, r2, ..., nnz]   (length nrows + 1)
//! ```
//!
//! Row `i` owns `values[row_offsets[i]..row_offsets[i + 1]]`. Column ids
//! within a row are unordered and may repeat; repeats act additively.
//!
//! The matrix never records its column count. Operations that need the
//! column space take it from the caller or derive it with
//! [`CsrMatrix::column_bound`]. Column ids can be arbitrary `usize` values;
//! [`CsrMatrix::compact_columns`] renumbers them to `0..distinct` so the
//! column space is bounded by `nnz` rather than by the largest id.
//!
//! # Operators
//!
//! - [`CsrMatrix::normalize`]: scale every row to unit L2 norm.
//! - [`CsrMatrix::product`]: `S · v`.
//! - [`CsrMatrix::transpose_product`]: `Sᵗ · v` without building `Sᵗ`.
//! - [`CsrMatrix::inverse_diagonal`]: `diag(1 / (S · Sᵗ · 𝟙))` as a CSR
//!   matrix, skipping zero degrees.
//!
//! Every operator runs in `O(nnz + nrows)`; the dense `S · Sᵗ` is never formed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::MatrixError;

/// What [`CsrMatrix::normalize_with`] does with a non-empty row whose L2
/// norm is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroNormPolicy {
    /// Divide by the zero norm anyway; every entry of the row becomes NaN.
    /// Matches historical output.
    #[default]
    Propagate,
    /// Leave the row's (all-zero) values untouched.
    Zero,
}

/// Sparse matrix in compressed sparse row layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsrMatrix {
    values: Vec<f64>,
    row_offsets: Vec<usize>,
    col_index: Vec<usize>,
}

impl CsrMatrix {
    /// A matrix with zero rows.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            values: Vec::new(),
            row_offsets: vec![0],
            col_index: Vec::new(),
        }
    }

    /// Assemble a matrix from raw CSR arrays, checking the layout invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`MatrixError`] when the offsets are empty, do not start at
    /// zero, decrease, or do not end at `values.len()`, or when `values` and
    /// `col_index` differ in length.
    pub fn from_parts(
        values: Vec<f64>,
        row_offsets: Vec<usize>,
        col_index: Vec<usize>,
    ) -> Result<Self, MatrixError> {
        if values.len() != col_index.len() {
            return Err(MatrixError::ColumnCountMismatch {
                values: values.len(),
                columns: col_index.len(),
            });
        }
        let (&first, &last) = match (row_offsets.first(), row_offsets.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(MatrixError::EmptyOffsets),
        };
        if first != 0 {
            return Err(MatrixError::NonZeroStart(first));
        }
        for (row, pair) in row_offsets.windows(2).enumerate() {
            if pair[0] > pair[1] {
                return Err(MatrixError::DecreasingOffsets {
                    row,
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        if last != values.len() {
            return Err(MatrixError::OffsetSentinel {
                last,
                values: values.len(),
            });
        }

        Ok(Self {
            values,
            row_offsets,
            col_index,
        })
    }

    /// Wrap arrays the caller has already laid out correctly.
    pub(crate) const fn from_raw(
        values: Vec<f64>,
        row_offsets: Vec<usize>,
        col_index: Vec<usize>,
    ) -> Self {
        Self {
            values,
            row_offsets,
            col_index,
        }
    }

    /// Build a matrix from dense rows, storing only non-zero cells.
    ///
    /// Rows may have different lengths; missing trailing cells are zero.
    #[must_use]
    pub fn from_dense<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        let mut values = Vec::new();
        let mut col_index = Vec::new();
        let mut row_offsets = Vec::with_capacity(rows.len() + 1);
        row_offsets.push(0);

        for row in rows {
            for (col, &value) in row.as_ref().iter().enumerate() {
                if value != 0.0 {
                    values.push(value);
                    col_index.push(col);
                }
            }
            row_offsets.push(values.len());
        }

        Self {
            values,
            row_offsets,
            col_index,
        }
    }

    /// Square diagonal matrix; zero (within `f64::EPSILON`) entries become
    /// empty rows. NaN entries are stored.
    #[must_use]
    pub fn diagonal(diag: &[f64]) -> Self {
        let mut values = Vec::with_capacity(diag.len());
        let mut col_index = Vec::with_capacity(diag.len());
        let mut row_offsets = Vec::with_capacity(diag.len() + 1);
        row_offsets.push(0);

        for (i, &d) in diag.iter().enumerate() {
            if d.abs() < f64::EPSILON {
                trace!(row = i, "zero diagonal entry omitted");
            } else {
                values.push(d);
                col_index.push(i);
            }
            row_offsets.push(values.len());
        }

        Self {
            values,
            row_offsets,
            col_index,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_offsets.len().saturating_sub(1)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Smallest column space that covers every stored column id
    /// (`max(col_index) + 1`, or 0 when nothing is stored). Saturates at
    /// `usize::MAX`.
    #[must_use]
    pub fn column_bound(&self) -> usize {
        self.col_index
            .iter()
            .max()
            .map_or(0, |&c| c.saturating_add(1))
    }

    /// Renumber column ids to `0..k` in first-seen storage order, where `k`
    /// is the number of distinct ids.
    ///
    /// Returns the original id of each new column, so `result[c]` is what
    /// column `c` was called before. Row products are unchanged because
    /// equal ids still share a column.
    pub fn compact_columns(&mut self) -> Vec<usize> {
        let mut renumber: HashMap<usize, usize> = HashMap::new();
        let mut originals = Vec::new();

        for col in &mut self.col_index {
            let original = *col;
            *col = *renumber.entry(original).or_insert_with(|| {
                originals.push(original);
                originals.len() - 1
            });
        }
        originals
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    #[must_use]
    pub fn col_index(&self) -> &[usize] {
        &self.col_index
    }

    /// `(column, value)` pairs stored for row `i`, in storage order.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.row_count()`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_offsets[i]..self.row_offsets[i + 1];
        self.col_index[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// L2 norm of each row.
    #[must_use]
    pub fn row_norms(&self) -> Vec<f64> {
        self.row_offsets
            .windows(2)
            .map(|w| {
                self.values[w[0]..w[1]]
                    .iter()
                    .map(|v| v * v)
                    .sum::<f64>()
                    .sqrt()
            })
            .collect()
    }

    /// Scale every row to unit L2 norm, dividing through even when the norm
    /// is zero (see [`ZeroNormPolicy::Propagate`]).
    pub fn normalize(&mut self) {
        self.normalize_with(ZeroNormPolicy::Propagate);
    }

    /// Scale every row to unit L2 norm.
    ///
    /// Empty rows are left alone under either policy. A non-empty row whose
    /// values are all zero is handled according to `policy`.
    pub fn normalize_with(&mut self, policy: ZeroNormPolicy) {
        let norms = self.row_norms();

        for (row, norm) in norms.into_iter().enumerate() {
            let (start, end) = (self.row_offsets[row], self.row_offsets[row + 1]);
            if norm == 0.0 && start < end {
                trace!(row, ?policy, "zero-norm row during normalization");
                if policy == ZeroNormPolicy::Zero {
                    continue;
                }
            }
            for value in &mut self.values[start..end] {
                *value /= norm;
            }
        }
    }

    /// Sparse matrix–vector product `S · v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` is shorter than [`column_bound`](Self::column_bound).
    #[must_use]
    pub fn product(&self, v: &[f64]) -> Vec<f64> {
        self.row_offsets
            .windows(2)
            .map(|w| {
                (w[0]..w[1])
                    .map(|e| self.values[e] * v[self.col_index[e]])
                    .sum::<f64>()
            })
            .collect()
    }

    /// Product of the transpose, `Sᵗ · v`, scattered into a vector of
    /// length `ncols`.
    ///
    /// # Panics
    ///
    /// Panics if `v.len() != self.row_count()` or if a stored column id is
    /// `>= ncols`.
    #[must_use]
    pub fn transpose_product(&self, v: &[f64], ncols: usize) -> Vec<f64> {
        assert_eq!(
            v.len(),
            self.row_count(),
            "transpose_product: vector length must equal row count"
        );

        let mut result = vec![0.0; ncols];
        for (row, w) in self.row_offsets.windows(2).enumerate() {
            let vi = v[row];
            for e in w[0]..w[1] {
                result[self.col_index[e]] += self.values[e] * vi;
            }
        }
        result
    }

    /// Row sums of the implicit similarity matrix, `S · Sᵗ · 𝟙`.
    ///
    /// Sparse column ids (a bound above `nnz`) are compacted on a copy first.
    #[must_use]
    pub fn degrees(&self) -> Vec<f64> {
        let ones = vec![1.0; self.row_count()];
        let ncols = self.column_bound();
        if ncols <= self.nnz() {
            return self.product(&self.transpose_product(&ones, ncols));
        }

        let mut compact = self.clone();
        let ncols = compact.compact_columns().len();
        compact.product(&compact.transpose_product(&ones, ncols))
    }

    /// `D⁻¹` as a diagonal CSR matrix with one row per row of `self`.
    ///
    /// Items whose degree is zero (within `f64::EPSILON`) get an empty row
    /// instead of an infinite reciprocal.
    #[must_use]
    pub fn inverse_diagonal(&self) -> Self {
        let reciprocals: Vec<f64> = self
            .degrees()
            .into_iter()
            .map(|degree| if degree.abs() < f64::EPSILON { 0.0 } else { degree.recip() })
            .collect();
        Self::diagonal(&reciprocals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn sample() -> CsrMatrix {
        // [1 0 2]
        // [0 0 0]
        // [0 3 4]
        CsrMatrix::from_dense(&[[1.0, 0.0, 2.0], [0.0, 0.0, 0.0], [0.0, 3.0, 4.0]])
    }

    #[test]
    fn from_dense_layout() {
        let m = sample();
        assert_eq!(m.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.col_index(), &[0, 2, 1, 2]);
        assert_eq!(m.row_offsets(), &[0, 2, 2, 4]);
        assert_eq!(m.row_count(), 3);
        assert_eq!(m.nnz(), 4);
        assert_eq!(m.column_bound(), 3);
    }

    #[test]
    fn from_parts_rejects_bad_layouts() {
        assert_eq!(
            CsrMatrix::from_parts(vec![], vec![], vec![]),
            Err(MatrixError::EmptyOffsets)
        );
        assert_eq!(
            CsrMatrix::from_parts(vec![1.0], vec![1, 1], vec![0]),
            Err(MatrixError::NonZeroStart(1))
        );
        assert_eq!(
            CsrMatrix::from_parts(vec![1.0], vec![0, 1, 0], vec![0]),
            Err(MatrixError::DecreasingOffsets {
                row: 1,
                prev: 1,
                next: 0
            })
        );
        assert_eq!(
            CsrMatrix::from_parts(vec![1.0, 2.0], vec![0, 1], vec![0, 1]),
            Err(MatrixError::OffsetSentinel { last: 1, values: 2 })
        );
        assert_eq!(
            CsrMatrix::from_parts(vec![1.0], vec![0, 1], vec![]),
            Err(MatrixError::ColumnCountMismatch {
                values: 1,
                columns: 0
            })
        );
    }

    #[test]
    fn from_parts_allows_unsorted_and_repeated_columns() {
        let m = CsrMatrix::from_parts(vec![1.0, 2.0, 3.0], vec![0, 3], vec![4, 0, 4])
            .expect("valid layout");
        assert_eq!(m.product(&[10.0, 0.0, 0.0, 0.0, 1.0]), vec![24.0]);
    }

    #[test]
    fn empty_matrix_has_no_rows() {
        let m = CsrMatrix::empty();
        assert_eq!(m.row_count(), 0);
        assert_eq!(m.column_bound(), 0);
        assert!(m.product(&[]).is_empty());
        assert!(m.transpose_product(&[], 0).is_empty());
        assert_eq!(m.inverse_diagonal().row_count(), 0);
    }

    #[test]
    fn product_matches_hand_computation() {
        let m = sample();
        assert_eq!(m.product(&[1.0, 2.0, 3.0]), vec![7.0, 0.0, 18.0]);
    }

    #[test]
    fn transpose_product_matches_hand_computation() {
        let m = sample();
        assert_eq!(m.transpose_product(&[1.0, 5.0, 2.0], 3), vec![1.0, 6.0, 10.0]);
    }

    #[test]
    fn transpose_product_uses_caller_column_space() {
        // More feature columns than rows.
        let m = CsrMatrix::from_dense(&[vec![0.0, 0.0, 0.0, 0.0, 2.0]]);
        assert_eq!(m.transpose_product(&[3.0], 7), vec![0.0, 0.0, 0.0, 0.0, 6.0, 0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "vector length must equal row count")]
    fn transpose_product_rejects_wrong_length() {
        let _ = sample().transpose_product(&[1.0], 3);
    }

    #[test]
    fn normalize_gives_unit_rows() {
        let mut m = CsrMatrix::from_dense(&[[3.0, 4.0], [0.0, 2.0]]);
        m.normalize();
        assert!((m.values()[0] - 0.6).abs() < EPS);
        assert!((m.values()[1] - 0.8).abs() < EPS);
        assert!((m.values()[2] - 1.0).abs() < EPS);
        for norm in m.row_norms() {
            assert!((norm - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn normalize_leaves_empty_rows_empty() {
        let mut m = sample();
        m.normalize();
        assert_eq!(m.row(1).count(), 0);
        assert!(m.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn zero_norm_row_propagates_nan_by_default() {
        let mut m = CsrMatrix::from_parts(vec![0.0, 0.0, 1.0], vec![0, 2, 3], vec![0, 1, 0])
            .expect("valid layout");
        m.normalize();
        assert!(m.values()[0].is_nan());
        assert!(m.values()[1].is_nan());
        assert!((m.values()[2] - 1.0).abs() < EPS);
    }

    #[test]
    fn zero_norm_row_kept_zero_under_zero_policy() {
        let mut m = CsrMatrix::from_parts(vec![0.0, 0.0, 2.0], vec![0, 2, 3], vec![0, 1, 0])
            .expect("valid layout");
        m.normalize_with(ZeroNormPolicy::Zero);
        assert_eq!(&m.values()[..2], &[0.0, 0.0]);
        assert!((m.values()[2] - 1.0).abs() < EPS);
    }

    #[test]
    fn inverse_diagonal_inverts_degrees() {
        // S·Sᵗ = [[2, 1], [1, 1]] → degrees [3, 2]
        let m = CsrMatrix::from_dense(&[[1.0, 1.0], [1.0, 0.0]]);
        assert_eq!(m.degrees(), vec![3.0, 2.0]);

        let d = m.inverse_diagonal();
        assert_eq!(d.row_count(), 2);
        assert_eq!(d.col_index(), &[0, 1]);
        assert!((d.values()[0] - 1.0 / 3.0).abs() < EPS);
        assert!((d.values()[1] - 0.5).abs() < EPS);
    }

    #[test]
    fn inverse_diagonal_omits_isolated_items() {
        let m = sample();
        let d = m.inverse_diagonal();
        assert_eq!(d.row_count(), 3);
        assert_eq!(d.row(1).count(), 0);
        assert_eq!(d.row_offsets(), &[0, 1, 1, 2]);
        // An omitted row acts as zero in products.
        assert_eq!(d.product(&[1.0, 1.0, 1.0])[1], 0.0);
    }

    #[test]
    fn diagonal_skips_zero_entries() {
        let d = CsrMatrix::diagonal(&[2.0, 0.0, 4.0]);
        assert_eq!(d.row_offsets(), &[0, 1, 1, 2]);
        assert_eq!(d.product(&[1.0, 1.0, 1.0]), vec![2.0, 0.0, 4.0]);
    }

    #[test]
    fn inverse_diagonal_keeps_nan_degrees() {
        // A zero-norm row normalized under Propagate poisons its degree.
        let mut m = CsrMatrix::from_parts(vec![0.0, 1.0], vec![0, 1, 2], vec![0, 0])
            .expect("valid layout");
        m.normalize();
        let d = m.inverse_diagonal();
        assert_eq!(d.nnz(), 2);
        assert!(d.values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn column_bound_saturates_at_max_id() {
        let m = CsrMatrix::from_parts(vec![1.0], vec![0, 1], vec![usize::MAX])
            .expect("valid layout");
        assert_eq!(m.column_bound(), usize::MAX);
    }

    #[test]
    fn compact_columns_renumbers_in_first_seen_order() {
        let mut m = CsrMatrix::from_parts(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![0, 2, 4],
            vec![900, usize::MAX, 900, 5],
        )
        .expect("valid layout");
        let originals = m.compact_columns();
        assert_eq!(originals, vec![900, usize::MAX, 5]);
        assert_eq!(m.col_index(), &[0, 1, 0, 2]);
        assert_eq!(m.column_bound(), 3);
    }

    #[test]
    fn degrees_handle_huge_column_ids() {
        let m = CsrMatrix::from_parts(
            vec![1.0, 1.0, 1.0],
            vec![0, 1, 2, 3],
            vec![100_000_000_000, 100_000_000_000, usize::MAX],
        )
        .expect("valid layout");
        // Rows 0 and 1 share a feature; row 2 only matches itself.
        assert_eq!(m.degrees(), vec![2.0, 2.0, 1.0]);
        let d = m.inverse_diagonal();
        assert_eq!(d.values(), &[0.5, 0.5, 1.0]);
    }
}
