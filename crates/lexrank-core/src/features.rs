//! Record parsing: text lines → feature matrix `S` plus item identifiers.
//!
//! # Record grammar
//!
//! One record per line:
//!
//! ```text
//! <id>
//! <id>,<feature_id>:<weight>,<feature_id>:<weight>,...
//! ```
//!
//! Each accepted record becomes one row of `S`, in input order, and its
//! `<id>` is appended to the identifier list at the same position.
//!
//! # Parsing policy
//!
//! - Surrounding whitespace is trimmed; blank lines are skipped.
//! - A malformed `<id>` skips the whole line: no row and no identifier.
//! - Entries with a negative weight are dropped without a diagnostic.
//! - A malformed entry stops parsing of that line; entries already accepted
//!   on the line are kept and the row is still emitted.
//!
//! # Columns
//!
//! Feature ids are renumbered to dense column indices in first-seen order,
//! so the column space equals the number of distinct features no matter how
//! large the ids are. [`FeatureMatrix::feature_ids`] maps columns back.
//!
//! Problems are collected as [`RecordError`] diagnostics and logged with
//! `warn!`. They never abort the build.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::error::{BuildError, RecordError};
use crate::sparse::CsrMatrix;

/// Identifier of one item (one row of the feature matrix).
pub type ItemId = i64;

/// Feature matrix together with the identifiers of its rows.
///
/// `ids[k]` names the item stored in row `k` of `matrix`, and
/// `feature_ids[c]` names the feature stored in column `c`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    matrix: CsrMatrix,
    ids: Vec<ItemId>,
    feature_ids: Vec<usize>,
    diagnostics: Vec<RecordError>,
}

impl FeatureMatrix {
    /// Pair a matrix with its row identifiers. The matrix's column ids are
    /// compacted; its stored ids become [`feature_ids`](Self::feature_ids).
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::LengthMismatch`] when `ids.len()` differs from
    /// `matrix.row_count()`.
    pub fn new(mut matrix: CsrMatrix, ids: Vec<ItemId>) -> Result<Self, BuildError> {
        if ids.len() != matrix.row_count() {
            return Err(BuildError::LengthMismatch {
                rows: matrix.row_count(),
                ids: ids.len(),
            });
        }
        let feature_ids = matrix.compact_columns();
        Ok(Self {
            matrix,
            ids,
            feature_ids,
            diagnostics: Vec::new(),
        })
    }

    #[must_use]
    pub const fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Original feature id of each column.
    #[must_use]
    pub fn feature_ids(&self) -> &[usize] {
        &self.feature_ids
    }

    /// Per-line problems encountered while parsing.
    #[must_use]
    pub fn diagnostics(&self) -> &[RecordError] {
        &self.diagnostics
    }

    /// Number of items (rows).
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Split into the matrix and the identifier list.
    #[must_use]
    pub fn into_parts(self) -> (CsrMatrix, Vec<ItemId>) {
        (self.matrix, self.ids)
    }
}

/// One parsed record, before it is committed to the matrix.
#[derive(Debug, Clone, PartialEq)]
struct Record {
    id: ItemId,
    entries: Vec<(usize, f64)>,
}

/// Incrementally accumulates records into CSR arrays.
#[derive(Debug, Clone)]
pub struct FeatureMatrixBuilder {
    values: Vec<f64>,
    row_offsets: Vec<usize>,
    col_index: Vec<usize>,
    ids: Vec<ItemId>,
    diagnostics: Vec<RecordError>,
    line_no: usize,
}

impl Default for FeatureMatrixBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureMatrixBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            row_offsets: vec![0],
            col_index: Vec::new(),
            ids: Vec::new(),
            diagnostics: Vec::new(),
            line_no: 0,
        }
    }

    /// Parse every line from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] if reading fails part-way. Malformed records
    /// are not errors; see [`FeatureMatrix::diagnostics`].
    pub fn from_reader<R: BufRead>(reader: R) -> Result<FeatureMatrix, BuildError> {
        let mut builder = Self::new();
        for line in reader.lines() {
            let line = line.map_err(|source| BuildError::Io {
                path: "<reader>".into(),
                source,
            })?;
            builder.push_line(&line);
        }
        Ok(builder.finish())
    }

    /// Open and parse a record file.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] if the file cannot be opened or read.
    #[instrument]
    pub fn from_path(path: &Path) -> Result<FeatureMatrix, BuildError> {
        let io_err = |source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;

        let mut builder = Self::new();
        for line in BufReader::new(file).lines() {
            builder.push_line(&line.map_err(io_err)?);
        }
        Ok(builder.finish())
    }

    /// Parse every line of an in-memory string.
    #[must_use]
    pub fn from_text(text: &str) -> FeatureMatrix {
        let mut builder = Self::new();
        for line in text.lines() {
            builder.push_line(line);
        }
        builder.finish()
    }

    /// Feed one input line. Returns `true` if a row was added.
    pub fn push_line(&mut self, line: &str) -> bool {
        self.line_no += 1;
        let line_no = self.line_no;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            debug!(line = line_no, "skipping blank line");
            return false;
        }

        match parse_record(line_no, trimmed) {
            Ok((record, entry_error)) => {
                if let Some(err) = entry_error {
                    warn!(code = %err.code(), "{err}");
                    self.diagnostics.push(err);
                }
                for (feature, weight) in record.entries {
                    self.col_index.push(feature);
                    self.values.push(weight);
                }
                self.row_offsets.push(self.values.len());
                self.ids.push(record.id);
                true
            }
            Err(err) => {
                warn!(code = %err.code(), "{err}");
                self.diagnostics.push(err);
                false
            }
        }
    }

    /// Number of rows accepted so far.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.ids.len()
    }

    /// Finalize into a [`FeatureMatrix`].
    #[must_use]
    pub fn finish(self) -> FeatureMatrix {
        debug_assert_eq!(self.row_offsets.len(), self.ids.len() + 1);
        let mut matrix = CsrMatrix::from_raw(self.values, self.row_offsets, self.col_index);
        let feature_ids = matrix.compact_columns();
        debug!(
            rows = self.ids.len(),
            nnz = matrix.nnz(),
            features = feature_ids.len(),
            skipped = self.diagnostics.len(),
            "feature matrix built"
        );

        FeatureMatrix {
            matrix,
            ids: self.ids,
            feature_ids,
            diagnostics: self.diagnostics,
        }
    }
}

/// Parse a trimmed, non-empty line.
///
/// On success returns the record plus the entry error (if any) that cut the
/// entry list short.
fn parse_record(line_no: usize, line: &str) -> Result<(Record, Option<RecordError>), RecordError> {
    let (id_part, rest) = match line.split_once(',') {
        Some((id, rest)) => (id, Some(rest)),
        None => (line, None),
    };

    let id = id_part
        .trim()
        .parse::<ItemId>()
        .map_err(|_| RecordError::MalformedId {
            line: line_no,
            raw: id_part.to_string(),
        })?;

    let mut record = Record {
        id,
        entries: Vec::new(),
    };

    let Some(rest) = rest else {
        return Ok((record, None));
    };

    for raw in rest.split(',') {
        match parse_entry(raw) {
            Some((feature, weight)) if weight < 0.0 => {
                debug!(line = line_no, feature, weight, "dropping negative weight");
            }
            Some(entry) => record.entries.push(entry),
            None => {
                let err = RecordError::MalformedEntry {
                    line: line_no,
                    raw: raw.to_string(),
                };
                return Ok((record, Some(err)));
            }
        }
    }

    Ok((record, None))
}

/// Parse `<feature_id>:<weight>`; the weight must be finite.
fn parse_entry(raw: &str) -> Option<(usize, f64)> {
    let (feature, weight) = raw.split_once(':')?;
    let feature = feature.trim().parse::<usize>().ok()?;
    let weight = weight.trim().parse::<f64>().ok()?;
    weight.is_finite().then_some((feature, weight))
}
