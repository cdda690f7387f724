use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InputUnreadable,
    MalformedId,
    MalformedEntry,
    RowIdMismatch,
    InvalidDamping,
    ConfigParseError,
    OutputWriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InputUnreadable => "E1001",
            Self::ConfigParseError => "E1002",
            Self::MalformedId => "E2001",
            Self::MalformedEntry => "E2002",
            Self::RowIdMismatch => "E3001",
            Self::InvalidDamping => "E4001",
            Self::OutputWriteFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InputUnreadable => "Input file could not be read",
            Self::ConfigParseError => "Config file parse error",
            Self::MalformedId => "Malformed item identifier",
            Self::MalformedEntry => "Malformed feature:weight pair",
            Self::RowIdMismatch => "Row count and identifier count differ",
            Self::InvalidDamping => "Damping factor out of range",
            Self::OutputWriteFailed => "Score file write failed",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InputUnreadable => Some("Check the input path and read permissions."),
            Self::ConfigParseError => Some("Fix the TOML syntax in the config file and retry."),
            Self::MalformedId => Some("Each line must start with an integer item id."),
            Self::MalformedEntry => {
                Some("Feature entries must look like `<feature_id>:<weight>`.")
            }
            Self::RowIdMismatch => None,
            Self::InvalidDamping => Some("Use a damping factor between 0 and 1."),
            Self::OutputWriteFailed => Some("Check disk space and write permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A CSR triple that does not describe a valid matrix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatrixError {
    /// `row_offsets` must hold at least the leading zero.
    #[error("row offsets are empty; expected at least [0]")]
    EmptyOffsets,

    /// `row_offsets[0]` must be zero.
    #[error("row offsets must start at 0, found {0}")]
    NonZeroStart(usize),

    /// Offsets went backwards between two rows.
    #[error("row offsets decrease at row {row}: {prev} > {next}")]
    DecreasingOffsets { row: usize, prev: usize, next: usize },

    /// Final offset must equal the number of stored values.
    #[error("last row offset {last} does not match value count {values}")]
    OffsetSentinel { last: usize, values: usize },

    /// `values` and `col_index` must be parallel.
    #[error("values ({values}) and column indices ({columns}) differ in length")]
    ColumnCountMismatch { values: usize, columns: usize },
}

/// A recoverable problem with one input record.
///
/// These never abort a build; they are collected as diagnostics and the
/// offending line or entry is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The leading identifier is not an integer. The whole line is skipped.
    #[error("line {line}: malformed item id {raw:?}")]
    MalformedId { line: usize, raw: String },

    /// A `feature:weight` pair could not be parsed. Remaining pairs on the
    /// line are ignored.
    #[error("line {line}: malformed feature entry {raw:?}")]
    MalformedEntry { line: usize, raw: String },
}

impl RecordError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedId { .. } => ErrorCode::MalformedId,
            Self::MalformedEntry { .. } => ErrorCode::MalformedEntry,
        }
    }

    /// 1-based line number the problem was found on.
    #[must_use]
    pub const fn line(&self) -> usize {
        match self {
            Self::MalformedId { line, .. } | Self::MalformedEntry { line, .. } => *line,
        }
    }
}

/// Fatal errors while assembling a feature matrix.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The record source could not be opened or read.
    #[error("failed to read records from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The matrix and identifier list disagree on the item count.
    #[error("matrix has {rows} rows but {ids} identifiers")]
    LengthMismatch { rows: usize, ids: usize },
}

impl BuildError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::InputUnreadable,
            Self::LengthMismatch { .. } => ErrorCode::RowIdMismatch,
        }
    }
}

/// Errors raised before the power iteration starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    /// Damping must be a finite value in `[0, 1]`.
    #[error("damping factor {0} is outside [0, 1]")]
    InvalidDamping(f64),
}

impl SolverError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidDamping
    }
}
