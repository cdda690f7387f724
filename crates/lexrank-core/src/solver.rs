//! Continuous LexRank by damped power iteration over a sparse feature matrix.
//!
//! # Overview
//!
//! LexRank scores an item by how much similarity mass flows into it from
//! other central items. With `S` the row-normalized feature matrix, the
//! cosine-similarity matrix is `S · Sᵗ` and its row sums form the degree
//! matrix `D`. The transition matrix `B = S · Sᵗ · D⁻¹` drives the usual
//! PageRank-style recurrence.
//!
//! # Algorithm
//!
//! ```text
//! p₀      = d/N · 𝟙
//! p_{k+1} = d/N · 𝟙 + (1 - d) · S · (Sᵗ · (D⁻¹ · p_k))
//! ```
//!
//! `B · p_k` is evaluated right to left as three sparse products, so no
//! `N × N` matrix ever exists. Exactly `iterations` steps are taken; the
//! per-step change `‖p_{k+1} - p_k‖₂` is recorded but never used to stop.
//!
//! # Output
//!
//! Returns a [`LexRankResult`] whose `scores` are positionally aligned with
//! the rows of the input matrix.

use tracing::{debug, instrument};

use crate::error::SolverError;
use crate::sparse::{CsrMatrix, ZeroNormPolicy};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a LexRank run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexRankConfig {
    /// Teleportation weight `d`; must be within `[0, 1]`.
    /// Default: 0.15.
    pub damping: f64,
    /// Number of power-iteration steps to take.
    /// Default: 100.
    pub iterations: usize,
    /// Handling of non-empty rows with zero L2 norm.
    /// Default: [`ZeroNormPolicy::Propagate`].
    pub zero_rows: ZeroNormPolicy,
}

impl Default for LexRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.15,
            iterations: 100,
            zero_rows: ZeroNormPolicy::default(),
        }
    }
}

impl LexRankConfig {
    #[must_use]
    pub fn new(iterations: usize, damping: f64) -> Self {
        Self {
            damping,
            iterations,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`SolverError::InvalidDamping`] if `damping` is not a finite
    /// value in `[0, 1]`.
    pub fn validate(&self) -> Result<(), SolverError> {
        if (0.0..=1.0).contains(&self.damping) {
            Ok(())
        } else {
            Err(SolverError::InvalidDamping(self.damping))
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Per-step diagnostics handed to an observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationStats {
    /// 1-based step number.
    pub iteration: usize,
    /// L2 norm of the change between this iterate and the previous one.
    pub delta: f64,
}

/// Result of a LexRank computation.
#[derive(Debug, Clone, PartialEq)]
pub struct LexRankResult {
    /// Score per row of the input matrix.
    pub scores: Vec<f64>,
    /// Number of iterations performed (always the configured count).
    pub iterations: usize,
    /// Change norm after each iteration, in order.
    pub deltas: Vec<f64>,
}

impl LexRankResult {
    /// Change norm of the last iteration, if any ran.
    #[must_use]
    pub fn final_delta(&self) -> Option<f64> {
        self.deltas.last().copied()
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Precomputed operators for one LexRank run.
///
/// Owns the normalized feature matrix `S` and `D⁻¹`.
#[derive(Debug, Clone)]
pub struct LexRankSolver {
    features: CsrMatrix,
    inv_degree: CsrMatrix,
    ncols: usize,
    damping: f64,
}

impl LexRankSolver {
    /// Normalize `features` in place, compact its column ids, and derive
    /// `D⁻¹` from it.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidDamping`] for an out-of-range damping
    /// factor.
    pub fn new(mut features: CsrMatrix, config: &LexRankConfig) -> Result<Self, SolverError> {
        config.validate()?;

        features.normalize_with(config.zero_rows);
        let ncols = features.compact_columns().len();
        let inv_degree = features.inverse_diagonal();

        debug!(
            items = features.row_count(),
            features = ncols,
            nnz = features.nnz(),
            isolated = features.row_count() - inv_degree.nnz(),
            "lexrank operators ready"
        );

        Ok(Self {
            features,
            inv_degree,
            ncols,
            damping: config.damping,
        })
    }

    /// Number of items being ranked.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.features.row_count()
    }

    /// The normalized feature matrix.
    #[must_use]
    pub const fn features(&self) -> &CsrMatrix {
        &self.features
    }

    /// The `D⁻¹` operator.
    #[must_use]
    pub const fn inverse_degree(&self) -> &CsrMatrix {
        &self.inv_degree
    }

    /// Teleportation term `d/N`, which is also every entry of `p₀`.
    #[must_use]
    pub fn teleport(&self) -> f64 {
        self.damping / self.item_count() as f64
    }

    /// The starting iterate `p₀`.
    #[must_use]
    pub fn initial_scores(&self) -> Vec<f64> {
        vec![self.teleport(); self.item_count()]
    }

    /// Apply the transition operator: `S · (Sᵗ · (D⁻¹ · p))`.
    #[must_use]
    pub fn transition(&self, p: &[f64]) -> Vec<f64> {
        let weighted = self.inv_degree.product(p);
        let feature_mass = self.features.transpose_product(&weighted, self.ncols);
        self.features.product(&feature_mass)
    }

    /// One damped step: `d/N + (1 - d) · B · p`.
    #[must_use]
    pub fn step(&self, p: &[f64]) -> Vec<f64> {
        let teleport = self.teleport();
        let follow = 1.0 - self.damping;
        self.transition(p)
            .into_iter()
            .map(|x| follow.mul_add(x, teleport))
            .collect()
    }

    /// Run exactly `iterations` steps from `p₀`, reporting each step's
    /// change norm to `observer`.
    pub fn run<F>(&self, iterations: usize, mut observer: F) -> LexRankResult
    where
        F: FnMut(IterationStats),
    {
        if self.item_count() == 0 {
            return LexRankResult {
                scores: Vec::new(),
                iterations: 0,
                deltas: Vec::new(),
            };
        }

        let mut scores = self.initial_scores();
        let mut deltas = Vec::with_capacity(iterations);

        for iteration in 1..=iterations {
            let next = self.step(&scores);
            let delta = l2_distance(&scores, &next);
            scores = next;

            debug!(iteration, delta, "lexrank step");
            observer(IterationStats { iteration, delta });
            deltas.push(delta);
        }

        LexRankResult {
            scores,
            iterations,
            deltas,
        }
    }
}

/// Compute continuous LexRank scores for the rows of `features`.
///
/// `features` is the raw (unnormalized) item × feature matrix; it is
/// consumed and normalized in place.
///
/// # Errors
///
/// Returns [`SolverError::InvalidDamping`] if the damping factor is not a
/// finite value in `[0, 1]`.
#[instrument(skip(features, config), fields(items = features.row_count()))]
pub fn lexrank(features: CsrMatrix, config: &LexRankConfig) -> Result<LexRankResult, SolverError> {
    lexrank_with_observer(features, config, |_| {})
}

/// Like [`lexrank`], calling `observer` after every iteration.
///
/// # Errors
///
/// Same as [`lexrank`].
pub fn lexrank_with_observer<F>(
    features: CsrMatrix,
    config: &LexRankConfig,
    observer: F,
) -> Result<LexRankResult, SolverError>
where
    F: FnMut(IterationStats),
{
    let solver = LexRankSolver::new(features, config)?;
    Ok(solver.run(config.iterations, observer))
}

fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
