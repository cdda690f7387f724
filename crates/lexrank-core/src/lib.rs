#![forbid(unsafe_code)]
//! lexrank-core library.
//!
//! Graph-free continuous LexRank: item centrality computed from a sparse
//! item × feature matrix without ever forming the item × item similarity
//! matrix.
//!
//! ```text
//! record lines
//!        ↓  features::FeatureMatrixBuilder
//! FeatureMatrix { matrix: S, ids }
//!        ↓  solver::lexrank(S, &LexRankConfig)
//! LexRankResult { scores (aligned with ids), deltas }
//! ```
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per concern (see [`error`]); `anyhow` only
//!   for config loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod features;
pub mod solver;
pub mod sparse;

pub use config::{OutputFormat, RunConfig, load_run_config};
pub use error::{BuildError, ErrorCode, MatrixError, RecordError, SolverError};
pub use features::{FeatureMatrix, FeatureMatrixBuilder, ItemId};
pub use solver::{
    IterationStats, LexRankConfig, LexRankResult, LexRankSolver, lexrank, lexrank_with_observer,
};
pub use sparse::{CsrMatrix, ZeroNormPolicy};
