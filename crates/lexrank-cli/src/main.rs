#![forbid(unsafe_code)]

mod output;

use std::env;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use lexrank_core::{ErrorCode, FeatureMatrixBuilder, LexRankConfig, load_run_config, lexrank};
use output::{FormatArg, ZeroRowsArg};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lexrank: graph-free continuous LexRank over sparse feature vectors",
    long_about = None,
    allow_negative_numbers = true,
    after_help = "INPUT FORMAT:\n    One item per line: `<id>` or `<id>,<feature>:<weight>,...`\n\nEXAMPLES:\n    # 100 iterations with damping 0.15, scores to ./output.txt\n    lexrank docs.csv 100 0.15\n\n    # JSON scores to a chosen file\n    lexrank docs.csv 50 0.2 --format json -o scores.json"
)]
struct Cli {
    /// Record file, one item per line.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Number of power-iteration steps (exact; no early exit).
    #[arg(value_name = "ITERATIONS")]
    iterations: usize,

    /// Damping (teleportation) factor in [0, 1].
    #[arg(value_name = "DAMPING", value_parser = parse_damping)]
    damping: f64,

    /// Score file path [default: output.txt, or `output.path` from --config].
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Score file format [default: text, or `output.format` from --config].
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// TOML run configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Treatment of non-empty feature rows whose weights are all zero.
    #[arg(long, value_enum)]
    zero_rows: Option<ZeroRowsArg>,

    /// Log every iteration's change norm.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_damping(raw: &str) -> Result<f64, String> {
    let damping: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("`{raw}` is not a number: {err}"))?;
    if (0.0..=1.0).contains(&damping) {
        Ok(damping)
    } else {
        Err(format!("{damping} is outside [0, 1]"))
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LEXRANK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "lexrank=debug,info"
        } else {
            "lexrank=info,warn"
        })
    });

    let format = env::var("LEXRANK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

/// Error context line: `E####: message`, plus the remediation hint if any.
fn coded(code: ErrorCode) -> String {
    match code.hint() {
        Some(hint) => format!("{code}: {} (hint: {hint})", code.message()),
        None => format!("{code}: {}", code.message()),
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let run_config = load_run_config(cli.config.as_deref())
        .with_context(|| coded(ErrorCode::ConfigParseError))?;

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| run_config.output.path.clone());
    let format = cli.format.map_or(run_config.output.format, Into::into);
    let zero_rows = cli
        .zero_rows
        .map_or(run_config.normalize.zero_rows, Into::into);

    let features = FeatureMatrixBuilder::from_path(&cli.input).map_err(|err| {
        let context = coded(err.code());
        anyhow::Error::new(err).context(context)
    })?;

    if !features.diagnostics().is_empty() {
        warn!(
            skipped = features.diagnostics().len(),
            "some records or entries were malformed and skipped"
        );
    }
    info!(
        items = features.len(),
        nnz = features.matrix().nnz(),
        input = %cli.input.display(),
        "records loaded"
    );

    let config = LexRankConfig {
        damping: cli.damping,
        iterations: cli.iterations,
        zero_rows,
    };
    let (matrix, ids) = features.into_parts();
    let result = lexrank(matrix, &config).map_err(|err| {
        let context = coded(err.code());
        anyhow::Error::new(err).context(context)
    })?;

    output::write_score_file(&output_path, &ids, &result.scores, format).with_context(|| {
        format!(
            "{} ({})",
            coded(ErrorCode::OutputWriteFailed),
            output_path.display()
        )
    })?;

    info!(
        items = ids.len(),
        iterations = result.iterations,
        final_delta = result.final_delta(),
        output = %output_path.display(),
        "scores written"
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(&cli)
}
