//! Score file rendering.
//!
//! Scores are written in identifier-list order, never re-sorted:
//!
//! - [`OutputFormat::Text`]: `<id>:<score>` per line.
//! - [`OutputFormat::Json`]: a JSON array of `{ "id": .., "score": .. }`;
//!   non-finite scores become `null`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use lexrank_core::{ItemId, OutputFormat, ZeroNormPolicy};
use serde::Serialize;

/// `--format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// One `<id>:<score>` line per item.
    Text,
    /// JSON array of `{ "id", "score" }` objects.
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// `--zero-rows` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ZeroRowsArg {
    /// Divide by the zero norm (scores touching the row become NaN).
    Propagate,
    /// Keep the row all-zero; the item behaves as isolated.
    Zero,
}

impl From<ZeroRowsArg> for ZeroNormPolicy {
    fn from(arg: ZeroRowsArg) -> Self {
        match arg {
            ZeroRowsArg::Propagate => Self::Propagate,
            ZeroRowsArg::Zero => Self::Zero,
        }
    }
}

#[derive(Debug, Serialize)]
struct ScoreRow {
    id: ItemId,
    score: Option<f64>,
}

/// Render `scores` (aligned with `ids`) to `w`.
pub fn render_scores(
    w: &mut dyn Write,
    ids: &[ItemId],
    scores: &[f64],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for (id, score) in ids.iter().zip(scores) {
                writeln!(w, "{id}:{score}")?;
            }
        }
        OutputFormat::Json => {
            let rows: Vec<ScoreRow> = ids
                .iter()
                .zip(scores)
                .map(|(&id, &score)| ScoreRow {
                    id,
                    score: score.is_finite().then_some(score),
                })
                .collect();
            serde_json::to_writer_pretty(&mut *w, &rows)?;
            writeln!(w)?;
        }
    }
    Ok(())
}

/// Create (or truncate) `path` and write the scores to it.
pub fn write_score_file(
    path: &Path,
    ids: &[ItemId],
    scores: &[f64],
    format: OutputFormat,
) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    render_scores(&mut w, ids, scores, format)?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(ids: &[ItemId], scores: &[f64], format: OutputFormat) -> String {
        let mut buf = Vec::new();
        render_scores(&mut buf, ids, scores, format).expect("render to memory");
        String::from_utf8(buf).expect("utf-8 output")
    }

    #[test]
    fn text_lines_follow_id_order() {
        let out = render(&[30, 10, 20], &[0.5, 0.25, 0.125], OutputFormat::Text);
        assert_eq!(out, "30:0.5\n10:0.25\n20:0.125\n");
    }

    #[test]
    fn text_handles_negative_ids() {
        let out = render(&[-4], &[1.0], OutputFormat::Text);
        assert_eq!(out, "-4:1\n");
    }

    #[test]
    fn json_is_an_array_of_objects() {
        let out = render(&[1, 2], &[0.75, 0.25], OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(value[0]["id"], 1);
        assert_eq!(value[0]["score"], 0.75);
        assert_eq!(value[1]["id"], 2);
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn json_maps_non_finite_scores_to_null() {
        let out = render(&[1], &[f64::NAN], OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert!(value[0]["score"].is_null());
    }

    #[test]
    fn empty_input_renders_nothing_or_empty_array() {
        assert_eq!(render(&[], &[], OutputFormat::Text), "");
        assert_eq!(render(&[], &[], OutputFormat::Json).trim(), "[]");
    }

    #[test]
    fn arg_enums_convert() {
        assert_eq!(OutputFormat::from(FormatArg::Json), OutputFormat::Json);
        assert_eq!(ZeroNormPolicy::from(ZeroRowsArg::Zero), ZeroNormPolicy::Zero);
    }
}
