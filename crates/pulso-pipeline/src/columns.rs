//! Column resolution: which column holds the comments, and which (optional)
//! columns hold the 0–10 recommendation score and the numeric rating.

use serde_json::Value;

use pulso_core::{ColumnConfig, Dataset, PipelineError};
use pulso_rules::fold;

/// Minimum fraction of qualifying non-null cells for a column to count as a
/// score or rating column.
const NUMERIC_RATIO: f64 = 0.8;

/// Resolved column indices for one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub comment: usize,
    pub score: Option<usize>,
    pub rating: Option<usize>,
}

/// Locate the comment column and the optional score/rating columns.
///
/// The comment column is found by case-insensitive exact match against the
/// configured name list in priority order, then by substring match, then by
/// taking the first predominantly-text column. Score and rating columns are
/// located by name the same way but must also hold predominantly numeric
/// values; their absence is not an error.
///
/// # Errors
///
/// Returns [`PipelineError::NoCommentColumn`] if no column qualifies —
/// nothing downstream can proceed without text.
pub fn resolve_columns(
    dataset: &Dataset,
    config: &ColumnConfig,
) -> Result<ResolvedColumns, PipelineError> {
    let comment = find_named_column(dataset, &config.comment_names)
        .or_else(|| first_text_column(dataset, config.text_ratio))
        .ok_or_else(|| PipelineError::NoCommentColumn {
            columns: dataset.columns.clone(),
        })?;

    let score = find_named_column(dataset, &config.score_names)
        .filter(|&idx| idx != comment && is_score_column(dataset, idx));
    let rating = find_named_column(dataset, &config.rating_names)
        .filter(|&idx| idx != comment && Some(idx) != score && is_numeric_column(dataset, idx));

    tracing::debug!(comment, ?score, ?rating, "columns resolved");
    Ok(ResolvedColumns {
        comment,
        score,
        rating,
    })
}

/// Exact match wins over substring match; both respect the priority order of
/// the name list.
fn find_named_column(dataset: &Dataset, names: &[String]) -> Option<usize> {
    let folded: Vec<String> = dataset.columns.iter().map(|c| fold(c)).collect();
    for name in names {
        let name = fold(name);
        if let Some(idx) = folded.iter().position(|c| *c == name) {
            return Some(idx);
        }
    }
    for name in names {
        let name = fold(name);
        if let Some(idx) = folded.iter().position(|c| c.contains(&name)) {
            return Some(idx);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Null,
    Text,
    Number,
    Other,
}

fn cell_kind(value: &Value) -> CellKind {
    match value {
        Value::Null => CellKind::Null,
        Value::Number(_) => CellKind::Number,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                CellKind::Null
            } else if trimmed.parse::<f64>().is_ok() {
                CellKind::Number
            } else if trimmed.chars().any(char::is_alphabetic) {
                CellKind::Text
            } else {
                CellKind::Other
            }
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => CellKind::Other,
    }
}

/// First column whose non-null cells are predominantly text.
fn first_text_column(dataset: &Dataset, text_ratio: f64) -> Option<usize> {
    (0..dataset.columns.len()).find(|&idx| kind_ratio(dataset, idx, CellKind::Text) >= text_ratio)
}

fn is_score_column(dataset: &Dataset, idx: usize) -> bool {
    let qualifying = dataset
        .column_values(idx)
        .filter(|v| cell_kind(v) != CellKind::Null)
        .filter(|v| cell_score(v).is_some())
        .count();
    ratio_of(dataset, idx, qualifying) >= NUMERIC_RATIO
}

fn is_numeric_column(dataset: &Dataset, idx: usize) -> bool {
    kind_ratio(dataset, idx, CellKind::Number) >= NUMERIC_RATIO
}

fn kind_ratio(dataset: &Dataset, idx: usize, kind: CellKind) -> f64 {
    let matching = dataset
        .column_values(idx)
        .filter(|v| cell_kind(v) == kind)
        .count();
    ratio_of(dataset, idx, matching)
}

fn ratio_of(dataset: &Dataset, idx: usize, matching: usize) -> f64 {
    let non_null = dataset
        .column_values(idx)
        .filter(|v| cell_kind(v) != CellKind::Null)
        .count();
    if non_null == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = matching as f64 / non_null as f64;
    ratio
}

/// Read a cell as a 0–10 integer recommendation score.
#[must_use]
pub(crate) fn cell_score(value: &Value) -> Option<u8> {
    let number = cell_number(value)?;
    if number.fract() != 0.0 || !(0.0..=10.0).contains(&number) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(number as u8)
}

/// Read a cell as a plain number, accepting numeric strings.
#[must_use]
pub(crate) fn cell_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
