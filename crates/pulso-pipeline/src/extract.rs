//! Comment extraction: dataset rows → immutable [`Comment`] list.

use std::collections::HashSet;

use serde_json::Value;

use pulso_core::{Comment, Dataset, PipelineError};
use pulso_rules::fold;

use crate::columns::{cell_number, cell_score, ResolvedColumns};

/// Extraction output: the de-duplicated comments plus the counts the
/// aggregate reports.
#[derive(Debug, Clone)]
pub struct ExtractedBatch {
    pub comments: Vec<Comment>,
    /// Non-blank comment rows before de-duplication.
    pub raw_total: usize,
    pub duplicates: usize,
}

/// Build the comment list for one run.
///
/// Blank and non-text cells are skipped; duplicates (case-insensitive,
/// accent-folded trimmed text) keep their first occurrence. Scores and
/// ratings attach per row when their columns resolved.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyDataset`] when no usable comment remains.
pub fn extract_comments(
    dataset: &Dataset,
    columns: &ResolvedColumns,
) -> Result<ExtractedBatch, PipelineError> {
    let mut comments = Vec::new();
    let mut seen = HashSet::new();
    let mut raw_total = 0usize;
    let mut duplicates = 0usize;

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let Some(text) = row.get(columns.comment).and_then(cell_text) else {
            continue;
        };
        raw_total += 1;

        if !seen.insert(fold(&text)) {
            duplicates += 1;
            continue;
        }

        let recommendation_score = columns
            .score
            .and_then(|col| row.get(col))
            .and_then(cell_score);
        let rating = columns
            .rating
            .and_then(|col| row.get(col))
            .and_then(cell_number);

        comments.push(Comment {
            text,
            recommendation_score,
            rating,
            row: row_idx,
        });
    }

    if comments.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    tracing::debug!(
        total = comments.len(),
        raw_total,
        duplicates,
        "comments extracted"
    );
    Ok(ExtractedBatch {
        comments,
        raw_total,
        duplicates,
    })
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}
