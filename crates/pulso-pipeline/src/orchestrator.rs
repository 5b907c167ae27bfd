//! Pipeline orchestration: the state machine that sequences extraction, the
//! AI attempt, normalization, and oversight.
//!
//! AI failure is a modeled state transition, not a caught exception: a failed
//! batch is re-submitted at the next smaller batch-size tier, and whatever
//! still has no result is analyzed by the rule engine. Fatal faults surface
//! as [`PipelineError`]; the caller always receives either a complete
//! aggregate or a small structured error, never a partial result.

use std::collections::VecDeque;

use pulso_ai::{AiClient, ReviewSummary};
use pulso_core::{
    AggregateResult, AnalysisMethod, Comment, Dataset, PipelineConfig, PipelineError, RawAnalysis,
};
use pulso_rules::{Lexicon, RuleEngine};

use crate::columns::resolve_columns;
use crate::extract::extract_comments;
use crate::normalize::{round1, Normalizer};
use crate::oversight::Overseer;

/// States of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Extracting,
    AiAttempt,
    AiSuccess,
    AiPartial,
    AiFailed,
    Normalizing,
    Overseeing,
    Done,
    Error,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Extracting => "extracting",
            PipelineState::AiAttempt => "ai_attempt",
            PipelineState::AiSuccess => "ai_success",
            PipelineState::AiPartial => "ai_partial",
            PipelineState::AiFailed => "ai_failed",
            PipelineState::Normalizing => "normalizing",
            PipelineState::Overseeing => "overseeing",
            PipelineState::Done => "done",
            PipelineState::Error => "error",
        };
        write!(f, "{name}")
    }
}

fn transition(state: &mut PipelineState, to: PipelineState) {
    tracing::debug!(from = %state, to = %to, "pipeline state transition");
    *state = to;
}

/// One pipeline instance. Safe to reuse across runs; each run owns its own
/// comment/result graph, so concurrent runs need no coordination.
pub struct Pipeline {
    config: PipelineConfig,
    engine: RuleEngine,
    ai: Option<AiClient>,
}

impl Pipeline {
    /// Build a pipeline from configuration.
    ///
    /// A broken lexicon override or an unconstructible AI client degrade to
    /// the built-in tables / rule-based-only operation with a warning — the
    /// pipeline itself must always be able to run.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let lexicon = match &config.lexicon_path {
            Some(path) => match Lexicon::from_yaml_file(path) {
                Ok(lexicon) => lexicon,
                Err(e) => {
                    tracing::warn!(error = %e, "lexicon override failed to load; using built-in tables");
                    Lexicon::default()
                }
            },
            None => Lexicon::default(),
        };

        let ai = match AiClient::from_config(&config.ai) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "AI client construction failed; running rule-based only");
                None
            }
        };

        Self {
            config,
            engine: RuleEngine::new(lexicon),
            ai,
        }
    }

    /// Run the full pipeline over one dataset.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only for fatal input/system faults (no
    /// comment column, empty dataset, malformed engine output). AI failures
    /// never error: they show up as the `analysis_method` tag instead.
    pub async fn run(&self, dataset: &Dataset) -> Result<AggregateResult, PipelineError> {
        let mut state = PipelineState::Extracting;
        tracing::info!(
            rows = dataset.rows.len(),
            columns = dataset.columns.len(),
            "pipeline run started"
        );

        let resolved = match resolve_columns(dataset, &self.config.columns) {
            Ok(resolved) => resolved,
            Err(e) => {
                transition(&mut state, PipelineState::Error);
                return Err(e);
            }
        };
        let batch = match extract_comments(dataset, &resolved) {
            Ok(batch) => batch,
            Err(e) => {
                transition(&mut state, PipelineState::Error);
                return Err(e);
            }
        };

        transition(&mut state, PipelineState::AiAttempt);
        let total = batch.comments.len();
        let mut ai_results: Vec<Option<RawAnalysis>> = vec![None; total];
        if let Some(client) = &self.ai {
            self.run_ai_attempt(client, &batch.comments, &mut ai_results)
                .await;
        } else {
            tracing::info!("no AI service configured; skipping AI attempt");
        }

        let covered = ai_results.iter().filter(|r| r.is_some()).count();
        let (outcome, method) = if covered == total {
            (PipelineState::AiSuccess, AnalysisMethod::AiPowered)
        } else if covered > 0 {
            (PipelineState::AiPartial, AnalysisMethod::HybridAiRule)
        } else {
            (PipelineState::AiFailed, AnalysisMethod::RuleBasedFallback)
        };
        transition(&mut state, outcome);
        #[allow(clippy::cast_precision_loss)]
        let ai_coverage = round1(covered as f64 * 100.0 / total as f64);
        tracing::info!(covered, total, ai_coverage, method = %method, "AI attempt settled");

        // Gap filling is keyed by comment index, so the aggregate does not
        // depend on batch submission order.
        let results: Vec<RawAnalysis> = batch
            .comments
            .iter()
            .zip(ai_results)
            .map(|(comment, ai_result)| {
                ai_result
                    .unwrap_or_else(|| self.engine.analyze(&comment.text, comment.numeric_signal()))
            })
            .collect();

        transition(&mut state, PipelineState::Normalizing);
        let normalizer = Normalizer::new(self.engine.lexicon(), &self.config.synthetic_nps);
        let result = match normalizer.normalize(
            &batch.comments,
            &results,
            method,
            ai_coverage,
            batch.raw_total,
            batch.duplicates,
        ) {
            Ok(result) => result,
            Err(e) => {
                transition(&mut state, PipelineState::Error);
                return Err(e);
            }
        };

        transition(&mut state, PipelineState::Overseeing);
        let opinion = match &self.ai {
            Some(client) => client.quality_opinion(&review_summary(&result)).await,
            None => None,
        };
        let overseer = Overseer::new(&self.config.oversight, self.engine.lexicon());
        let result = overseer.review(result, opinion);

        transition(&mut state, PipelineState::Done);
        tracing::info!(
            total = result.total,
            method = %result.analysis_method,
            confidence = result.oversight.confidence,
            "pipeline run complete"
        );
        Ok(result)
    }

    /// Submit comments to the AI client in sequential batches, descending
    /// through the configured batch-size tiers on failure. Positions that
    /// stay `None` fall back to the rule engine.
    async fn run_ai_attempt(
        &self,
        client: &AiClient,
        comments: &[Comment],
        out: &mut [Option<RawAnalysis>],
    ) {
        let sizes = &self.config.ai.batch_sizes;
        let Some(&first) = sizes.first() else {
            return;
        };

        let mut queue: VecDeque<(usize, usize, usize)> = VecDeque::new();
        push_chunks(&mut queue, 0, comments.len(), first, 0);

        while let Some((start, end, tier)) = queue.pop_front() {
            let texts: Vec<&str> = comments[start..end].iter().map(|c| c.text.as_str()).collect();
            match client.analyze_batch(&texts).await {
                Some(results) => {
                    for (offset, item) in results.into_iter().enumerate().take(end - start) {
                        out[start + offset] = item;
                    }
                }
                None => {
                    if let Some(&next) = sizes.get(tier + 1) {
                        tracing::warn!(
                            start,
                            end,
                            next_batch_size = next,
                            "batch failed; retrying at smaller batch size"
                        );
                        push_chunks(&mut queue, start, end, next, tier + 1);
                    } else {
                        tracing::warn!(
                            start,
                            end,
                            "batch failed at smallest batch size; leaving to rule engine"
                        );
                    }
                }
            }
        }
    }
}

fn push_chunks(
    queue: &mut VecDeque<(usize, usize, usize)>,
    start: usize,
    end: usize,
    size: usize,
    tier: usize,
) {
    let size = size.max(1);
    let mut chunk_start = start;
    while chunk_start < end {
        let chunk_end = (chunk_start + size).min(end);
        queue.push_back((chunk_start, chunk_end, tier));
        chunk_start = chunk_end;
    }
}

fn review_summary(result: &AggregateResult) -> ReviewSummary {
    ReviewSummary {
        total: result.total,
        positive: result.sentiments.positive,
        neutral: result.sentiments.neutral,
        negative: result.sentiments.negative,
        theme_count: result.themes.len(),
        analysis_method: result.analysis_method.to_string(),
    }
}
