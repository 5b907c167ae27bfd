//! Quality oversight: consistency checks, confidence scoring, strict-mode
//! invalidation.
//!
//! Every check appends a [`ValidationIssue`] instead of aborting — issues are
//! data the caller can render next to a degraded result.

use pulso_core::{
    AggregateResult, IssueKind, OversightConfig, QualityMetrics, Sentiment, ValidationIssue,
};
use pulso_rules::{fold, Lexicon};

use crate::normalize::round1;

/// Number of hard consistency checks behind `checks_passed / checks_total`.
const CHECKS_TOTAL: usize = 5;
/// Allowed drift between a reported percentage and its recomputation.
const PERCENTAGE_TOLERANCE: f64 = 1.0;
/// Allowed drift on the NPS arithmetic cross-check.
const NPS_TOLERANCE: f64 = 0.5;

/// Reviews a normalized aggregate and attaches the oversight block.
pub struct Overseer<'a> {
    config: &'a OversightConfig,
    lexicon: &'a Lexicon,
}

impl<'a> Overseer<'a> {
    #[must_use]
    pub fn new(config: &'a OversightConfig, lexicon: &'a Lexicon) -> Self {
        Self { config, lexicon }
    }

    /// Run all checks and return the same aggregate with `oversight` filled.
    ///
    /// `review_opinion` is the optional secondary opinion from the
    /// lightweight review call, fetched by the orchestrator; when it is
    /// absent the remaining weights renormalize.
    #[must_use]
    pub fn review(
        &self,
        mut result: AggregateResult,
        review_opinion: Option<f64>,
    ) -> AggregateResult {
        let mut issues: Vec<ValidationIssue> = Vec::new();
        let mut suggestions: Vec<String> = Vec::new();
        let mut checks_passed = 0usize;

        if self.check_counts(&result, &mut issues) {
            checks_passed += 1;
        }
        if self.check_percentages(&result, &mut issues) {
            checks_passed += 1;
        }
        if self.check_required_fields(&result, &mut issues) {
            checks_passed += 1;
        }
        if self.spot_check_sentiments(&result, &mut issues, &mut suggestions) {
            checks_passed += 1;
        }
        if self.check_nps_arithmetic(&result, &mut issues) {
            checks_passed += 1;
        }

        let completeness = completeness_score(&result);
        #[allow(clippy::cast_precision_loss)]
        let checks_fraction = checks_passed as f64 / CHECKS_TOTAL as f64;

        let c = self.config;
        let confidence = match review_opinion {
            Some(opinion) => {
                c.checks_weight * checks_fraction
                    + c.completeness_weight * completeness
                    + c.review_weight * opinion
            }
            None => {
                (c.checks_weight * checks_fraction + c.completeness_weight * completeness)
                    / (c.checks_weight + c.completeness_weight)
            }
        }
        .clamp(0.0, 1.0);

        let valid = !(c.strict && confidence < c.min_confidence);
        if !valid {
            suggestions.push(format!(
                "confidence {confidence:.2} is below the {:.2} floor; review before publishing",
                c.min_confidence
            ));
        }

        tracing::info!(
            checks_passed,
            checks_total = CHECKS_TOTAL,
            completeness,
            confidence,
            valid,
            issue_count = issues.len(),
            "oversight complete"
        );

        result.oversight = pulso_core::OversightReport {
            confidence,
            valid,
            metrics: QualityMetrics {
                checks_passed,
                checks_total: CHECKS_TOTAL,
                completeness,
                review_opinion,
            },
            issues,
            suggestions,
        };
        result
    }

    fn check_counts(&self, result: &AggregateResult, issues: &mut Vec<ValidationIssue>) -> bool {
        let sum = result.sentiments.sum();
        if sum == result.total {
            return true;
        }
        issues.push(
            ValidationIssue::new(
                IssueKind::CountMismatch,
                format!(
                    "sentiment counts sum to {sum} but total is {}",
                    result.total
                ),
            )
            .with_field("sentiments"),
        );
        false
    }

    fn check_percentages(
        &self,
        result: &AggregateResult,
        issues: &mut Vec<ValidationIssue>,
    ) -> bool {
        if result.total == 0 {
            return true;
        }
        #[allow(clippy::cast_precision_loss)]
        let expected = |count: usize| round1(count as f64 * 100.0 / result.total as f64);

        let fields = [
            ("positive", result.sentiment_percentages.positive, expected(result.sentiments.positive)),
            ("neutral", result.sentiment_percentages.neutral, expected(result.sentiments.neutral)),
            ("negative", result.sentiment_percentages.negative, expected(result.sentiments.negative)),
        ];

        let mut ok = true;
        for (name, reported, recomputed) in fields {
            if (reported - recomputed).abs() > PERCENTAGE_TOLERANCE {
                ok = false;
                issues.push(
                    ValidationIssue::new(
                        IssueKind::PercentageDrift,
                        format!(
                            "{name} percentage {reported:.1} drifts from recomputed {recomputed:.1}"
                        ),
                    )
                    .with_field(format!("sentiment_percentages.{name}")),
                );
            }
        }
        ok
    }

    fn check_required_fields(
        &self,
        result: &AggregateResult,
        issues: &mut Vec<ValidationIssue>,
    ) -> bool {
        let mut ok = true;
        if result.comments.len() != result.total {
            ok = false;
            issues.push(
                ValidationIssue::new(
                    IssueKind::MissingField,
                    format!(
                        "comment detail list holds {} entries for a total of {}",
                        result.comments.len(),
                        result.total
                    ),
                )
                .with_field("comments"),
            );
        }
        if result.analysis_date.timestamp() <= 0 {
            ok = false;
            issues.push(
                ValidationIssue::new(IssueKind::MissingField, "analysis date is unset")
                    .with_field("analysis_date"),
            );
        }
        ok
    }

    /// Compare labeled sentiment against unambiguous lexical cues on a
    /// bounded sample. Produces issues and suggestions, never hard failures
    /// of the run.
    fn spot_check_sentiments(
        &self,
        result: &AggregateResult,
        issues: &mut Vec<ValidationIssue>,
        suggestions: &mut Vec<String>,
    ) -> bool {
        let mut mismatches = 0usize;
        for analysis in result.comments.iter().take(self.config.spot_check_sample) {
            let folded = fold(&analysis.text);
            let strongly_positive =
                Lexicon::count_hits(&folded, &self.lexicon.strong_positive) > 0;
            let strongly_negative =
                Lexicon::count_hits(&folded, &self.lexicon.strong_negative) > 0;

            let suspicious = (strongly_positive
                && !strongly_negative
                && analysis.sentiment == Sentiment::Negative)
                || (strongly_negative
                    && !strongly_positive
                    && analysis.sentiment == Sentiment::Positive);
            if suspicious {
                mismatches += 1;
                issues.push(
                    ValidationIssue::new(
                        IssueKind::ImplausibleSentiment,
                        format!(
                            "comment at row {} carries strong lexical cues contradicting its '{}' label",
                            analysis.row, analysis.sentiment
                        ),
                    )
                    .with_field(format!("comments[row={}]", analysis.row)),
                );
                suggestions.push(format!(
                    "re-check the sentiment label for the comment at row {}",
                    analysis.row
                ));
            }
        }
        mismatches == 0
    }

    fn check_nps_arithmetic(
        &self,
        result: &AggregateResult,
        issues: &mut Vec<ValidationIssue>,
    ) -> bool {
        let respondents = result.nps.promoters + result.nps.passives + result.nps.detractors;
        if respondents == 0 {
            return true;
        }
        #[allow(clippy::cast_precision_loss)]
        let expected = round1(
            (result.nps.promoters as f64 - result.nps.detractors as f64) / respondents as f64
                * 100.0,
        );
        if (result.nps.score - expected).abs() <= NPS_TOLERANCE {
            return true;
        }
        issues.push(
            ValidationIssue::new(
                IssueKind::NpsMismatch,
                format!(
                    "NPS score {:.1} disagrees with promoter/detractor arithmetic ({expected:.1})",
                    result.nps.score
                ),
            )
            .with_field("nps.score"),
        );
        false
    }
}

/// Share of analytical blocks carrying data: themes, emotions, NPS, churn.
fn completeness_score(result: &AggregateResult) -> f64 {
    let blocks = [
        !result.themes.is_empty(),
        !result.emotions.distribution.is_empty(),
        result.nps.promoters + result.nps.passives + result.nps.detractors > 0,
        !result.churn.details.is_empty(),
    ];
    #[allow(clippy::cast_precision_loss)]
    let score = blocks.iter().filter(|&&present| present).count() as f64 / blocks.len() as f64;
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulso_core::{AnalysisMethod, Comment, RawAnalysis, SyntheticNpsParams};

    use crate::normalize::Normalizer;

    fn comment(text: &str, row: usize) -> Comment {
        Comment {
            text: text.to_string(),
            recommendation_score: None,
            rating: None,
            row,
        }
    }

    fn raw(sentiment: &str, confidence: f64, themes: &[&str], emotions: &[&str]) -> RawAnalysis {
        RawAnalysis {
            sentiment: sentiment.to_string(),
            confidence,
            themes: themes.iter().map(|t| (*t).to_string()).collect(),
            pain_points: vec![],
            emotions: emotions.iter().map(|e| (*e).to_string()).collect(),
            language: None,
            translation: None,
        }
    }

    fn aggregate(raws: Vec<(&'static str, RawAnalysis)>) -> AggregateResult {
        let lexicon = Lexicon::default();
        let params = SyntheticNpsParams::default();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments: Vec<Comment> = raws
            .iter()
            .enumerate()
            .map(|(i, (text, _))| comment(text, i))
            .collect();
        let results: Vec<RawAnalysis> = raws.into_iter().map(|(_, r)| r).collect();
        let total = comments.len();
        normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::AiPowered,
                100.0,
                total,
                0,
            )
            .unwrap()
    }

    fn rich_aggregate() -> AggregateResult {
        aggregate(vec![
            (
                "excelente servicio",
                raw("positive", 0.9, &["calidad del servicio"], &["satisfaccion"]),
            ),
            (
                "muy lento el internet",
                raw("negative", 0.8, &["velocidad"], &["frustracion"]),
            ),
            ("sin novedades", raw("neutral", 0.5, &[], &[])),
        ])
    }

    #[test]
    fn consistent_aggregate_passes_all_checks() {
        let config = OversightConfig::default();
        let lexicon = Lexicon::default();
        let overseer = Overseer::new(&config, &lexicon);
        let reviewed = overseer.review(rich_aggregate(), None);

        assert!(reviewed.oversight.issues.is_empty(), "{:?}", reviewed.oversight.issues);
        assert_eq!(reviewed.oversight.metrics.checks_passed, 5);
        assert!(reviewed.oversight.valid);
        assert!(reviewed.oversight.confidence > 0.9);
    }

    #[test]
    fn tampered_counts_raise_count_mismatch() {
        let config = OversightConfig::default();
        let lexicon = Lexicon::default();
        let overseer = Overseer::new(&config, &lexicon);
        let mut result = rich_aggregate();
        result.sentiments.positive += 1;

        let reviewed = overseer.review(result, None);
        assert!(reviewed
            .oversight
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::CountMismatch));
        assert!(reviewed.oversight.confidence < 1.0);
    }

    #[test]
    fn tampered_percentages_raise_drift() {
        let config = OversightConfig::default();
        let lexicon = Lexicon::default();
        let overseer = Overseer::new(&config, &lexicon);
        let mut result = rich_aggregate();
        result.sentiment_percentages.positive += 10.0;

        let reviewed = overseer.review(result, None);
        assert!(reviewed
            .oversight
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::PercentageDrift));
    }

    #[test]
    fn strong_cue_contradiction_is_flagged_with_suggestion() {
        let config = OversightConfig::default();
        let lexicon = Lexicon::default();
        let overseer = Overseer::new(&config, &lexicon);
        // "excelente" is a strong positive cue; the label says negative.
        let result = aggregate(vec![(
            "excelente servicio de verdad",
            raw("negative", 0.9, &[], &["enojo"]),
        )]);

        let reviewed = overseer.review(result, None);
        assert!(reviewed
            .oversight
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::ImplausibleSentiment));
        assert!(!reviewed.oversight.suggestions.is_empty());
        // Plausibility problems degrade confidence but never invalidate alone.
        assert!(reviewed.oversight.valid);
    }

    #[test]
    fn nps_arithmetic_mismatch_is_flagged() {
        let config = OversightConfig::default();
        let lexicon = Lexicon::default();
        let overseer = Overseer::new(&config, &lexicon);
        let mut result = rich_aggregate();
        result.nps.score = 90.0;

        let reviewed = overseer.review(result, None);
        assert!(reviewed
            .oversight
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::NpsMismatch));
    }

    #[test]
    fn review_opinion_feeds_confidence_and_metrics() {
        let config = OversightConfig::default();
        let lexicon = Lexicon::default();
        let overseer = Overseer::new(&config, &lexicon);
        // Sparse aggregate: no themes, no emotions → completeness 0.5.
        let sparse = || aggregate(vec![("sin novedades", raw("neutral", 0.5, &[], &[]))]);

        let without = overseer.review(sparse(), None);
        let with = overseer.review(sparse(), Some(1.0));
        assert!(with.oversight.confidence > without.oversight.confidence);
        assert_eq!(with.oversight.metrics.review_opinion, Some(1.0));
        assert_eq!(without.oversight.metrics.review_opinion, None);
    }

    #[test]
    fn strict_mode_invalidates_low_confidence() {
        let config = OversightConfig {
            strict: true,
            min_confidence: 0.99,
            ..OversightConfig::default()
        };
        let lexicon = Lexicon::default();
        let overseer = Overseer::new(&config, &lexicon);
        // Sparse aggregate keeps completeness at 0.5 → confidence ≈ 0.81.
        let result = aggregate(vec![("sin novedades", raw("neutral", 0.5, &[], &[]))]);

        let reviewed = overseer.review(result, None);
        assert!(!reviewed.oversight.valid);
        // The data itself is still fully present.
        assert_eq!(reviewed.total, 1);
        assert!(reviewed
            .oversight
            .suggestions
            .iter()
            .any(|s| s.contains("below")));
    }

    #[test]
    fn non_strict_mode_never_invalidates() {
        let config = OversightConfig {
            strict: false,
            min_confidence: 0.99,
            ..OversightConfig::default()
        };
        let lexicon = Lexicon::default();
        let overseer = Overseer::new(&config, &lexicon);
        let result = aggregate(vec![("sin novedades", raw("neutral", 0.5, &[], &[]))]);
        let reviewed = overseer.review(result, None);
        assert!(reviewed.oversight.valid);
    }
}
