//! Result normalization: engine-native output → the canonical aggregate.
//!
//! Both the AI client and the rule engine emit [`RawAnalysis`]; everything
//! derived from it — canonical sentiment, emotion intensity, churn risk,
//! urgency, NPS, rollups — is computed here, once, so the two paths cannot
//! drift apart.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use pulso_core::{
    AggregateResult, AnalysisMethod, ChurnAssessment, ChurnDetail, ChurnReport, ChurnRiskLevel,
    Comment, CommentAnalysis, EmotionReport, NpsReport, OversightReport, PipelineError,
    RawAnalysis, Sentiment, SentimentCounts, SentimentPercentages, SyntheticNpsParams,
    ThemeSummary, UrgencyLevel,
};
use pulso_rules::{fold, Lexicon};

const MAX_THEME_EXAMPLES: usize = 3;
/// Base intensity for emotions the lexicon does not know (AI vocabulary).
const DEFAULT_EMOTION_BASE: f64 = 0.5;

// Churn scoring weights and bucket thresholds.
const CRITICAL_WEIGHT: f64 = 0.65;
const EXTRA_CRITICAL_WEIGHT: f64 = 0.1;
const MEDIUM_WEIGHT: f64 = 0.2;
const EXTRA_MEDIUM_WEIGHT: f64 = 0.05;
const NEGATIVE_SENTIMENT_WEIGHT: f64 = 0.1;
const HIGH_CHURN_THRESHOLD: f64 = 0.65;
const MEDIUM_CHURN_THRESHOLD: f64 = 0.3;

/// Builds one [`AggregateResult`] from per-comment engine output.
pub struct Normalizer<'a> {
    lexicon: &'a Lexicon,
    nps_params: &'a SyntheticNpsParams,
}

impl<'a> Normalizer<'a> {
    #[must_use]
    pub fn new(lexicon: &'a Lexicon, nps_params: &'a SyntheticNpsParams) -> Self {
        Self { lexicon, nps_params }
    }

    /// Aggregate `results` (parallel to `comments`) into the canonical shape.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Normalization`] when the two lists disagree
    /// in length — an internal fault, not an input problem.
    pub fn normalize(
        &self,
        comments: &[Comment],
        results: &[RawAnalysis],
        method: AnalysisMethod,
        ai_coverage: f64,
        raw_total: usize,
        duplicates: usize,
    ) -> Result<AggregateResult, PipelineError> {
        if comments.len() != results.len() {
            return Err(PipelineError::Normalization(format!(
                "result count {} does not match comment count {}",
                results.len(),
                comments.len()
            )));
        }

        let analyses: Vec<CommentAnalysis> = comments
            .iter()
            .zip(results)
            .map(|(comment, raw)| self.canonicalize(comment, raw))
            .collect();

        let total = analyses.len();
        let sentiments = count_sentiments(&analyses);
        let sentiment_percentages = percentages(&sentiments, total);
        let themes = roll_up_themes(&analyses);
        let emotions = roll_up_emotions(&analyses);
        let nps = real_nps(comments).unwrap_or_else(|| synthetic_nps(&analyses, self.nps_params));
        let churn = roll_up_churn(&analyses);

        Ok(AggregateResult {
            total,
            raw_total,
            duplicates,
            comments: analyses,
            sentiments,
            sentiment_percentages,
            themes,
            emotions,
            nps,
            churn,
            analysis_method: method,
            ai_coverage: round1(ai_coverage),
            analysis_date: Utc::now(),
            oversight: OversightReport::default(),
        })
    }

    /// Engine-native shape → canonical per-comment analysis.
    fn canonicalize(&self, comment: &Comment, raw: &RawAnalysis) -> CommentAnalysis {
        let sentiment = parse_sentiment(&raw.sentiment);
        let confidence = raw.confidence.clamp(0.0, 1.0);

        let themes: Vec<String> = raw.themes.iter().map(|t| fold(t)).collect();
        let pain_points: Vec<String> = raw.pain_points.iter().map(|p| fold(p)).collect();
        let emotions: Vec<String> = raw.emotions.iter().map(|e| fold(e)).collect();

        let dominant_emotion = emotions.first().cloned();
        let emotion_intensity = dominant_emotion.as_deref().map_or(0.0, |name| {
            let base = self
                .lexicon
                .emotion_base(name)
                .unwrap_or(DEFAULT_EMOTION_BASE);
            base * confidence
        });

        let churn = self.classify_churn(&comment.text, &pain_points, sentiment);
        let urgency = urgency_for(churn.level, sentiment, emotion_intensity);

        CommentAnalysis {
            text: comment.text.clone(),
            row: comment.row,
            sentiment,
            confidence,
            themes,
            pain_points,
            emotions,
            dominant_emotion,
            emotion_intensity,
            churn,
            urgency,
        }
    }

    /// Churn risk from pain-point severity keywords: critical hits outweigh
    /// medium ones; negative sentiment contributes a small amount.
    #[allow(clippy::cast_precision_loss)]
    fn classify_churn(
        &self,
        text: &str,
        pain_points: &[String],
        sentiment: Sentiment,
    ) -> ChurnAssessment {
        let folded = fold(text);
        // Severity terms are matched against the comment text and against
        // the pain-point tags the engine produced.
        let in_tags = |term: &String| pain_points.iter().any(|p| p.contains(term.as_str()));

        let mut factors: Vec<String> = Vec::new();
        let mut critical_hits = 0usize;
        let mut medium_hits = 0usize;
        for term in &self.lexicon.churn_critical {
            if Lexicon::contains_term(&folded, term) || in_tags(term) {
                critical_hits += 1;
                factors.push(term.clone());
            }
        }
        for term in &self.lexicon.churn_medium {
            if Lexicon::contains_term(&folded, term) || in_tags(term) {
                medium_hits += 1;
                factors.push(term.clone());
            }
        }

        let mut score = 0.0;
        if critical_hits > 0 {
            score += CRITICAL_WEIGHT + EXTRA_CRITICAL_WEIGHT * (critical_hits - 1) as f64;
        }
        if medium_hits > 0 {
            score += MEDIUM_WEIGHT + EXTRA_MEDIUM_WEIGHT * (medium_hits - 1) as f64;
        }
        if sentiment == Sentiment::Negative {
            score += NEGATIVE_SENTIMENT_WEIGHT;
        }
        let score = score.clamp(0.0, 1.0);

        let level = if score >= HIGH_CHURN_THRESHOLD {
            ChurnRiskLevel::High
        } else if score >= MEDIUM_CHURN_THRESHOLD {
            ChurnRiskLevel::Medium
        } else {
            ChurnRiskLevel::Low
        };

        ChurnAssessment {
            level,
            score,
            factors,
        }
    }
}

/// Engine vocabulary → canonical sentiment. Unknown words read as neutral.
fn parse_sentiment(raw: &str) -> Sentiment {
    match fold(raw).as_str() {
        "positive" | "positivo" | "positiva" | "pos" => Sentiment::Positive,
        "negative" | "negativo" | "negativa" | "neg" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

fn urgency_for(churn: ChurnRiskLevel, sentiment: Sentiment, intensity: f64) -> UrgencyLevel {
    if churn == ChurnRiskLevel::High && intensity >= 0.7 {
        UrgencyLevel::P0
    } else if churn == ChurnRiskLevel::High
        || (sentiment == Sentiment::Negative && intensity >= 0.6)
    {
        UrgencyLevel::P1
    } else if churn == ChurnRiskLevel::Medium || sentiment == Sentiment::Negative {
        UrgencyLevel::P2
    } else {
        UrgencyLevel::P3
    }
}

fn count_sentiments(analyses: &[CommentAnalysis]) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for analysis in analyses {
        match analysis.sentiment {
            Sentiment::Positive => counts.positive += 1,
            Sentiment::Neutral => counts.neutral += 1,
            Sentiment::Negative => counts.negative += 1,
        }
    }
    counts
}

/// Percentages rounded to one decimal. The rounding residue is folded into
/// the largest bucket so the reported sum is exactly 100.0 for non-empty runs.
fn percentages(counts: &SentimentCounts, total: usize) -> SentimentPercentages {
    if total == 0 {
        return SentimentPercentages::default();
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = |count: usize| round1(count as f64 * 100.0 / total as f64);

    let mut result = SentimentPercentages {
        positive: pct(counts.positive),
        neutral: pct(counts.neutral),
        negative: pct(counts.negative),
    };

    let residual = 100.0 - result.sum();
    if residual.abs() > f64::EPSILON {
        let target = if counts.positive >= counts.neutral && counts.positive >= counts.negative {
            &mut result.positive
        } else if counts.neutral >= counts.negative {
            &mut result.neutral
        } else {
            &mut result.negative
        };
        *target = round1(*target + residual);
    }
    result
}

fn roll_up_themes(analyses: &[CommentAnalysis]) -> BTreeMap<String, ThemeSummary> {
    let mut themes: BTreeMap<String, ThemeSummary> = BTreeMap::new();
    for analysis in analyses {
        let distinct: HashSet<&String> = analysis.themes.iter().collect();
        for theme in distinct {
            let entry = themes.entry(theme.clone()).or_default();
            entry.count += 1;
            if entry.examples.len() < MAX_THEME_EXAMPLES {
                entry.examples.push(analysis.text.clone());
            }
        }
    }
    themes
}

fn roll_up_emotions(analyses: &[CommentAnalysis]) -> EmotionReport {
    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut intensity_sum = 0.0;
    let mut expressive = 0usize;
    for analysis in analyses {
        let distinct: HashSet<&String> = analysis.emotions.iter().collect();
        for emotion in distinct {
            *distribution.entry(emotion.clone()).or_default() += 1;
        }
        if analysis.dominant_emotion.is_some() {
            intensity_sum += analysis.emotion_intensity;
            expressive += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let average_intensity = if expressive == 0 {
        0.0
    } else {
        round2(intensity_sum / expressive as f64)
    };
    EmotionReport {
        distribution,
        average_intensity,
    }
}

/// Standard NPS over real 0–10 survey scores, when any are present.
fn real_nps(comments: &[Comment]) -> Option<NpsReport> {
    let scores: Vec<u8> = comments
        .iter()
        .filter_map(|c| c.recommendation_score)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let promoters = scores.iter().filter(|&&s| s >= 9).count();
    let detractors = scores.iter().filter(|&&s| s <= 6).count();
    let passives = scores.len() - promoters - detractors;
    Some(NpsReport {
        score: nps_score(promoters, detractors, scores.len()),
        promoters,
        passives,
        detractors,
        derived_from_sentiment: false,
    })
}

/// Synthetic NPS: per-comment scores derived from sentiment and emotion
/// intensity, bucketed exactly like real scores.
fn synthetic_nps(analyses: &[CommentAnalysis], params: &SyntheticNpsParams) -> NpsReport {
    let mut promoters = 0usize;
    let mut passives = 0usize;
    let mut detractors = 0usize;
    for analysis in analyses {
        let score = params
            .score(
                analysis.sentiment == Sentiment::Positive,
                analysis.sentiment == Sentiment::Negative,
                analysis.emotion_intensity,
            )
            .round()
            .clamp(0.0, 10.0);
        if score >= 9.0 {
            promoters += 1;
        } else if score <= 6.0 {
            detractors += 1;
        } else {
            passives += 1;
        }
    }
    NpsReport {
        score: nps_score(promoters, detractors, analyses.len()),
        promoters,
        passives,
        detractors,
        derived_from_sentiment: true,
    }
}

fn nps_score(promoters: usize, detractors: usize, respondents: usize) -> f64 {
    if respondents == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let score = (promoters as f64 - detractors as f64) / respondents as f64 * 100.0;
    round1(score)
}

fn roll_up_churn(analyses: &[CommentAnalysis]) -> ChurnReport {
    let mut report = ChurnReport::default();
    for analysis in analyses {
        match analysis.churn.level {
            ChurnRiskLevel::Low => report.low += 1,
            ChurnRiskLevel::Medium => report.medium += 1,
            ChurnRiskLevel::High => report.high += 1,
        }
        report.details.push(ChurnDetail {
            row: analysis.row,
            level: analysis.churn.level,
            score: analysis.churn.score,
            factors: analysis.churn.factors.clone(),
        });
    }
    report
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str, row: usize) -> Comment {
        Comment {
            text: text.to_string(),
            recommendation_score: None,
            rating: None,
            row,
        }
    }

    fn scored_comment(text: &str, row: usize, score: u8) -> Comment {
        Comment {
            text: text.to_string(),
            recommendation_score: Some(score),
            rating: None,
            row,
        }
    }

    fn raw(sentiment: &str, confidence: f64, emotions: &[&str]) -> RawAnalysis {
        RawAnalysis {
            sentiment: sentiment.to_string(),
            confidence,
            themes: vec![],
            pain_points: vec![],
            emotions: emotions.iter().map(|e| (*e).to_string()).collect(),
            language: None,
            translation: None,
        }
    }

    fn normalizer_parts() -> (Lexicon, SyntheticNpsParams) {
        (Lexicon::default(), SyntheticNpsParams::default())
    }

    #[test]
    fn counts_sum_to_total_and_percentages_to_100() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("a", 0), comment("b", 1), comment("c", 2)];
        let results = vec![
            raw("positive", 0.9, &[]),
            raw("neutral", 0.5, &[]),
            raw("negative", 0.8, &[]),
        ];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::AiPowered,
                100.0,
                3,
                0,
            )
            .unwrap();

        assert_eq!(result.sentiments.sum(), result.total);
        assert!((result.sentiment_percentages.sum() - 100.0).abs() < 0.5);
        // Residual folded in: the reported sum is exactly 100.0.
        assert!((result.sentiment_percentages.sum() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn real_nps_standard_definition() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![
            scored_comment("a", 0, 9),
            scored_comment("b", 1, 9),
            scored_comment("c", 2, 3),
            scored_comment("d", 3, 7),
        ];
        let results = vec![
            raw("positive", 0.9, &[]),
            raw("positive", 0.9, &[]),
            raw("negative", 0.9, &[]),
            raw("neutral", 0.5, &[]),
        ];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::RuleBasedFallback,
                0.0,
                4,
                0,
            )
            .unwrap();

        assert_eq!(result.nps.promoters, 2);
        assert_eq!(result.nps.detractors, 1);
        assert_eq!(result.nps.passives, 1);
        assert!((result.nps.score - 25.0).abs() < f64::EPSILON);
        assert!(!result.nps.derived_from_sentiment);
    }

    #[test]
    fn synthetic_nps_when_no_scores_present() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("a", 0), comment("b", 1), comment("c", 2)];
        let results = vec![
            // alegria base 0.8 × 0.9 confidence → intensity 0.72 → score ≈ 9.72 → promoter
            raw("positive", 0.9, &["alegria"]),
            // enojo base 0.9 × 0.9 → 0.81 → score ≈ 0.57 → detractor
            raw("negative", 0.9, &["enojo"]),
            // neutral → 7 → passive
            raw("neutral", 0.5, &[]),
        ];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::RuleBasedFallback,
                0.0,
                3,
                0,
            )
            .unwrap();

        assert!(result.nps.derived_from_sentiment);
        assert_eq!(result.nps.promoters, 1);
        assert_eq!(result.nps.detractors, 1);
        assert_eq!(result.nps.passives, 1);
    }

    #[test]
    fn emotion_intensity_scales_with_confidence() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("a", 0)];
        let results = vec![raw("negative", 0.5, &["enojo", "frustracion"])];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::AiPowered,
                100.0,
                1,
                0,
            )
            .unwrap();

        let analysis = &result.comments[0];
        assert_eq!(analysis.dominant_emotion.as_deref(), Some("enojo"));
        assert!((analysis.emotion_intensity - 0.45).abs() < 1e-9);
        assert_eq!(result.emotions.distribution.len(), 2);
    }

    #[test]
    fn unknown_emotion_uses_default_base() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("a", 0)];
        let results = vec![raw("positive", 1.0, &["nostalgia"])];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::AiPowered,
                100.0,
                1,
                0,
            )
            .unwrap();
        assert!((result.comments[0].emotion_intensity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_sentiment_vocabulary_reads_neutral() {
        assert_eq!(parse_sentiment("mixed"), Sentiment::Neutral);
        assert_eq!(parse_sentiment("POSITIVO"), Sentiment::Positive);
        assert_eq!(parse_sentiment("neg"), Sentiment::Negative);
    }

    #[test]
    fn theme_examples_capped_at_three() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments: Vec<Comment> = (0..5).map(|i| comment("muy lento", i)).collect();
        let results: Vec<RawAnalysis> = (0..5)
            .map(|_| {
                let mut r = raw("negative", 0.8, &[]);
                r.themes = vec!["velocidad".to_string()];
                r
            })
            .collect();
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::AiPowered,
                100.0,
                5,
                0,
            )
            .unwrap();

        let summary = &result.themes["velocidad"];
        assert_eq!(summary.count, 5);
        assert_eq!(summary.examples.len(), 3);
    }

    #[test]
    fn critical_churn_keyword_buckets_high() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("quiero cancelar, esto nunca funciona", 0)];
        let results = vec![raw("negative", 0.9, &["enojo"])];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::RuleBasedFallback,
                0.0,
                1,
                0,
            )
            .unwrap();

        let analysis = &result.comments[0];
        assert_eq!(analysis.churn.level, ChurnRiskLevel::High);
        assert!(analysis.churn.factors.contains(&"cancelar".to_string()));
        assert_eq!(result.churn.high, 1);
        // High churn + intense anger → top urgency.
        assert_eq!(analysis.urgency, UrgencyLevel::P0);
    }

    #[test]
    fn medium_severity_needs_negative_sentiment_to_escalate() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("el internet esta lento", 0), comment("ok", 1)];
        let results = vec![raw("negative", 0.7, &[]), raw("neutral", 0.4, &[])];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::RuleBasedFallback,
                0.0,
                2,
                0,
            )
            .unwrap();

        assert_eq!(result.comments[0].churn.level, ChurnRiskLevel::Medium);
        assert_eq!(result.comments[1].churn.level, ChurnRiskLevel::Low);
        assert_eq!(result.churn.medium, 1);
        assert_eq!(result.churn.low, 1);
        assert_eq!(result.churn.details.len(), 2);
    }

    #[test]
    fn positive_comment_has_low_churn_and_p3() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("excelente servicio", 0)];
        let results = vec![raw("positive", 0.9, &["satisfaccion"])];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::AiPowered,
                100.0,
                1,
                0,
            )
            .unwrap();
        assert_eq!(result.comments[0].churn.level, ChurnRiskLevel::Low);
        assert_eq!(result.comments[0].urgency, UrgencyLevel::P3);
    }

    #[test]
    fn hybrid_method_and_coverage_are_recorded() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("a", 0)];
        let results = vec![raw("neutral", 0.5, &[])];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::HybridAiRule,
                60.0,
                1,
                0,
            )
            .unwrap();
        assert_eq!(result.analysis_method, AnalysisMethod::HybridAiRule);
        assert!((result.ai_coverage - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dedup_counts_pass_through() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("a", 0)];
        let results = vec![raw("neutral", 0.5, &[])];
        let result = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::RuleBasedFallback,
                0.0,
                4,
                3,
            )
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.raw_total, 4);
        assert_eq!(result.duplicates, 3);
    }

    #[test]
    fn normalization_is_idempotent_modulo_timestamp() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![
            comment("excelente servicio", 0),
            comment("muy lento, quiero cancelar", 1),
        ];
        let results = vec![
            raw("positive", 0.9, &["satisfaccion"]),
            raw("negative", 0.8, &["enojo"]),
        ];

        let first = normalizer
            .normalize(&comments, &results, AnalysisMethod::AiPowered, 100.0, 2, 0)
            .unwrap();
        let mut second = normalizer
            .normalize(&comments, &results, AnalysisMethod::AiPowered, 100.0, 2, 0)
            .unwrap();
        second.analysis_date = first.analysis_date;
        assert_eq!(first, second);
    }

    #[test]
    fn length_mismatch_is_a_normalization_error() {
        let (lexicon, params) = normalizer_parts();
        let normalizer = Normalizer::new(&lexicon, &params);
        let comments = vec![comment("a", 0), comment("b", 1)];
        let results = vec![raw("neutral", 0.5, &[])];
        let err = normalizer
            .normalize(
                &comments,
                &results,
                AnalysisMethod::AiPowered,
                100.0,
                2,
                0,
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::Normalization(_)));
    }

    #[test]
    fn percentage_residual_goes_to_largest_bucket() {
        let counts = SentimentCounts {
            positive: 1,
            neutral: 1,
            negative: 1,
        };
        let pct = percentages(&counts, 3);
        assert!((pct.sum() - 100.0).abs() < 1e-9);
        // Tie on counts: positive absorbs the residue.
        assert!((pct.positive - 33.4).abs() < 1e-9);
        assert!((pct.neutral - 33.3).abs() < 1e-9);
    }

    #[test]
    fn empty_total_yields_zero_percentages() {
        let pct = percentages(&SentimentCounts::default(), 0);
        assert!((pct.sum() - 0.0).abs() < f64::EPSILON);
    }
}
