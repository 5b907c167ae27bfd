//! Canonical result schema and the engine-native raw analysis shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-way sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// Ordinal priority assigned to a comment. `P0` is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UrgencyLevel {
    P0,
    P1,
    P2,
    P3,
}

/// Churn-risk bucket derived from pain-point severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChurnRiskLevel {
    Low,
    Medium,
    High,
}

/// Which path produced the aggregate result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisMethod {
    AiPowered,
    HybridAiRule,
    RuleBasedFallback,
    Error,
}

impl std::fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMethod::AiPowered => write!(f, "AI_POWERED"),
            AnalysisMethod::HybridAiRule => write!(f, "HYBRID_AI_RULE"),
            AnalysisMethod::RuleBasedFallback => write!(f, "RULE_BASED_FALLBACK"),
            AnalysisMethod::Error => write!(f, "ERROR"),
        }
    }
}

/// One ingested feedback row. Immutable after extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    /// Trimmed free-text content.
    pub text: String,
    /// 0–10 recommendation score from a real NPS survey column, when present.
    pub recommendation_score: Option<u8>,
    /// Separate numeric rating (e.g. 1–10 stars), when present.
    pub rating: Option<f64>,
    /// Source row index in the original dataset.
    pub row: usize,
}

impl Comment {
    /// Strongest available numeric signal: the rating column when present,
    /// otherwise the recommendation score.
    #[must_use]
    pub fn numeric_signal(&self) -> Option<f64> {
        self.rating
            .or_else(|| self.recommendation_score.map(f64::from))
    }
}

/// Engine-native per-comment output shared by the AI client and the rule
/// engine. Sentiment stays in the engine's vocabulary until normalization;
/// `emotions` is ordered strongest-first, so the head is the dominant emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysis {
    pub sentiment: String,
    pub confidence: f64,
    pub themes: Vec<String>,
    pub pain_points: Vec<String>,
    pub emotions: Vec<String>,
    pub language: Option<String>,
    pub translation: Option<String>,
}

/// Per-comment churn-risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnAssessment {
    pub level: ChurnRiskLevel,
    /// 0.0–1.0 risk score.
    pub score: f64,
    /// Severity keywords that contributed to the score.
    pub factors: Vec<String>,
}

impl Default for ChurnAssessment {
    fn default() -> Self {
        Self {
            level: ChurnRiskLevel::Low,
            score: 0.0,
            factors: Vec::new(),
        }
    }
}

/// Canonical per-comment analysis. Collections are always present; they may
/// be empty but never missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentAnalysis {
    pub text: String,
    pub row: usize,
    pub sentiment: Sentiment,
    /// 0.0–1.0.
    pub confidence: f64,
    pub themes: Vec<String>,
    pub pain_points: Vec<String>,
    pub emotions: Vec<String>,
    pub dominant_emotion: Option<String>,
    /// 0.0–1.0, dominant-emotion base intensity scaled by confidence.
    pub emotion_intensity: f64,
    pub churn: ChurnAssessment,
    pub urgency: UrgencyLevel,
}

/// Absolute sentiment counts. Sums to `total` by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    #[must_use]
    pub fn sum(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

/// Sentiment shares rounded to one decimal. Sums to 100.0 for non-empty runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentPercentages {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentPercentages {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }
}

/// Frequency of one theme across the batch, with up to three example comments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThemeSummary {
    pub count: usize,
    pub examples: Vec<String>,
}

/// Emotion tag distribution plus the mean per-comment intensity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmotionReport {
    pub distribution: BTreeMap<String, usize>,
    pub average_intensity: f64,
}

/// Net Promoter Score block.
///
/// `derived_from_sentiment` is `false` when real 0–10 survey scores were
/// present and `true` when the scores were synthesized from sentiment and
/// emotion intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NpsReport {
    pub score: f64,
    pub promoters: usize,
    pub passives: usize,
    pub detractors: usize,
    pub derived_from_sentiment: bool,
}

/// One row of the churn detail list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnDetail {
    pub row: usize,
    pub level: ChurnRiskLevel,
    pub score: f64,
    pub factors: Vec<String>,
}

/// Churn-risk buckets plus the full per-comment detail list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChurnReport {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub details: Vec<ChurnDetail>,
}

/// Kind tag on a [`ValidationIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CountMismatch,
    PercentageDrift,
    MissingField,
    ImplausibleSentiment,
    NpsMismatch,
}

/// A consistency or plausibility problem found during oversight. Issues are
/// data attached to the result, never control flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    pub field: Option<String>,
}

impl ValidationIssue {
    #[must_use]
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Quality-metric breakdown behind the oversight confidence score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub checks_passed: usize,
    pub checks_total: usize,
    /// 0.0–1.0 share of analytical blocks that carry data.
    pub completeness: f64,
    /// Secondary opinion from the lightweight review call, when available.
    pub review_opinion: Option<f64>,
}

/// Oversight block attached by the Quality Overseer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OversightReport {
    /// 0.0–1.0 overall confidence in the aggregate.
    pub confidence: f64,
    /// `false` only in strict mode when confidence fell below the floor.
    pub valid: bool,
    pub metrics: QualityMetrics,
    pub issues: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
}

impl Default for OversightReport {
    fn default() -> Self {
        Self {
            confidence: 0.0,
            valid: true,
            metrics: QualityMetrics::default(),
            issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

/// The one result of a pipeline run.
///
/// Built once by the normalizer, amended in place by the overseer (which
/// fills `oversight` and may append issues), then handed to the caller and
/// never mutated afterward. Every analytical block is a plain field with a
/// zero/empty default so callers never deal with missing keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    /// Comments analyzed after de-duplication.
    pub total: usize,
    /// Non-blank comment rows before de-duplication.
    pub raw_total: usize,
    pub duplicates: usize,
    pub comments: Vec<CommentAnalysis>,
    pub sentiments: SentimentCounts,
    pub sentiment_percentages: SentimentPercentages,
    pub themes: BTreeMap<String, ThemeSummary>,
    pub emotions: EmotionReport,
    pub nps: NpsReport,
    pub churn: ChurnReport,
    pub analysis_method: AnalysisMethod,
    /// Percentage of comments that went through the AI engine.
    pub ai_coverage: f64,
    pub analysis_date: DateTime<Utc>,
    pub oversight: OversightReport,
}
