//! HTTP client for the external analysis service.
//!
//! Wraps `reqwest` with timeout tiers, typed response deserialization, and
//! per-item shape validation. The public surface never returns an error:
//! failures become `None` and the orchestrator decides what that means.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use pulso_core::{AiConfig, RawAnalysis};

use crate::cache::{cache_key, ResponseCache};
use crate::error::AiError;
use crate::retry::retry_with_backoff;

const ANALYZE_PATH: &str = "v1/analyze";
const REVIEW_PATH: &str = "v1/review";

/// Per-call timeout band, chosen from the batch size actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeoutTier {
    Short,
    Medium,
    Long,
    Max,
}

impl TimeoutTier {
    fn for_batch(len: usize) -> Self {
        match len {
            0..=5 => TimeoutTier::Short,
            6..=20 => TimeoutTier::Medium,
            21..=60 => TimeoutTier::Long,
            _ => TimeoutTier::Max,
        }
    }

    fn duration(self, config: &AiConfig) -> Duration {
        let secs = match self {
            TimeoutTier::Short => config.timeout_short_secs,
            TimeoutTier::Medium => config.timeout_medium_secs,
            TimeoutTier::Long => config.timeout_long_secs,
            TimeoutTier::Max => config.timeout_max_secs,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    comments: &'a [&'a str],
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    results: Vec<serde_json::Value>,
}

/// Loose per-item wire shape; [`validate_item`] decides what is acceptable.
#[derive(Deserialize)]
struct RawAnalysisWire {
    sentiment: Option<String>,
    confidence: Option<f64>,
    themes: Option<Vec<String>>,
    #[serde(default)]
    pain_points: Vec<String>,
    emotions: Option<Vec<String>>,
    language: Option<String>,
    translation: Option<String>,
}

/// Aggregate stats sent to the lightweight review endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub total: usize,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub theme_count: usize,
    pub analysis_method: String,
}

#[derive(Deserialize)]
struct ReviewResponse {
    opinion: f64,
}

/// Client for the external LLM analysis service.
///
/// Holds a private response cache keyed by comment text; identical texts
/// within a batch are sent once and cache hits skip the wire entirely. The
/// cache is an internal economy measure, not part of the contract.
pub struct AiClient {
    client: Client,
    analyze_url: Url,
    review_url: Url,
    api_key: Option<String>,
    config: AiConfig,
    cache: ResponseCache,
}

impl AiClient {
    /// Build a client from configuration, or `None` when no base URL is
    /// configured (the pipeline then runs rule-based only).
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`AiError::Api`] for an unparseable base URL.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, AiError> {
        match config.base_url.clone() {
            None => Ok(None),
            Some(url) => Self::with_base_url(&url, config.clone()).map(Some),
        }
    }

    /// Create a client against an explicit base URL (tests point this at a
    /// wiremock server).
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`AiError::Api`] for an unparseable base URL.
    pub fn with_base_url(base_url: &str, config: AiConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;

        // Ensure the base URL ends with exactly one slash so join() appends
        // instead of replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&normalised)
            .map_err(|e| AiError::Api(format!("invalid base URL '{base_url}': {e}")))?;
        let analyze_url = base
            .join(ANALYZE_PATH)
            .map_err(|e| AiError::Api(format!("invalid analyze URL: {e}")))?;
        let review_url = base
            .join(REVIEW_PATH)
            .map_err(|e| AiError::Api(format!("invalid review URL: {e}")))?;

        Ok(Self {
            client,
            analyze_url,
            review_url,
            api_key: config.api_key.clone(),
            config,
            cache: ResponseCache::default(),
        })
    }

    /// Analyze a batch of comments.
    ///
    /// Blank comments are stripped before sending; the returned list aligns
    /// positionally with the *filtered* input, so callers must zip against
    /// the same filtering. Per-position `None` marks an item the service
    /// returned malformed (tolerated below the invalid-fraction threshold).
    ///
    /// Returns `None` when the batch as a whole failed — transport error,
    /// timeout, empty input, or too many invalid items. Never panics, never
    /// returns an error.
    pub async fn analyze_batch(&self, comments: &[&str]) -> Option<Vec<Option<RawAnalysis>>> {
        let outcome = retry_with_backoff(
            self.config.max_retries,
            self.config.retry_backoff_base_ms,
            || self.try_analyze(comments),
        )
        .await;

        match outcome {
            Ok(results) => Some(results),
            Err(e) => {
                tracing::warn!(batch = comments.len(), error = %e, "AI analysis batch failed");
                None
            }
        }
    }

    /// Best-effort secondary opinion on an aggregate, in `[0.0, 1.0]`.
    ///
    /// Uses the Short timeout tier and no retry; any failure yields `None`.
    pub async fn quality_opinion(&self, summary: &ReviewSummary) -> Option<f64> {
        match self.try_review(summary).await {
            Ok(opinion) => Some(opinion.clamp(0.0, 1.0)),
            Err(e) => {
                tracing::debug!(error = %e, "quality review unavailable");
                None
            }
        }
    }

    async fn try_analyze(&self, comments: &[&str]) -> Result<Vec<Option<RawAnalysis>>, AiError> {
        let filtered: Vec<&str> = comments
            .iter()
            .copied()
            .filter(|c| !c.trim().is_empty())
            .collect();
        if filtered.is_empty() {
            return Err(AiError::EmptyInput);
        }

        let keys: Vec<String> = filtered.iter().map(|c| cache_key(c)).collect();
        let mut results: Vec<Option<RawAnalysis>> =
            keys.iter().map(|k| self.cache.get(k)).collect();

        // Wire batch: cache misses, each distinct text sent once.
        let mut sent = HashSet::new();
        let mut miss_keys: Vec<String> = Vec::new();
        let mut miss_texts: Vec<&str> = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            if results[i].is_none() && sent.insert(key.clone()) {
                miss_keys.push(key.clone());
                miss_texts.push(filtered[i]);
            }
        }

        if miss_texts.is_empty() {
            tracing::debug!(batch = filtered.len(), "all comments served from cache");
            return Ok(results);
        }

        let tier = TimeoutTier::for_batch(miss_texts.len());
        let mut request = self
            .client
            .post(self.analyze_url.clone())
            .timeout(tier.duration(&self.config))
            .json(&AnalyzeRequest {
                comments: &miss_texts,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        let envelope: AnalyzeResponse =
            serde_json::from_str(&body).map_err(|e| AiError::Deserialize {
                context: format!("analyze(batch={})", miss_texts.len()),
                source: e,
            })?;

        let expected = miss_texts.len();
        if envelope.results.len() != expected {
            tracing::warn!(
                expected,
                got = envelope.results.len(),
                "analysis response length mismatch"
            );
        }
        let mut items: Vec<Option<RawAnalysis>> = envelope
            .results
            .into_iter()
            .take(expected)
            .map(validate_item)
            .collect();
        items.resize(expected, None);

        let invalid = items.iter().filter(|i| i.is_none()).count();
        #[allow(clippy::cast_precision_loss)]
        let invalid_fraction = invalid as f64 / expected as f64;
        if invalid_fraction > self.config.max_invalid_fraction {
            return Err(AiError::InvalidShape {
                invalid,
                total: expected,
            });
        }
        if invalid > 0 {
            tracing::warn!(
                invalid,
                total = expected,
                "tolerating structurally invalid items in analysis response"
            );
        }

        let mut by_key: HashMap<String, Option<RawAnalysis>> = HashMap::new();
        for (key, item) in miss_keys.into_iter().zip(items) {
            if let Some(analysis) = &item {
                self.cache.insert(key.clone(), analysis.clone());
            }
            by_key.insert(key, item);
        }

        for (i, key) in keys.iter().enumerate() {
            if results[i].is_none() {
                if let Some(item) = by_key.get(key) {
                    results[i].clone_from(item);
                }
            }
        }
        Ok(results)
    }

    async fn try_review(&self, summary: &ReviewSummary) -> Result<f64, AiError> {
        let mut request = self
            .client
            .post(self.review_url.clone())
            .timeout(TimeoutTier::Short.duration(&self.config))
            .json(summary);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let response = response.error_for_status()?;
        let parsed: ReviewResponse = response.json().await?;
        Ok(parsed.opinion)
    }
}

/// Accept an item only if it carries sentiment, confidence, themes, and
/// emotions; everything else is optional.
fn validate_item(value: serde_json::Value) -> Option<RawAnalysis> {
    let wire: RawAnalysisWire = serde_json::from_value(value).ok()?;
    let sentiment = wire.sentiment?;
    if sentiment.trim().is_empty() {
        return None;
    }
    let confidence = wire.confidence?;
    if !(0.0..=1.0).contains(&confidence) {
        return None;
    }
    Some(RawAnalysis {
        sentiment,
        confidence,
        themes: wire.themes?,
        pain_points: wire.pain_points,
        emotions: wire.emotions?,
        language: wire.language,
        translation: wire.translation,
    })
}
