//! Pipeline configuration structs.
//!
//! Constructed once at process start (see [`crate::config`]) and passed by
//! reference into the orchestrator, column resolver, and both engines. No
//! component reads ambient global state.

use std::path::PathBuf;

/// Top-level configuration injected into the pipeline.
#[derive(Clone, Default)]
pub struct PipelineConfig {
    pub ai: AiConfig,
    pub columns: ColumnConfig,
    pub oversight: OversightConfig,
    pub synthetic_nps: SyntheticNpsParams,
    /// Optional YAML lexicon override for the rule engine.
    pub lexicon_path: Option<PathBuf>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("ai", &self.ai)
            .field("columns", &self.columns)
            .field("oversight", &self.oversight)
            .field("synthetic_nps", &self.synthetic_nps)
            .field("lexicon_path", &self.lexicon_path)
            .finish()
    }
}

/// AI analysis client settings.
#[derive(Clone)]
pub struct AiConfig {
    /// Base URL of the external analysis service. `None` disables the AI
    /// path entirely and every run goes straight to the rule engine.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Batch sizes tried in order; a failed batch is re-submitted at the
    /// next (smaller) size before its comments fall back to the rule engine.
    pub batch_sizes: Vec<usize>,
    pub timeout_short_secs: u64,
    pub timeout_medium_secs: u64,
    pub timeout_long_secs: u64,
    pub timeout_max_secs: u64,
    /// Fraction of structurally invalid items above which a whole batch is
    /// treated as failed. Empirically chosen; kept configurable.
    pub max_invalid_fraction: f64,
    /// Additional attempts per batch on transient transport errors.
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub user_agent: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            batch_sizes: vec![50, 20, 5],
            timeout_short_secs: 10,
            timeout_medium_secs: 30,
            timeout_long_secs: 60,
            timeout_max_secs: 120,
            max_invalid_fraction: 0.1,
            max_retries: 1,
            retry_backoff_base_ms: 500,
            user_agent: "pulso/0.1 (feedback-analysis)".to_string(),
        }
    }
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("batch_sizes", &self.batch_sizes)
            .field("timeout_short_secs", &self.timeout_short_secs)
            .field("timeout_medium_secs", &self.timeout_medium_secs)
            .field("timeout_long_secs", &self.timeout_long_secs)
            .field("timeout_max_secs", &self.timeout_max_secs)
            .field("max_invalid_fraction", &self.max_invalid_fraction)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Column resolution settings: known header names in priority order.
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub comment_names: Vec<String>,
    pub score_names: Vec<String>,
    pub rating_names: Vec<String>,
    /// Minimum fraction of textual non-null cells for the fallback
    /// "predominantly text" column detection.
    pub text_ratio: f64,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            comment_names: [
                "comentario final",
                "comentario",
                "comentarios",
                "comment",
                "comments",
                "feedback",
                "observaciones",
                "opinion",
                "respuesta abierta",
                "verbatim",
            ]
            .map(str::to_string)
            .to_vec(),
            score_names: ["nps", "recomendacion", "recommendation", "puntaje nps"]
                .map(str::to_string)
                .to_vec(),
            rating_names: [
                "calificacion",
                "rating",
                "puntuacion",
                "estrellas",
                "satisfaccion",
            ]
            .map(str::to_string)
            .to_vec(),
            text_ratio: 0.6,
        }
    }
}

/// Quality overseer settings.
#[derive(Debug, Clone)]
pub struct OversightConfig {
    /// In strict mode a result below `min_confidence` is marked invalid.
    pub strict: bool,
    pub min_confidence: f64,
    /// Upper bound on comments spot-checked for sentiment plausibility.
    pub spot_check_sample: usize,
    pub checks_weight: f64,
    pub completeness_weight: f64,
    pub review_weight: f64,
}

impl Default for OversightConfig {
    fn default() -> Self {
        Self {
            strict: false,
            min_confidence: 0.7,
            spot_check_sample: 25,
            checks_weight: 0.5,
            completeness_weight: 0.3,
            review_weight: 0.2,
        }
    }
}

/// Parameters of the synthetic NPS score derived from sentiment + intensity
/// when no real survey scores exist. Empirically chosen; kept configurable.
///
/// positive: `positive_base + intensity × (10 − positive_base)`
/// neutral:  `neutral_base`
/// negative: `negative_base × (1 − intensity)`
#[derive(Debug, Clone, Copy)]
pub struct SyntheticNpsParams {
    pub positive_base: f64,
    pub neutral_base: f64,
    pub negative_base: f64,
}

impl Default for SyntheticNpsParams {
    fn default() -> Self {
        Self {
            positive_base: 9.0,
            neutral_base: 7.0,
            negative_base: 3.0,
        }
    }
}

impl SyntheticNpsParams {
    /// Synthetic 0–10 score for one comment.
    #[must_use]
    pub fn score(&self, positive: bool, negative: bool, intensity: f64) -> f64 {
        let intensity = intensity.clamp(0.0, 1.0);
        if positive {
            self.positive_base + intensity * (10.0 - self.positive_base)
        } else if negative {
            self.negative_base * (1.0 - intensity)
        } else {
            self.neutral_base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_redacted_in_debug() {
        let cfg = AiConfig {
            api_key: Some("secret".to_string()),
            ..AiConfig::default()
        };
        let dump = format!("{cfg:?}");
        assert!(!dump.contains("secret"));
        assert!(dump.contains("[redacted]"));
    }

    #[test]
    fn synthetic_score_bands() {
        let p = SyntheticNpsParams::default();
        // Positive high-intensity lands in the promoter band.
        assert!(p.score(true, false, 1.0) >= 9.0);
        // Neutral lands in the passive band.
        let neutral = p.score(false, false, 0.5);
        assert!((7.0..=8.0).contains(&neutral));
        // Negative high-intensity lands near the floor.
        assert!(p.score(false, true, 1.0) <= 1.0);
        assert!(p.score(false, true, 0.0) <= 6.0);
    }

    #[test]
    fn default_batch_sizes_descend() {
        let cfg = AiConfig::default();
        assert!(cfg.batch_sizes.windows(2).all(|w| w[0] > w[1]));
    }
}
