//! Environment-driven construction of [`PipelineConfig`].

use std::path::PathBuf;

use crate::app_config::{
    AiConfig, ColumnConfig, OversightConfig, PipelineConfig, SyntheticNpsParams,
};
use crate::ConfigError;

/// Load pipeline configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a set variable holds an invalid value.
pub fn load_config() -> Result<PipelineConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_config_from_env()
}

/// Load pipeline configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a set variable holds an invalid value.
pub fn load_config_from_env() -> Result<PipelineConfig, ConfigError> {
    build_config(|key| std::env::var(key))
}

/// Build the configuration using the provided env-var lookup function.
///
/// The parsing/validation logic is decoupled from the actual environment so
/// tests can drive it with a plain `HashMap` lookup.
fn build_config<F>(lookup: F) -> Result<PipelineConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        or_default(var, default)
            .parse::<f64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    };

    // Comma-separated name lists; entries are trimmed and lower-cased.
    let parse_names = |var: &str, defaults: Vec<String>| -> Vec<String> {
        match lookup(var) {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => defaults,
        }
    };

    let parse_sizes = |var: &str| -> Result<Vec<usize>, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw
                .split(',')
                .map(|s| {
                    s.trim()
                        .parse::<usize>()
                        .map_err(|e| ConfigError::InvalidEnvVar {
                            var: var.to_string(),
                            reason: e.to_string(),
                        })
                })
                .collect(),
            Err(_) => Ok(AiConfig::default().batch_sizes),
        }
    };

    let column_defaults = ColumnConfig::default();
    let ai = AiConfig {
        base_url: lookup("PULSO_AI_BASE_URL").ok(),
        api_key: lookup("PULSO_AI_API_KEY").ok(),
        batch_sizes: parse_sizes("PULSO_AI_BATCH_SIZES")?,
        timeout_short_secs: parse_u64("PULSO_AI_TIMEOUT_SHORT_SECS", "10")?,
        timeout_medium_secs: parse_u64("PULSO_AI_TIMEOUT_MEDIUM_SECS", "30")?,
        timeout_long_secs: parse_u64("PULSO_AI_TIMEOUT_LONG_SECS", "60")?,
        timeout_max_secs: parse_u64("PULSO_AI_TIMEOUT_MAX_SECS", "120")?,
        max_invalid_fraction: parse_f64("PULSO_AI_MAX_INVALID_FRACTION", "0.1")?,
        max_retries: parse_u32("PULSO_AI_MAX_RETRIES", "1")?,
        retry_backoff_base_ms: parse_u64("PULSO_AI_RETRY_BACKOFF_BASE_MS", "500")?,
        user_agent: or_default("PULSO_AI_USER_AGENT", "pulso/0.1 (feedback-analysis)"),
    };

    let columns = ColumnConfig {
        comment_names: parse_names("PULSO_COMMENT_COLUMNS", column_defaults.comment_names),
        score_names: parse_names("PULSO_SCORE_COLUMNS", column_defaults.score_names),
        rating_names: parse_names("PULSO_RATING_COLUMNS", column_defaults.rating_names),
        text_ratio: parse_f64("PULSO_TEXT_RATIO", "0.6")?,
    };

    let oversight = OversightConfig {
        strict: parse_bool("PULSO_STRICT_MODE", "false")?,
        min_confidence: parse_f64("PULSO_MIN_CONFIDENCE", "0.7")?,
        spot_check_sample: parse_usize("PULSO_SPOT_CHECK_SAMPLE", "25")?,
        checks_weight: parse_f64("PULSO_CHECKS_WEIGHT", "0.5")?,
        completeness_weight: parse_f64("PULSO_COMPLETENESS_WEIGHT", "0.3")?,
        review_weight: parse_f64("PULSO_REVIEW_WEIGHT", "0.2")?,
    };

    let synthetic_nps = SyntheticNpsParams {
        positive_base: parse_f64("PULSO_NPS_POSITIVE_BASE", "9.0")?,
        neutral_base: parse_f64("PULSO_NPS_NEUTRAL_BASE", "7.0")?,
        negative_base: parse_f64("PULSO_NPS_NEGATIVE_BASE", "3.0")?,
    };

    let lexicon_path = lookup("PULSO_LEXICON_PATH").ok().map(PathBuf::from);

    let config = PipelineConfig {
        ai,
        columns,
        oversight,
        synthetic_nps,
        lexicon_path,
    };
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.ai.batch_sizes.is_empty() {
        return Err(ConfigError::Validation(
            "PULSO_AI_BATCH_SIZES must list at least one batch size".to_string(),
        ));
    }
    if config.ai.batch_sizes.iter().any(|&s| s == 0) {
        return Err(ConfigError::Validation(
            "batch sizes must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.ai.max_invalid_fraction) {
        return Err(ConfigError::Validation(
            "PULSO_AI_MAX_INVALID_FRACTION must be within [0, 1]".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.columns.text_ratio) {
        return Err(ConfigError::Validation(
            "PULSO_TEXT_RATIO must be within [0, 1]".to_string(),
        ));
    }
    if config.columns.comment_names.is_empty() {
        return Err(ConfigError::Validation(
            "PULSO_COMMENT_COLUMNS must list at least one name".to_string(),
        ));
    }
    let weight_sum = config.oversight.checks_weight + config.oversight.completeness_weight;
    if weight_sum <= 0.0 {
        return Err(ConfigError::Validation(
            "oversight weights must sum to a positive value".to_string(),
        ));
    }
    Ok(())
}
