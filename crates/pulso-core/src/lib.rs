//! Shared domain model for the PULSO feedback analysis pipeline.
//!
//! Holds the canonical result schema produced by the pipeline, the engine-native
//! raw analysis shape both engines emit, the tabular `Dataset` input contract,
//! error types, and the injected `PipelineConfig`.

pub mod app_config;
pub mod config;
pub mod dataset;
pub mod error;
pub mod types;

pub use app_config::{
    AiConfig, ColumnConfig, OversightConfig, PipelineConfig, SyntheticNpsParams,
};
pub use config::{load_config, load_config_from_env};
pub use dataset::Dataset;
pub use error::{ConfigError, ErrorReport, PipelineError};
pub use types::{
    AggregateResult, AnalysisMethod, ChurnAssessment, ChurnDetail, ChurnReport, ChurnRiskLevel,
    Comment, CommentAnalysis, EmotionReport, IssueKind, NpsReport, OversightReport,
    QualityMetrics, RawAnalysis, Sentiment, SentimentCounts, SentimentPercentages, ThemeSummary,
    UrgencyLevel, ValidationIssue,
};
