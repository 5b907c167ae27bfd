//! The resilient multi-stage analysis pipeline.
//!
//! Orchestrates column resolution, comment extraction, the AI analysis
//! attempt with rule-based fallback, result normalization into the canonical
//! aggregate schema, and the final quality-oversight pass. Data flows
//! strictly top-down through the orchestrator; no component calls another
//! analysis component directly.

pub mod columns;
pub mod extract;
pub mod normalize;
pub mod orchestrator;
pub mod oversight;

pub use columns::{resolve_columns, ResolvedColumns};
pub use extract::{extract_comments, ExtractedBatch};
pub use normalize::Normalizer;
pub use orchestrator::{Pipeline, PipelineState};
pub use oversight::Overseer;
