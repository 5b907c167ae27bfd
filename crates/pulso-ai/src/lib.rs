//! HTTP client for the external LLM analysis service.
//!
//! The only component of the pipeline whose failure is expected: every
//! transport, timeout, or decoding error is absorbed and reported as "no
//! result", never as an exception. The orchestrator decides what a missing
//! result means.

pub mod client;
pub mod error;

mod cache;
mod retry;

pub use client::{AiClient, ReviewSummary};
pub use error::AiError;
