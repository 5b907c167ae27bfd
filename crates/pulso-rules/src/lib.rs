//! Rule-based analysis engine for customer feedback.
//!
//! Deterministic, dictionary-driven analyzer producing sentiment, coarse
//! emotion, themes, and pain points from a single comment. The last line of
//! defense when the AI service is unavailable: pure function of its keyword
//! tables, never fails.

pub mod engine;
pub mod lexicon;

pub use engine::RuleEngine;
pub use lexicon::{fold, EmotionRule, Lexicon, PainRule, ThemeRule};
