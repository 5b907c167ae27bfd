//! The rule-based analysis engine.

use pulso_core::RawAnalysis;

use crate::lexicon::{fold, Lexicon};

/// Confidence when no sentiment keyword matched at all.
const NO_SIGNAL_CONFIDENCE: f64 = 0.3;
/// Confidence for a tie between positive and negative hits.
const TIE_CONFIDENCE: f64 = 0.5;
/// Confidence gain per hit of margin between the two sides.
const MARGIN_STEP: f64 = 0.1;
/// Lexical confidence cap; the engine never claims near-certainty.
const MAX_LEXICAL_CONFIDENCE: f64 = 0.9;
/// Confidence floor applied when a numeric rating overrides the text.
const RATING_CONFIDENCE: f64 = 0.85;

/// Deterministic keyword/pattern analyzer. Pure function of its [`Lexicon`];
/// performs no I/O and cannot fail.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    lexicon: Lexicon,
}

impl RuleEngine {
    #[must_use]
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Analyze one comment, optionally informed by a numeric rating.
    ///
    /// Sentiment is decided by counting positive vs negative keyword hits in
    /// the folded text; a tie (including zero hits) is neutral. A rating of
    /// ≤ 3 or ≥ 8 overrides the lexical decision — the survey number is a
    /// stronger signal than keywords.
    #[must_use]
    pub fn analyze(&self, text: &str, rating: Option<f64>) -> RawAnalysis {
        let folded = fold(text);

        let pos = Lexicon::count_hits(&folded, &self.lexicon.positive);
        let neg = Lexicon::count_hits(&folded, &self.lexicon.negative);

        let (mut sentiment, mut confidence) = match pos.cmp(&neg) {
            std::cmp::Ordering::Greater => ("positive", margin_confidence(pos - neg)),
            std::cmp::Ordering::Less => ("negative", margin_confidence(neg - pos)),
            std::cmp::Ordering::Equal => {
                let confidence = if pos == 0 {
                    NO_SIGNAL_CONFIDENCE
                } else {
                    TIE_CONFIDENCE
                };
                ("neutral", confidence)
            }
        };

        if let Some(r) = rating {
            if r <= 3.0 {
                sentiment = "negative";
                confidence = confidence.max(RATING_CONFIDENCE);
            } else if r >= 8.0 {
                sentiment = "positive";
                confidence = confidence.max(RATING_CONFIDENCE);
            }
        }

        let themes = self
            .lexicon
            .themes
            .iter()
            .filter(|t| Lexicon::count_hits(&folded, &t.keywords) > 0)
            .map(|t| t.name.clone())
            .collect();

        let pain_points = self
            .lexicon
            .pain_points
            .iter()
            .filter(|p| Lexicon::count_hits(&folded, &p.keywords) > 0)
            .map(|p| p.name.clone())
            .collect();

        // Emotions ordered strongest-first by hit count; sort is stable, so
        // ties keep the lexicon's order.
        let mut emotion_hits: Vec<(usize, &str)> = self
            .lexicon
            .emotions
            .iter()
            .map(|e| (Lexicon::count_hits(&folded, &e.keywords), e.name.as_str()))
            .filter(|(hits, _)| *hits > 0)
            .collect();
        emotion_hits.sort_by(|a, b| b.0.cmp(&a.0));
        let emotions = emotion_hits
            .into_iter()
            .map(|(_, name)| name.to_string())
            .collect();

        let language = if Lexicon::count_hits(&folded, &self.lexicon.spanish_markers) > 0 {
            Some("es".to_string())
        } else {
            None
        };

        RawAnalysis {
            sentiment: sentiment.to_string(),
            confidence,
            themes,
            pain_points,
            emotions,
            language,
            translation: None,
        }
    }
}

fn margin_confidence(margin: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let margin = margin as f64;
    (TIE_CONFIDENCE + MARGIN_STEP * margin).min(MAX_LEXICAL_CONFIDENCE)
}
