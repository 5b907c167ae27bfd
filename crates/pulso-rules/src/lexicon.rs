//! Keyword tables for the rule engine and their optional YAML override.
//!
//! Terms are stored lower-cased and accent-folded. Single-word terms match
//! whole tokens (punctuation trimmed); multi-word terms match by substring.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use pulso_core::ConfigError;

/// Lower-case a text and strip Spanish diacritics so `rápido` matches
/// `rapido` and `señal` matches `senal`.
#[must_use]
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            _ => c,
        })
        .collect()
}

/// A theme with its trigger keywords.
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// A pain-point category with its trigger keywords.
#[derive(Debug, Clone, Deserialize)]
pub struct PainRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// An emotion with its trigger keywords and base intensity in `(0.0, 1.0]`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmotionRule {
    pub name: String,
    pub keywords: Vec<String>,
    pub base_intensity: f64,
}

/// All keyword tables the rule engine (and the overseer's spot checks, and
/// the normalizer's churn classification) draw from.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub themes: Vec<ThemeRule>,
    pub pain_points: Vec<PainRule>,
    pub emotions: Vec<EmotionRule>,
    /// Severity keywords that alone push churn risk to high.
    pub churn_critical: Vec<String>,
    /// Severity keywords that accumulate toward medium churn risk.
    pub churn_medium: Vec<String>,
    /// Unambiguous cues used by the overseer's sentiment spot check.
    pub strong_positive: Vec<String>,
    pub strong_negative: Vec<String>,
    /// Common Spanish tokens used for cheap language detection.
    pub spanish_markers: Vec<String>,
}

const POSITIVE: &[&str] = &[
    "excelente",
    "bueno",
    "buena",
    "genial",
    "perfecto",
    "rapido",
    "rapida",
    "agil",
    "amable",
    "satisfecho",
    "satisfecha",
    "contento",
    "contenta",
    "recomiendo",
    "recomendable",
    "encanta",
    "encantado",
    "mejor",
    "estable",
    "cumple",
    "great",
    "good",
    "excellent",
    "fast",
    "love",
    "best",
    "helpful",
    "reliable",
];

const NEGATIVE: &[&str] = &[
    "malo",
    "mala",
    "pesimo",
    "pesima",
    "terrible",
    "horrible",
    "lento",
    "lenta",
    "lentitud",
    "caro",
    "cara",
    "demora",
    "demorado",
    "falla",
    "fallas",
    "corte",
    "cortes",
    "intermitente",
    "problema",
    "problemas",
    "queja",
    "deficiente",
    "estafa",
    "inaceptable",
    "sin servicio",
    "no funciona",
    "bad",
    "slow",
    "awful",
    "worst",
    "expensive",
    "broken",
    "useless",
];

const THEMES: &[(&str, &[&str])] = &[
    (
        "velocidad",
        &["velocidad", "rapido", "rapida", "lento", "lenta", "megas", "speed", "fast", "slow"],
    ),
    (
        "atencion al cliente",
        &[
            "atencion",
            "soporte",
            "asesor",
            "asesora",
            "llamada",
            "call center",
            "support",
            "amable",
            "tecnico",
        ],
    ),
    (
        "precio",
        &["precio", "caro", "cara", "barato", "tarifa", "costo", "price", "expensive", "cheap"],
    ),
    (
        "facturacion",
        &["factura", "facturacion", "cobro", "cobros", "cargo", "billing", "invoice", "charge"],
    ),
    (
        "cobertura",
        &["cobertura", "senal", "signal", "coverage", "antena", "zona"],
    ),
    (
        "instalacion",
        &["instalacion", "instalar", "installation", "visita"],
    ),
    (
        "calidad del servicio",
        &["servicio", "calidad", "corte", "cortes", "intermitente", "quality", "outage"],
    ),
];

const PAIN_POINTS: &[(&str, &[&str])] = &[
    (
        "conexion lenta",
        &["lento", "lenta", "lentitud", "muy lento", "se arrastra", "slow"],
    ),
    (
        "cortes de servicio",
        &["corte", "cortes", "intermitente", "sin servicio", "se cae", "caida", "outage"],
    ),
    (
        "cobros indebidos",
        &[
            "cobro indebido",
            "cobros indebidos",
            "me cobraron",
            "sobrecargo",
            "cargo no reconocido",
            "overcharge",
        ],
    ),
    (
        "mala atencion",
        &[
            "mala atencion",
            "atencion pesima",
            "grosero",
            "grosera",
            "no resuelven",
            "sin respuesta",
            "unhelpful",
        ],
    ),
    (
        "demoras de instalacion",
        &["demora", "demoras", "no llego el tecnico", "sin instalar", "delay"],
    ),
];

const EMOTIONS: &[(&str, &[&str], f64)] = &[
    (
        "enojo",
        &["furioso", "furiosa", "indignado", "indignada", "enojado", "enojada", "molesto", "molesta", "rabia", "harto", "harta", "angry", "furious"],
        0.9,
    ),
    (
        "frustracion",
        &["frustrado", "frustrada", "frustrante", "cansado de", "cansada de", "otra vez", "de nuevo", "frustrating"],
        0.8,
    ),
    (
        "decepcion",
        &["decepcionado", "decepcionada", "decepcion", "esperaba mas", "disappointed"],
        0.7,
    ),
    (
        "alegria",
        &["feliz", "encantado", "encantada", "encanta", "genial", "maravilloso", "happy", "love"],
        0.8,
    ),
    (
        "satisfaccion",
        &["satisfecho", "satisfecha", "excelente", "conforme", "cumple", "bueno", "buena", "satisfied", "great"],
        0.6,
    ),
    (
        "preocupacion",
        &["preocupado", "preocupada", "preocupa", "duda", "worried"],
        0.55,
    ),
    (
        "confianza",
        &["confiable", "confianza", "seguro", "segura", "reliable", "trust"],
        0.5,
    ),
];

const CHURN_CRITICAL: &[&str] = &[
    "cancelar",
    "cancelo",
    "dar de baja",
    "me doy de baja",
    "me cambio",
    "cambiar de compania",
    "estafa",
    "nunca funciona",
    "sin servicio",
    "denuncia",
    "cancel",
    "switching",
];

const CHURN_MEDIUM: &[&str] = &[
    "lento",
    "lenta",
    "caro",
    "cara",
    "demora",
    "falla",
    "fallas",
    "corte",
    "cortes",
    "queja",
    "mala atencion",
    "intermitente",
    "slow",
    "expensive",
];

const STRONG_POSITIVE: &[&str] = &[
    "excelente",
    "perfecto",
    "encantado",
    "encantada",
    "encanta",
    "genial",
    "maravilloso",
    "muy bueno",
    "muy buena",
    "excellent",
    "amazing",
];

const STRONG_NEGATIVE: &[&str] = &[
    "pesimo",
    "pesima",
    "horrible",
    "terrible",
    "estafa",
    "nunca funciona",
    "inaceptable",
    "awful",
    "worst",
];

const SPANISH_MARKERS: &[&str] = &[
    "el", "la", "los", "las", "de", "que", "muy", "con", "por", "para", "pero", "esta", "este",
    "servicio", "atencion", "gracias", "bueno", "malo", "porque", "cuando",
];

fn terms(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|t| fold(t)).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            positive: terms(POSITIVE),
            negative: terms(NEGATIVE),
            themes: THEMES
                .iter()
                .map(|(name, keywords)| ThemeRule {
                    name: (*name).to_string(),
                    keywords: terms(keywords),
                })
                .collect(),
            pain_points: PAIN_POINTS
                .iter()
                .map(|(name, keywords)| PainRule {
                    name: (*name).to_string(),
                    keywords: terms(keywords),
                })
                .collect(),
            emotions: EMOTIONS
                .iter()
                .map(|(name, keywords, base_intensity)| EmotionRule {
                    name: (*name).to_string(),
                    keywords: terms(keywords),
                    base_intensity: *base_intensity,
                })
                .collect(),
            churn_critical: terms(CHURN_CRITICAL),
            churn_medium: terms(CHURN_MEDIUM),
            strong_positive: terms(STRONG_POSITIVE),
            strong_negative: terms(STRONG_NEGATIVE),
            spanish_markers: terms(SPANISH_MARKERS),
        }
    }
}

impl Lexicon {
    /// Whether a folded text contains the given folded term. Multi-word terms
    /// match by substring; single words match whole tokens with surrounding
    /// punctuation trimmed.
    #[must_use]
    pub fn contains_term(folded_text: &str, term: &str) -> bool {
        if term.contains(' ') {
            return folded_text.contains(term);
        }
        folded_text
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .any(|w| w == term)
    }

    /// Number of terms from `table` present in the folded text.
    #[must_use]
    pub fn count_hits(folded_text: &str, table: &[String]) -> usize {
        table
            .iter()
            .filter(|t| Self::contains_term(folded_text, t))
            .count()
    }

    /// The terms from `table` present in the folded text, in table order.
    #[must_use]
    pub fn matched_terms(folded_text: &str, table: &[String]) -> Vec<String> {
        table
            .iter()
            .filter(|t| Self::contains_term(folded_text, t))
            .cloned()
            .collect()
    }

    /// Base intensity for an emotion name, if the lexicon knows it.
    #[must_use]
    pub fn emotion_base(&self, name: &str) -> Option<f64> {
        let folded = fold(name);
        self.emotions
            .iter()
            .find(|e| e.name == folded)
            .map(|e| e.base_intensity)
    }

    /// Load a full lexicon replacement from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LexiconFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML lexicon.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on parse failure or validation failure.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let file: LexiconFile = serde_yaml::from_str(content)?;
        let lexicon = file.into_lexicon();
        validate_lexicon(&lexicon)?;
        Ok(lexicon)
    }
}

/// On-disk lexicon shape. Every table is required so a partial file cannot
/// silently hollow out the engine.
#[derive(Debug, Deserialize)]
struct LexiconFile {
    positive: Vec<String>,
    negative: Vec<String>,
    themes: Vec<ThemeRule>,
    pain_points: Vec<PainRule>,
    emotions: Vec<EmotionRule>,
    churn_critical: Vec<String>,
    churn_medium: Vec<String>,
    strong_positive: Vec<String>,
    strong_negative: Vec<String>,
    #[serde(default)]
    spanish_markers: Vec<String>,
}

impl LexiconFile {
    fn into_lexicon(self) -> Lexicon {
        let fold_all = |v: Vec<String>| v.iter().map(|t| fold(t)).collect::<Vec<_>>();
        let defaults = Lexicon::default();
        Lexicon {
            positive: fold_all(self.positive),
            negative: fold_all(self.negative),
            themes: self
                .themes
                .into_iter()
                .map(|t| ThemeRule {
                    name: fold(&t.name),
                    keywords: fold_all(t.keywords),
                })
                .collect(),
            pain_points: self
                .pain_points
                .into_iter()
                .map(|p| PainRule {
                    name: fold(&p.name),
                    keywords: fold_all(p.keywords),
                })
                .collect(),
            emotions: self
                .emotions
                .into_iter()
                .map(|e| EmotionRule {
                    name: fold(&e.name),
                    keywords: fold_all(e.keywords),
                    base_intensity: e.base_intensity,
                })
                .collect(),
            churn_critical: fold_all(self.churn_critical),
            churn_medium: fold_all(self.churn_medium),
            strong_positive: fold_all(self.strong_positive),
            strong_negative: fold_all(self.strong_negative),
            spanish_markers: if self.spanish_markers.is_empty() {
                defaults.spanish_markers
            } else {
                fold_all(self.spanish_markers)
            },
        }
    }
}

fn validate_lexicon(lexicon: &Lexicon) -> Result<(), ConfigError> {
    if lexicon.positive.is_empty() || lexicon.negative.is_empty() {
        return Err(ConfigError::Validation(
            "lexicon must define positive and negative terms".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for theme in &lexicon.themes {
        if !seen.insert(theme.name.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate theme name: '{}'",
                theme.name
            )));
        }
    }

    let mut seen = HashSet::new();
    for pain in &lexicon.pain_points {
        if !seen.insert(pain.name.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate pain-point name: '{}'",
                pain.name
            )));
        }
    }

    for emotion in &lexicon.emotions {
        if !(emotion.base_intensity > 0.0 && emotion.base_intensity <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "emotion '{}' has base intensity {} outside (0, 1]",
                emotion.name, emotion.base_intensity
            )));
        }
    }

    Ok(())
}
