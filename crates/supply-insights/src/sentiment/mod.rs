//! Review sentiment analysis.
//!
//! The engine blends one or more back-ends (lexicon scorer, learned model)
//! behind a single contract. Back-end failures never surface to the caller:
//! a failed back-end contributes a neutral score and a warn-level diagnostic,
//! so review submission keeps working when the model dependency does not.

mod lexicon;

pub use lexicon::LexiconBackend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::config::SentimentConfig;

/// Raw output of one back-end for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendScore {
    /// Signed polarity, negative = unfavorable. Back-ends should stay within
    /// [-1, 1]; the engine clamps the blend regardless.
    pub polarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Failure raised by a sentiment back-end. Absorbed by the engine.
#[derive(Debug, thiserror::Error)]
pub enum SentimentError {
    #[error("sentiment back-end unavailable: {0}")]
    Unavailable(String),
    #[error("sentiment back-end rejected input: {0}")]
    RejectedInput(String),
}

/// One sentiment-analysis capability. Implementations must be cheap to call
/// per review; the engine truncates input before handing it over.
pub trait SentimentBackend: Send + Sync {
    fn name(&self) -> &str;
    fn analyze_text(&self, text: &str) -> Result<BackendScore, SentimentError>;
}

/// Label strings are deployment configuration, not hardcoded constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    pub positive: String,
    pub negative: String,
    pub neutral: String,
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self {
            positive: "Positive".to_string(),
            negative: "Negative".to_string(),
            neutral: "Neutral".to_string(),
        }
    }
}

/// Immutable sentiment verdict for one piece of submitted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub polarity: f64,
    pub label: String,
    pub computed_at: DateTime<Utc>,
}

/// Invalid engine construction: empty back-end set or blend weights that do
/// not sum to 1.
#[derive(Debug, thiserror::Error)]
pub enum SentimentEngineError {
    #[error("sentiment engine requires at least one back-end")]
    NoBackends,
    #[error("blend weights must sum to 1.0, got {sum}")]
    WeightsNotNormalized { sum: f64 },
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Blends weighted back-end scores into one polarity and label.
pub struct SentimentEngine {
    backends: Vec<(Arc<dyn SentimentBackend>, f64)>,
    vocabulary: LabelVocabulary,
    max_chars: usize,
}

impl std::fmt::Debug for SentimentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentEngine")
            .field(
                "backends",
                &self
                    .backends
                    .iter()
                    .map(|(backend, weight)| (backend.name().to_string(), *weight))
                    .collect::<Vec<_>>(),
            )
            .field("vocabulary", &self.vocabulary)
            .field("max_chars", &self.max_chars)
            .finish()
    }
}

impl SentimentEngine {
    pub fn new(
        backends: Vec<(Arc<dyn SentimentBackend>, f64)>,
        vocabulary: LabelVocabulary,
        config: SentimentConfig,
    ) -> Result<Self, SentimentEngineError> {
        if backends.is_empty() {
            return Err(SentimentEngineError::NoBackends);
        }
        let sum: f64 = backends.iter().map(|(_, weight)| weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(SentimentEngineError::WeightsNotNormalized { sum });
        }
        Ok(Self {
            backends,
            vocabulary,
            max_chars: config.max_chars,
        })
    }

    /// Single-back-end engine with weight 1.0.
    pub fn single(
        backend: Arc<dyn SentimentBackend>,
        vocabulary: LabelVocabulary,
        config: SentimentConfig,
    ) -> Self {
        Self {
            backends: vec![(backend, 1.0)],
            vocabulary,
            max_chars: config.max_chars,
        }
    }

    /// Analyze free text. Empty or whitespace-only input short-circuits to a
    /// neutral result without touching any back-end.
    pub fn analyze_at(&self, text: &str, now: DateTime<Utc>) -> SentimentResult {
        if text.trim().is_empty() {
            return self.neutral(now);
        }

        let text = truncate_chars(text, self.max_chars);

        let mut polarity = 0.0;
        let mut any_succeeded = false;
        for (backend, weight) in &self.backends {
            match backend.analyze_text(text) {
                Ok(score) => {
                    polarity += score.polarity * weight;
                    any_succeeded = true;
                }
                Err(err) => {
                    warn!(backend = backend.name(), error = %err, "sentiment back-end failed, scoring neutral");
                }
            }
        }

        if !any_succeeded {
            return self.neutral(now);
        }

        let polarity = polarity.clamp(-1.0, 1.0);
        let label = if polarity >= 0.0 {
            self.vocabulary.positive.clone()
        } else {
            self.vocabulary.negative.clone()
        };

        SentimentResult {
            polarity,
            label,
            computed_at: now,
        }
    }

    pub fn analyze(&self, text: &str) -> SentimentResult {
        self.analyze_at(text, Utc::now())
    }

    fn neutral(&self, now: DateTime<Utc>) -> SentimentResult {
        SentimentResult {
            polarity: 0.0,
            label: self.vocabulary.neutral.clone(),
            computed_at: now,
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
