//! Supplier performance scoring.
//!
//! A supplier's seven accumulated sub-scores are collapsed into one weighted,
//! clamped aggregate plus a categorical rating. The computation is a pure
//! function of the inputs and the weight table; persistence of either side is
//! the caller's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accumulated sub-scores for a supplier, each conventionally 0-100.
/// `risk_index` is the only input that normally contributes negatively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplierScoreInput {
    pub timeliness: f64,
    pub quantity_accuracy: f64,
    pub quality: f64,
    pub complaint: f64,
    pub consistency: f64,
    pub trust_index: f64,
    pub risk_index: f64,
}

impl SupplierScoreInput {
    /// A NaN or infinite sub-score would poison the weighted sum past the
    /// clamp, so inputs are rejected up front, matching the weight checks.
    fn validate(&self) -> Result<(), ScoreInputError> {
        let fields = [
            ("timeliness", self.timeliness),
            ("quantity_accuracy", self.quantity_accuracy),
            ("quality", self.quality),
            ("complaint", self.complaint),
            ("consistency", self.consistency),
            ("trust_index", self.trust_index),
            ("risk_index", self.risk_index),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ScoreInputError::NonFinite { field });
            }
        }
        Ok(())
    }
}

/// Malformed sub-score supplied by a caller.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScoreInputError {
    #[error("sub-score '{field}' must be a finite number")]
    NonFinite { field: &'static str },
}

/// Weight applied to each sub-score. Custom tables are all-or-nothing: a
/// table built from a partial mapping is rejected rather than merged with
/// defaults, so a typo never silently falls back to a default weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub timeliness: f64,
    pub quantity_accuracy: f64,
    pub quality: f64,
    pub complaint: f64,
    pub consistency: f64,
    pub trust_index: f64,
    pub risk_index: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            timeliness: 0.20,
            quantity_accuracy: 0.20,
            quality: 0.20,
            complaint: 0.15,
            consistency: 0.10,
            trust_index: 0.10,
            risk_index: -0.05,
        }
    }
}

const WEIGHT_KEYS: [&str; 7] = [
    "timeliness",
    "quantity_accuracy",
    "quality",
    "complaint",
    "consistency",
    "trust_index",
    "risk_index",
];

impl WeightTable {
    /// Build a table from a key/value mapping, requiring all seven keys.
    pub fn from_map(weights: &BTreeMap<String, f64>) -> Result<Self, WeightTableError> {
        for key in weights.keys() {
            if !WEIGHT_KEYS.contains(&key.as_str()) {
                return Err(WeightTableError::UnknownKey { key: key.clone() });
            }
        }

        let fetch = |key: &'static str| -> Result<f64, WeightTableError> {
            let value = weights
                .get(key)
                .copied()
                .ok_or(WeightTableError::MissingKey { key })?;
            if !value.is_finite() {
                return Err(WeightTableError::NonFinite { key });
            }
            Ok(value)
        };

        Ok(Self {
            timeliness: fetch("timeliness")?,
            quantity_accuracy: fetch("quantity_accuracy")?,
            quality: fetch("quality")?,
            complaint: fetch("complaint")?,
            consistency: fetch("consistency")?,
            trust_index: fetch("trust_index")?,
            risk_index: fetch("risk_index")?,
        })
    }

    fn weighted_sum(&self, input: &SupplierScoreInput) -> f64 {
        input.timeliness * self.timeliness
            + input.quantity_accuracy * self.quantity_accuracy
            + input.quality * self.quality
            + input.complaint * self.complaint
            + input.consistency * self.consistency
            + input.trust_index * self.trust_index
            + input.risk_index * self.risk_index
    }
}

/// Malformed weight table supplied by a caller.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WeightTableError {
    #[error("weight table is missing required key '{key}'")]
    MissingKey { key: &'static str },
    #[error("weight table contains unrecognized key '{key}'")]
    UnknownKey { key: String },
    #[error("weight for '{key}' must be a finite number")]
    NonFinite { key: &'static str },
}

/// Categorical rating derived from the final score via fixed thresholds.
/// Ties go to the higher band: exactly 85 is Excellent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingCategory {
    Excellent,
    Good,
    Average,
    Poor,
}

impl RatingCategory {
    pub fn from_score(final_score: f64) -> Self {
        if final_score >= 85.0 {
            Self::Excellent
        } else if final_score >= 70.0 {
            Self::Good
        } else if final_score >= 50.0 {
            Self::Average
        } else {
            Self::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Poor => "Poor",
        }
    }
}

/// Outcome of a scoring pass. Always recomputed on demand; never stored as
/// authoritative state by this module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierScoreResult {
    pub final_score: f64,
    pub rating_category: RatingCategory,
    pub computed_at: DateTime<Utc>,
}

/// Weighted, clamped aggregate using the supplied table.
pub fn compute_score_at(
    input: &SupplierScoreInput,
    weights: &WeightTable,
    now: DateTime<Utc>,
) -> Result<SupplierScoreResult, ScoreInputError> {
    input.validate()?;
    let final_score = weights.weighted_sum(input).clamp(0.0, 100.0);
    Ok(SupplierScoreResult {
        final_score,
        rating_category: RatingCategory::from_score(final_score),
        computed_at: now,
    })
}

pub fn compute_score(
    input: &SupplierScoreInput,
    weights: &WeightTable,
) -> Result<SupplierScoreResult, ScoreInputError> {
    compute_score_at(input, weights, Utc::now())
}
