//! Customer review intake.
//!
//! A submission is scored for sentiment over its free text, combined with
//! session engagement signals into engagement and loyalty figures, and
//! persisted as one immutable record through the repository seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::sentiment::{SentimentEngine, SentimentResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

/// Incoming review payload. Ratings are conventionally 1-10, `nps_score`
/// 0-10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub reviewer: String,
    pub brand: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub nps_score: i32,
    #[serde(default)]
    pub full_experience: Option<String>,
    #[serde(default)]
    pub improvement_suggestions: Option<String>,
}

/// Session-derived engagement signals captured alongside a submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementSignals {
    pub page_views: u32,
    pub clicks: u32,
    pub time_spent_secs: f64,
}

impl Default for EngagementSignals {
    fn default() -> Self {
        // A bare submission still counts as one view and one click.
        Self {
            page_views: 1,
            clicks: 1,
            time_spent_secs: 0.0,
        }
    }
}

pub fn engagement_score(signals: &EngagementSignals) -> f64 {
    f64::from(signals.page_views) * 0.2
        + f64::from(signals.clicks) * 0.3
        + signals.time_spent_secs * 0.001
}

pub fn loyalty_index(nps_score: i32, engagement: f64) -> f64 {
    f64::from(nps_score) * 0.6 + engagement * 0.4
}

/// Stored review with its derived figures. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: ReviewId,
    pub submission: ReviewSubmission,
    pub sentiment: SentimentResult,
    pub engagement_score: f64,
    pub loyalty_index: f64,
    pub submitted_at: DateTime<Utc>,
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait ReviewRepository: Send + Sync {
    fn insert(&self, record: ReviewRecord) -> Result<ReviewRecord, RepositoryError>;
    fn fetch(&self, id: &ReviewId) -> Result<Option<ReviewRecord>, RepositoryError>;
    fn recent(&self, limit: usize) -> Result<Vec<ReviewRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

static REVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_review_id() -> ReviewId {
    let id = REVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewId(format!("rev-{id:06}"))
}

/// Service composing the sentiment engine with the repository.
pub struct ReviewService<R> {
    repository: Arc<R>,
    sentiment: Arc<SentimentEngine>,
}

impl<R> ReviewService<R>
where
    R: ReviewRepository + 'static,
{
    pub fn new(repository: Arc<R>, sentiment: Arc<SentimentEngine>) -> Self {
        Self {
            repository,
            sentiment,
        }
    }

    /// Score and persist one submission.
    pub fn submit_at(
        &self,
        submission: ReviewSubmission,
        signals: EngagementSignals,
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord, ReviewServiceError> {
        let text = submission.full_experience.as_deref().unwrap_or("");
        let sentiment = self.sentiment.analyze_at(text, now);

        let engagement = engagement_score(&signals);
        let loyalty = loyalty_index(submission.nps_score, engagement);

        let record = ReviewRecord {
            id: next_review_id(),
            submission,
            sentiment,
            engagement_score: engagement,
            loyalty_index: loyalty,
            submitted_at: now,
        };

        let stored = self.repository.insert(record)?;
        Ok(stored)
    }

    pub fn submit(
        &self,
        submission: ReviewSubmission,
        signals: EngagementSignals,
    ) -> Result<ReviewRecord, ReviewServiceError> {
        self.submit_at(submission, signals, Utc::now())
    }

    pub fn get(&self, id: &ReviewId) -> Result<ReviewRecord, ReviewServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<ReviewRecord>, ReviewServiceError> {
        Ok(self.repository.recent(limit)?)
    }
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engagement_formula_matches_weights() {
        let signals = EngagementSignals {
            page_views: 4,
            clicks: 1,
            time_spent_secs: 120.0,
        };
        let score = engagement_score(&signals);
        assert!((score - (0.8 + 0.3 + 0.12)).abs() < 1e-9);
    }

    #[test]
    fn loyalty_blends_nps_and_engagement() {
        let loyalty = loyalty_index(9, 1.5);
        assert!((loyalty - (5.4 + 0.6)).abs() < 1e-9);
    }
}
