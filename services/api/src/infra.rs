use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use supply_insights::config::SentimentConfig;
use supply_insights::reviews::{RepositoryError, ReviewId, ReviewRecord, ReviewRepository};
use supply_insights::sentiment::{LabelVocabulary, LexiconBackend, SentimentEngine};
use supply_insights::visit::{VisitLogError, VisitRecord, VisitSink};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewRepository {
    records: Arc<Mutex<HashMap<ReviewId, ReviewRecord>>>,
}

impl ReviewRepository for InMemoryReviewRepository {
    fn insert(&self, record: ReviewRecord) -> Result<ReviewRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<ReviewRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ReviewRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<ReviewRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        records.truncate(limit);
        Ok(records)
    }
}

/// Append-only visit storage with a bounded read path for the dashboard.
#[derive(Default, Clone)]
pub(crate) struct InMemoryVisitSink {
    records: Arc<Mutex<Vec<VisitRecord>>>,
}

impl InMemoryVisitSink {
    pub(crate) fn recent(&self, limit: usize) -> Vec<VisitRecord> {
        let guard = self.records.lock().expect("visit sink mutex poisoned");
        guard.iter().rev().take(limit).cloned().collect()
    }
}

impl VisitSink for InMemoryVisitSink {
    fn record(&self, record: VisitRecord) -> Result<(), VisitLogError> {
        let mut guard = self.records.lock().expect("visit sink mutex poisoned");
        guard.push(record);
        Ok(())
    }
}

/// Credential check behind the throttle. Password policy and session
/// handling live outside this service; only pass/fail is surfaced here.
pub(crate) trait CredentialVerifier: Send + Sync {
    fn verify(&self, identifier: &str, password: &str) -> bool;
}

/// Fixed identifier/password table for demos and tests.
#[derive(Default, Clone)]
pub(crate) struct StaticCredentialVerifier {
    accounts: HashMap<String, String>,
}

impl StaticCredentialVerifier {
    pub(crate) fn with_account(
        mut self,
        identifier: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.accounts.insert(identifier.into(), password.into());
        self
    }
}

impl CredentialVerifier for StaticCredentialVerifier {
    fn verify(&self, identifier: &str, password: &str) -> bool {
        self.accounts
            .get(identifier)
            .is_some_and(|expected| expected == password)
    }
}

pub(crate) fn default_sentiment_engine(config: SentimentConfig) -> SentimentEngine {
    SentimentEngine::single(
        Arc::new(LexiconBackend::new()),
        LabelVocabulary::default(),
        config,
    )
}
