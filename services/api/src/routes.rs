use crate::infra::{AppState, CredentialVerifier, InMemoryReviewRepository, InMemoryVisitSink};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use supply_insights::error::AppError;
use supply_insights::reviews::{
    EngagementSignals, ReviewService, ReviewServiceError, ReviewSubmission,
};
use supply_insights::scoring::{compute_score, SupplierScoreInput, WeightTable};
use supply_insights::sentiment::{SentimentEngine, SentimentResult};
use supply_insights::throttle::{
    AttemptKey, InMemoryAttemptStore, LoginThrottle, ThrottleDecision,
};

#[derive(Clone)]
pub(crate) struct LoginState {
    pub(crate) throttle: Arc<LoginThrottle<InMemoryAttemptStore>>,
    pub(crate) verifier: Arc<dyn CredentialVerifier>,
}

pub(crate) struct ApiDeps {
    pub(crate) reviews: Arc<ReviewService<InMemoryReviewRepository>>,
    pub(crate) sentiment: Arc<SentimentEngine>,
    pub(crate) login: LoginState,
    pub(crate) visits: Arc<InMemoryVisitSink>,
}

pub(crate) fn api_router(deps: ApiDeps) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/suppliers/score", post(score_endpoint))
        .merge(
            Router::new()
                .route("/api/v1/reviews", post(review_endpoint))
                .with_state(deps.reviews),
        )
        .merge(
            Router::new()
                .route("/api/v1/sentiment", post(sentiment_endpoint))
                .with_state(deps.sentiment),
        )
        .merge(
            Router::new()
                .route("/api/v1/auth/login", post(login_endpoint))
                .with_state(deps.login),
        )
        .merge(
            Router::new()
                .route("/api/v1/visits/recent", get(visits_endpoint))
                .with_state(deps.visits),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    pub(crate) timeliness: f64,
    pub(crate) quantity_accuracy: f64,
    pub(crate) quality: f64,
    pub(crate) complaint: f64,
    pub(crate) consistency: f64,
    pub(crate) trust_index: f64,
    pub(crate) risk_index: f64,
    /// Optional custom weight table; all seven keys or nothing.
    #[serde(default)]
    pub(crate) weights: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreResponse {
    pub(crate) final_score: f64,
    pub(crate) rating_category: &'static str,
    pub(crate) computed_at: DateTime<Utc>,
}

pub(crate) async fn score_endpoint(
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let weights = match &payload.weights {
        Some(map) => WeightTable::from_map(map)?,
        None => WeightTable::default(),
    };

    let input = SupplierScoreInput {
        timeliness: payload.timeliness,
        quantity_accuracy: payload.quantity_accuracy,
        quality: payload.quality,
        complaint: payload.complaint,
        consistency: payload.consistency,
        trust_index: payload.trust_index,
        risk_index: payload.risk_index,
    };

    let result = compute_score(&input, &weights)?;
    Ok(Json(ScoreResponse {
        final_score: result.final_score,
        rating_category: result.rating_category.label(),
        computed_at: result.computed_at,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    #[serde(flatten)]
    pub(crate) submission: ReviewSubmission,
    #[serde(default)]
    pub(crate) signals: Option<EngagementSignals>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewResponse {
    pub(crate) review_id: String,
    pub(crate) sentiment: SentimentResult,
    pub(crate) engagement_score: f64,
    pub(crate) loyalty_index: f64,
}

pub(crate) async fn review_endpoint(
    State(service): State<Arc<ReviewService<InMemoryReviewRepository>>>,
    Json(payload): Json<ReviewRequest>,
) -> Response {
    let signals = payload.signals.unwrap_or_default();
    match service.submit(payload.submission, signals) {
        Ok(record) => {
            let view = ReviewResponse {
                review_id: record.id.0,
                sentiment: record.sentiment,
                engagement_score: record.engagement_score,
                loyalty_index: record.loyalty_index,
            };
            (StatusCode::ACCEPTED, Json(view)).into_response()
        }
        Err(ReviewServiceError::Repository(err)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SentimentRequest {
    pub(crate) text: String,
}

pub(crate) async fn sentiment_endpoint(
    State(engine): State<Arc<SentimentEngine>>,
    Json(payload): Json<SentimentRequest>,
) -> Json<SentimentResult> {
    Json(engine.analyze(&payload.text))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) identifier: String,
    pub(crate) password: String,
}

pub(crate) async fn login_endpoint(
    State(state): State<LoginState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    // The throttle keys on the connection peer only. A forwarded-for chain
    // is attacker-controlled and would hand out a fresh counter per spoofed
    // value; it stays a visit-logging concern.
    let ip = connect_info
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = AttemptKey::new(payload.identifier.clone(), ip);
    let now = Utc::now();

    // Lockout is checked before any credential validation.
    match state.throttle.check(&key, now) {
        Ok(ThrottleDecision::Locked { retry_after_secs }) => {
            return locked_response(retry_after_secs);
        }
        Ok(_) => {}
        Err(err) => return store_error_response(err),
    }

    if state.verifier.verify(&payload.identifier, &payload.password) {
        if let Err(err) = state.throttle.record_success(&key) {
            return store_error_response(err);
        }
        let body = json!({ "status": "ok", "identifier": payload.identifier });
        return (StatusCode::OK, Json(body)).into_response();
    }

    match state.throttle.record_failure(&key, now) {
        Ok(ThrottleDecision::Locked { retry_after_secs }) => locked_response(retry_after_secs),
        Ok(_) => {
            let body = json!({ "error": "invalid credentials" });
            (StatusCode::UNAUTHORIZED, Json(body)).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

fn locked_response(retry_after_secs: i64) -> Response {
    let body = json!({
        "error": "too many failed attempts",
        "retry_after_secs": retry_after_secs,
    });
    (StatusCode::LOCKED, Json(body)).into_response()
}

fn store_error_response(err: supply_insights::throttle::StoreError) -> Response {
    let body = json!({ "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

pub(crate) async fn visits_endpoint(
    State(sink): State<Arc<InMemoryVisitSink>>,
) -> Json<serde_json::Value> {
    Json(json!({ "visits": sink.recent(50) }))
}
