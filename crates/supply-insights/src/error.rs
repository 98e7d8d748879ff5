use crate::config::ConfigError;
use crate::scoring::{ScoreInputError, WeightTableError};
use crate::sentiment::SentimentEngineError;
use crate::telemetry::TelemetryError;
use crate::throttle::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    WeightTable(WeightTableError),
    ScoreInput(ScoreInputError),
    SentimentEngine(SentimentEngineError),
    AttemptStore(StoreError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::WeightTable(err) => write!(f, "weight table error: {}", err),
            AppError::ScoreInput(err) => write!(f, "score input error: {}", err),
            AppError::SentimentEngine(err) => write!(f, "sentiment engine error: {}", err),
            AppError::AttemptStore(err) => write!(f, "attempt store error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::WeightTable(err) => Some(err),
            AppError::ScoreInput(err) => Some(err),
            AppError::SentimentEngine(err) => Some(err),
            AppError::AttemptStore(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::WeightTable(_) | AppError::ScoreInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::SentimentEngine(_)
            | AppError::AttemptStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<WeightTableError> for AppError {
    fn from(value: WeightTableError) -> Self {
        Self::WeightTable(value)
    }
}

impl From<ScoreInputError> for AppError {
    fn from(value: ScoreInputError) -> Self {
        Self::ScoreInput(value)
    }
}

impl From<SentimentEngineError> for AppError {
    fn from(value: SentimentEngineError) -> Self {
        Self::SentimentEngine(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::AttemptStore(value)
    }
}
