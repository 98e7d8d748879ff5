use crate::cli::ServeArgs;
use crate::infra::{
    default_sentiment_engine, AppState, InMemoryReviewRepository, InMemoryVisitSink,
    StaticCredentialVerifier,
};
use crate::routes::{api_router, ApiDeps, LoginState};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use supply_insights::config::AppConfig;
use supply_insights::error::AppError;
use supply_insights::reviews::ReviewService;
use supply_insights::telemetry;
use supply_insights::throttle::{InMemoryAttemptStore, LoginThrottle};
use supply_insights::visit::{visit_middleware, VisitConfig, VisitLogger};
use tracing::info;

/// Health probes and metrics scrapes would otherwise dominate the visit log.
fn visit_config() -> VisitConfig {
    let mut config = VisitConfig::default();
    config.excluded_prefixes.extend(
        ["/health", "/ready", "/metrics"]
            .into_iter()
            .map(String::from),
    );
    config
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let sentiment = Arc::new(default_sentiment_engine(config.sentiment));
    let reviews = Arc::new(ReviewService::new(
        Arc::new(InMemoryReviewRepository::default()),
        sentiment.clone(),
    ));

    let attempt_store = Arc::new(InMemoryAttemptStore::new(config.throttle.lockout));
    let login = LoginState {
        throttle: Arc::new(LoginThrottle::new(attempt_store, config.throttle)),
        verifier: Arc::new(
            StaticCredentialVerifier::default().with_account("admin@supplyinsights.local", "admin"),
        ),
    };

    let visits = Arc::new(InMemoryVisitSink::default());
    let visit_logger = VisitLogger::new(visits.clone(), visit_config());

    let app = api_router(ApiDeps {
        reviews,
        sentiment,
        login,
        visits,
    })
    .layer(axum::middleware::from_fn_with_state(
        visit_logger,
        visit_middleware,
    ))
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "supply insights api ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method};
    use chrono::Utc;
    use std::sync::Mutex;
    use supply_insights::visit::{VisitLogError, VisitRecord, VisitSink};

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<VisitRecord>>,
    }

    impl VisitSink for RecordingSink {
        fn record(&self, record: VisitRecord) -> Result<(), VisitLogError> {
            self.records
                .lock()
                .expect("sink mutex poisoned")
                .push(record);
            Ok(())
        }
    }

    #[test]
    fn operational_endpoints_are_not_visit_logged() {
        let sink = Arc::new(RecordingSink::default());
        let logger = VisitLogger::new(sink.clone(), visit_config());
        let headers = HeaderMap::new();

        for path in [
            "/health",
            "/ready",
            "/metrics",
            "/static/app.css",
            "/admin/login",
        ] {
            logger.capture(&Method::GET, path, &headers, None, None, Utc::now());
        }
        logger.capture(&Method::GET, "/market/trends/", &headers, None, None, Utc::now());

        let records = sink.records.lock().expect("sink mutex poisoned");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "/market/trends/");
    }
}
