use super::schema::{HealthMetricsView, HealthResponse};
use crate::app::AppState;
use crate::infra::{ping_mongo, ping_redis};
use crate::service::metrics_service;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (mongo_available, redis_available) = match &state.infra {
        Some(infra) => (ping_mongo(infra).await, ping_redis(infra).await),
        None => (false, false),
    };
    let m = metrics_service::snapshot();
    let metrics = HealthMetricsView {
        users_registered: m.users_registered,
        terms_created: m.terms_created,
        terms_resynced: m.terms_resynced,
        integrity_failures: m.integrity_failures,
        mails_sent: m.mails_sent,
        mails_failed: m.mails_failed,
        last_error_ts: m.last_error_ts,
    };
    // in-memory mode is healthy; a configured store must answer
    let ok = state.infra.is_none() || mongo_available;

    (
        StatusCode::OK,
        Json(HealthResponse {
            ok,
            env: state.config.rust_env.clone(),
            mongo_available,
            redis_available,
            mail_transport: state.mailer.transport_name().to_string(),
            metrics,
        }),
    )
}
