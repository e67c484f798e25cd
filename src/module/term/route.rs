use super::controller;
use crate::app::AppState;
use crate::module::auth::middleware::require_auth;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

pub fn register_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/terms/:kind",
            post(controller::create_term).get(controller::list_terms),
        )
        .route("/v1/terms/:kind/:term_id", get(controller::get_term))
        .route("/v1/terms/:kind/:term_id/resync", post(controller::resync_term))
        .route("/v1/terms/:kind/:term_id/validate", get(controller::validate_term))
        .route("/v1/terms/:kind/:term_id/document", get(controller::term_document))
        .route("/v1/terms/:kind/:term_id/send", post(controller::send_term))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
