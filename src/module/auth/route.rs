use super::controller;
use super::middleware::require_auth;
use crate::app::AppState;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

pub fn register_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/v1/auth/login", post(controller::login))
        .route("/v1/auth/recovery/request", post(controller::request_recovery))
        .route("/v1/auth/recovery/verify", post(controller::verify_recovery))
        .route("/v1/auth/recovery/reset", post(controller::reset_password));

    let protected = Router::new()
        .route("/v1/auth/me", get(controller::me))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).with_state(state)
}
