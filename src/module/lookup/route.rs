use super::controller;
use crate::app::AppState;
use crate::module::auth::middleware::require_auth;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};

pub fn register_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/v1/lookups/:kind", get(controller::list_lookups))
        .route("/v1/lookups/:kind/:id", get(controller::get_lookup));

    let protected = Router::new()
        .route("/v1/lookups/:kind", post(controller::create_lookup))
        .route(
            "/v1/lookups/:kind/:id",
            put(controller::update_lookup).delete(controller::delete_lookup),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).with_state(state)
}
