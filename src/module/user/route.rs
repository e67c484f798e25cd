use super::controller;
use crate::app::AppState;
use crate::module::auth::middleware::require_auth;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

pub fn register_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/v1/users", post(controller::register_user))
        .route("/v1/users/availability", get(controller::check_availability));

    let protected = Router::new()
        .route("/v1/users", get(controller::list_users))
        .route(
            "/v1/users/:user_id",
            get(controller::get_user)
                .put(controller::update_user)
                .delete(controller::delete_user),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).with_state(state)
}
