use super::controller;
use crate::app::AppState;
use crate::module::auth::middleware::require_auth;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};

pub fn register_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/v1/pets", get(controller::list_pets))
        .route("/v1/pets/:pet_id", get(controller::get_pet))
        .route("/v1/pets/:pet_id/diseases", get(controller::list_pet_diseases));

    let protected = Router::new()
        .route("/v1/pets", post(controller::create_pet))
        .route(
            "/v1/pets/:pet_id",
            put(controller::update_pet).delete(controller::delete_pet),
        )
        .route("/v1/pets/:pet_id/diseases", post(controller::add_pet_disease))
        .route(
            "/v1/pets/:pet_id/diseases/:disease_id",
            delete(controller::remove_pet_disease),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).with_state(state)
}
