use super::crud;
use super::schema::{AddDiseaseRequest, CreatePetRequest, PetListQuery, UpdatePetRequest};
use crate::app::AppState;
use crate::module::auth::middleware::AuthUser;
use crate::module::error::reply;
use crate::module::extract::{ApiJson, ApiPath, ApiQuery};
use axum::extract::{Extension, State};
use axum::response::Response;

pub async fn create_pet(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreatePetRequest>,
) -> Response {
    reply(crud::create_pet(&state, &actor, req).await, "pet create rejected")
}

pub async fn list_pets(State(state): State<AppState>, ApiQuery(query): ApiQuery<PetListQuery>) -> Response {
    reply(crud::list_pets(&state, query).await, "pet listing failed")
}

pub async fn get_pet(State(state): State<AppState>, ApiPath(pet_id): ApiPath<i64>) -> Response {
    reply(crud::get_pet(&state, pet_id).await, "pet fetch failed")
}

pub async fn update_pet(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(pet_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdatePetRequest>,
) -> Response {
    reply(
        crud::update_pet(&state, &actor, pet_id, req).await,
        "pet update rejected",
    )
}

pub async fn delete_pet(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(pet_id): ApiPath<i64>,
) -> Response {
    reply(crud::delete_pet(&state, &actor, pet_id).await, "pet delete rejected")
}

pub async fn list_pet_diseases(State(state): State<AppState>, ApiPath(pet_id): ApiPath<i64>) -> Response {
    reply(
        crud::list_pet_diseases(&state, pet_id).await,
        "pet disease listing failed",
    )
}

pub async fn add_pet_disease(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(pet_id): ApiPath<i64>,
    ApiJson(req): ApiJson<AddDiseaseRequest>,
) -> Response {
    reply(
        crud::add_pet_disease(&state, &actor, pet_id, req).await,
        "pet disease link rejected",
    )
}

pub async fn remove_pet_disease(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath((pet_id, disease_id)): ApiPath<(i64, i64)>,
) -> Response {
    reply(
        crud::remove_pet_disease(&state, &actor, pet_id, disease_id).await,
        "pet disease unlink rejected",
    )
}
