use super::crud;
use super::schema::{AvailabilityQuery, RegisterUserRequest, UpdateUserRequest};
use crate::app::AppState;
use crate::module::auth::middleware::AuthUser;
use crate::module::error::reply;
use crate::module::extract::{ApiJson, ApiPath, ApiQuery};
use axum::extract::{Extension, State};
use axum::response::Response;

pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterUserRequest>,
) -> Response {
    reply(crud::register_user(&state, req).await, "user registration rejected")
}

pub async fn check_availability(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Response {
    reply(
        crud::check_availability(&state, query).await,
        "availability check rejected",
    )
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Response {
    reply(crud::list_users(&state, &actor).await, "user listing failed")
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(user_id): ApiPath<i64>,
) -> Response {
    reply(crud::get_user(&state, &actor, user_id).await, "user fetch failed")
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Response {
    reply(
        crud::update_user(&state, &actor, user_id, req).await,
        "user update rejected",
    )
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(user_id): ApiPath<i64>,
) -> Response {
    reply(
        crud::delete_user(&state, &actor, user_id).await,
        "user delete rejected",
    )
}
