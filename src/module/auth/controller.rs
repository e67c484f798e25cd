use super::crud;
use super::middleware::AuthUser;
use super::schema::{LoginRequest, PasswordResetRequest, RecoveryRequest, RecoveryVerifyRequest};
use crate::app::AppState;
use crate::module::error::reply;
use crate::module::extract::ApiJson;
use axum::extract::{Extension, State};
use axum::response::Response;

pub async fn login(State(state): State<AppState>, ApiJson(req): ApiJson<LoginRequest>) -> Response {
    reply(crud::login(&state, req).await, "login rejected")
}

pub async fn me(State(state): State<AppState>, Extension(actor): Extension<AuthUser>) -> Response {
    reply(crud::me(&state, &actor).await, "profile fetch failed")
}

pub async fn request_recovery(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RecoveryRequest>,
) -> Response {
    reply(
        crud::request_recovery(&state, req).await,
        "recovery request failed",
    )
}

pub async fn verify_recovery(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RecoveryVerifyRequest>,
) -> Response {
    reply(
        crud::verify_recovery(&state, req).await,
        "recovery verification failed",
    )
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PasswordResetRequest>,
) -> Response {
    reply(crud::reset_password(&state, req).await, "password reset rejected")
}
