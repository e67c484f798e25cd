use crate::app::AppState;
use crate::module::error::AppError;
use crate::module::user::crud as user_crud;
use crate::service::token_service::verify_access_token;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Identity of the bearer, inserted into request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authenticate(&state, request.headers()) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => {
            warn!(
                error_code = err.code,
                reason = %err.message,
                path = %request.uri().path(),
                "request rejected by auth"
            );
            err.into_response()
        }
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("AUTH_REQUIRED", "missing bearer token"))?;
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::unauthorized("AUTH_MALFORMED", "authorization header must be Bearer <token>")
        })?;

    let claims = verify_access_token(token, &state.config.jwt_secret)
        .map_err(|e| AppError::unauthorized("INVALID_TOKEN", e.to_string()))?;
    let user_id = claims
        .user_id()
        .map_err(|e| AppError::unauthorized("INVALID_TOKEN", e.to_string()))?;
    if user_crud::find_user(&state.users, user_id)?.is_none() {
        return Err(AppError::unauthorized(
            "UNKNOWN_USER",
            "token subject no longer exists",
        ));
    }
    Ok(AuthUser { user_id })
}
