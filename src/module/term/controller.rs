use super::crud;
use super::schema::{CreateTermRequest, ResyncTermRequest, TermKind, TermListQuery};
use crate::app::AppState;
use crate::module::auth::middleware::AuthUser;
use crate::module::error::{AppError, reply};
use crate::module::extract::{ApiJson, ApiPath, ApiQuery};
use axum::extract::{Extension, State};
use axum::response::Response;

pub async fn create_term(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(kind): ApiPath<String>,
    ApiJson(req): ApiJson<CreateTermRequest>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::create_term(&state, &actor, kind, req).await,
        Err(err) => Err(err),
    };
    reply(result, "term create rejected")
}

pub async fn list_terms(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(query): ApiQuery<TermListQuery>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::list_terms(&state, &actor, kind, query).await,
        Err(err) => Err(err),
    };
    reply(result, "term listing failed")
}

pub async fn get_term(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath((kind, term_id)): ApiPath<(String, i64)>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::get_term(&state, &actor, kind, term_id).await,
        Err(err) => Err(err),
    };
    reply(result, "term fetch failed")
}

pub async fn resync_term(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath((kind, term_id)): ApiPath<(String, i64)>,
    ApiJson(req): ApiJson<ResyncTermRequest>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::resync_term(&state, &actor, kind, term_id, req).await,
        Err(err) => Err(err),
    };
    reply(result, "term resync rejected")
}

pub async fn validate_term(
    State(state): State<AppState>,
    ApiPath((kind, term_id)): ApiPath<(String, i64)>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::validate_term(&state, kind, term_id).await,
        Err(err) => Err(err),
    };
    reply(result, "term validation failed")
}

pub async fn term_document(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath((kind, term_id)): ApiPath<(String, i64)>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::term_document(&state, &actor, kind, term_id).await,
        Err(err) => Err(err),
    };
    reply(result, "term document failed")
}

pub async fn send_term(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    ApiPath((kind, term_id)): ApiPath<(String, i64)>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::send_term(&state, &actor, kind, term_id).await,
        Err(err) => Err(err),
    };
    reply(result, "term delivery failed")
}

fn parse_kind(segment: &str) -> Result<TermKind, AppError> {
    TermKind::parse(segment).ok_or_else(|| {
        AppError::bad_request(
            "UNKNOWN_TERM_KIND",
            format!("unknown term kind: {segment}"),
        )
    })
}
