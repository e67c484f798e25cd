use super::crud;
use super::schema::{LookupKind, LookupListQuery, UpsertLookupRequest};
use crate::app::AppState;
use crate::module::error::{AppError, reply};
use crate::module::extract::{ApiJson, ApiPath, ApiQuery};
use axum::extract::State;
use axum::response::Response;

pub async fn list_lookups(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(query): ApiQuery<LookupListQuery>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::list_lookups(&state, kind, query.parent_id).await,
        Err(err) => Err(err),
    };
    reply(result, "lookup listing failed")
}

pub async fn get_lookup(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::get_lookup(&state, kind, id).await,
        Err(err) => Err(err),
    };
    reply(result, "lookup fetch failed")
}

pub async fn create_lookup(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiJson(req): ApiJson<UpsertLookupRequest>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::create_lookup(&state, kind, req).await,
        Err(err) => Err(err),
    };
    reply(result, "lookup create rejected")
}

pub async fn update_lookup(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
    ApiJson(req): ApiJson<UpsertLookupRequest>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::update_lookup(&state, kind, id, req).await,
        Err(err) => Err(err),
    };
    reply(result, "lookup update rejected")
}

pub async fn delete_lookup(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, i64)>,
) -> Response {
    let result = match parse_kind(&kind) {
        Ok(kind) => crud::delete_lookup(&state, kind, id).await,
        Err(err) => Err(err),
    };
    reply(result, "lookup delete rejected")
}

fn parse_kind(segment: &str) -> Result<LookupKind, AppError> {
    LookupKind::from_path(segment).ok_or_else(|| {
        AppError::bad_request(
            "UNKNOWN_LOOKUP_KIND",
            format!("unknown lookup table: {segment}"),
        )
    })
}
