use super::model::LookupRecord;
use super::schema::{
    DeleteLookupResponse, LookupKind, LookupListResponse, LookupView, UpsertLookupRequest,
};
use crate::app::AppState;
use crate::infra::{LOOKUPS_COLLECTION, delete_records, upsert_record};
use crate::module::error::AppError;
use crate::module::pet::crud as pet_crud;
use crate::module::user::crud as user_crud;
use crate::service::validation_service::require_text;
use chrono::Utc;
use mongodb::bson::doc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const BRAZILIAN_STATES: [(&str, &str); 27] = [
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapa"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceara"),
    ("DF", "Distrito Federal"),
    ("ES", "Espirito Santo"),
    ("GO", "Goias"),
    ("MA", "Maranhao"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Para"),
    ("PB", "Paraiba"),
    ("PR", "Parana"),
    ("PE", "Pernambuco"),
    ("PI", "Piaui"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondonia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "Sao Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

#[derive(Debug, Default)]
pub struct LookupStore {
    inner: Mutex<LookupStoreInner>,
}

#[derive(Debug, Default)]
struct LookupStoreInner {
    records: BTreeMap<(LookupKind, i64), LookupRecord>,
    next_id: HashMap<LookupKind, i64>,
}

impl LookupStoreInner {
    fn allocate_id(&mut self, kind: LookupKind) -> i64 {
        let next = self.next_id.entry(kind).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    fn name_taken(&self, kind: LookupKind, parent_id: Option<i64>, name: &str, skip: Option<i64>) -> bool {
        self.records
            .range((kind, i64::MIN)..=(kind, i64::MAX))
            .any(|(_, r)| {
                Some(r.id) != skip && r.parent_id == parent_id && r.name.eq_ignore_ascii_case(name)
            })
    }

    fn has_children(&self, kind: LookupKind, id: i64) -> bool {
        self.records
            .values()
            .any(|r| r.kind.parent_kind() == Some(kind) && r.parent_id == Some(id))
    }
}

pub async fn list_lookups(
    state: &AppState,
    kind: LookupKind,
    parent_id: Option<i64>,
) -> Result<LookupListResponse, AppError> {
    if parent_id.is_some() && kind.parent_kind().is_none() {
        return Err(AppError::bad_request(
            "PARENT_NOT_SUPPORTED",
            format!("{} has no parent relation", kind.as_str()),
        ));
    }
    let inner = lock_store(&state.lookups)?;
    let items = inner
        .records
        .range((kind, i64::MIN)..=(kind, i64::MAX))
        .map(|(_, r)| r)
        .filter(|r| parent_id.is_none() || r.parent_id == parent_id)
        .map(LookupRecord::to_view)
        .collect();
    Ok(LookupListResponse { kind, items })
}

pub async fn get_lookup(state: &AppState, kind: LookupKind, id: i64) -> Result<LookupView, AppError> {
    Ok(require_lookup(&state.lookups, kind, id)?.to_view())
}

pub async fn create_lookup(
    state: &AppState,
    kind: LookupKind,
    req: UpsertLookupRequest,
) -> Result<LookupView, AppError> {
    let (name, code) = validate_upsert(kind, &req)?;
    let record = {
        // parent check and insert share one lock
        let mut inner = lock_store(&state.lookups)?;
        check_parent(&inner, kind, req.parent_id)?;
        if inner.name_taken(kind, req.parent_id, &name, None) {
            return Err(AppError::conflict(
                "LOOKUP_NAME_TAKEN",
                format!("{} '{name}' already exists", kind.as_str()),
            ));
        }
        let now = Utc::now().timestamp();
        let record = LookupRecord {
            id: inner.allocate_id(kind),
            kind,
            name,
            code,
            parent_id: req.parent_id,
            created_at: now,
            updated_at: now,
        };
        inner.records.insert((kind, record.id), record.clone());
        record
    };

    if let Err(err) = persist_lookup(state, &record).await {
        lock_store(&state.lookups)?.records.remove(&(kind, record.id));
        return Err(err);
    }
    info!(kind = kind.as_str(), id = record.id, "lookup created");
    Ok(record.to_view())
}

pub async fn update_lookup(
    state: &AppState,
    kind: LookupKind,
    id: i64,
    req: UpsertLookupRequest,
) -> Result<LookupView, AppError> {
    let (name, code) = validate_upsert(kind, &req)?;
    let (previous, record) = {
        let mut inner = lock_store(&state.lookups)?;
        check_parent(&inner, kind, req.parent_id)?;
        if inner.name_taken(kind, req.parent_id, &name, Some(id)) {
            return Err(AppError::conflict(
                "LOOKUP_NAME_TAKEN",
                format!("{} '{name}' already exists", kind.as_str()),
            ));
        }
        let record = inner
            .records
            .get_mut(&(kind, id))
            .ok_or_else(|| AppError::not_found(kind.not_found_code(), "lookup not found"))?;
        let previous = record.clone();
        record.name = name;
        record.code = code;
        record.parent_id = req.parent_id;
        record.updated_at = Utc::now().timestamp();
        (previous, record.clone())
    };

    if let Err(err) = persist_lookup(state, &record).await {
        lock_store(&state.lookups)?.records.insert((kind, id), previous);
        return Err(err);
    }
    Ok(record.to_view())
}

pub async fn delete_lookup(
    state: &AppState,
    kind: LookupKind,
    id: i64,
) -> Result<DeleteLookupResponse, AppError> {
    require_lookup(&state.lookups, kind, id)?;
    if pet_crud::references_lookup(&state.pets, kind, id)?
        || user_crud::references_location(&state.users, kind, id)?
    {
        return Err(AppError::conflict(
            "LOOKUP_IN_USE",
            format!("{} {id} is referenced by pets or users", kind.as_str()),
        ));
    }
    {
        let mut inner = lock_store(&state.lookups)?;
        if inner.has_children(kind, id) {
            return Err(AppError::conflict(
                "LOOKUP_HAS_CHILDREN",
                format!("{} {id} still has dependent entries", kind.as_str()),
            ));
        }
        inner.records.remove(&(kind, id));
    }
    if let Some(infra) = &state.infra {
        delete_records(infra, LOOKUPS_COLLECTION, doc! { "kind": kind.as_str(), "id": id }).await?;
    }
    Ok(DeleteLookupResponse {
        deleted: true,
        kind,
        id,
    })
}

pub fn require_lookup(store: &LookupStore, kind: LookupKind, id: i64) -> Result<LookupRecord, AppError> {
    lock_store(store)?
        .records
        .get(&(kind, id))
        .cloned()
        .ok_or_else(|| {
            AppError::not_found(
                kind.not_found_code(),
                format!("{} {id} not found", kind.as_str()),
            )
        })
}

/// Resolves an optional city/state pair; a city requires its state.
pub fn resolve_location(
    store: &LookupStore,
    city_id: Option<i64>,
    state_id: Option<i64>,
) -> Result<(Option<LookupRecord>, Option<LookupRecord>), AppError> {
    let state_rec = state_id
        .map(|id| require_lookup(store, LookupKind::State, id))
        .transpose()?;
    let city_rec = city_id
        .map(|id| require_lookup(store, LookupKind::City, id))
        .transpose()?;
    if let Some(city) = &city_rec {
        let Some(st) = &state_rec else {
            return Err(AppError::bad_request(
                "STATE_REQUIRED",
                "state_id is required when city_id is given",
            ));
        };
        if city.parent_id != Some(st.id) {
            return Err(AppError::bad_request(
                "CITY_STATE_MISMATCH",
                "city does not belong to the given state",
            ));
        }
    }
    Ok((city_rec, state_rec))
}

pub fn label_of(store: &LookupStore, kind: LookupKind, id: Option<i64>) -> Result<Option<String>, AppError> {
    let Some(id) = id else {
        return Ok(None);
    };
    let inner = lock_store(store)?;
    Ok(inner.records.get(&(kind, id)).map(|r| r.name.clone()))
}

pub fn hydrate(store: &LookupStore, records: Vec<LookupRecord>) -> Result<(), AppError> {
    let mut inner = lock_store(store)?;
    for record in records {
        let next = inner.next_id.entry(record.kind).or_insert(1);
        *next = (*next).max(record.id + 1);
        inner.records.insert((record.kind, record.id), record);
    }
    Ok(())
}

pub fn is_empty(store: &LookupStore) -> Result<bool, AppError> {
    Ok(lock_store(store)?.records.is_empty())
}

/// Seeds the reference tables a fresh deployment needs to list pets.
pub async fn seed_reference_data(state: &AppState) -> Result<usize, AppError> {
    let mut plan: Vec<(LookupKind, &str, Option<&str>)> = Vec::new();
    for name in ["Macho", "Femea"] {
        plan.push((LookupKind::Sex, name, None));
    }
    for name in ["Disponivel", "Em adocao", "Adotado"] {
        plan.push((LookupKind::Status, name, None));
    }
    for name in ["Filhote", "Jovem", "Adulto", "Idoso"] {
        plan.push((LookupKind::AgeBracket, name, None));
    }
    for name in ["Cachorro", "Gato"] {
        plan.push((LookupKind::Species, name, None));
    }
    for (code, name) in BRAZILIAN_STATES {
        plan.push((LookupKind::State, name, Some(code)));
    }

    let mut created = 0;
    for (kind, name, code) in plan {
        create_lookup(
            state,
            kind,
            UpsertLookupRequest {
                name: name.to_string(),
                code: code.map(ToOwned::to_owned),
                parent_id: None,
            },
        )
        .await?;
        created += 1;
    }
    info!(created, "reference data seeded");
    Ok(created)
}

fn validate_upsert(
    kind: LookupKind,
    req: &UpsertLookupRequest,
) -> Result<(String, Option<String>), AppError> {
    let name = require_text("INVALID_LOOKUP_NAME", "name", &req.name, 1, 120)?;
    match (kind.parent_kind(), req.parent_id) {
        (Some(parent), None) => {
            return Err(AppError::bad_request(
                "PARENT_REQUIRED",
                format!("{} requires a {} parent_id", kind.as_str(), parent.as_str()),
            ));
        }
        (None, Some(_)) => {
            return Err(AppError::bad_request(
                "PARENT_NOT_SUPPORTED",
                format!("{} has no parent relation", kind.as_str()),
            ));
        }
        _ => {}
    }

    let code = req
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_ascii_uppercase);
    if kind == LookupKind::State {
        let valid = code
            .as_deref()
            .is_some_and(|c| c.len() == 2 && c.chars().all(|ch| ch.is_ascii_alphabetic()));
        if !valid {
            return Err(AppError::bad_request(
                "INVALID_STATE_CODE",
                "state code must be a 2-letter abbreviation",
            ));
        }
    }
    Ok((name, code))
}

fn check_parent(
    inner: &LookupStoreInner,
    kind: LookupKind,
    parent_id: Option<i64>,
) -> Result<(), AppError> {
    if let (Some(parent_kind), Some(parent_id)) = (kind.parent_kind(), parent_id) {
        if !inner.records.contains_key(&(parent_kind, parent_id)) {
            return Err(AppError::not_found(
                parent_kind.not_found_code(),
                format!("{} {parent_id} not found", parent_kind.as_str()),
            ));
        }
    }
    Ok(())
}

async fn persist_lookup(state: &AppState, record: &LookupRecord) -> Result<(), AppError> {
    let Some(infra) = &state.infra else {
        return Ok(());
    };
    upsert_record(
        infra,
        LOOKUPS_COLLECTION,
        doc! { "kind": record.kind.as_str(), "id": record.id },
        record,
    )
    .await
}

fn lock_store(store: &LookupStore) -> Result<MutexGuard<'_, LookupStoreInner>, AppError> {
    store
        .inner
        .lock()
        .map_err(|_| AppError::internal("STORE_LOCK_ERROR", "lookup store lock poisoned"))
}
