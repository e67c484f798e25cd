use super::model::PetRecord;
use super::schema::{
    AddDiseaseRequest, CreatePetRequest, DeletePetResponse, DiseaseView, PetDiseasesResponse,
    PetListQuery, PetListResponse, PetView, UpdatePetRequest,
};
use crate::app::AppState;
use crate::infra::{PETS_COLLECTION, delete_records, upsert_record};
use crate::module::auth::middleware::AuthUser;
use crate::module::error::AppError;
use crate::module::lookup::crud::{label_of, require_lookup, resolve_location};
use crate::module::lookup::schema::LookupKind;
use crate::module::term::crud as term_crud;
use crate::service::validation_service::{optional_text, require_text};
use chrono::Utc;
use mongodb::bson::doc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const MAX_PET_AGE: u32 = 40;

#[derive(Debug, Default)]
pub struct PetStore {
    inner: Mutex<PetStoreInner>,
}

#[derive(Debug)]
struct PetStoreInner {
    pets: BTreeMap<i64, PetRecord>,
    next_id: i64,
}

impl Default for PetStoreInner {
    fn default() -> Self {
        Self {
            pets: BTreeMap::new(),
            next_id: 1,
        }
    }
}

pub async fn create_pet(
    state: &AppState,
    actor: &AuthUser,
    req: CreatePetRequest,
) -> Result<PetView, AppError> {
    let name = require_text("INVALID_PET_NAME", "name", &req.name, 1, 80)?;
    check_age(req.age)?;
    let description = optional_text("INVALID_DESCRIPTION", "description", req.description.as_deref(), 2000)?;
    let donation_reason = optional_text(
        "INVALID_DONATION_REASON",
        "donation_reason",
        req.donation_reason.as_deref(),
        500,
    )?;

    let now = Utc::now().timestamp();
    let mut draft = PetRecord {
        id: 0,
        owner_id: actor.user_id,
        name,
        species_id: req.species_id,
        breed_id: req.breed_id,
        age: req.age,
        age_bracket_id: req.age_bracket_id,
        sex_id: req.sex_id,
        status_id: req.status_id,
        city_id: req.city_id,
        state_id: req.state_id,
        description,
        donation_reason,
        disease_ids: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    for disease_id in req.disease_ids {
        if !draft.disease_ids.contains(&disease_id) {
            draft.disease_ids.push(disease_id);
        }
    }
    check_references(state, &draft)?;

    let pet = {
        let mut inner = lock_store(&state.pets)?;
        draft.id = inner.next_id;
        inner.next_id += 1;
        inner.pets.insert(draft.id, draft.clone());
        draft
    };
    if let Err(err) = persist_pet(state, &pet).await {
        lock_store(&state.pets)?.pets.remove(&pet.id);
        return Err(err);
    }
    info!(pet_id = pet.id, owner_id = pet.owner_id, "pet created");
    to_view(state, &pet)
}

pub async fn list_pets(state: &AppState, query: PetListQuery) -> Result<PetListResponse, AppError> {
    let matches = |expected: Option<i64>, actual: i64| expected.is_none_or(|v| v == actual);
    let pets = lock_store(&state.pets)?
        .pets
        .values()
        .filter(|p| {
            matches(query.owner_id, p.owner_id)
                && matches(query.status_id, p.status_id)
                && matches(query.breed_id, p.breed_id)
                && matches(query.species_id, p.species_id)
                && matches(query.state_id, p.state_id)
                && matches(query.city_id, p.city_id)
                && matches(query.age_bracket_id, p.age_bracket_id)
                && matches(query.sex_id, p.sex_id)
        })
        .cloned()
        .collect::<Vec<_>>();
    let pets = pets
        .iter()
        .map(|p| to_view(state, p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PetListResponse { pets })
}

pub async fn get_pet(state: &AppState, pet_id: i64) -> Result<PetView, AppError> {
    let pet = require_pet(&state.pets, pet_id)?;
    to_view(state, &pet)
}

pub async fn update_pet(
    state: &AppState,
    actor: &AuthUser,
    pet_id: i64,
    req: UpdatePetRequest,
) -> Result<PetView, AppError> {
    let current = require_pet(&state.pets, pet_id)?;
    ensure_owner(actor, &current)?;

    let mut next = current.clone();
    if let Some(name) = req.name.as_deref() {
        next.name = require_text("INVALID_PET_NAME", "name", name, 1, 80)?;
    }
    if let Some(age) = req.age {
        check_age(age)?;
        next.age = age;
    }
    if req.description.is_some() {
        next.description =
            optional_text("INVALID_DESCRIPTION", "description", req.description.as_deref(), 2000)?;
    }
    if req.donation_reason.is_some() {
        next.donation_reason = optional_text(
            "INVALID_DONATION_REASON",
            "donation_reason",
            req.donation_reason.as_deref(),
            500,
        )?;
    }
    next.species_id = req.species_id.unwrap_or(next.species_id);
    next.breed_id = req.breed_id.unwrap_or(next.breed_id);
    next.age_bracket_id = req.age_bracket_id.unwrap_or(next.age_bracket_id);
    next.sex_id = req.sex_id.unwrap_or(next.sex_id);
    next.status_id = req.status_id.unwrap_or(next.status_id);
    next.city_id = req.city_id.unwrap_or(next.city_id);
    next.state_id = req.state_id.unwrap_or(next.state_id);
    next.updated_at = Utc::now().timestamp();
    check_references(state, &next)?;

    let previous = replace_pet(&state.pets, next.clone())?;
    if let Err(err) = persist_pet(state, &next).await {
        replace_pet(&state.pets, previous)?;
        return Err(err);
    }
    info!(pet_id, "pet updated");
    to_view(state, &next)
}

pub async fn delete_pet(
    state: &AppState,
    actor: &AuthUser,
    pet_id: i64,
) -> Result<DeletePetResponse, AppError> {
    let pet = require_pet(&state.pets, pet_id)?;
    ensure_owner(actor, &pet)?;
    let terms_removed = term_crud::remove_terms_for_pet(state, pet_id).await?;
    lock_store(&state.pets)?.pets.remove(&pet_id);
    if let Some(infra) = &state.infra {
        delete_records(infra, PETS_COLLECTION, doc! { "id": pet_id }).await?;
    }
    info!(pet_id, terms_removed, "pet deleted");
    Ok(DeletePetResponse {
        deleted: true,
        pet_id,
        terms_removed,
    })
}

pub async fn list_pet_diseases(state: &AppState, pet_id: i64) -> Result<PetDiseasesResponse, AppError> {
    let pet = require_pet(&state.pets, pet_id)?;
    Ok(PetDiseasesResponse {
        pet_id,
        diseases: disease_views(state, &pet)?,
    })
}

pub async fn add_pet_disease(
    state: &AppState,
    actor: &AuthUser,
    pet_id: i64,
    req: AddDiseaseRequest,
) -> Result<PetDiseasesResponse, AppError> {
    let pet = require_pet(&state.pets, pet_id)?;
    ensure_owner(actor, &pet)?;
    require_lookup(&state.lookups, LookupKind::Disease, req.disease_id)?;
    if pet.disease_ids.contains(&req.disease_id) {
        return list_pet_diseases(state, pet_id).await;
    }

    let mut next = pet;
    next.disease_ids.push(req.disease_id);
    next.updated_at = Utc::now().timestamp();
    let previous = replace_pet(&state.pets, next.clone())?;
    if let Err(err) = persist_pet(state, &next).await {
        replace_pet(&state.pets, previous)?;
        return Err(err);
    }
    info!(pet_id, disease_id = req.disease_id, "disease linked");
    Ok(PetDiseasesResponse {
        pet_id,
        diseases: disease_views(state, &next)?,
    })
}

pub async fn remove_pet_disease(
    state: &AppState,
    actor: &AuthUser,
    pet_id: i64,
    disease_id: i64,
) -> Result<PetDiseasesResponse, AppError> {
    let pet = require_pet(&state.pets, pet_id)?;
    ensure_owner(actor, &pet)?;
    if !pet.disease_ids.contains(&disease_id) {
        return Err(AppError::not_found(
            "DISEASE_NOT_LINKED",
            format!("disease {disease_id} is not linked to pet {pet_id}"),
        ));
    }

    let mut next = pet;
    next.disease_ids.retain(|id| *id != disease_id);
    next.updated_at = Utc::now().timestamp();
    let previous = replace_pet(&state.pets, next.clone())?;
    if let Err(err) = persist_pet(state, &next).await {
        replace_pet(&state.pets, previous)?;
        return Err(err);
    }
    info!(pet_id, disease_id, "disease unlinked");
    Ok(PetDiseasesResponse {
        pet_id,
        diseases: disease_views(state, &next)?,
    })
}

/// Removes every pet of `owner_id` along with their terms.
/// Returns (pets removed, terms removed).
pub async fn remove_pets_of_owner(state: &AppState, owner_id: i64) -> Result<(usize, usize), AppError> {
    let pet_ids = lock_store(&state.pets)?
        .pets
        .values()
        .filter(|p| p.owner_id == owner_id)
        .map(|p| p.id)
        .collect::<Vec<_>>();

    let mut terms_removed = 0;
    for pet_id in &pet_ids {
        terms_removed += term_crud::remove_terms_for_pet(state, *pet_id).await?;
    }
    {
        let mut inner = lock_store(&state.pets)?;
        for pet_id in &pet_ids {
            inner.pets.remove(pet_id);
        }
    }
    if let Some(infra) = &state.infra {
        delete_records(infra, PETS_COLLECTION, doc! { "owner_id": owner_id }).await?;
    }
    Ok((pet_ids.len(), terms_removed))
}

pub fn require_pet(store: &PetStore, pet_id: i64) -> Result<PetRecord, AppError> {
    lock_store(store)?
        .pets
        .get(&pet_id)
        .cloned()
        .ok_or_else(|| AppError::not_found("PET_NOT_FOUND", format!("pet {pet_id} not found")))
}

pub fn references_lookup(store: &PetStore, kind: LookupKind, id: i64) -> Result<bool, AppError> {
    let inner = lock_store(store)?;
    Ok(inner.pets.values().any(|p| match kind {
        LookupKind::Species => p.species_id == id,
        LookupKind::Breed => p.breed_id == id,
        LookupKind::State => p.state_id == id,
        LookupKind::City => p.city_id == id,
        LookupKind::AgeBracket => p.age_bracket_id == id,
        LookupKind::Status => p.status_id == id,
        LookupKind::Sex => p.sex_id == id,
        LookupKind::Disease => p.disease_ids.contains(&id),
    }))
}

pub fn hydrate(store: &PetStore, pets: Vec<PetRecord>) -> Result<(), AppError> {
    let mut inner = lock_store(store)?;
    for pet in pets {
        inner.next_id = inner.next_id.max(pet.id + 1);
        inner.pets.insert(pet.id, pet);
    }
    Ok(())
}

pub fn to_view(state: &AppState, pet: &PetRecord) -> Result<PetView, AppError> {
    let label = |kind: LookupKind, id: i64| label_of(&state.lookups, kind, Some(id));
    Ok(PetView {
        id: pet.id,
        owner_id: pet.owner_id,
        name: pet.name.clone(),
        species_id: pet.species_id,
        species: label(LookupKind::Species, pet.species_id)?,
        breed_id: pet.breed_id,
        breed: label(LookupKind::Breed, pet.breed_id)?,
        age: pet.age,
        age_bracket_id: pet.age_bracket_id,
        age_bracket: label(LookupKind::AgeBracket, pet.age_bracket_id)?,
        sex_id: pet.sex_id,
        sex: label(LookupKind::Sex, pet.sex_id)?,
        status_id: pet.status_id,
        status: label(LookupKind::Status, pet.status_id)?,
        city_id: pet.city_id,
        city: label(LookupKind::City, pet.city_id)?,
        state_id: pet.state_id,
        state: label(LookupKind::State, pet.state_id)?,
        description: pet.description.clone(),
        donation_reason: pet.donation_reason.clone(),
        diseases: disease_views(state, pet)?,
        created_at: pet.created_at,
        updated_at: pet.updated_at,
    })
}

fn disease_views(state: &AppState, pet: &PetRecord) -> Result<Vec<DiseaseView>, AppError> {
    let mut out = Vec::with_capacity(pet.disease_ids.len());
    for id in &pet.disease_ids {
        if let Some(name) = label_of(&state.lookups, LookupKind::Disease, Some(*id))? {
            out.push(DiseaseView { id: *id, name });
        }
    }
    Ok(out)
}

fn check_references(state: &AppState, pet: &PetRecord) -> Result<(), AppError> {
    require_lookup(&state.lookups, LookupKind::Species, pet.species_id)?;
    let breed = require_lookup(&state.lookups, LookupKind::Breed, pet.breed_id)?;
    if breed.parent_id != Some(pet.species_id) {
        return Err(AppError::bad_request(
            "BREED_SPECIES_MISMATCH",
            "breed does not belong to the given species",
        ));
    }
    require_lookup(&state.lookups, LookupKind::AgeBracket, pet.age_bracket_id)?;
    require_lookup(&state.lookups, LookupKind::Sex, pet.sex_id)?;
    require_lookup(&state.lookups, LookupKind::Status, pet.status_id)?;
    resolve_location(&state.lookups, Some(pet.city_id), Some(pet.state_id))?;
    for disease_id in &pet.disease_ids {
        require_lookup(&state.lookups, LookupKind::Disease, *disease_id)?;
    }
    Ok(())
}

fn check_age(age: u32) -> Result<(), AppError> {
    if age > MAX_PET_AGE {
        return Err(AppError::bad_request(
            "INVALID_PET_AGE",
            format!("age must be between 0 and {MAX_PET_AGE}"),
        ));
    }
    Ok(())
}

fn ensure_owner(actor: &AuthUser, pet: &PetRecord) -> Result<(), AppError> {
    if pet.owner_id != actor.user_id {
        return Err(AppError::forbidden(
            "NOT_PET_OWNER",
            format!("pet {} belongs to another user", pet.id),
        ));
    }
    Ok(())
}

fn replace_pet(store: &PetStore, pet: PetRecord) -> Result<PetRecord, AppError> {
    let mut inner = lock_store(store)?;
    let id = pet.id;
    inner
        .pets
        .insert(id, pet)
        .ok_or_else(|| AppError::not_found("PET_NOT_FOUND", format!("pet {id} not found")))
}

async fn persist_pet(state: &AppState, pet: &PetRecord) -> Result<(), AppError> {
    let Some(infra) = &state.infra else {
        return Ok(());
    };
    upsert_record(infra, PETS_COLLECTION, doc! { "id": pet.id }, pet).await
}

fn lock_store(store: &PetStore) -> Result<MutexGuard<'_, PetStoreInner>, AppError> {
    store
        .inner
        .lock()
        .map_err(|_| AppError::internal("STORE_LOCK_ERROR", "pet store lock poisoned"))
}
