use super::model::{PartySnapshot, PetSnapshot, TermRecord};
use super::schema::{
    CreateTermRequest, NotificationView, ResyncTermRequest, SendTermResponse, TermDocumentResponse,
    TermKind, TermListQuery, TermListResponse, TermView, TermWriteResponse, ValidateTermResponse,
};
use crate::app::AppState;
use crate::infra::{delete_records, upsert_record};
use crate::module::auth::middleware::AuthUser;
use crate::module::error::AppError;
use crate::module::lookup::crud::label_of;
use crate::module::lookup::schema::LookupKind;
use crate::module::pet::crud as pet_crud;
use crate::module::pet::model::PetRecord;
use crate::module::user::crud as user_crud;
use crate::module::user::model::UserRecord;
use crate::service::document_service::{RenderedDocument, render_term};
use crate::service::integrity_service::{compute_hash, verify_integrity};
use crate::service::mail_service::compose_term_mails;
use crate::service::metrics_service;
use crate::service::validation_service::{optional_text, require_text};
use chrono::Utc;
use mongodb::bson::doc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

const MAX_SIGNATURE_CHARS: usize = 200;
const MAX_OBSERVATION_CHARS: usize = 2000;

#[derive(Debug, Default)]
pub struct TermStore {
    inner: Mutex<TermStoreInner>,
}

#[derive(Debug, Default)]
struct TermStoreInner {
    terms: HashMap<TermKind, BTreeMap<i64, TermRecord>>,
    next_id: HashMap<TermKind, i64>,
    // (kind, pet_id or donor_id) -> term id
    unique: HashMap<(TermKind, i64), i64>,
}

impl TermStoreInner {
    fn allocate_id(&mut self, kind: TermKind) -> i64 {
        let next = self.next_id.entry(kind).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    fn insert(&mut self, term: TermRecord) {
        self.unique.insert(uniqueness_key(&term), term.id);
        self.terms.entry(term.kind).or_default().insert(term.id, term);
    }

    fn remove(&mut self, kind: TermKind, id: i64) -> Option<TermRecord> {
        let term = self.terms.get_mut(&kind)?.remove(&id)?;
        self.unique.remove(&uniqueness_key(&term));
        Some(term)
    }

    fn get(&self, kind: TermKind, id: i64) -> Option<&TermRecord> {
        self.terms.get(&kind).and_then(|m| m.get(&id))
    }
}

/// Adoption and compromise terms are unique per pet, donation terms per donor.
fn uniqueness_key(term: &TermRecord) -> (TermKind, i64) {
    match term.kind {
        TermKind::Donation => (term.kind, term.donor_id),
        _ => (term.kind, term.pet_id.unwrap_or_default()),
    }
}

pub async fn create_term(
    state: &AppState,
    actor: &AuthUser,
    kind: TermKind,
    req: CreateTermRequest,
) -> Result<TermWriteResponse, AppError> {
    let signature = validate_signature(&req.signature_text)?;
    let observations = optional_text(
        "INVALID_OBSERVATIONS",
        "observations",
        req.observations.as_deref(),
        MAX_OBSERVATION_CHARS,
    )?;

    let parties = if kind.has_adopter() {
        resolve_adoption_parties(state, actor, &req)?
    } else {
        resolve_donation_parties(state, actor, &req)?
    };

    let now = Utc::now();
    let mut draft = TermRecord {
        id: 0,
        kind,
        pet_id: parties.pet.as_ref().map(|p| p.id),
        donor_id: parties.donor.id,
        adopter_id: parties.adopter.as_ref().map(|a| a.id),
        pet: parties
            .pet
            .as_ref()
            .map(|p| pet_snapshot(state, p))
            .transpose()?,
        donor: party_snapshot(state, &parties.donor)?,
        adopter: parties
            .adopter
            .as_ref()
            .map(|a| party_snapshot(state, a))
            .transpose()?,
        digital_signature: signature,
        signed_at: now.timestamp_millis(),
        observations,
        integrity_hash: String::new(),
        snapshot_digest: String::new(),
        created_at: now.timestamp(),
        updated_at: now.timestamp(),
    };
    compute_hash(&mut draft).map_err(|e| AppError::internal("TERM_HASH_FAILED", e))?;

    let term = {
        // uniqueness check and insert share one lock
        let mut inner = lock_store(&state.terms)?;
        if inner.unique.contains_key(&uniqueness_key(&draft)) {
            return Err(duplicate_term(kind));
        }
        draft.id = inner.allocate_id(kind);
        inner.insert(draft.clone());
        draft
    };

    if let Err(err) = persist_term(state, &term).await {
        lock_store(&state.terms)?.remove(kind, term.id);
        return Err(if err.code == "UNIQUE_CONSTRAINT" {
            duplicate_term(kind)
        } else {
            err
        });
    }
    metrics_service::inc_terms_created();
    info!(
        kind = kind.as_str(),
        term_id = term.id,
        pet_id = ?term.pet_id,
        donor_id = term.donor_id,
        adopter_id = ?term.adopter_id,
        "term created"
    );

    let notification = notify_parties(state, &term).await;
    Ok(TermWriteResponse {
        term: to_view(&term),
        notification,
    })
}

/// Re-reads the adopter's live data into the snapshot and re-signs. Pet and
/// donor snapshots are left untouched.
pub async fn resync_term(
    state: &AppState,
    actor: &AuthUser,
    kind: TermKind,
    term_id: i64,
    req: ResyncTermRequest,
) -> Result<TermWriteResponse, AppError> {
    if !kind.has_adopter() {
        return Err(AppError::bad_request(
            "RESYNC_NOT_SUPPORTED",
            "donation terms have no adopter to resync",
        ));
    }
    let signature = validate_signature(&req.signature_text)?;
    let current = require_term(&state.terms, kind, term_id)?;
    let adopter = user_crud::require_user(&state.users, req.adopter_id)?;
    if current.adopter_id != Some(req.adopter_id) {
        return Err(AppError::forbidden(
            "NOT_TERM_ADOPTER",
            format!("user {} is not the adopter of this term", req.adopter_id),
        ));
    }
    if actor.user_id != req.adopter_id {
        return Err(AppError::forbidden(
            "NOT_SIGNING_PARTY",
            "only the adopter can re-sign this term",
        ));
    }

    let now = Utc::now();
    let mut next = current.clone();
    next.adopter = Some(party_snapshot(state, &adopter)?);
    next.digital_signature = signature;
    next.signed_at = now.timestamp_millis();
    next.updated_at = now.timestamp();
    compute_hash(&mut next).map_err(|e| AppError::internal("TERM_HASH_FAILED", e))?;

    replace_term(&state.terms, next.clone())?;
    if let Err(err) = persist_term(state, &next).await {
        replace_term(&state.terms, current)?;
        return Err(err);
    }
    metrics_service::inc_terms_resynced();
    info!(kind = kind.as_str(), term_id, "term resynced");

    let notification = notify_parties(state, &next).await;
    Ok(TermWriteResponse {
        term: to_view(&next),
        notification,
    })
}

pub async fn list_terms(
    state: &AppState,
    actor: &AuthUser,
    kind: TermKind,
    query: TermListQuery,
) -> Result<TermListResponse, AppError> {
    let inner = lock_store(&state.terms)?;
    let terms = inner
        .terms
        .get(&kind)
        .map(|m| {
            m.values()
                .filter(|t| t.involves(actor.user_id))
                .filter(|t| query.pet_id.is_none() || t.pet_id == query.pet_id)
                .filter(|t| query.donor_id.is_none_or(|d| t.donor_id == d))
                .filter(|t| query.adopter_id.is_none() || t.adopter_id == query.adopter_id)
                .map(to_view)
                .collect()
        })
        .unwrap_or_default();
    Ok(TermListResponse { kind, terms })
}

pub async fn get_term(
    state: &AppState,
    actor: &AuthUser,
    kind: TermKind,
    term_id: i64,
) -> Result<TermView, AppError> {
    let term = require_party_term(state, actor, kind, term_id)?;
    Ok(to_view(&term))
}

pub async fn validate_term(
    state: &AppState,
    kind: TermKind,
    term_id: i64,
) -> Result<ValidateTermResponse, AppError> {
    let term = require_term(&state.terms, kind, term_id)?;
    let valid =
        verify_integrity(&term).map_err(|e| AppError::internal("TERM_HASH_FAILED", e))?;
    if !valid {
        metrics_service::inc_integrity_failures();
        warn!(kind = kind.as_str(), term_id, "term integrity check failed");
    }
    Ok(ValidateTermResponse {
        term_id,
        kind,
        valid,
    })
}

pub async fn term_document(
    state: &AppState,
    actor: &AuthUser,
    kind: TermKind,
    term_id: i64,
) -> Result<TermDocumentResponse, AppError> {
    let term = require_party_term(state, actor, kind, term_id)?;
    let document = render_term(&term);
    Ok(document_response(&term, &document))
}

pub async fn send_term(
    state: &AppState,
    actor: &AuthUser,
    kind: TermKind,
    term_id: i64,
) -> Result<SendTermResponse, AppError> {
    let term = require_party_term(state, actor, kind, term_id)?;
    let document = render_term(&term);
    let mails = compose_term_mails(state.mailer.from_address(), &term, &document);
    let recipients = state
        .mailer
        .deliver_all(mails)
        .await
        .map_err(|e| AppError::internal("MAIL_DELIVERY_FAILED", e.to_string()))?;
    info!(kind = kind.as_str(), term_id, "term re-sent");
    Ok(SendTermResponse {
        term_id,
        kind,
        recipients,
    })
}

/// Drops every term of any kind that references `pet_id`.
pub async fn remove_terms_for_pet(state: &AppState, pet_id: i64) -> Result<usize, AppError> {
    let removed = remove_matching(&state.terms, |t| t.pet_id == Some(pet_id))?;
    if let Some(infra) = &state.infra {
        for kind in TermKind::ALL {
            delete_records(infra, kind.collection(), doc! { "pet_id": pet_id }).await?;
        }
    }
    Ok(removed)
}

/// Drops every term where `user_id` is donor or adopter.
pub async fn remove_terms_for_user(state: &AppState, user_id: i64) -> Result<usize, AppError> {
    let removed = remove_matching(&state.terms, |t| t.involves(user_id))?;
    if let Some(infra) = &state.infra {
        for kind in TermKind::ALL {
            delete_records(
                infra,
                kind.collection(),
                doc! { "$or": [{ "donor_id": user_id }, { "adopter_id": user_id }] },
            )
            .await?;
        }
    }
    Ok(removed)
}

pub fn hydrate(store: &TermStore, terms: Vec<TermRecord>) -> Result<(), AppError> {
    let mut inner = lock_store(store)?;
    for term in terms {
        let next = inner.next_id.entry(term.kind).or_insert(1);
        *next = (*next).max(term.id + 1);
        inner.insert(term);
    }
    Ok(())
}

pub fn require_term(store: &TermStore, kind: TermKind, term_id: i64) -> Result<TermRecord, AppError> {
    lock_store(store)?
        .get(kind, term_id)
        .cloned()
        .ok_or_else(|| {
            AppError::not_found(
                "TERM_NOT_FOUND",
                format!("{} term {term_id} not found", kind.as_str()),
            )
        })
}

pub fn to_view(term: &TermRecord) -> TermView {
    TermView {
        id: term.id,
        kind: term.kind,
        pet_id: term.pet_id,
        donor_id: term.donor_id,
        adopter_id: term.adopter_id,
        pet: term.pet.clone(),
        donor: term.donor.clone(),
        adopter: term.adopter.clone(),
        digital_signature: term.digital_signature.clone(),
        signed_at: term.signed_at,
        observations: term.observations.clone(),
        integrity_hash: term.integrity_hash.clone(),
        snapshot_digest: term.snapshot_digest.clone(),
        created_at: term.created_at,
        updated_at: term.updated_at,
    }
}

struct Parties {
    pet: Option<PetRecord>,
    donor: UserRecord,
    adopter: Option<UserRecord>,
}

fn resolve_adoption_parties(
    state: &AppState,
    actor: &AuthUser,
    req: &CreateTermRequest,
) -> Result<Parties, AppError> {
    let pet_id = req
        .pet_id
        .ok_or_else(|| AppError::bad_request("PET_REQUIRED", "pet_id is required"))?;
    let adopter_id = req
        .adopter_id
        .ok_or_else(|| AppError::bad_request("ADOPTER_REQUIRED", "adopter_id is required"))?;

    let pet = pet_crud::require_pet(&state.pets, pet_id)?;
    let donor = user_crud::find_user(&state.users, pet.owner_id)?.ok_or_else(|| {
        AppError::not_found("DONOR_NOT_FOUND", format!("owner of pet {pet_id} not found"))
    })?;
    if req.donor_id.is_some_and(|d| d != donor.id) {
        return Err(AppError::bad_request(
            "DONOR_MISMATCH",
            "donor_id does not own the given pet",
        ));
    }
    let adopter = user_crud::find_user(&state.users, adopter_id)?.ok_or_else(|| {
        AppError::not_found("ADOPTER_NOT_FOUND", format!("adopter {adopter_id} not found"))
    })?;
    if adopter.id == donor.id {
        return Err(AppError::bad_request(
            "SELF_ADOPTION",
            "adopter and donor must be different users",
        ));
    }
    if actor.user_id != adopter.id {
        return Err(AppError::forbidden(
            "NOT_SIGNING_PARTY",
            "only the adopter can sign this term",
        ));
    }
    Ok(Parties {
        pet: Some(pet),
        donor,
        adopter: Some(adopter),
    })
}

fn resolve_donation_parties(
    state: &AppState,
    actor: &AuthUser,
    req: &CreateTermRequest,
) -> Result<Parties, AppError> {
    if req.adopter_id.is_some() {
        return Err(AppError::bad_request(
            "FIELD_NOT_APPLICABLE",
            "adopter_id does not apply to donation terms",
        ));
    }
    let donor_id = req
        .donor_id
        .ok_or_else(|| AppError::bad_request("DONOR_REQUIRED", "donor_id is required"))?;
    let donor = user_crud::find_user(&state.users, donor_id)?.ok_or_else(|| {
        AppError::not_found("DONOR_NOT_FOUND", format!("donor {donor_id} not found"))
    })?;
    let pet = req
        .pet_id
        .map(|id| pet_crud::require_pet(&state.pets, id))
        .transpose()?;
    if actor.user_id != donor.id {
        return Err(AppError::forbidden(
            "NOT_SIGNING_PARTY",
            "only the donor can sign this term",
        ));
    }
    if let Some(pet) = &pet {
        if pet.owner_id != donor.id {
            return Err(AppError::forbidden(
                "PET_NOT_OWNED",
                format!("pet {} is not owned by the donor", pet.id),
            ));
        }
    }
    Ok(Parties {
        pet,
        donor,
        adopter: None,
    })
}

fn pet_snapshot(state: &AppState, pet: &PetRecord) -> Result<PetSnapshot, AppError> {
    Ok(PetSnapshot {
        name: pet.name.clone(),
        species: label_of(&state.lookups, LookupKind::Species, Some(pet.species_id))?,
        breed: label_of(&state.lookups, LookupKind::Breed, Some(pet.breed_id))?,
        age: pet.age,
        sex: label_of(&state.lookups, LookupKind::Sex, Some(pet.sex_id))?,
        donation_reason: pet.donation_reason.clone(),
    })
}

fn party_snapshot(state: &AppState, user: &UserRecord) -> Result<PartySnapshot, AppError> {
    Ok(PartySnapshot {
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        document_number: user.document_number.clone(),
        document_type: user.document_type,
        city: label_of(&state.lookups, LookupKind::City, user.city_id)?,
        state: label_of(&state.lookups, LookupKind::State, user.state_id)?,
    })
}

/// Mails both parties. A delivery failure is reported, not raised: the term
/// is already stored.
async fn notify_parties(state: &AppState, term: &TermRecord) -> NotificationView {
    let document = render_term(term);
    let mails = compose_term_mails(state.mailer.from_address(), term, &document);
    let expected = mails.iter().map(|m| m.to.clone()).collect::<Vec<_>>();
    match state.mailer.deliver_all(mails).await {
        Ok(recipients) => NotificationView {
            sent: true,
            recipients,
            reason: None,
        },
        Err(err) => {
            warn!(
                kind = term.kind.as_str(),
                term_id = term.id,
                reason = %err,
                "term notification failed"
            );
            NotificationView {
                sent: false,
                recipients: expected,
                reason: Some(err.to_string()),
            }
        }
    }
}

fn document_response(term: &TermRecord, document: &RenderedDocument) -> TermDocumentResponse {
    TermDocumentResponse {
        term_id: term.id,
        kind: term.kind,
        file_name: document.file_name.clone(),
        content_type: document.content_type.to_string(),
        page_count: document.page_count(),
        content: document.content(),
    }
}

fn require_party_term(
    state: &AppState,
    actor: &AuthUser,
    kind: TermKind,
    term_id: i64,
) -> Result<TermRecord, AppError> {
    let term = require_term(&state.terms, kind, term_id)?;
    if !term.involves(actor.user_id) {
        return Err(AppError::forbidden(
            "NOT_TERM_PARTY",
            "only the donor or adopter can access this term",
        ));
    }
    Ok(term)
}

fn validate_signature(raw: &str) -> Result<String, AppError> {
    require_text(
        "INVALID_SIGNATURE",
        "signature_text",
        raw,
        1,
        MAX_SIGNATURE_CHARS,
    )
}

fn duplicate_term(kind: TermKind) -> AppError {
    let key = match kind {
        TermKind::Donation => "donor",
        _ => "pet",
    };
    AppError::conflict(
        "TERM_ALREADY_EXISTS",
        format!("a {} term already exists for this {key}", kind.as_str()),
    )
}

fn replace_term(store: &TermStore, term: TermRecord) -> Result<(), AppError> {
    let mut inner = lock_store(store)?;
    if inner.get(term.kind, term.id).is_none() {
        return Err(AppError::not_found(
            "TERM_NOT_FOUND",
            format!("{} term {} not found", term.kind.as_str(), term.id),
        ));
    }
    inner.insert(term);
    Ok(())
}

fn remove_matching<F>(store: &TermStore, predicate: F) -> Result<usize, AppError>
where
    F: Fn(&TermRecord) -> bool,
{
    let mut inner = lock_store(store)?;
    let doomed = inner
        .terms
        .values()
        .flat_map(|m| m.values())
        .filter(|t| predicate(t))
        .map(|t| (t.kind, t.id))
        .collect::<Vec<_>>();
    for (kind, id) in &doomed {
        inner.remove(*kind, *id);
    }
    Ok(doomed.len())
}

async fn persist_term(state: &AppState, term: &TermRecord) -> Result<(), AppError> {
    let Some(infra) = &state.infra else {
        return Ok(());
    };
    upsert_record(infra, term.kind.collection(), doc! { "id": term.id }, term).await
}

fn lock_store(store: &TermStore) -> Result<MutexGuard<'_, TermStoreInner>, AppError> {
    store
        .inner
        .lock()
        .map_err(|_| AppError::internal("STORE_LOCK_ERROR", "term store lock poisoned"))
}
