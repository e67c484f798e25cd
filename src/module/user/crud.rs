use super::model::UserRecord;
use super::schema::{
    AvailabilityQuery, AvailabilityResponse, DeleteUserResponse, DocumentType, RegisterUserRequest,
    UpdateUserRequest, UserListResponse, UserView,
};
use crate::app::AppState;
use crate::infra::{USERS_COLLECTION, delete_records, upsert_record};
use crate::module::auth::crud as auth_crud;
use crate::module::auth::middleware::AuthUser;
use crate::module::error::AppError;
use crate::module::lookup::crud::{label_of, resolve_location};
use crate::module::lookup::schema::LookupKind;
use crate::module::pet::crud as pet_crud;
use crate::module::term::crud as term_crud;
use crate::service::metrics_service;
use crate::service::password_service::hash_password;
use crate::service::validation_service::{
    document_digits, is_valid_cnpj, is_valid_cpf, normalize_email, normalize_phone, require_text,
    validate_password,
};
use chrono::Utc;
use mongodb::bson::doc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

#[derive(Debug, Default)]
pub struct UserStore {
    inner: Mutex<UserStoreInner>,
}

#[derive(Debug)]
struct UserStoreInner {
    users: BTreeMap<i64, UserRecord>,
    by_email: HashMap<String, i64>,
    by_document: HashMap<String, i64>,
    by_phone: HashMap<String, i64>,
    next_id: i64,
}

impl Default for UserStoreInner {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            by_email: HashMap::new(),
            by_document: HashMap::new(),
            by_phone: HashMap::new(),
            next_id: 1,
        }
    }
}

impl UserStoreInner {
    fn index(&mut self, user: &UserRecord) {
        self.by_email.insert(user.email.clone(), user.id);
        self.by_document.insert(user.document_number.clone(), user.id);
        self.by_phone.insert(user.phone.clone(), user.id);
    }

    fn unindex(&mut self, user: &UserRecord) {
        self.by_email.remove(&user.email);
        self.by_document.remove(&user.document_number);
        self.by_phone.remove(&user.phone);
    }

    fn taken_by_other(index: &HashMap<String, i64>, key: &str, id: Option<i64>) -> bool {
        index.get(key).is_some_and(|owner| Some(*owner) != id)
    }

    fn check_unique(
        &self,
        email: &str,
        document: Option<&str>,
        phone: &str,
        id: Option<i64>,
    ) -> Result<(), AppError> {
        if Self::taken_by_other(&self.by_email, email, id) {
            return Err(AppError::conflict("EMAIL_TAKEN", "email already registered"));
        }
        if let Some(document) = document {
            if Self::taken_by_other(&self.by_document, document, id) {
                return Err(AppError::conflict(
                    "DOCUMENT_TAKEN",
                    "document number already registered",
                ));
            }
        }
        if Self::taken_by_other(&self.by_phone, phone, id) {
            return Err(AppError::conflict("PHONE_TAKEN", "phone already registered"));
        }
        Ok(())
    }
}

pub async fn register_user(
    state: &AppState,
    req: RegisterUserRequest,
) -> Result<UserView, AppError> {
    let name = require_text("INVALID_NAME", "name", &req.name, 2, 120)?;
    let email = normalize_email(&req.email)?;
    let document_number = normalize_document(&req.document_number, req.document_type)?;
    let phone = normalize_phone(&req.phone)?;
    validate_password(&req.password)?;
    resolve_location(&state.lookups, req.city_id, req.state_id)?;
    let password_hash = hash_password(&req.password)
        .map_err(|e| AppError::internal("PASSWORD_HASH_FAILED", e))?;

    let user = {
        let mut inner = lock_store(&state.users)?;
        inner.check_unique(&email, Some(&document_number), &phone, None)?;
        let now = Utc::now().timestamp();
        let user = UserRecord {
            id: inner.next_id,
            name,
            email,
            document_number,
            document_type: req.document_type,
            phone,
            password_hash,
            city_id: req.city_id,
            state_id: req.state_id,
            created_at: now,
            updated_at: now,
        };
        inner.next_id += 1;
        inner.index(&user);
        inner.users.insert(user.id, user.clone());
        user
    };

    if let Err(err) = persist_user(state, &user).await {
        let mut inner = lock_store(&state.users)?;
        inner.unindex(&user);
        inner.users.remove(&user.id);
        return Err(err);
    }
    metrics_service::inc_users_registered();
    info!(user_id = user.id, "user registered");
    to_view(state, &user, true)
}

pub async fn check_availability(
    state: &AppState,
    query: AvailabilityQuery,
) -> Result<AvailabilityResponse, AppError> {
    let email = query.email.as_deref().map(normalize_email).transpose()?;
    let document = query
        .document_number
        .as_deref()
        .map(|d| {
            document_digits(d).ok_or_else(|| {
                AppError::bad_request("INVALID_DOCUMENT", "document number is not valid")
            })
        })
        .transpose()?;
    let phone = query.phone.as_deref().map(normalize_phone).transpose()?;

    let inner = lock_store(&state.users)?;
    Ok(AvailabilityResponse {
        email_available: email.map(|e| !inner.by_email.contains_key(&e)),
        document_available: document.map(|d| !inner.by_document.contains_key(&d)),
        phone_available: phone.map(|p| !inner.by_phone.contains_key(&p)),
    })
}

pub async fn list_users(state: &AppState, actor: &AuthUser) -> Result<UserListResponse, AppError> {
    let users = lock_store(&state.users)?
        .users
        .values()
        .cloned()
        .collect::<Vec<_>>();
    let users = users
        .iter()
        .map(|u| to_view(state, u, u.id == actor.user_id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(UserListResponse { users })
}

pub async fn get_user(state: &AppState, actor: &AuthUser, user_id: i64) -> Result<UserView, AppError> {
    let user = require_user(&state.users, user_id)?;
    to_view(state, &user, user.id == actor.user_id)
}

pub async fn update_user(
    state: &AppState,
    actor: &AuthUser,
    user_id: i64,
    req: UpdateUserRequest,
) -> Result<UserView, AppError> {
    ensure_self(actor, user_id)?;
    let current = require_user(&state.users, user_id)?;

    let name = req
        .name
        .as_deref()
        .map(|n| require_text("INVALID_NAME", "name", n, 2, 120))
        .transpose()?;
    let email = req.email.as_deref().map(normalize_email).transpose()?;
    let phone = req.phone.as_deref().map(normalize_phone).transpose()?;
    let password_hash = match req.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(
                hash_password(password)
                    .map_err(|e| AppError::internal("PASSWORD_HASH_FAILED", e))?,
            )
        }
        None => None,
    };
    let (city_id, state_id) = if req.city_id.is_some() || req.state_id.is_some() {
        (req.city_id, req.state_id.or(current.state_id))
    } else {
        (current.city_id, current.state_id)
    };
    resolve_location(&state.lookups, city_id, state_id)?;

    let (previous, user) = {
        let mut inner = lock_store(&state.users)?;
        let previous = inner
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "user not found"))?;
        let mut next = previous.clone();
        if let Some(name) = name {
            next.name = name;
        }
        if let Some(email) = email {
            next.email = email;
        }
        if let Some(phone) = phone {
            next.phone = phone;
        }
        if let Some(hash) = password_hash {
            next.password_hash = hash;
        }
        next.city_id = city_id;
        next.state_id = state_id;
        next.updated_at = Utc::now().timestamp();
        inner.check_unique(&next.email, None, &next.phone, Some(user_id))?;
        inner.unindex(&previous);
        inner.index(&next);
        inner.users.insert(user_id, next.clone());
        (previous, next)
    };

    if let Err(err) = persist_user(state, &user).await {
        let mut inner = lock_store(&state.users)?;
        inner.unindex(&user);
        inner.index(&previous);
        inner.users.insert(user_id, previous);
        return Err(err);
    }
    info!(user_id, "user updated");
    to_view(state, &user, true)
}

pub async fn delete_user(
    state: &AppState,
    actor: &AuthUser,
    user_id: i64,
) -> Result<DeleteUserResponse, AppError> {
    ensure_self(actor, user_id)?;
    let user = require_user(&state.users, user_id)?;

    let (pets_removed, pet_terms_removed) = pet_crud::remove_pets_of_owner(state, user_id).await?;
    let user_terms_removed = term_crud::remove_terms_for_user(state, user_id).await?;
    auth_crud::discard_recovery_code(state, user_id).await?;

    {
        let mut inner = lock_store(&state.users)?;
        inner.unindex(&user);
        inner.users.remove(&user_id);
    }
    if let Some(infra) = &state.infra {
        delete_records(infra, USERS_COLLECTION, doc! { "id": user_id }).await?;
    }
    info!(user_id, pets_removed, "user deleted");
    Ok(DeleteUserResponse {
        deleted: true,
        user_id,
        pets_removed,
        terms_removed: pet_terms_removed + user_terms_removed,
    })
}

/// Overwrites the stored password hash; used by the recovery flow.
pub async fn set_password_hash(
    state: &AppState,
    user_id: i64,
    password_hash: String,
) -> Result<(), AppError> {
    let (previous, user) = {
        let mut inner = lock_store(&state.users)?;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "user not found"))?;
        let previous = user.clone();
        user.password_hash = password_hash;
        user.updated_at = Utc::now().timestamp();
        (previous, user.clone())
    };
    if let Err(err) = persist_user(state, &user).await {
        lock_store(&state.users)?.users.insert(user_id, previous);
        return Err(err);
    }
    Ok(())
}

pub fn find_user(store: &UserStore, user_id: i64) -> Result<Option<UserRecord>, AppError> {
    Ok(lock_store(store)?.users.get(&user_id).cloned())
}

pub fn find_user_by_email(store: &UserStore, email: &str) -> Result<Option<UserRecord>, AppError> {
    let inner = lock_store(store)?;
    Ok(inner
        .by_email
        .get(email)
        .and_then(|id| inner.users.get(id))
        .cloned())
}

pub fn require_user(store: &UserStore, user_id: i64) -> Result<UserRecord, AppError> {
    find_user(store, user_id)?
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", format!("user {user_id} not found")))
}

pub fn references_location(store: &UserStore, kind: LookupKind, id: i64) -> Result<bool, AppError> {
    let inner = lock_store(store)?;
    Ok(match kind {
        LookupKind::City => inner.users.values().any(|u| u.city_id == Some(id)),
        LookupKind::State => inner.users.values().any(|u| u.state_id == Some(id)),
        _ => false,
    })
}

pub fn hydrate(store: &UserStore, users: Vec<UserRecord>) -> Result<(), AppError> {
    let mut inner = lock_store(store)?;
    for user in users {
        inner.next_id = inner.next_id.max(user.id + 1);
        inner.index(&user);
        inner.users.insert(user.id, user);
    }
    Ok(())
}

pub fn to_view(state: &AppState, user: &UserRecord, include_private: bool) -> Result<UserView, AppError> {
    Ok(UserView {
        id: user.id,
        name: user.name.clone(),
        email: include_private.then(|| user.email.clone()),
        document_number: include_private.then(|| user.document_number.clone()),
        document_type: include_private.then_some(user.document_type),
        phone: include_private.then(|| user.phone.clone()),
        city_id: user.city_id,
        city_name: label_of(&state.lookups, LookupKind::City, user.city_id)?,
        state_id: user.state_id,
        state_name: label_of(&state.lookups, LookupKind::State, user.state_id)?,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

fn normalize_document(raw: &str, document_type: DocumentType) -> Result<String, AppError> {
    let digits = document_digits(raw)
        .ok_or_else(|| AppError::bad_request("INVALID_DOCUMENT", "document number is not valid"))?;
    match document_type {
        DocumentType::Cpf if is_valid_cpf(&digits) => Ok(digits),
        DocumentType::Cnpj if is_valid_cnpj(&digits) => Ok(digits),
        DocumentType::Cpf => Err(AppError::bad_request("INVALID_CPF", "CPF is not valid")),
        DocumentType::Cnpj => Err(AppError::bad_request("INVALID_CNPJ", "CNPJ is not valid")),
    }
}

fn ensure_self(actor: &AuthUser, user_id: i64) -> Result<(), AppError> {
    if actor.user_id != user_id {
        return Err(AppError::forbidden(
            "NOT_ACCOUNT_OWNER",
            "users can only change their own account",
        ));
    }
    Ok(())
}

async fn persist_user(state: &AppState, user: &UserRecord) -> Result<(), AppError> {
    let Some(infra) = &state.infra else {
        return Ok(());
    };
    upsert_record(infra, USERS_COLLECTION, doc! { "id": user.id }, user).await
}

fn lock_store(store: &UserStore) -> Result<MutexGuard<'_, UserStoreInner>, AppError> {
    store
        .inner
        .lock()
        .map_err(|_| AppError::internal("STORE_LOCK_ERROR", "user store lock poisoned"))
}
