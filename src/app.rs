use crate::config::environment::AppConfig;
use crate::infra::{
    InfraClients, LOOKUPS_COLLECTION, PETS_COLLECTION, USERS_COLLECTION, load_all,
};
use crate::module::auth::crud::RecoveryStore;
use crate::module::lookup::crud::{self as lookup_crud, LookupStore};
use crate::module::lookup::model::LookupRecord;
use crate::module::pet::crud::{self as pet_crud, PetStore};
use crate::module::pet::model::PetRecord;
use crate::module::term::crud::{self as term_crud, TermStore};
use crate::module::term::model::TermRecord;
use crate::module::term::schema::TermKind;
use crate::module::user::crud::{self as user_crud, UserStore};
use crate::module::user::model::UserRecord;
use crate::module::{auth, health, lookup, pet, term, user};
use crate::service::mail_service::Mailer;
use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub lookups: Arc<LookupStore>,
    pub users: Arc<UserStore>,
    pub pets: Arc<PetStore>,
    pub terms: Arc<TermStore>,
    pub recovery: Arc<RecoveryStore>,
    pub infra: Option<InfraClients>,
    pub mailer: Mailer,
}

impl AppState {
    /// Uses the relay from config when one is set, the in-memory outbox otherwise.
    pub fn new(config: AppConfig, infra: Option<InfraClients>) -> Self {
        let mailer = Mailer::from_config(&config.mail).unwrap_or_else(|e| {
            warn!(error = %e, "mail relay unavailable; falling back to outbox");
            Mailer::outbox(&config.mail.from_address)
        });
        Self::with_mailer(config, infra, mailer)
    }

    pub fn with_mailer(config: AppConfig, infra: Option<InfraClients>, mailer: Mailer) -> Self {
        Self {
            config,
            lookups: Arc::new(LookupStore::default()),
            users: Arc::new(UserStore::default()),
            pets: Arc::new(PetStore::default()),
            terms: Arc::new(TermStore::default()),
            recovery: Arc::new(RecoveryStore::default()),
            infra,
            mailer,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let origins = state
        .config
        .cors_allowed_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .merge(health::route::register_routes(state.clone()))
        .merge(auth::route::register_routes(state.clone()))
        .merge(user::route::register_routes(state.clone()))
        .merge(lookup::route::register_routes(state.clone()))
        .merge(pet::route::register_routes(state.clone()))
        .merge(term::route::register_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Loads persisted records into the in-memory stores, then seeds reference
/// data when the lookup tables are empty.
pub async fn bootstrap(state: &AppState) -> Result<(), String> {
    if let Some(infra) = &state.infra {
        let lookups: Vec<LookupRecord> = load_all(infra, LOOKUPS_COLLECTION).await?;
        let users: Vec<UserRecord> = load_all(infra, USERS_COLLECTION).await?;
        let pets: Vec<PetRecord> = load_all(infra, PETS_COLLECTION).await?;
        info!(
            lookups = lookups.len(),
            users = users.len(),
            pets = pets.len(),
            "hydrating stores"
        );
        lookup_crud::hydrate(&state.lookups, lookups).map_err(|e| e.message)?;
        user_crud::hydrate(&state.users, users).map_err(|e| e.message)?;
        pet_crud::hydrate(&state.pets, pets).map_err(|e| e.message)?;
        for kind in TermKind::ALL {
            let terms: Vec<TermRecord> = load_all(infra, kind.collection()).await?;
            term_crud::hydrate(&state.terms, terms).map_err(|e| e.message)?;
        }
    }

    if state.config.seed_reference_data
        && lookup_crud::is_empty(&state.lookups).map_err(|e| e.message)?
    {
        lookup_crud::seed_reference_data(state)
            .await
            .map_err(|e| e.message)?;
    }
    Ok(())
}
