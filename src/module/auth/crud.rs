use super::middleware::AuthUser;
use super::model::RecoveryCodeRecord;
use super::schema::{
    LoginRequest, LoginResponse, PasswordResetRequest, PasswordResetResponse, RecoveryRequest,
    RecoveryRequestResponse, RecoveryVerifyRequest, RecoveryVerifyResponse,
};
use crate::app::AppState;
use crate::module::error::AppError;
use crate::module::user::crud as user_crud;
use crate::module::user::schema::UserView;
use crate::service::hash_service::sha256_hex;
use crate::service::mail_service::compose_recovery_mail;
use crate::service::password_service::{hash_password, verify_password};
use crate::service::token_service::issue_access_token;
use crate::service::validation_service::{normalize_email, validate_password};
use chrono::Utc;
use rand::Rng;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

const RECOVERY_KEY_PREFIX: &str = "password_recovery";
const MAX_RECOVERY_ATTEMPTS: u32 = 5;

#[derive(Debug, Default)]
pub struct RecoveryStore {
    codes: Mutex<HashMap<i64, RecoveryCodeRecord>>,
}

enum CodeCheck {
    Valid,
    Invalid,
    Missing,
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginResponse, AppError> {
    let invalid = || AppError::unauthorized("INVALID_CREDENTIALS", "email or password is incorrect");
    let email = normalize_email(&req.email).map_err(|_| invalid())?;
    let user = user_crud::find_user_by_email(&state.users, &email)?.ok_or_else(invalid)?;
    let matches = verify_password(&req.password, &user.password_hash)
        .map_err(|e| AppError::internal("PASSWORD_VERIFY_FAILED", e))?;
    if !matches {
        return Err(invalid());
    }

    let (access_token, expires_at) =
        issue_access_token(user.id, &state.config.jwt_secret, state.config.jwt_ttl_seconds)
            .map_err(|e| AppError::internal("TOKEN_ISSUE_FAILED", e.to_string()))?;
    info!(user_id = user.id, "login accepted");
    Ok(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_at,
        user: user_crud::to_view(state, &user, true)?,
    })
}

pub async fn me(state: &AppState, actor: &AuthUser) -> Result<UserView, AppError> {
    let user = user_crud::require_user(&state.users, actor.user_id)?;
    user_crud::to_view(state, &user, true)
}

pub async fn request_recovery(
    state: &AppState,
    req: RecoveryRequest,
) -> Result<RecoveryRequestResponse, AppError> {
    let accepted = RecoveryRequestResponse { accepted: true };
    let Ok(email) = normalize_email(&req.email) else {
        return Ok(accepted);
    };
    let Some(user) = user_crud::find_user_by_email(&state.users, &email)? else {
        info!("recovery requested for unknown email");
        return Ok(accepted);
    };

    let code = generate_code();
    let ttl = state.config.recovery_code_ttl_seconds;
    let record = RecoveryCodeRecord {
        user_id: user.id,
        code_hash: code_digest(user.id, &code),
        expires_at: Utc::now().timestamp() + ttl,
        attempts: 0,
    };
    lock_codes(&state.recovery)?.insert(user.id, record.clone());
    mirror_code(state, &record).await?;

    let mail = compose_recovery_mail(
        state.mailer.from_address(),
        &user.email,
        &user.name,
        &code,
        ttl / 60,
    );
    if let Err(err) = state.mailer.deliver(mail).await {
        warn!(user_id = user.id, reason = %err, "recovery code delivery failed");
    }
    info!(user_id = user.id, "recovery code issued");
    Ok(accepted)
}

pub async fn verify_recovery(
    state: &AppState,
    req: RecoveryVerifyRequest,
) -> Result<RecoveryVerifyResponse, AppError> {
    let Some(user_id) = user_for_email(state, &req.email)? else {
        return Ok(RecoveryVerifyResponse { valid: false });
    };
    let valid = matches!(check_code(state, user_id, &req.code).await?, CodeCheck::Valid);
    Ok(RecoveryVerifyResponse { valid })
}

pub async fn reset_password(
    state: &AppState,
    req: PasswordResetRequest,
) -> Result<PasswordResetResponse, AppError> {
    let invalid = || {
        AppError::bad_request(
            "INVALID_RECOVERY_CODE",
            "recovery code is invalid or expired",
        )
    };
    validate_password(&req.new_password)?;
    let user_id = user_for_email(state, &req.email)?.ok_or_else(invalid)?;
    match check_code(state, user_id, &req.code).await? {
        CodeCheck::Valid => {}
        CodeCheck::Invalid | CodeCheck::Missing => return Err(invalid()),
    }

    let password_hash = hash_password(&req.new_password)
        .map_err(|e| AppError::internal("PASSWORD_HASH_FAILED", e))?;
    user_crud::set_password_hash(state, user_id, password_hash).await?;
    discard_recovery_code(state, user_id).await?;
    info!(user_id, "password reset");
    Ok(PasswordResetResponse {
        reset: true,
        user_id,
    })
}

pub async fn discard_recovery_code(state: &AppState, user_id: i64) -> Result<(), AppError> {
    lock_codes(&state.recovery)?.remove(&user_id);
    let Some(redis) = state.infra.as_ref().and_then(|i| i.redis.as_ref()) else {
        return Ok(());
    };
    let mut conn = redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::internal("REDIS_CONNECT_FAILED", e.to_string()))?;
    let _: usize = conn
        .del(recovery_key(user_id))
        .await
        .map_err(|e| AppError::internal("REDIS_WRITE_FAILED", e.to_string()))?;
    Ok(())
}

/// Compares the submitted code, counting wrong attempts. A code past its
/// expiry or over the attempt limit is dropped.
async fn check_code(state: &AppState, user_id: i64, code: &str) -> Result<CodeCheck, AppError> {
    let now = Utc::now().timestamp();
    let digest = code_digest(user_id, code.trim());
    let cached = lock_codes(&state.recovery)?.contains_key(&user_id);
    if !cached {
        if let Some(record) = load_mirrored_code(state, user_id).await? {
            lock_codes(&state.recovery)?.entry(user_id).or_insert(record);
        }
    }

    let attempt = register_attempt(&mut *lock_codes(&state.recovery)?, user_id, &digest, now);
    match attempt {
        Attempt::Absent => Ok(CodeCheck::Missing),
        Attempt::Expired => {
            discard_recovery_code(state, user_id).await?;
            Ok(CodeCheck::Missing)
        }
        Attempt::Matched => Ok(CodeCheck::Valid),
        Attempt::Wrong(record) => {
            mirror_code(state, &record).await?;
            Ok(CodeCheck::Invalid)
        }
        Attempt::Exhausted => {
            warn!(user_id, "recovery code invalidated after repeated failures");
            discard_recovery_code(state, user_id).await?;
            Ok(CodeCheck::Invalid)
        }
    }
}

enum Attempt {
    Absent,
    Expired,
    Matched,
    Wrong(RecoveryCodeRecord),
    Exhausted,
}

/// Judges one attempt against the stored code. Callers hold the store lock for
/// the whole call.
fn register_attempt(
    codes: &mut HashMap<i64, RecoveryCodeRecord>,
    user_id: i64,
    digest: &str,
    now: i64,
) -> Attempt {
    let Some(record) = codes.get_mut(&user_id) else {
        return Attempt::Absent;
    };
    if record.is_expired(now) {
        codes.remove(&user_id);
        return Attempt::Expired;
    }
    if record.code_hash == digest {
        return Attempt::Matched;
    }
    record.attempts += 1;
    if record.attempts > MAX_RECOVERY_ATTEMPTS {
        codes.remove(&user_id);
        return Attempt::Exhausted;
    }
    Attempt::Wrong(record.clone())
}

fn user_for_email(state: &AppState, email: &str) -> Result<Option<i64>, AppError> {
    let Ok(email) = normalize_email(email) else {
        return Ok(None);
    };
    Ok(user_crud::find_user_by_email(&state.users, &email)?.map(|u| u.id))
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

fn code_digest(user_id: i64, code: &str) -> String {
    sha256_hex(&format!("{user_id}:{code}"))
}

fn recovery_key(user_id: i64) -> String {
    format!("{RECOVERY_KEY_PREFIX}:{user_id}")
}

async fn mirror_code(state: &AppState, record: &RecoveryCodeRecord) -> Result<(), AppError> {
    let Some(redis) = state.infra.as_ref().and_then(|i| i.redis.as_ref()) else {
        return Ok(());
    };
    let remaining = (record.expires_at - Utc::now().timestamp()).max(1) as u64;
    let payload = serde_json::to_string(record)
        .map_err(|e| AppError::internal("SERIALIZATION_ERROR", e.to_string()))?;
    let mut conn = redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::internal("REDIS_CONNECT_FAILED", e.to_string()))?;
    let _: () = conn
        .set_ex(recovery_key(record.user_id), payload, remaining)
        .await
        .map_err(|e| AppError::internal("REDIS_WRITE_FAILED", e.to_string()))?;
    Ok(())
}

async fn load_mirrored_code(
    state: &AppState,
    user_id: i64,
) -> Result<Option<RecoveryCodeRecord>, AppError> {
    let Some(redis) = state.infra.as_ref().and_then(|i| i.redis.as_ref()) else {
        return Ok(None);
    };
    let mut conn = redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::internal("REDIS_CONNECT_FAILED", e.to_string()))?;
    let raw: Option<String> = conn
        .get(recovery_key(user_id))
        .await
        .map_err(|e| AppError::internal("REDIS_QUERY_FAILED", e.to_string()))?;
    raw.map(|s| serde_json::from_str::<RecoveryCodeRecord>(&s))
        .transpose()
        .map_err(|e| AppError::internal("REDIS_DECODE_FAILED", e.to_string()))
}

fn lock_codes(
    store: &RecoveryStore,
) -> Result<MutexGuard<'_, HashMap<i64, RecoveryCodeRecord>>, AppError> {
    store
        .codes
        .lock()
        .map_err(|_| AppError::internal("STORE_LOCK_ERROR", "recovery store lock poisoned"))
}
