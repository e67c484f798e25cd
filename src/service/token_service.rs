use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const JWT_ISSUER: &str = "pet-adoption-api";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token ttl must be positive")]
    InvalidTtl,

    #[error("token subject is not a user id: {0}")]
    InvalidSubject(String),

    #[error("jwt issue failed: {0}")]
    Issue(String),

    #[error("jwt verify failed: {0}")]
    Verify(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| TokenError::InvalidSubject(self.sub.clone()))
    }
}

pub fn issue_access_token(
    user_id: i64,
    jwt_secret: &str,
    ttl_seconds: i64,
) -> Result<(String, i64), TokenError> {
    if ttl_seconds <= 0 {
        return Err(TokenError::InvalidTtl);
    }
    let iat = Utc::now().timestamp();
    let exp = iat.checked_add(ttl_seconds).ok_or(TokenError::InvalidTtl)?;
    let claims = AccessClaims {
        sub: user_id.to_string(),
        iat,
        exp,
        iss: JWT_ISSUER.to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| TokenError::Issue(e.to_string()))?;
    Ok((token, exp))
}

pub fn verify_access_token(token: &str, jwt_secret: &str) -> Result<AccessClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[JWT_ISSUER]);
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| TokenError::Verify(e.to_string()))?;
    Ok(data.claims)
}
