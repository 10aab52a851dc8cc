use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use crate::shared::validation::ValidationError;

pub const ADMIN_PASSWORD_KEY: &str = "admin_password";
/// Legacy fallback used until the password is changed for the first time.
pub const DEFAULT_ADMIN_PASSWORD: &str = "felicity@2024";

const SESSION_HOURS: i64 = 12;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
struct StaffClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub fn issue_token(secret: &str) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = StaffClaims {
        sub: "staff".to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(SESSION_HOURS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to issue session token: {e}")))
}

fn token_is_valid(secret: &str, token: &str) -> bool {
    decode::<StaffClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .is_ok()
}

/// Stored value may be an argon2 PHC string or (legacy) plaintext; unset
/// falls back to the default password.
pub fn password_matches(stored: Option<&str>, submitted: &str) -> bool {
    match stored {
        Some(stored) => match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(submitted.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => stored == submitted,
        },
        None => submitted == DEFAULT_ADMIN_PASSWORD,
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// Gate for every staff route. Expects `Authorization: Bearer <token>` with a
/// token minted by `verify_password`.
pub async fn require_staff(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token_is_valid(&state.config.session_secret, token))
        .unwrap_or(false);
    if !authorized {
        return Err(ApiError::Unauthorized("Staff session required".to_string()));
    }
    Ok(next.run(req).await)
}

#[derive(Debug, Deserialize)]
pub struct VerifyPasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPasswordResponse {
    pub valid: bool,
    pub token: String,
}

pub async fn verify_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyPasswordRequest>,
) -> Result<Json<VerifyPasswordResponse>, ApiError> {
    let stored = state.store.get_setting(ADMIN_PASSWORD_KEY).await?;
    if !password_matches(stored.as_deref(), &req.password) {
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }
    let token = issue_token(&state.config.session_secret)?;
    Ok(Json(VerifyPasswordResponse { valid: true, token }))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stored = state.store.get_setting(ADMIN_PASSWORD_KEY).await?;
    if !password_matches(stored.as_deref(), &req.current_password) {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }
    if req.new_password.len() < MIN_PASSWORD_LENGTH {
        return Err(vec![ValidationError::TooShort {
            field: "new_password".to_string(),
            min: MIN_PASSWORD_LENGTH,
            actual: req.new_password.len(),
        }]
        .into());
    }
    let hash = hash_password(&req.new_password)?;
    state.store.put_setting(ADMIN_PASSWORD_KEY, &hash).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn logout() -> Json<serde_json::Value> {
    // Sessions are bearer tokens; the client discards its copy.
    Json(serde_json::json!({ "success": true }))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/verify-password", post(verify_password))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/change-password", post(change_password))
        .route("/api/admin/logout", post(logout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_password_applies_when_unset() {
        assert!(password_matches(None, DEFAULT_ADMIN_PASSWORD));
        assert!(!password_matches(None, "guess"));
    }

    #[test]
    fn plaintext_stored_value_compares_directly() {
        assert!(password_matches(Some("letmein"), "letmein"));
        assert!(!password_matches(Some("letmein"), "other"));
        // A plaintext store no longer honors the default.
        assert!(!password_matches(Some("letmein"), DEFAULT_ADMIN_PASSWORD));
    }

    #[test]
    fn hashed_stored_value_verifies() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(password_matches(Some(&hash), "s3cret-pass"));
        assert!(!password_matches(Some(&hash), "wrong"));
    }

    #[test]
    fn tokens_round_trip_and_reject_forgeries() {
        let token = issue_token("test-secret").unwrap();
        assert!(token_is_valid("test-secret", &token));
        assert!(!token_is_valid("other-secret", &token));
        assert!(!token_is_valid("test-secret", "not-a-token"));
    }
}
