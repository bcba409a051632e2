//! Request authentication.
//!
//! - Players: the `x-device-id` header is looked up directly in the users table. No tokens.
//! - Admins: `POST /admin/auth/login` trades the configured credentials for an HS256 JWT;
//!   every other admin route wants `Authorization: Bearer <jwt>` with `role = "admin"`.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::config::Settings;
use crate::db::models::User;
use crate::db::{now, users};
use crate::error::ApiError;
use crate::protocol::LoginOut;
use crate::state::AppState;

pub const DEVICE_HEADER: &str = "x-device-id";
pub const ADMIN_ROLE: &str = "admin";

/// The player behind `x-device-id`. Rejects with 401 when the header is missing or unknown.
#[derive(Debug, Clone)]
pub struct DeviceUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for DeviceUser {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let device_id = parts
      .headers
      .get(DEVICE_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .ok_or_else(|| ApiError::Unauthorized(format!("Missing {DEVICE_HEADER} header")))?
      .to_string();

    let user = state
      .db
      .run(move |conn| {
        let Some(mut user) = users::find_by_device(conn, &device_id)? else {
          return Ok(None);
        };
        let at = now();
        users::touch_last_seen(conn, &user.id, at)?;
        user.last_seen_at = at;
        Ok(Some(user))
      })
      .await?;

    user
      .map(DeviceUser)
      .ok_or_else(|| ApiError::Unauthorized("Unknown device; register first".into()))
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
  pub sub: String,
  pub role: String,
  pub iat: i64,
  pub exp: i64,
}

/// Verified admin claims from the bearer token.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub Claims);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminClaims {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let header = parts
      .headers
      .get(AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;
    let token = header
      .strip_prefix("Bearer ")
      .or_else(|| header.strip_prefix("bearer "))
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;
    verify_token(&state.settings, token).map(AdminClaims)
  }
}

pub fn issue_token(settings: &Settings, subject: &str) -> Result<LoginOut, ApiError> {
  let iat = Utc::now();
  let exp = iat + Duration::hours(settings.jwt_ttl_hours);
  let claims = Claims {
    sub: subject.to_string(),
    role: ADMIN_ROLE.into(),
    iat: iat.timestamp(),
    exp: exp.timestamp(),
  };
  let token = encode(
    &Header::new(Algorithm::HS256),
    &claims,
    &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
  )
  .map_err(|e| ApiError::Internal(format!("Could not sign token: {e}")))?;
  Ok(LoginOut { token, expires_at: claims.exp })
}

/// 401 for a bad or expired token, 403 for a valid token without the admin role.
pub fn verify_token(settings: &Settings, token: &str) -> Result<Claims, ApiError> {
  let data = decode::<Claims>(
    token,
    &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
    &Validation::new(Algorithm::HS256),
  )
  .map_err(|e| {
    warn!(target: "admin", error = %e, "Rejected admin token");
    ApiError::Unauthorized("Invalid or expired token".into())
  })?;
  if data.claims.role != ADMIN_ROLE {
    return Err(ApiError::Forbidden("Admin role required".into()));
  }
  Ok(data.claims)
}

fn digest(s: &str) -> String {
  hex::encode(Sha256::digest(s.as_bytes()))
}

#[instrument(level = "info", skip(settings, password), fields(%username))]
pub fn login(settings: &Settings, username: &str, password: &str) -> Result<LoginOut, ApiError> {
  let Some(expected) = &settings.admin_password else {
    warn!(target: "admin", "Admin login attempted but ADMIN_PASSWORD is not set");
    return Err(ApiError::Unauthorized("Invalid credentials".into()));
  };
  let user_ok = digest(username) == digest(&settings.admin_username);
  let pass_ok = digest(password) == digest(expected);
  if !(user_ok && pass_ok) {
    warn!(target: "admin", %username, "Admin login failed");
    return Err(ApiError::Unauthorized("Invalid credentials".into()));
  }
  let out = issue_token(settings, username)?;
  info!(target: "admin", %username, expires_at = out.expires_at, "Admin logged in");
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn settings() -> Settings {
    Settings::from_lookup(|k| match k {
      "ADMIN_PASSWORD" => Some("letmein".into()),
      "JWT_SECRET" => Some("unit-secret".into()),
      _ => None,
    })
  }

  fn sign(settings: &Settings, claims: &Claims) -> String {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(settings.jwt_secret.as_bytes())).unwrap()
  }

  #[test]
  fn login_issues_verifiable_admin_token() {
    let s = settings();
    let out = login(&s, "admin", "letmein").unwrap();
    let claims = verify_token(&s, &out.token).unwrap();
    assert_eq!(claims.sub, "admin");
    assert_eq!(claims.role, ADMIN_ROLE);
    assert_eq!(claims.exp - claims.iat, 12 * 3600);
  }

  #[test]
  fn wrong_credentials_are_401() {
    let s = settings();
    assert!(matches!(login(&s, "admin", "nope"), Err(ApiError::Unauthorized(_))));
    assert!(matches!(login(&s, "root", "letmein"), Err(ApiError::Unauthorized(_))));

    let no_password = Settings::from_lookup(|_| None);
    assert!(matches!(login(&no_password, "admin", ""), Err(ApiError::Unauthorized(_))));
  }

  #[test]
  fn tampered_or_expired_tokens_are_401() {
    let s = settings();
    let out = login(&s, "admin", "letmein").unwrap();
    let other = Settings { jwt_secret: "other".into(), ..s.clone() };
    assert!(matches!(verify_token(&other, &out.token), Err(ApiError::Unauthorized(_))));

    let now = Utc::now().timestamp();
    let expired = sign(&s, &Claims { sub: "admin".into(), role: ADMIN_ROLE.into(), iat: now - 7200, exp: now - 3600 });
    assert!(matches!(verify_token(&s, &expired), Err(ApiError::Unauthorized(_))));
  }

  #[test]
  fn non_admin_role_is_403() {
    let s = settings();
    let now = Utc::now().timestamp();
    let token = sign(&s, &Claims { sub: "mod".into(), role: "moderator".into(), iat: now, exp: now + 60 });
    assert!(matches!(verify_token(&s, &token), Err(ApiError::Forbidden(_))));
  }
}
