//! Cookie sessions, password hashing, and the session extractors.
//!
//! A session is a random 32-byte token handed to the browser in the
//! `muster_session` cookie. Only its SHA-256 is stored, so a leaked database
//! cannot be replayed as cookies.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use muster_core::{
  AuthContext, identity::Identity, registration::CredentialHasher, store::{MemberStore, NewSession},
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{AppState, error::Error};

pub const SESSION_COOKIE: &str = "muster_session";

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// A fresh random token, hex encoded.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// The form a token is stored in.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

// ─── Cookies ─────────────────────────────────────────────────────────────────

/// The session token from the request's `Cookie` headers, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
    .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
  format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// A cookie that makes the browser drop the session.
pub fn expired_cookie() -> String { session_cookie("", 0) }

/// Persist a new session for `identity` and return the `Set-Cookie` value.
pub async fn start_session<S>(state: &AppState<S>, identity: &Identity) -> Result<String, Error>
where
  S: MemberStore + Clone + 'static,
{
  let token = new_token();
  let ttl = Duration::hours(state.config.session_ttl_hours);
  state
    .store
    .create_session(NewSession {
      token_hash:  hash_token(&token),
      identity_id: identity.identity_id,
      expires_at:  Utc::now() + ttl,
    })
    .await
    .map_err(Error::store)?;
  tracing::debug!(identity_id = identity.identity_id, "session started");
  Ok(session_cookie(&token, ttl.num_seconds()))
}

async fn resolve<S>(parts: &Parts, state: &AppState<S>) -> Result<Option<AuthContext>, Error>
where
  S: MemberStore + Clone + 'static,
{
  let Some(token) = session_token(&parts.headers) else {
    return Ok(None);
  };
  let identity = state
    .store
    .session_identity(hash_token(&token), Utc::now())
    .await
    .map_err(Error::store)?;
  Ok(identity.filter(|i| i.active).map(AuthContext::new))
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Argon2id with default parameters, producing PHC strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
  fn hash(&self, password: &str) -> muster_core::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map(|hash| hash.to_string())
      .map_err(|e| muster_core::Error::Hash(e.to_string()))
  }
}

/// Check `password` against a stored PHC string. Malformed hashes never
/// verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// The signed-in caller. Rejects with a redirect to the login page.
pub struct CurrentUser(pub AuthContext);

/// The signed-in caller, who must also be approved. Unapproved members are
/// redirected home.
pub struct ApprovedUser(pub AuthContext);

/// The signed-in caller, if there is one.
pub struct MaybeUser(pub Option<AuthContext>);

impl<S> FromRequestParts<AppState<S>> for MaybeUser
where
  S: MemberStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeUser(resolve(parts, state).await?))
  }
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: MemberStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve(parts, state)
      .await?
      .map(CurrentUser)
      .ok_or(Error::Unauthenticated)
  }
}

impl<S> FromRequestParts<AppState<S>> for ApprovedUser
where
  S: MemberStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentUser(ctx) = CurrentUser::from_request_parts(parts, state).await?;
    if !ctx.is_approved() {
      return Err(Error::NotApproved);
    }
    Ok(ApprovedUser(ctx))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn tokens_are_random_and_hashes_stable() {
    let (a, b) = (new_token(), new_token());
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
    assert_eq!(hash_token(&a), hash_token(&a));
    assert_ne!(hash_token(&a), a);
  }

  #[test]
  fn finds_session_among_other_cookies() {
    let mut headers = HeaderMap::new();
    headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
    headers.append(header::COOKIE, HeaderValue::from_static("a=1; muster_session=abc123; b=2"));
    assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
  }

  #[test]
  fn empty_or_missing_cookie_is_no_session() {
    let mut headers = HeaderMap::new();
    assert_eq!(session_token(&headers), None);
    headers.insert(header::COOKIE, HeaderValue::from_static("muster_session="));
    assert_eq!(session_token(&headers), None);
  }

  #[test]
  fn cookie_attributes() {
    assert_eq!(
      session_cookie("t", 60),
      "muster_session=t; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
    );
    assert!(expired_cookie().ends_with("Max-Age=0"));
  }

  #[test]
  fn argon2_round_trip() {
    let hash = Argon2Hasher.hash("hunter2").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("hunter2", &hash));
    assert!(!verify_password("hunter3", &hash));
    assert!(!verify_password("hunter2", "not-a-phc-string"));
  }
}
