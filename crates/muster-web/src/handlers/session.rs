//! Sign-in and sign-out.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/login/` | The signed-in member, or `null` |
//! | `POST` | `/login/` | Body: `{"username":..,"password":..}`; sets the session cookie |
//! | `POST` | `/logout/` | Drops the session; 303 to `/` |

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, header},
  response::{IntoResponse, Redirect},
};
use muster_core::{identity::MemberView, store::MemberStore};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{self, CurrentUser, MaybeUser},
  error::Error,
};

/// `GET /login/`
pub async fn current(MaybeUser(user): MaybeUser) -> Json<Option<MemberView>> {
  Json(user.map(|ctx| MemberView::from(&ctx.identity)))
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

/// `POST /login/`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(creds): Json<Credentials>,
) -> Result<impl IntoResponse, Error>
where
  S: MemberStore + Clone + 'static,
{
  let identity = state
    .store
    .find_by_username(creds.username.trim().to_string())
    .await
    .map_err(Error::store)?
    .filter(|i| i.active)
    .ok_or(Error::BadCredentials)?;

  if !auth::verify_password(&creds.password, &identity.password_hash) {
    tracing::info!(username = %identity.username, "rejected sign-in");
    return Err(Error::BadCredentials);
  }

  let cookie = auth::start_session(&state, &identity).await?;
  tracing::info!(identity_id = identity.identity_id, "signed in");
  Ok(([(header::SET_COOKIE, cookie)], Json(MemberView::from(&identity))))
}

/// `POST /logout/`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  CurrentUser(ctx): CurrentUser,
  headers: HeaderMap,
) -> Result<impl IntoResponse, Error>
where
  S: MemberStore + Clone + 'static,
{
  if let Some(token) = auth::session_token(&headers) {
    state
      .store
      .delete_session(auth::hash_token(&token))
      .await
      .map_err(Error::store)?;
  }
  tracing::info!(identity_id = ctx.identity.identity_id, "signed out");
  Ok(([(header::SET_COOKIE, auth::expired_cookie())], Redirect::to("/")))
}
