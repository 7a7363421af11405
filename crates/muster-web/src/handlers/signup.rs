//! Self-service registration.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/register/` | Roles that may currently be chosen |
//! | `POST` | `/register/` | Body: a `Registration`; 201 with the new member and a session cookie |
//!
//! Staff roles may be chosen here but confer nothing until the member is
//! approved.

use axum::{
  Json,
  extract::State,
  http::{StatusCode, header},
  response::IntoResponse,
};
use muster_core::{
  identity::MemberView,
  registration::{self, Registration},
  role::Role,
  store::MemberStore,
};

use crate::{
  AppState,
  auth::{self, Argon2Hasher},
  error::Error,
  notify::VerificationMailer,
};

/// `GET /register/`
pub async fn roles<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<Role>>, Error>
where
  S: MemberStore + Clone + 'static,
{
  Ok(Json(registration::available_roles(&*state.store).await?))
}

/// `POST /register/`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(form): Json<Registration>,
) -> Result<impl IntoResponse, Error>
where
  S: MemberStore + Clone + 'static,
{
  let mailer = VerificationMailer::new(state.store.clone(), &state.config.base_url);
  let identity =
    registration::register(&*state.store, &state.policy, &Argon2Hasher, &mailer, form).await?;

  // A member who cannot be signed in must register again, so the row goes.
  let cookie = match auth::start_session(&state, &identity).await {
    Ok(cookie) => cookie,
    Err(e) => {
      tracing::warn!(
        identity_id = identity.identity_id,
        error = %e,
        "session start failed; rolling back registration"
      );
      state
        .store
        .delete_identity(identity.identity_id)
        .await
        .map_err(Error::store)?;
      return Err(e);
    }
  };
  Ok((
    StatusCode::CREATED,
    [(header::SET_COOKIE, cookie)],
    Json(MemberView::from(&identity)),
  ))
}
