//! Member listings and the staff moderation actions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/` | Approved members, public fields only |
//! | `GET`  | `/admin/` | Staff only: pending queue and all members |
//! | `POST` | `/approve/{id}/` | Staff only; 303 to `/admin/` |
//! | `POST` | `/fire/{id}/` | Staff only; 303 to `/admin/`. Irreversible |

use axum::{
  Json,
  extract::{Path, State},
  response::Redirect,
};
use muster_core::{
  identity::PublicProfile,
  lookup,
  moderation::{self, AdminOverview},
  store::MemberStore,
};

use crate::{AppState, auth::CurrentUser, error::Error};

/// `GET /`
pub async fn index<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<PublicProfile>>, Error>
where
  S: MemberStore + Clone + 'static,
{
  Ok(Json(lookup::directory(&*state.store).await?))
}

/// `GET /admin/`
pub async fn admin<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
) -> Result<Json<AdminOverview>, Error>
where
  S: MemberStore + Clone + 'static,
{
  Ok(Json(moderation::admin_overview(&*state.store, &actor).await?))
}

/// `POST /approve/{id}/`
pub async fn approve<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<i64>,
) -> Result<Redirect, Error>
where
  S: MemberStore + Clone + 'static,
{
  moderation::approve(&*state.store, &actor, id).await?;
  Ok(Redirect::to("/admin/"))
}

/// `POST /fire/{id}/`
pub async fn fire<S>(
  State(state): State<AppState<S>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<i64>,
) -> Result<Redirect, Error>
where
  S: MemberStore + Clone + 'static,
{
  moderation::terminate(&*state.store, &actor, id).await?;
  Ok(Redirect::to("/admin/"))
}
