//! Unauthenticated lookups.

use axum::{
  Json,
  extract::{Path, State},
};
use muster_core::{identity::PublicProfile, lookup, store::MemberStore};
use serde_json::{Value, json};

use crate::{AppState, auth::hash_token, error::Error};

/// `GET /qrinfo/{public_id}/`: the profile a card's QR code points at.
pub async fn qrinfo<S>(
  State(state): State<AppState<S>>,
  Path(public_id): Path<String>,
) -> Result<Json<PublicProfile>, Error>
where
  S: MemberStore + Clone + 'static,
{
  Ok(Json(lookup::lookup(&*state.store, &public_id).await?))
}

/// `GET /verify/{token}/`: confirm an email address. Tokens are single use.
pub async fn verify<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
) -> Result<Json<Value>, Error>
where
  S: MemberStore + Clone + 'static,
{
  let identity_id = state
    .store
    .consume_verification(hash_token(&token))
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound)?;
  tracing::info!(identity_id, "email verified");
  Ok(Json(json!({ "verified": true })))
}
