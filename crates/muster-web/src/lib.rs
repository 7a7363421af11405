//! HTTP layer for Muster.
//!
//! Exposes an axum [`Router`] backed by any [`MemberStore`]. Pages answer with
//! JSON; state-changing staff actions answer with `303 See Other` redirects.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod setup;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use muster_card::CardStudio;
use muster_core::{role::NewRole, store::MemberStore, validation::EmailPolicy};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{card, members, public, session, signup};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  /// Absolute origin used in QR codes and verification links.
  pub base_url:          String,
  pub store_path:        PathBuf,
  /// Holds `background.png`, `font.ttf` and `badges/`.
  pub asset_dir:         PathBuf,
  /// Generated cards are written here.
  pub media_dir:         PathBuf,
  /// Only addresses in this domain may register.
  pub email_domain:      String,
  /// Card files kept in `media_dir`; at least two, so the newest card's PNG
  /// and PDF both survive eviction. Smaller values fail startup.
  #[serde(default = "default_card_retention")]
  pub card_retention:    usize,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
  /// Roles ensured at startup.
  #[serde(default)]
  pub roles:             Vec<NewRole>,
}

fn default_card_retention() -> usize { 10 }

fn default_session_ttl_hours() -> i64 { 24 * 14 }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: MemberStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub studio: Arc<CardStudio>,
  pub policy: Arc<EmailPolicy>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the member site.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MemberStore + Clone + 'static,
{
  Router::new()
    .route("/",                    get(members::index::<S>))
    .route("/login/",              get(session::current).post(session::login::<S>))
    .route("/logout/",             post(session::logout::<S>))
    .route("/register/",           get(signup::roles::<S>).post(signup::register::<S>))
    .route("/admin/",              get(members::admin::<S>))
    .route("/approve/{id}/",       post(members::approve::<S>))
    .route("/fire/{id}/",          post(members::fire::<S>))
    .route("/card/",               get(card::card::<S>))
    .route("/img/",                get(card::img::<S>))
    .route("/media/{file}/",       get(card::media::<S>))
    .route("/qrinfo/{public_id}/", get(public::qrinfo::<S>))
    .route("/verify/{token}/",     get(public::verify::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
