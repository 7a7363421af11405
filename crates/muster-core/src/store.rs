//! The `MemberStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `muster-store-sqlite`).
//! Workflows and the web layer depend on this abstraction only.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  identity::{Identity, NewIdentity},
  role::{NewRole, Role},
  validation::FieldError,
};

// ─── Query and result types ──────────────────────────────────────────────────

/// Parameters for [`MemberStore::list_identities`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFilter {
  /// Restrict to approved (`Some(true)`) or pending (`Some(false)`) members.
  pub approved:    Option<bool>,
  /// Skip deactivated accounts.
  pub active_only: bool,
}

/// Outcome of [`MemberStore::create_identity`].
#[derive(Debug, Clone)]
pub enum Insertion {
  Created(Identity),
  /// A uniqueness rule failed inside the insert transaction.
  Rejected(Vec<FieldError>),
}

/// Input to [`MemberStore::create_session`].
#[derive(Debug, Clone)]
pub struct NewSession {
  /// Hex SHA-256 of the cookie token; the raw token is never stored.
  pub token_hash:  String,
  pub identity_id: i64,
  pub expires_at:  DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Muster storage backend.
///
/// Every method that returns an [`Identity`] returns it with its role already
/// attached.
pub trait MemberStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Roles ─────────────────────────────────────────────────────────────

  /// Insert a role, or update the role with the same name in place.
  fn upsert_role(
    &self,
    role: NewRole,
  ) -> impl Future<Output = Result<Role, Self::Error>> + Send + '_;

  fn get_role(
    &self,
    role_id: i64,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;

  /// All roles, ordered by type then rank.
  fn list_roles(
    &self,
  ) -> impl Future<Output = Result<Vec<Role>, Self::Error>> + Send + '_;

  /// Whether any active identity currently holds `role_id`.
  fn role_has_active_holder(
    &self,
    role_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Identities ────────────────────────────────────────────────────────

  /// Insert a new identity with a freshly generated public id.
  ///
  /// Email, username, and unique-role exclusivity are re-checked in the same
  /// transaction as the insert; violations come back as
  /// [`Insertion::Rejected`] and nothing is written.
  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Insertion, Self::Error>> + Send + '_;

  fn get_identity(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn find_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn find_by_public_id(
    &self,
    public_id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Case-insensitive.
  fn email_in_use(
    &self,
    email: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn username_in_use(
    &self,
    username: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Members ordered by join date.
  fn list_identities(
    &self,
    filter: IdentityFilter,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

  /// Set `approved = true`. Returns `false` if the identity does not exist.
  fn set_approved(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Permanently delete an identity. Returns `false` if it did not exist.
  fn delete_identity(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    session: NewSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a session to its active identity. Sessions expired at `now` are
  /// purged and never resolve.
  fn session_identity(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Email verification ────────────────────────────────────────────────

  fn store_verification(
    &self,
    identity_id: i64,
    token_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Consume a verification token, marking its identity verified. Returns
  /// the identity id, or `None` for an unknown token.
  fn consume_verification(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;
}
