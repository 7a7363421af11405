//! Identities (registered members) and the views derived from them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::role::{Role, RoleType, can_moderate};

// ─── Identity ────────────────────────────────────────────────────────────────

/// A registered member, always loaded together with its role.
///
/// Deliberately not `Serialize`: it carries the password hash. Use
/// [`MemberView`] or [`PublicProfile`] for anything leaving the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  /// Internal key; only ever exposed on staff routes.
  pub identity_id:    i64,
  /// Random, stable identifier used in public URLs.
  pub public_id:      Uuid,
  pub username:       String,
  pub email:          String,
  /// PHC string owned by the credential hasher.
  pub password_hash:  String,
  pub first_name:     String,
  pub last_name:      String,
  pub role:           Option<Role>,
  pub approved:       bool,
  pub active:         bool,
  /// Staff capability granted independently of the role.
  pub is_staff:       bool,
  pub is_superuser:   bool,
  pub email_verified: bool,
  pub date_joined:    DateTime<Utc>,
}

impl Identity {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name).trim().to_string()
  }

  /// Staff through either the role or the override flag.
  pub fn has_staff_capability(&self) -> bool {
    self.is_superuser
      || self.is_staff
      || self.role.as_ref().is_some_and(|r| r.is_staff)
  }
}

/// Input to [`crate::store::MemberStore::create_identity`].
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub role_id:       Option<i64>,
  pub is_staff:      bool,
  pub is_superuser:  bool,
  /// Superusers created from the command line skip the approval queue.
  pub approved:      bool,
}

// ─── AuthContext ─────────────────────────────────────────────────────────────

/// The authenticated caller of a workflow, passed explicitly into every call.
#[derive(Debug, Clone)]
pub struct AuthContext {
  pub identity: Identity,
}

impl AuthContext {
  pub fn new(identity: Identity) -> Self { Self { identity } }

  /// Staff capability only counts once the caller has been approved;
  /// superusers always have it.
  pub fn is_staff(&self) -> bool {
    self.identity.is_superuser || (self.identity.approved && self.identity.has_staff_capability())
  }

  pub fn is_approved(&self) -> bool { self.identity.approved }

  /// Whether this caller may approve or terminate `target`.
  ///
  /// Superusers may moderate anyone but themselves. Other staff never reach
  /// superusers; between two role holders [`can_moderate`] decides, and a
  /// target without a role is only reachable when it carries no staff
  /// capability of its own.
  pub fn may_moderate(&self, target: &Identity) -> bool {
    if target.identity_id == self.identity.identity_id {
      return false;
    }
    if self.identity.is_superuser {
      return true;
    }
    if !self.is_staff() || target.is_superuser {
      return false;
    }
    match (&self.identity.role, &target.role) {
      (Some(actor), Some(target)) => can_moderate(actor, target),
      (_, None) => !target.has_staff_capability(),
      (None, Some(_)) => false,
    }
  }
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// Role fields safe to show to anyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSummary {
  pub name:      String,
  pub role_type: RoleType,
  pub rank:      u32,
}

impl From<&Role> for RoleSummary {
  fn from(role: &Role) -> Self {
    Self { name: role.name.clone(), role_type: role.role_type, rank: role.rank }
  }
}

/// The read-only profile behind a QR code. Never includes credentials or
/// internal keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicProfile {
  pub public_id:  Uuid,
  pub first_name: String,
  pub last_name:  String,
  pub role:       Option<RoleSummary>,
  pub approved:   bool,
}

impl From<&Identity> for PublicProfile {
  fn from(identity: &Identity) -> Self {
    Self {
      public_id:  identity.public_id,
      first_name: identity.first_name.clone(),
      last_name:  identity.last_name.clone(),
      role:       identity.role.as_ref().map(RoleSummary::from),
      approved:   identity.approved,
    }
  }
}

/// What staff and the member themself see: everything but the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
  pub identity_id:    i64,
  pub public_id:      Uuid,
  pub username:       String,
  pub email:          String,
  pub first_name:     String,
  pub last_name:      String,
  pub role:           Option<RoleSummary>,
  pub approved:       bool,
  pub active:         bool,
  pub is_staff:       bool,
  pub email_verified: bool,
  pub date_joined:    DateTime<Utc>,
}

impl From<&Identity> for MemberView {
  fn from(identity: &Identity) -> Self {
    Self {
      identity_id:    identity.identity_id,
      public_id:      identity.public_id,
      username:       identity.username.clone(),
      email:          identity.email.clone(),
      first_name:     identity.first_name.clone(),
      last_name:      identity.last_name.clone(),
      role:           identity.role.as_ref().map(RoleSummary::from),
      approved:       identity.approved,
      active:         identity.active,
      is_staff:       identity.has_staff_capability(),
      email_verified: identity.email_verified,
      date_joined:    identity.date_joined,
    }
  }
}
