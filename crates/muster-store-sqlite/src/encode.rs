//! Encoding and decoding between domain types and SQLite column values.
//!
//! Timestamps are stored as RFC 3339 UTC strings with fixed microsecond
//! precision so that they sort lexically. UUIDs are stored hyphenated.

use chrono::{DateTime, SecondsFormat, Utc};
use muster_core::{
  identity::Identity,
  role::{Role, RoleType},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_role_type(s: &str) -> Result<RoleType> {
  RoleType::parse(s).ok_or_else(|| Error::UnknownRoleType(s.to_string()))
}

fn decode_rank(rank: i64) -> Result<u32> { u32::try_from(rank).map_err(|_| Error::Rank(rank)) }

// ─── Column lists ────────────────────────────────────────────────────────────

pub const ROLE_COLUMNS: &str = "role_id, name, is_unique, is_staff, role_type, rank";

/// Identity columns joined with the role columns; the role side is all NULL
/// for identities without a role.
pub const IDENTITY_SELECT: &str = "
  SELECT i.identity_id, i.public_id, i.username, i.email, i.password_hash,
         i.first_name, i.last_name, i.approved, i.active, i.is_staff,
         i.is_superuser, i.email_verified, i.date_joined,
         r.role_id, r.name, r.is_unique, r.is_staff, r.role_type, r.rank
  FROM identities i
  LEFT JOIN roles r ON r.role_id = i.role_id";

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `roles` row before type conversion.
pub struct RawRole {
  pub role_id:   i64,
  pub name:      String,
  pub is_unique: bool,
  pub is_staff:  bool,
  pub role_type: String,
  pub rank:      i64,
}

impl RawRole {
  /// Read a row selected with [`ROLE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      role_id:   row.get(0)?,
      name:      row.get(1)?,
      is_unique: row.get(2)?,
      is_staff:  row.get(3)?,
      role_type: row.get(4)?,
      rank:      row.get(5)?,
    })
  }

  pub fn into_role(self) -> Result<Role> {
    Ok(Role {
      role_id:   self.role_id,
      name:      self.name,
      is_unique: self.is_unique,
      is_staff:  self.is_staff,
      role_type: decode_role_type(&self.role_type)?,
      rank:      decode_rank(self.rank)?,
    })
  }
}

/// An `identities` row joined with its role, before type conversion.
pub struct RawIdentity {
  pub identity_id:    i64,
  pub public_id:      String,
  pub username:       String,
  pub email:          String,
  pub password_hash:  String,
  pub first_name:     String,
  pub last_name:      String,
  pub approved:       bool,
  pub active:         bool,
  pub is_staff:       bool,
  pub is_superuser:   bool,
  pub email_verified: bool,
  pub date_joined:    String,
  pub role:           Option<RawRole>,
}

impl RawIdentity {
  /// Read a row selected with [`IDENTITY_SELECT`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let role_id: Option<i64> = row.get(13)?;
    let role = match role_id {
      Some(role_id) => Some(RawRole {
        role_id,
        name: row.get(14)?,
        is_unique: row.get(15)?,
        is_staff: row.get(16)?,
        role_type: row.get(17)?,
        rank: row.get(18)?,
      }),
      None => None,
    };
    Ok(Self {
      identity_id: row.get(0)?,
      public_id: row.get(1)?,
      username: row.get(2)?,
      email: row.get(3)?,
      password_hash: row.get(4)?,
      first_name: row.get(5)?,
      last_name: row.get(6)?,
      approved: row.get(7)?,
      active: row.get(8)?,
      is_staff: row.get(9)?,
      is_superuser: row.get(10)?,
      email_verified: row.get(11)?,
      date_joined: row.get(12)?,
      role,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      identity_id:    self.identity_id,
      public_id:      Uuid::parse_str(&self.public_id)?,
      username:       self.username,
      email:          self.email,
      password_hash:  self.password_hash,
      first_name:     self.first_name,
      last_name:      self.last_name,
      role:           self.role.map(RawRole::into_role).transpose()?,
      approved:       self.approved,
      active:         self.active,
      is_staff:       self.is_staff,
      is_superuser:   self.is_superuser,
      email_verified: self.email_verified,
      date_joined:    decode_dt(&self.date_joined)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let b = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
    let c = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
    let (ea, eb, ec) = (encode_dt(a), encode_dt(b), encode_dt(c));
    assert!(ea < eb && eb < ec, "{ea} {eb} {ec}");
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn negative_rank_is_rejected() {
    assert!(matches!(decode_rank(-1), Err(Error::Rank(-1))));
    assert_eq!(decode_rank(7).unwrap(), 7);
  }
}
