//! Roles (the "jobs" a member holds) and the seniority rule between them.

use serde::{Deserialize, Serialize};

// ─── RoleType ────────────────────────────────────────────────────────────────

/// The branch a role belongs to. Rank comparisons only make sense between
/// roles of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
  Peasant,
  Soldier,
  Miner,
  Builder,
  President,
  SpecialOps,
  Emperor,
}

impl RoleType {
  pub const ALL: [RoleType; 7] = [
    Self::Peasant,
    Self::Soldier,
    Self::Miner,
    Self::Builder,
    Self::President,
    Self::SpecialOps,
    Self::Emperor,
  ];

  /// Stable snake_case key, shared by the database column and badge asset
  /// file names.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Peasant => "peasant",
      Self::Soldier => "soldier",
      Self::Miner => "miner",
      Self::Builder => "builder",
      Self::President => "president",
      Self::SpecialOps => "special_ops",
      Self::Emperor => "emperor",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.as_str() == s)
  }
}

impl std::fmt::Display for RoleType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Role ────────────────────────────────────────────────────────────────────

/// An assignable position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub role_id:   i64,
  pub name:      String,
  /// At most one active identity may hold this role.
  pub is_unique: bool,
  /// Holders may approve and terminate other members.
  pub is_staff:  bool,
  pub role_type: RoleType,
  /// Seniority within `role_type`; higher is more senior.
  pub rank:      u32,
}

/// Seed input for [`crate::store::MemberStore::upsert_role`]. Roles are keyed
/// by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
  pub name:      String,
  #[serde(default)]
  pub is_unique: bool,
  #[serde(default)]
  pub is_staff:  bool,
  pub role_type: RoleType,
  #[serde(default)]
  pub rank:      u32,
}

/// Whether a holder of `actor` may moderate (approve or terminate) a holder of
/// `target`: same type, and at least as senior.
pub fn can_moderate(actor: &Role, target: &Role) -> bool {
  actor.role_type == target.role_type && actor.rank >= target.rank
}

#[cfg(test)]
mod tests {
  use super::*;

  fn role(role_type: RoleType, rank: u32) -> Role {
    Role {
      role_id: 1,
      name: format!("{role_type}-{rank}"),
      is_unique: false,
      is_staff: true,
      role_type,
      rank,
    }
  }

  #[test]
  fn senior_same_type_can_moderate() {
    assert!(can_moderate(&role(RoleType::Soldier, 3), &role(RoleType::Soldier, 1)));
  }

  #[test]
  fn equal_rank_same_type_can_moderate() {
    assert!(can_moderate(&role(RoleType::Miner, 2), &role(RoleType::Miner, 2)));
  }

  #[test]
  fn junior_cannot_moderate() {
    assert!(!can_moderate(&role(RoleType::Miner, 1), &role(RoleType::Miner, 2)));
  }

  #[test]
  fn different_type_cannot_moderate_regardless_of_rank() {
    assert!(!can_moderate(
      &role(RoleType::Emperor, 99),
      &role(RoleType::Peasant, 0)
    ));
  }

  #[test]
  fn role_type_keys_round_trip() {
    for t in RoleType::ALL {
      assert_eq!(RoleType::parse(t.as_str()), Some(t));
    }
    assert_eq!(RoleType::parse("wizard"), None);
  }
}
