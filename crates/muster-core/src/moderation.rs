//! Staff workflows: approval, termination, and the moderation overview.

use serde::Serialize;

use crate::{
  AuthContext, Error, Result,
  identity::{Identity, MemberView},
  store::{IdentityFilter, MemberStore},
};

/// Load `target_id` and check that `actor` may moderate it.
///
/// Callers without staff capability, and callers naming themselves, are
/// refused before the target is looked up, so they cannot probe which ids
/// exist.
async fn authorize<S: MemberStore>(
  store: &S,
  actor: &AuthContext,
  target_id: i64,
) -> Result<Identity> {
  if !actor.is_staff() || target_id == actor.identity.identity_id {
    return Err(Error::PermissionDenied);
  }
  let target = store
    .get_identity(target_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound)?;
  if !actor.may_moderate(&target) {
    return Err(Error::PermissionDenied);
  }
  Ok(target)
}

/// Approve a pending identity. Approving an approved identity is a no-op.
pub async fn approve<S: MemberStore>(
  store: &S,
  actor: &AuthContext,
  target_id: i64,
) -> Result<Identity> {
  let target = authorize(store, actor, target_id).await?;
  if target.approved {
    return Ok(target);
  }
  if !store.set_approved(target_id).await.map_err(Error::store)? {
    return Err(Error::NotFound);
  }
  tracing::info!(
    actor = actor.identity.identity_id,
    target = target_id,
    "approved member"
  );
  Ok(Identity { approved: true, ..target })
}

/// Permanently delete an identity. There is no undo.
pub async fn terminate<S: MemberStore>(
  store: &S,
  actor: &AuthContext,
  target_id: i64,
) -> Result<()> {
  authorize(store, actor, target_id).await?;
  if !store.delete_identity(target_id).await.map_err(Error::store)? {
    return Err(Error::NotFound);
  }
  tracing::info!(
    actor = actor.identity.identity_id,
    target = target_id,
    "terminated member"
  );
  Ok(())
}

/// What the staff admin page lists.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOverview {
  pub pending: Vec<MemberView>,
  pub members: Vec<MemberView>,
}

pub async fn admin_overview<S: MemberStore>(
  store: &S,
  actor: &AuthContext,
) -> Result<AdminOverview> {
  if !actor.is_staff() {
    return Err(Error::PermissionDenied);
  }
  let all = store
    .list_identities(IdentityFilter::default())
    .await
    .map_err(Error::store)?;
  let members: Vec<MemberView> = all.iter().map(MemberView::from).collect();
  let pending = members.iter().filter(|m| !m.approved).cloned().collect();
  Ok(AdminOverview { pending, members })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    identity::NewIdentity,
    role::{NewRole, RoleType},
    store::Insertion,
    testing::MemoryStore,
  };

  async fn role(store: &MemoryStore, name: &str, t: RoleType, rank: u32, staff: bool) -> i64 {
    store
      .upsert_role(NewRole {
        name:      name.into(),
        is_unique: false,
        is_staff:  staff,
        role_type: t,
        rank,
      })
      .await
      .unwrap()
      .role_id
  }

  async fn member(store: &MemoryStore, name: &str, role_id: Option<i64>) -> Identity {
    create(store, name, role_id, false).await
  }

  /// An approved member, as every acting staff member must be.
  async fn staff(store: &MemoryStore, name: &str, role_id: Option<i64>) -> AuthContext {
    AuthContext::new(create(store, name, role_id, true).await)
  }

  async fn create(store: &MemoryStore, name: &str, role_id: Option<i64>, approved: bool) -> Identity {
    let input = NewIdentity {
      username:      name.into(),
      email:         format!("{name}@org.domain"),
      password_hash: "x".into(),
      first_name:    name.into(),
      last_name:     "Test".into(),
      role_id,
      is_staff:      false,
      is_superuser:  false,
      approved,
    };
    match store.create_identity(input).await.unwrap() {
      Insertion::Created(identity) => identity,
      Insertion::Rejected(e) => panic!("rejected: {e:?}"),
    }
  }

  #[tokio::test]
  async fn staff_approves_junior_of_same_type() {
    let store = MemoryStore::default();
    let captain = role(&store, "Captain", RoleType::Soldier, 5, true).await;
    let private = role(&store, "Private", RoleType::Soldier, 1, false).await;
    let actor = staff(&store, "cap", Some(captain)).await;
    let target = member(&store, "pvt", Some(private)).await;

    let approved = approve(&store, &actor, target.identity_id).await.unwrap();
    assert!(approved.approved);
    assert!(store.get_identity(target.identity_id).await.unwrap().unwrap().approved);
  }

  #[tokio::test]
  async fn approval_is_idempotent() {
    let store = MemoryStore::default();
    let captain = role(&store, "Captain", RoleType::Soldier, 5, true).await;
    let actor = staff(&store, "cap", Some(captain)).await;
    let target = member(&store, "pvt", Some(captain)).await;

    approve(&store, &actor, target.identity_id).await.unwrap();
    let again = approve(&store, &actor, target.identity_id).await.unwrap();
    assert!(again.approved);
  }

  #[tokio::test]
  async fn staff_of_other_type_is_denied() {
    let store = MemoryStore::default();
    let foreman = role(&store, "Foreman", RoleType::Miner, 9, true).await;
    let private = role(&store, "Private", RoleType::Soldier, 1, false).await;
    let actor = staff(&store, "boss", Some(foreman)).await;
    let target = member(&store, "pvt", Some(private)).await;

    let err = approve(&store, &actor, target.identity_id).await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied));
    assert!(!store.get_identity(target.identity_id).await.unwrap().unwrap().approved);
  }

  #[tokio::test]
  async fn non_staff_is_denied_regardless_of_target() {
    let store = MemoryStore::default();
    let private = role(&store, "Private", RoleType::Soldier, 1, false).await;
    let actor = staff(&store, "pvt", Some(private)).await;
    let target = member(&store, "other", None).await;

    for id in [target.identity_id, 4242] {
      assert!(matches!(approve(&store, &actor, id).await, Err(Error::PermissionDenied)));
      assert!(matches!(terminate(&store, &actor, id).await, Err(Error::PermissionDenied)));
    }
    assert!(matches!(admin_overview(&store, &actor).await, Err(Error::PermissionDenied)));
  }

  #[tokio::test]
  async fn superuser_bypasses_rank_rule() {
    let store = MemoryStore::default();
    let emperor = role(&store, "Emperor", RoleType::Emperor, 100, true).await;
    let mut root = member(&store, "root", None).await;
    root.is_superuser = true;
    let actor = AuthContext::new(root);
    let target = member(&store, "emp", Some(emperor)).await;

    assert!(approve(&store, &actor, target.identity_id).await.unwrap().approved);
  }

  #[tokio::test]
  async fn missing_target_is_not_found_for_staff() {
    let store = MemoryStore::default();
    let captain = role(&store, "Captain", RoleType::Soldier, 5, true).await;
    let actor = staff(&store, "cap", Some(captain)).await;

    assert!(matches!(approve(&store, &actor, 777).await, Err(Error::NotFound)));
    assert!(matches!(terminate(&store, &actor, 777).await, Err(Error::NotFound)));
  }

  #[tokio::test]
  async fn terminate_deletes_permanently() {
    let store = MemoryStore::default();
    let captain = role(&store, "Captain", RoleType::Soldier, 5, true).await;
    let actor = staff(&store, "cap", Some(captain)).await;
    let target = member(&store, "gone", None).await;

    terminate(&store, &actor, target.identity_id).await.unwrap();
    assert!(store.get_identity(target.identity_id).await.unwrap().is_none());
    assert!(matches!(
      terminate(&store, &actor, target.identity_id).await,
      Err(Error::NotFound)
    ));
  }

  #[tokio::test]
  async fn overview_splits_pending_members() {
    let store = MemoryStore::default();
    let captain = role(&store, "Captain", RoleType::Soldier, 5, true).await;
    let actor = staff(&store, "cap", Some(captain)).await;
    let approved = member(&store, "pvt", None).await;
    member(&store, "waiting", None).await;
    approve(&store, &actor, approved.identity_id).await.unwrap();

    let overview = admin_overview(&store, &actor).await.unwrap();
    assert_eq!(overview.members.len(), 3);
    assert_eq!(overview.pending.len(), 1);
    assert_eq!(overview.pending[0].username, "waiting");
  }

  #[tokio::test]
  async fn pending_holder_of_staff_role_cannot_moderate() {
    let store = MemoryStore::default();
    let captain = role(&store, "Captain", RoleType::Soldier, 5, true).await;
    let private = role(&store, "Private", RoleType::Soldier, 1, false).await;
    let pending = member(&store, "cap", Some(captain)).await;
    let target = member(&store, "pvt", Some(private)).await;
    let actor = AuthContext::new(pending.clone());

    for id in [pending.identity_id, target.identity_id] {
      assert!(matches!(approve(&store, &actor, id).await, Err(Error::PermissionDenied)));
      assert!(matches!(terminate(&store, &actor, id).await, Err(Error::PermissionDenied)));
    }
    assert!(!store.get_identity(pending.identity_id).await.unwrap().unwrap().approved);
    assert_eq!(store.identity_count(), 2);
  }

  #[tokio::test]
  async fn staff_cannot_moderate_themselves() {
    let store = MemoryStore::default();
    let captain = role(&store, "Captain", RoleType::Soldier, 5, true).await;
    let actor = staff(&store, "cap", Some(captain)).await;
    let own = actor.identity.identity_id;

    assert!(matches!(terminate(&store, &actor, own).await, Err(Error::PermissionDenied)));
    assert!(store.get_identity(own).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn staff_cannot_reach_superusers() {
    let store = MemoryStore::default();
    let emperor = role(&store, "Emperor", RoleType::Emperor, 100, true).await;
    let actor = staff(&store, "emp", Some(emperor)).await;
    let root = store
      .create_identity(NewIdentity {
        username:      "root".into(),
        email:         "root@org.domain".into(),
        password_hash: "x".into(),
        first_name:    "Root".into(),
        last_name:     "User".into(),
        role_id:       None,
        is_staff:      true,
        is_superuser:  true,
        approved:      true,
      })
      .await
      .unwrap();
    let Insertion::Created(root) = root else { panic!("root rejected") };

    assert!(matches!(
      terminate(&store, &actor, root.identity_id).await,
      Err(Error::PermissionDenied)
    ));
    assert!(store.get_identity(root.identity_id).await.unwrap().is_some());
  }
}
