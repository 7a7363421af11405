//! In-memory fakes for exercising workflows without a database.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Identity, NewIdentity},
  registration::{CredentialHasher, Notifier},
  role::{NewRole, Role},
  store::{IdentityFilter, Insertion, MemberStore, NewSession},
  validation::FieldError,
};

#[derive(Default)]
struct Inner {
  roles:         Vec<Role>,
  identities:    Vec<Identity>,
  sessions:      HashMap<String, (i64, DateTime<Utc>)>,
  verifications: HashMap<String, i64>,
  next_id:       i64,
  /// Returned by the next `create_identity`, as if a concurrent insert won.
  lost_race:     Option<Vec<FieldError>>,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().expect("memory store poisoned")
  }

  pub fn identity_count(&self) -> usize { self.lock().identities.len() }

  /// Make the next insert fail with `errors` even though every pre-check
  /// passed.
  pub fn lose_next_insert(&self, errors: Vec<FieldError>) { self.lock().lost_race = Some(errors); }
}

impl Inner {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }

  fn holder_exists(&self, role_id: i64) -> bool {
    self
      .identities
      .iter()
      .any(|i| i.active && i.role.as_ref().is_some_and(|r| r.role_id == role_id))
  }
}

impl MemberStore for MemoryStore {
  type Error = Infallible;

  async fn upsert_role(&self, input: NewRole) -> Result<Role, Infallible> {
    let mut inner = self.lock();
    let existing = inner.roles.iter().find(|r| r.name == input.name).map(|r| r.role_id);
    let role_id = match existing {
      Some(id) => id,
      None => inner.next_id(),
    };
    let role = Role {
      role_id,
      name: input.name,
      is_unique: input.is_unique,
      is_staff: input.is_staff,
      role_type: input.role_type,
      rank: input.rank,
    };
    inner.roles.retain(|r| r.role_id != role_id);
    inner.roles.push(role.clone());
    Ok(role)
  }

  async fn get_role(&self, role_id: i64) -> Result<Option<Role>, Infallible> {
    Ok(self.lock().roles.iter().find(|r| r.role_id == role_id).cloned())
  }

  async fn list_roles(&self) -> Result<Vec<Role>, Infallible> { Ok(self.lock().roles.clone()) }

  async fn role_has_active_holder(&self, role_id: i64) -> Result<bool, Infallible> {
    Ok(self.lock().holder_exists(role_id))
  }

  async fn create_identity(&self, input: NewIdentity) -> Result<Insertion, Infallible> {
    let mut inner = self.lock();
    if let Some(errors) = inner.lost_race.take() {
      return Ok(Insertion::Rejected(errors));
    }
    let mut rejected = Vec::new();
    if inner.identities.iter().any(|i| i.email.eq_ignore_ascii_case(&input.email)) {
      rejected.push(FieldError::EmailAlreadyUsed);
    }
    if inner.identities.iter().any(|i| i.username == input.username) {
      rejected.push(FieldError::UsernameAlreadyUsed);
    }
    let role = input
      .role_id
      .and_then(|id| inner.roles.iter().find(|r| r.role_id == id).cloned());
    if let Some(role) = &role
      && role.is_unique
      && inner.holder_exists(role.role_id)
    {
      rejected.push(FieldError::RoleUnavailable);
    }
    if !rejected.is_empty() {
      return Ok(Insertion::Rejected(rejected));
    }

    let identity = Identity {
      identity_id: inner.next_id(),
      public_id: Uuid::new_v4(),
      username: input.username,
      email: input.email,
      password_hash: input.password_hash,
      first_name: input.first_name,
      last_name: input.last_name,
      role,
      approved: input.approved,
      active: true,
      is_staff: input.is_staff,
      is_superuser: input.is_superuser,
      email_verified: false,
      date_joined: Utc::now(),
    };
    inner.identities.push(identity.clone());
    Ok(Insertion::Created(identity))
  }

  async fn get_identity(&self, identity_id: i64) -> Result<Option<Identity>, Infallible> {
    Ok(
      self
        .lock()
        .identities
        .iter()
        .find(|i| i.identity_id == identity_id)
        .cloned(),
    )
  }

  async fn find_by_username(&self, username: String) -> Result<Option<Identity>, Infallible> {
    Ok(self.lock().identities.iter().find(|i| i.username == username).cloned())
  }

  async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Identity>, Infallible> {
    Ok(self.lock().identities.iter().find(|i| i.public_id == public_id).cloned())
  }

  async fn email_in_use(&self, email: String) -> Result<bool, Infallible> {
    Ok(self.lock().identities.iter().any(|i| i.email.eq_ignore_ascii_case(&email)))
  }

  async fn username_in_use(&self, username: String) -> Result<bool, Infallible> {
    Ok(self.lock().identities.iter().any(|i| i.username == username))
  }

  async fn list_identities(&self, filter: IdentityFilter) -> Result<Vec<Identity>, Infallible> {
    Ok(
      self
        .lock()
        .identities
        .iter()
        .filter(|i| filter.approved.is_none_or(|a| i.approved == a))
        .filter(|i| !filter.active_only || i.active)
        .cloned()
        .collect(),
    )
  }

  async fn set_approved(&self, identity_id: i64) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    match inner.identities.iter_mut().find(|i| i.identity_id == identity_id) {
      Some(identity) => {
        identity.approved = true;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn delete_identity(&self, identity_id: i64) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    let before = inner.identities.len();
    inner.identities.retain(|i| i.identity_id != identity_id);
    inner.sessions.retain(|_, (id, _)| *id != identity_id);
    Ok(inner.identities.len() != before)
  }

  async fn create_session(&self, session: NewSession) -> Result<(), Infallible> {
    self
      .lock()
      .sessions
      .insert(session.token_hash, (session.identity_id, session.expires_at));
    Ok(())
  }

  async fn session_identity(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> Result<Option<Identity>, Infallible> {
    let mut inner = self.lock();
    inner.sessions.retain(|_, (_, expires)| *expires > now);
    let Some((id, _)) = inner.sessions.get(&token_hash).copied() else {
      return Ok(None);
    };
    Ok(inner.identities.iter().find(|i| i.identity_id == id && i.active).cloned())
  }

  async fn delete_session(&self, token_hash: String) -> Result<(), Infallible> {
    self.lock().sessions.remove(&token_hash);
    Ok(())
  }

  async fn store_verification(&self, identity_id: i64, token_hash: String) -> Result<(), Infallible> {
    self.lock().verifications.insert(token_hash, identity_id);
    Ok(())
  }

  async fn consume_verification(&self, token_hash: String) -> Result<Option<i64>, Infallible> {
    let mut inner = self.lock();
    let Some(id) = inner.verifications.remove(&token_hash) else {
      return Ok(None);
    };
    if let Some(identity) = inner.identities.iter_mut().find(|i| i.identity_id == id) {
      identity.email_verified = true;
    }
    Ok(Some(id))
  }
}

/// Prefixes instead of hashing so tests can see what was stored.
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
  fn hash(&self, password: &str) -> Result<String> { Ok(format!("hashed:{password}")) }
}

#[derive(Default)]
pub struct RecordingNotifier {
  sent: Mutex<Vec<i64>>,
}

impl RecordingNotifier {
  pub fn sent(&self) -> Vec<i64> { self.sent.lock().expect("poisoned").clone() }
}

impl Notifier for RecordingNotifier {
  async fn email_verification(&self, identity: &Identity) -> Result<()> {
    self.sent.lock().expect("poisoned").push(identity.identity_id);
    Ok(())
  }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
  async fn email_verification(&self, _: &Identity) -> Result<()> {
    Err(Error::Notify("mail relay unreachable".into()))
  }
}
