//! Registration workflow: validate a signup and create a pending identity.

use std::future::Future;

use serde::Deserialize;

use crate::{
  Error, Result,
  identity::{Identity, NewIdentity},
  role::Role,
  store::{Insertion, MemberStore},
  validation::{EmailPolicy, FieldError, ValidationErrors},
};

/// A signup submission as it arrives from the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
  #[serde(default)]
  pub username:     String,
  #[serde(default)]
  pub email:        String,
  #[serde(default)]
  pub password:     String,
  #[serde(default)]
  pub confirmation: String,
  #[serde(default)]
  pub first_name:   String,
  #[serde(default)]
  pub last_name:    String,
  pub role_id:      Option<i64>,
}

impl Registration {
  /// Trim whitespace from everything except the passwords.
  fn normalized(mut self) -> Self {
    for field in [
      &mut self.username,
      &mut self.email,
      &mut self.first_name,
      &mut self.last_name,
    ] {
      *field = field.trim().to_string();
    }
    self
  }
}

/// Turns a plaintext password into an opaque, storable hash.
pub trait CredentialHasher: Send + Sync {
  fn hash(&self, password: &str) -> Result<String>;
}

/// Dispatches outbound messages about an identity.
pub trait Notifier: Send + Sync {
  /// Ask the member to confirm their email address.
  fn email_verification(
    &self,
    identity: &Identity,
  ) -> impl Future<Output = Result<()>> + Send;
}

/// A unique role is taken while any active identity holds it.
async fn is_available<S: MemberStore>(store: &S, role: &Role) -> Result<bool> {
  if !role.is_unique {
    return Ok(true);
  }
  let held = store
    .role_has_active_holder(role.role_id)
    .await
    .map_err(Error::store)?;
  Ok(!held)
}

/// Roles a new member may currently pick on the signup form.
///
/// Staff roles are offered too: their capability only applies once another
/// staff member has approved the holder.
pub async fn available_roles<S: MemberStore>(store: &S) -> Result<Vec<Role>> {
  let mut available = Vec::new();
  for role in store.list_roles().await.map_err(Error::store)? {
    if is_available(store, &role).await? {
      available.push(role);
    }
  }
  Ok(available)
}

/// Validate `form` and create a pending (`approved = false`) identity.
///
/// All field errors are collected before failing. Nothing is persisted on
/// failure: if the verification message cannot be dispatched after the
/// insert, the new identity is deleted again.
pub async fn register<S, H, N>(
  store: &S,
  policy: &EmailPolicy,
  hasher: &H,
  notifier: &N,
  form: Registration,
) -> Result<Identity>
where
  S: MemberStore,
  H: CredentialHasher,
  N: Notifier,
{
  let form = form.normalized();
  let mut errors = ValidationErrors::default();

  for (name, value) in [
    ("username", &form.username),
    ("email", &form.email),
    ("password", &form.password),
    ("first_name", &form.first_name),
    ("last_name", &form.last_name),
  ] {
    if value.is_empty() {
      errors.push(FieldError::Required(name));
    }
  }

  if !form.email.is_empty() {
    if !policy.accepts(&form.email) {
      errors.push(FieldError::EmailFormatInvalid);
    } else if store
      .email_in_use(form.email.clone())
      .await
      .map_err(Error::store)?
    {
      errors.push(FieldError::EmailAlreadyUsed);
    }
  }

  if !form.username.is_empty()
    && store
      .username_in_use(form.username.clone())
      .await
      .map_err(Error::store)?
  {
    errors.push(FieldError::UsernameAlreadyUsed);
  }

  if form.password != form.confirmation {
    errors.push(FieldError::PasswordMismatch);
  }

  match form.role_id {
    None => errors.push(FieldError::Required("role_id")),
    Some(role_id) => {
      let available = match store.get_role(role_id).await.map_err(Error::store)? {
        None => false,
        Some(role) => is_available(store, &role).await?,
      };
      if !available {
        errors.push(FieldError::RoleUnavailable);
      }
    }
  }

  errors.into_result()?;

  let password_hash = hasher.hash(&form.password)?;
  let input = NewIdentity {
    username: form.username,
    email: form.email,
    password_hash,
    first_name: form.first_name,
    last_name: form.last_name,
    role_id: form.role_id,
    is_staff: false,
    is_superuser: false,
    approved: false,
  };

  let identity = match store.create_identity(input).await.map_err(Error::store)? {
    Insertion::Created(identity) => identity,
    Insertion::Rejected(rejected) => {
      return Err(Error::Conflict(ValidationErrors::from(rejected).to_string()));
    }
  };

  tracing::info!(
    identity_id = identity.identity_id,
    username = %identity.username,
    "registered pending member"
  );

  if let Err(e) = notifier.email_verification(&identity).await {
    tracing::warn!(
      identity_id = identity.identity_id,
      error = %e,
      "verification dispatch failed; rolling back registration"
    );
    store
      .delete_identity(identity.identity_id)
      .await
      .map_err(Error::store)?;
    return Err(e);
  }

  Ok(identity)
}
