//! One-off store preparation run by the `server` binary.

use muster_core::{
  Error as CoreError,
  identity::{Identity, NewIdentity},
  registration::CredentialHasher,
  role::{NewRole, Role},
  store::{Insertion, MemberStore},
  validation::{FieldError, ValidationErrors},
};

use crate::{auth::Argon2Hasher, error::Error};

/// Ensure every configured role exists, updating roles that already do.
pub async fn seed_roles<S: MemberStore>(store: &S, roles: &[NewRole]) -> Result<Vec<Role>, Error> {
  let mut seeded = Vec::with_capacity(roles.len());
  for role in roles {
    seeded.push(store.upsert_role(role.clone()).await.map_err(Error::store)?);
  }
  if !seeded.is_empty() {
    tracing::info!(count = seeded.len(), "roles seeded");
  }
  Ok(seeded)
}

/// Details for [`create_superuser`].
#[derive(Debug, Clone)]
pub struct Superuser {
  pub username:   String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub password:   String,
}

/// Create an approved superuser without a role. Email domain rules do not
/// apply here.
pub async fn create_superuser<S: MemberStore>(store: &S, su: Superuser) -> Result<Identity, Error> {
  let mut missing = ValidationErrors::default();
  if su.username.trim().is_empty() {
    missing.push(FieldError::Required("username"));
  }
  if su.password.is_empty() {
    missing.push(FieldError::Required("password"));
  }
  missing.into_result()?;

  let input = NewIdentity {
    username:      su.username.trim().to_string(),
    email:         su.email.trim().to_string(),
    password_hash: Argon2Hasher.hash(&su.password)?,
    first_name:    su.first_name,
    last_name:     su.last_name,
    role_id:       None,
    is_staff:      true,
    is_superuser:  true,
    approved:      true,
  };

  match store.create_identity(input).await.map_err(Error::store)? {
    Insertion::Created(identity) => {
      tracing::info!(identity_id = identity.identity_id, username = %identity.username, "superuser created");
      Ok(identity)
    }
    Insertion::Rejected(errors) => Err(CoreError::Validation(ValidationErrors::from(errors)).into()),
  }
}
