//! Error types for `muster-core`.

use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum Error {
  /// One or more submitted fields were rejected.
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("permission denied")]
  PermissionDenied,

  #[error("not found")]
  NotFound,

  /// A uniqueness rule was violated after validation had passed, e.g. by a
  /// concurrent registration.
  #[error("conflict: {0}")]
  Conflict(String),

  /// The store failed underneath a workflow.
  #[error("integrity failure: {0}")]
  Integrity(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error("notification failed: {0}")]
  Notify(String),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Integrity(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
