//! Error type for `muster-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown role type: {0:?}")]
  UnknownRoleType(String),

  #[error("rank out of range: {0}")]
  Rank(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
