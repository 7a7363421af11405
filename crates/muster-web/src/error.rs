//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use thiserror::Error;

pub const BAD_CREDENTIALS: &str = "Invalid username and/or password.";

#[derive(Debug, Error)]
pub enum Error {
  /// No valid session; the client is sent to the login page.
  #[error("not signed in")]
  Unauthenticated,
  #[error("bad credentials")]
  BadCredentials,
  /// Signed in but not yet approved; the client is sent home.
  #[error("member not approved")]
  NotApproved,
  #[error("not found")]
  NotFound,
  #[error(transparent)]
  Core(#[from] muster_core::Error),
  #[error("card error: {0}")]
  Card(#[from] muster_card::Error),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("background task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

fn message(status: StatusCode, msg: impl Into<String>) -> Response {
  (status, Json(json!({ "error": msg.into() }))).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    use muster_core::Error as Core;

    match self {
      Error::Unauthenticated => Redirect::to("/login/").into_response(),
      Error::NotApproved | Error::Card(muster_card::Error::NotApproved) => {
        Redirect::to("/").into_response()
      }
      Error::BadCredentials => message(StatusCode::UNAUTHORIZED, BAD_CREDENTIALS),
      Error::NotFound | Error::Core(Core::NotFound) => {
        message(StatusCode::NOT_FOUND, "Not Found")
      }
      Error::Core(Core::Validation(errors)) => {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors }))).into_response()
      }
      Error::Core(Core::PermissionDenied) => message(StatusCode::FORBIDDEN, "Forbidden"),
      Error::Core(Core::Conflict(msg)) => message(StatusCode::CONFLICT, msg),
      other => {
        tracing::error!(error = %other, "request failed");
        message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
