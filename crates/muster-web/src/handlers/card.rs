//! Card generation and the media files it produces.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/card/` | Generate; JSON with `/media/` URLs of the PNG and PDF |
//! | `GET`  | `/img/` | Generate; the PNG itself |
//! | `GET`  | `/media/{file}/` | A generated file, confined to the media directory |
//!
//! All three require an approved member.

use std::path::{Path as FsPath, PathBuf};

use axum::{
  Json,
  extract::{Path, State},
  http::header,
  response::IntoResponse,
};
use muster_card::CardArtifacts;
use muster_core::{identity::Identity, store::MemberStore};
use serde::Serialize;

use crate::{AppState, auth::ApprovedUser, error::Error};

async fn generate<S>(state: &AppState<S>, identity: Identity) -> Result<CardArtifacts, Error>
where
  S: MemberStore + Clone + 'static,
{
  let studio = state.studio.clone();
  let artifacts = tokio::task::spawn_blocking(move || studio.generate(&identity)).await??;
  Ok(artifacts)
}

#[derive(Debug, Serialize)]
pub struct CardLinks {
  pub image:    String,
  pub document: String,
}

fn media_url(name: &str) -> String { format!("/media/{name}/") }

/// `GET /card/`
pub async fn card<S>(
  State(state): State<AppState<S>>,
  ApprovedUser(ctx): ApprovedUser,
) -> Result<Json<CardLinks>, Error>
where
  S: MemberStore + Clone + 'static,
{
  let artifacts = generate(&state, ctx.identity).await?;
  Ok(Json(CardLinks {
    image:    media_url(&artifacts.image),
    document: media_url(&artifacts.document),
  }))
}

/// `GET /img/`
pub async fn img<S>(
  State(state): State<AppState<S>>,
  ApprovedUser(ctx): ApprovedUser,
) -> Result<impl IntoResponse, Error>
where
  S: MemberStore + Clone + 'static,
{
  let artifacts = generate(&state, ctx.identity).await?;
  Ok(([(header::CONTENT_TYPE, "image/png")], artifacts.png))
}

/// `GET /media/{file}/`
pub async fn media<S>(
  State(state): State<AppState<S>>,
  ApprovedUser(_): ApprovedUser,
  Path(file): Path<String>,
) -> Result<impl IntoResponse, Error>
where
  S: MemberStore + Clone + 'static,
{
  let path = confine(state.studio.media_dir(), &file).await?;
  let bytes = match tokio::fs::read(&path).await {
    Ok(bytes) => bytes,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotFound),
    Err(e) => return Err(e.into()),
  };
  Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes))
}

// ─── Confinement ─────────────────────────────────────────────────────────────

/// Resolve `name` inside `media_dir`, refusing anything that could reach
/// outside it. Every refusal is reported as not found.
pub async fn confine(media_dir: &FsPath, name: &str) -> Result<PathBuf, Error> {
  if name.is_empty()
    || name.starts_with('.')
    || name.contains(['/', '\\'])
    || name.contains("..")
  {
    return Err(Error::NotFound);
  }

  let root = tokio::fs::canonicalize(media_dir).await?;
  let resolved = tokio::fs::canonicalize(root.join(name))
    .await
    .map_err(|_| Error::NotFound)?;
  if !resolved.starts_with(&root) {
    tracing::warn!(requested = %name, "media request escaped the media directory");
    return Err(Error::NotFound);
  }
  Ok(resolved)
}

fn content_type(path: &FsPath) -> &'static str {
  match path.extension().and_then(|e| e.to_str()) {
    Some("png") => "image/png",
    Some("pdf") => "application/pdf",
    _ => "application/octet-stream",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn confine_accepts_plain_names() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("card-1.png"), b"png").unwrap();
    let path = confine(dir.path(), "card-1.png").await.unwrap();
    assert_eq!(path, dir.path().canonicalize().unwrap().join("card-1.png"));
  }

  #[tokio::test]
  async fn confine_rejects_traversal_and_hidden_names() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".secret"), b"x").unwrap();
    for name in ["", ".secret", "../etc/passwd", "a/b", "a\\b", "..", "x..y"] {
      assert!(
        matches!(confine(dir.path(), name).await, Err(Error::NotFound)),
        "{name:?} was accepted"
      );
    }
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn confine_rejects_symlinks_out_of_the_directory() {
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("target.png"), b"x").unwrap();
    let dir = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(outside.path().join("target.png"), dir.path().join("card-link.png"))
      .unwrap();
    assert!(matches!(confine(dir.path(), "card-link.png").await, Err(Error::NotFound)));
  }

  #[tokio::test]
  async fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(confine(dir.path(), "card-none.png").await, Err(Error::NotFound)));
  }

  #[test]
  fn content_types() {
    assert_eq!(content_type(FsPath::new("a.png")), "image/png");
    assert_eq!(content_type(FsPath::new("a.pdf")), "application/pdf");
    assert_eq!(content_type(FsPath::new("a.bin")), "application/octet-stream");
  }
}
