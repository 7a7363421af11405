//! Retention of generated card files in the media directory.
//!
//! Every generation writes a `card-<stamp>-<uuid>.png` and a matching `.pdf`. Each
//! file counts separately against the retention bound; once the bound is
//! exceeded the oldest files are removed first.

use std::{
  io,
  path::{Path, PathBuf},
  sync::atomic::{AtomicU64, Ordering},
  time::SystemTime,
};

use chrono::Utc;
use uuid::Uuid;

use crate::Result;

pub const PREFIX: &str = "card-";

// ─── Naming ──────────────────────────────────────────────────────────────────

/// Hands out strictly increasing microsecond stamps, so that file names sort
/// in generation order even when the filesystem records equal creation
/// times.
#[derive(Debug, Default)]
pub struct StampSequence {
  last: AtomicU64,
}

impl StampSequence {
  pub fn next(&self) -> u64 {
    let now = u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0);
    let prev = self
      .last
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
      .unwrap_or_else(|last| last);
    now.max(prev + 1)
  }
}

/// `card-<stamp>-<uuid>`: the zero-padded stamp orders names, the uuid keeps
/// them unique across processes.
pub fn stem(stamp: u64) -> String { format!("{PREFIX}{stamp:020}-{}", Uuid::new_v4()) }

// ─── Listing and eviction ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
  Image,
  Document,
}

impl ArtifactKind {
  pub fn extension(self) -> &'static str {
    match self {
      Self::Image => "png",
      Self::Document => "pdf",
    }
  }

  fn from_file_name(name: &str) -> Option<Self> {
    let rest = name.strip_prefix(PREFIX)?;
    if rest.ends_with(".png") {
      Some(Self::Image)
    } else if rest.ends_with(".pdf") {
      Some(Self::Document)
    } else {
      None
    }
  }
}

/// A generated card file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub path:    PathBuf,
  pub kind:    ArtifactKind,
  pub created: SystemTime,
}

/// Every card artifact directly inside `dir`.
pub fn list_artifacts(dir: &Path) -> Result<Vec<Artifact>> {
  let mut found = Vec::new();
  for entry in std::fs::read_dir(dir)? {
    let entry = entry?;
    let name = entry.file_name();
    let Some(kind) = name.to_str().and_then(ArtifactKind::from_file_name) else {
      continue;
    };
    let meta = match entry.metadata() {
      Ok(meta) => meta,
      // Removed by a concurrent eviction between read_dir and stat.
      Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
      Err(e) => return Err(e.into()),
    };
    if !meta.is_file() {
      continue;
    }
    let created = meta.created().or_else(|_| meta.modified())?;
    found.push(Artifact { path: entry.path(), kind, created });
  }
  Ok(found)
}

/// The artifacts to delete so that at most `bound` remain, oldest first.
/// Ties on creation time are broken by path, which follows generation order
/// for names built by [`stem`].
pub fn select_evictions(mut artifacts: Vec<Artifact>, bound: usize) -> Vec<Artifact> {
  if artifacts.len() <= bound {
    return Vec::new();
  }
  artifacts.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
  let excess = artifacts.len() - bound;
  artifacts.truncate(excess);
  artifacts
}

/// Delete the oldest card files in `dir` until at most `bound` remain.
/// Returns how many files were removed by this call.
pub fn evict(dir: &Path, bound: usize) -> Result<usize> {
  let victims = select_evictions(list_artifacts(dir)?, bound);
  let mut removed = 0;
  for victim in victims {
    match std::fs::remove_file(&victim.path) {
      Ok(()) => {
        tracing::debug!(path = ?victim.path, "evicted card file");
        removed += 1;
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => return Err(e.into()),
    }
  }
  if removed > 0 {
    tracing::info!(removed, bound, "card retention enforced");
  }
  Ok(removed)
}
