//! Error type for `muster-card`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Cards are only issued to approved members.
  #[error("member is not approved")]
  NotApproved,

  #[error("cannot load asset {path:?}: {source}")]
  Asset {
    path:   PathBuf,
    #[source]
    source: image::ImageError,
  },

  #[error("cannot load font {path:?}: {reason}")]
  Font { path: PathBuf, reason: String },

  #[error("qr encoding failed: {0}")]
  Qr(String),

  #[error("image error: {0}")]
  Image(#[from] image::ImageError),

  #[error("pdf error: {0}")]
  Pdf(String),

  #[error("card retention {requested} is below the minimum of {minimum}")]
  Retention { requested: usize, minimum: usize },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
