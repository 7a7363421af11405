//! Membership card rendering for muster.
//!
//! A card is a PNG composed from fixed artwork, the member's role badge and
//! name, and a QR code pointing at the member's public lookup page. Each PNG
//! is accompanied by a one-page PDF sized for ID-1 card stock. Both files land
//! in the media directory, which is kept to a bounded number of files.

pub mod cache;
pub mod error;
pub mod pdf;
pub mod render;

use std::{io::Cursor, path::{Path, PathBuf}};

use image::ImageFormat;
use muster_core::identity::Identity;
use uuid::Uuid;

pub use error::{Error, Result};
pub use render::CardAssets;

use crate::cache::{ArtifactKind, StampSequence};

/// The smallest retention bound that still keeps both files of the card just
/// generated.
pub const MIN_RETENTION: usize = 2;

/// The files written for one card.
#[derive(Debug, Clone)]
pub struct CardArtifacts {
  /// File name of the PNG inside the media directory.
  pub image:    String,
  /// File name of the PDF inside the media directory.
  pub document: String,
  /// The PNG bytes, so callers need not re-read a file that may already have
  /// been evicted.
  pub png:      Vec<u8>,
}

/// Renders cards and maintains the media directory.
pub struct CardStudio {
  assets:    CardAssets,
  media_dir: PathBuf,
  base_url:  String,
  retention: usize,
  stamps:    StampSequence,
}

impl CardStudio {
  /// Creates `media_dir` if it does not yet exist. A `retention` below
  /// [`MIN_RETENTION`] is refused.
  pub fn new(
    assets: CardAssets,
    media_dir: impl Into<PathBuf>,
    base_url: impl Into<String>,
    retention: usize,
  ) -> Result<Self> {
    if retention < MIN_RETENTION {
      return Err(Error::Retention { requested: retention, minimum: MIN_RETENTION });
    }
    let media_dir = media_dir.into();
    std::fs::create_dir_all(&media_dir)?;
    Ok(Self {
      assets,
      media_dir,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      retention,
      stamps: StampSequence::default(),
    })
  }

  pub fn media_dir(&self) -> &Path { &self.media_dir }

  /// The URL a card's QR code encodes.
  pub fn lookup_url(&self, public_id: Uuid) -> String {
    format!("{}/qrinfo/{}/", self.base_url, public_id)
  }

  /// Render and store a card for `identity`, then enforce retention.
  ///
  /// Blocking; run it on the blocking pool from async code.
  pub fn generate(&self, identity: &Identity) -> Result<CardArtifacts> {
    if !identity.approved {
      return Err(Error::NotApproved);
    }

    let badge = match &identity.role {
      Some(role) => match self.assets.load_badge(role) {
        Ok(badge) => Some(badge),
        Err(e) => {
          tracing::warn!(error = %e, role = %role.name, "badge unavailable; card issued without it");
          None
        }
      },
      None => None,
    };

    let qr = render::qr_image(&self.lookup_url(identity.public_id))?;
    let card = render::compose(&self.assets, badge.as_ref(), &identity.full_name(), &qr);

    let stem = cache::stem(self.stamps.next());
    let image = format!("{stem}.{}", ArtifactKind::Image.extension());
    let document = format!("{stem}.{}", ArtifactKind::Document.extension());

    let mut png = Cursor::new(Vec::new());
    card.write_to(&mut png, ImageFormat::Png)?;
    let png = png.into_inner();
    std::fs::write(self.media_dir.join(&image), &png)?;
    pdf::write_document(&card, &self.media_dir.join(&document))?;

    tracing::info!(
      identity_id = identity.identity_id,
      image = %image,
      "card generated"
    );

    if let Err(e) = cache::evict(&self.media_dir, self.retention) {
      tracing::warn!(error = %e, "card eviction failed");
    }

    Ok(CardArtifacts { image, document, png })
  }
}
