//! Raster composition of the card face.

use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Luma, Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_text_mut;
use muster_core::role::Role;
use qrcode::QrCode;

use crate::{Error, Result};

/// Top-left corner of the role badge.
pub const BADGE_OFFSET: (i64, i64) = (40, 40);
/// Top-left corner of the member's name.
pub const NAME_POSITION: (i32, i32) = (40, 300);
pub const NAME_SIZE: f32 = 48.0;
pub const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Gap between the QR code and the left and bottom card edges.
pub const QR_MARGIN: i64 = 20;
/// Pixel size of one QR module.
pub const QR_MODULE: u32 = 4;

// ─── Assets ──────────────────────────────────────────────────────────────────

/// The fixed artwork every card is drawn on, loaded once at startup.
#[derive(Clone)]
pub struct CardAssets {
  asset_dir:  PathBuf,
  background: RgbaImage,
  font:       Option<FontArc>,
}

impl CardAssets {
  /// Load `background.png` and `font.ttf` from `asset_dir`.
  ///
  /// A missing font is tolerated: cards are then issued without the name
  /// line, and a warning is logged once here.
  pub fn load(asset_dir: impl Into<PathBuf>) -> Result<Self> {
    let asset_dir = asset_dir.into();
    let background = open_rgba(&asset_dir.join("background.png"))?;

    let font_path = asset_dir.join("font.ttf");
    let font = match std::fs::read(&font_path) {
      Ok(bytes) => Some(FontArc::try_from_vec(bytes).map_err(|e| Error::Font {
        path:   font_path.clone(),
        reason: e.to_string(),
      })?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        tracing::warn!(path = ?font_path, "card font missing; names will not be printed");
        None
      }
      Err(e) => return Err(e.into()),
    };

    Ok(Self { asset_dir, background, font })
  }

  /// Build assets from already-loaded parts.
  pub fn from_parts(asset_dir: impl Into<PathBuf>, background: RgbaImage, font: Option<FontArc>) -> Self {
    Self { asset_dir: asset_dir.into(), background, font }
  }

  pub fn background(&self) -> &RgbaImage { &self.background }

  /// Badge artwork for a role: `badges/<rank>_<type>.png`.
  pub fn badge_path(&self, role: &Role) -> PathBuf {
    self
      .asset_dir
      .join("badges")
      .join(format!("{}_{}.png", role.rank, role.role_type.as_str()))
  }

  pub fn load_badge(&self, role: &Role) -> Result<RgbaImage> { open_rgba(&self.badge_path(role)) }
}

fn open_rgba(path: &Path) -> Result<RgbaImage> {
  image::open(path)
    .map(DynamicImage::into_rgba8)
    .map_err(|source| Error::Asset { path: path.to_path_buf(), source })
}

// ─── Composition ─────────────────────────────────────────────────────────────

/// Render `url` as a black-on-white QR code.
pub fn qr_image(url: &str) -> Result<RgbaImage> {
  let code = QrCode::new(url.as_bytes()).map_err(|e| Error::Qr(e.to_string()))?;
  let luma = code
    .render::<Luma<u8>>()
    .quiet_zone(true)
    .module_dimensions(QR_MODULE, QR_MODULE)
    .build();
  Ok(DynamicImage::ImageLuma8(luma).into_rgba8())
}

/// Draw the card face: background, alpha-blended badge, name, and the QR code
/// at the bottom-left.
pub fn compose(
  assets: &CardAssets,
  badge: Option<&RgbaImage>,
  name: &str,
  qr: &RgbaImage,
) -> RgbaImage {
  let mut card = assets.background.clone();

  if let Some(badge) = badge {
    imageops::overlay(&mut card, badge, BADGE_OFFSET.0, BADGE_OFFSET.1);
  }

  if let Some(font) = &assets.font {
    draw_text_mut(
      &mut card,
      TEXT_COLOR,
      NAME_POSITION.0,
      NAME_POSITION.1,
      PxScale::from(NAME_SIZE),
      font,
      name,
    );
  }

  let qr_y = i64::from(card.height()) - i64::from(qr.height()) - QR_MARGIN;
  imageops::overlay(&mut card, qr, QR_MARGIN, qr_y);

  card
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assets() -> CardAssets {
    CardAssets::from_parts("/nonexistent", RgbaImage::from_pixel(600, 380, Rgba([255, 255, 255, 255])), None)
  }

  #[test]
  fn qr_code_is_square_and_has_dark_modules() {
    let qr = qr_image("https://members.example/qrinfo/abc/").unwrap();
    assert_eq!(qr.width(), qr.height());
    assert_eq!(qr.width() % QR_MODULE, 0);
    assert!(qr.pixels().any(|p| p.0[0] == 0));
  }

  #[test]
  fn badge_is_blended_at_offset() {
    let badge = RgbaImage::from_pixel(20, 20, Rgba([255, 0, 0, 255]));
    let qr = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
    let card = compose(&assets(), Some(&badge), "Alice", &qr);

    assert_eq!(card.dimensions(), (600, 380));
    assert_eq!(card.get_pixel(45, 45), &Rgba([255, 0, 0, 255]));
    assert_eq!(card.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
  }

  #[test]
  fn transparent_badge_pixels_keep_background() {
    let badge = RgbaImage::from_pixel(20, 20, Rgba([255, 0, 0, 0]));
    let qr = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
    let card = compose(&assets(), Some(&badge), "Alice", &qr);
    assert_eq!(card.get_pixel(45, 45), &Rgba([255, 255, 255, 255]));
  }

  #[test]
  fn qr_sits_in_bottom_left_margin() {
    let qr = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
    let card = compose(&assets(), None, "Alice", &qr);

    let margin = QR_MARGIN as u32;
    assert_eq!(card.get_pixel(margin, 380 - margin - 1), &Rgba([0, 0, 0, 255]));
    assert_eq!(card.get_pixel(margin + 99, 380 - margin - 100), &Rgba([0, 0, 0, 255]));
    assert_eq!(card.get_pixel(margin - 1, 380 - margin - 1), &Rgba([255, 255, 255, 255]));
    assert_eq!(card.get_pixel(margin, 380 - margin), &Rgba([255, 255, 255, 255]));
  }

  #[test]
  fn badge_path_uses_rank_and_type() {
    let role = Role {
      role_id:   1,
      name:      "Ghost".into(),
      is_unique: false,
      is_staff:  false,
      role_type: muster_core::role::RoleType::SpecialOps,
      rank:      3,
    };
    assert_eq!(
      assets().badge_path(&role),
      PathBuf::from("/nonexistent/badges/3_special_ops.png")
    );
  }
}
