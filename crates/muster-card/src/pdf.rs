//! Wraps a rendered card into a single-page, ID-1 sized PDF.

use std::{io::Cursor, path::Path};

use image::{DynamicImage, ImageFormat, RgbaImage};
use lopdf::{
  Document, Object, Stream,
  content::{Content, Operation},
  dictionary,
};

use crate::{Error, Result};

const POINTS_PER_MM: f32 = 72.0 / 25.4;
pub const PAGE_WIDTH_MM: f32 = 85.0;
pub const PAGE_HEIGHT_MM: f32 = 54.0;

fn pdf_err(e: impl std::fmt::Display) -> Error { Error::Pdf(e.to_string()) }

/// Build the PDF bytes for `card`, stretched over the whole 85×54 mm page.
pub fn document(card: &RgbaImage) -> Result<Vec<u8>> {
  let width_pt = PAGE_WIDTH_MM * POINTS_PER_MM;
  let height_pt = PAGE_HEIGHT_MM * POINTS_PER_MM;

  let rgb = DynamicImage::ImageRgba8(card.clone()).into_rgb8();
  let mut jpeg = Cursor::new(Vec::new());
  rgb.write_to(&mut jpeg, ImageFormat::Jpeg)?;

  let mut doc = Document::with_version("1.5");
  let pages_id = doc.new_object_id();

  let image_id = doc.add_object(Stream::new(
    dictionary! {
      "Type" => "XObject",
      "Subtype" => "Image",
      "Width" => i64::from(rgb.width()),
      "Height" => i64::from(rgb.height()),
      "ColorSpace" => "DeviceRGB",
      "BitsPerComponent" => 8,
      "Filter" => "DCTDecode",
    },
    jpeg.into_inner(),
  ));

  let content = Content {
    operations: vec![
      Operation::new("q", vec![]),
      Operation::new(
        "cm",
        vec![
          width_pt.into(),
          0.into(),
          0.into(),
          height_pt.into(),
          0.into(),
          0.into(),
        ],
      ),
      Operation::new("Do", vec![Object::Name(b"Card".to_vec())]),
      Operation::new("Q", vec![]),
    ],
  };
  let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().map_err(pdf_err)?));

  let page_id = doc.add_object(dictionary! {
    "Type" => "Page",
    "Parent" => pages_id,
    "Contents" => content_id,
    "Resources" => dictionary! {
      "XObject" => dictionary! { "Card" => image_id },
    },
    "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
  });

  doc.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! {
      "Type" => "Pages",
      "Kids" => vec![page_id.into()],
      "Count" => 1,
    }),
  );

  let catalog_id = doc.add_object(dictionary! {
    "Type" => "Catalog",
    "Pages" => pages_id,
  });
  doc.trailer.set("Root", catalog_id);

  let mut out = Vec::new();
  doc.save_to(&mut out).map_err(pdf_err)?;
  Ok(out)
}

/// Write the PDF for `card` to `path`.
pub fn write_document(card: &RgbaImage, path: &Path) -> Result<()> {
  std::fs::write(path, document(card)?)?;
  Ok(())
}
