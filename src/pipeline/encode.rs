//! Image encoding: `DynamicImage` → base64 JPEG wrapped in `ImageData`.
//!
//! VLM APIs accept images as base64 data-URIs embedded in the JSON request
//! body. The inputs are already lossy scanner JPEGs, so re-encoding as JPEG
//! keeps request bodies small without losing anything PNG would have kept.
//! `detail: "high"` lets GPT-4-class models tile the page so small address
//! blocks stay legible.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode one extracted image as a base64 JPEG ready for the VLM API.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(ImageData::new(b64, "image/jpeg").with_detail("high"))
}
