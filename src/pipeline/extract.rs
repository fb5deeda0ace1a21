//! PDF image extraction: pull the embedded raster scans out of a PDF via pdfium.
//!
//! Domiciliation mail arrives as scanner output: each page is one (sometimes
//! several) embedded JPEG. Extracting those images directly avoids a lossy
//! re-rasterisation and keeps the scanner's native resolution.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool so the
//! Tokio worker threads keep serving other requests.

use crate::error::VerifyError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Environment variable pointing at an explicit libpdfium to bind to.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract every embedded raster image, in page order.
///
/// Returns the images together with their count. Fails on a corrupt or
/// locked PDF, and when no image at all could be extracted.
pub async fn extract_document_images(
    pdf_bytes: Vec<u8>,
    source_name: &str,
    password: Option<&str>,
) -> Result<(Vec<DynamicImage>, usize), VerifyError> {
    let name = source_name.to_string();
    let pwd = password.map(|s| s.to_string());

    let images = tokio::task::spawn_blocking(move || {
        extract_images_blocking(&pdf_bytes, &name, pwd.as_deref())
    })
    .await
    .map_err(|e| VerifyError::Internal(format!("Extraction task panicked: {}", e)))??;

    let count = images.len();
    Ok((images, count))
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the system library.
fn bind_pdfium() -> Result<Pdfium, VerifyError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(path.clone()).map_err(|e| {
            VerifyError::PdfiumBindingFailed(format!("{path}: {e:?}"))
        })?,
        _ => Pdfium::bind_to_system_library()
            .map_err(|e| VerifyError::PdfiumBindingFailed(format!("{e:?}")))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of image extraction.
fn extract_images_blocking(
    pdf_bytes: &[u8],
    source_name: &str,
    password: Option<&str>,
) -> Result<Vec<DynamicImage>, VerifyError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    VerifyError::WrongPassword {
                        source_name: source_name.to_string(),
                    }
                } else {
                    VerifyError::PasswordRequired {
                        source_name: source_name.to_string(),
                    }
                }
            } else {
                VerifyError::CorruptPdf {
                    source_name: source_name.to_string(),
                    detail: err_str,
                }
            }
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut images = Vec::new();
    for (page_idx, page) in pages.iter().enumerate() {
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            match image_object.get_raw_image() {
                Ok(image) => {
                    debug!(
                        "Page {}: image {} → {}x{} px",
                        page_idx + 1,
                        images.len() + 1,
                        image.width(),
                        image.height()
                    );
                    images.push(image);
                }
                Err(e) => warn!("Page {}: skipping undecodable image: {:?}", page_idx + 1, e),
            }
        }
    }

    if images.is_empty() {
        return Err(VerifyError::NoImages {
            source_name: source_name.to_string(),
        });
    }
    Ok(images)
}

/// Decode a document supplied directly as an image file.
pub fn decode_single_image(bytes: &[u8], source_name: &str) -> Result<DynamicImage, VerifyError> {
    image::load_from_memory(bytes).map_err(|e| VerifyError::ImageFailed {
        index: 0,
        detail: format!("{source_name}: {e}"),
    })
}
