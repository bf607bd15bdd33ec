//! Image encoding: `DynamicImage` → JPEG bytes.
//!
//! Page images go to a browser, not to an OCR model, so lossy JPEG at
//! quality 80–90 is used: a 2× render of a text page drops from several
//! megabytes as PNG to a few hundred kilobytes. pdfium renders RGBA; JPEG
//! has no alpha channel, so pixels are flattened to RGB first.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

pub const JPEG_MIME: &str = "image/jpeg";

/// Encode a rasterised page as JPEG at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)))?;
    debug!(
        "Encoded {}x{} image → {} bytes JPEG (q={})",
        img.width(),
        img.height(),
        buf.len(),
        quality
    );
    Ok(buf)
}

/// Wrap encoded bytes in a `data:` URL for direct use as an image source.
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}
