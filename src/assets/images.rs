//! Image codec helpers
//!
//! | Operation | Implementation |
//! |-----------|----------------|
//! | Transcode | decode with `image`, re-encode with `webp` at quality 50 |
//! | Keep smaller | the original wins when the WebP is not smaller |
//! | Resize | `DynamicImage::resize` with `Lanczos3`, never upscales |
//! | Illustration | `resize_to_fill` + PNG |
//! | Favicon | `resize_to_fill` + ICO |

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use webp::Encoder;

/// Tag of the WebP preset, stored with cached optimized images.
pub const WEBP_CODEC_VERSION: &str = "webp-q50-1";

/// Lossy WebP quality, 0 to 100.
pub const WEBP_QUALITY: f32 = 50.0;

/// Bounding box of optimized images, in pixels.
pub const MAX_IMAGE_SIZE: u32 = 640;

pub const ILLUSTRATION_SIZE: u32 = 48;
pub const FAVICON_SIZE: u32 = 32;

/// Media types worth optimizing. Types the codec cannot decode fall back to
/// the original bytes.
pub const SUPPORTED_IMAGE_MIME_TYPES: [&str; 13] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/webp",
    "image/x-portable-pixmap",
    "image/x-portable-graymap",
    "image/x-portable-bitmap",
    "image/x-portable-anymap",
    "image/vnd.microsoft.icon",
    "image/vnd.ms-dds",
    "application/postscript",
];

pub fn is_optimizable(media_type: &str) -> bool {
    SUPPORTED_IMAGE_MIME_TYPES.contains(&media_type.trim().to_lowercase().as_str())
}

/// Shrinks an image to fit in a `max` x `max` box, keeping its aspect ratio.
pub fn resize_to_fit(img: DynamicImage, max: u32) -> DynamicImage {
    if img.width() <= max && img.height() <= max {
        return img;
    }
    img.resize(max, max, FilterType::Lanczos3)
}

/// Re-encodes an image as WebP, optionally shrinking it first.
pub fn transcode_to_webp(data: &[u8], max_size: Option<u32>) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(data)?;
    let img = match max_size {
        Some(max) => resize_to_fit(img, max),
        None => img,
    };

    // The WebP encoder only takes 8-bit RGB(A)
    let webp = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        Encoder::from_rgba(&rgba, rgba.width(), rgba.height()).encode(WEBP_QUALITY)
    } else {
        let rgb = img.to_rgb8();
        Encoder::from_rgb(&rgb, rgb.width(), rgb.height()).encode(WEBP_QUALITY)
    };
    Ok(webp.to_vec())
}

/// The optimized bytes, unless they are not smaller than the original.
pub fn smaller_of(original: Vec<u8>, optimized: Vec<u8>) -> Vec<u8> {
    if optimized.len() < original.len() {
        optimized
    } else {
        original
    }
}

fn encode_square(data: &[u8], size: u32, format: ImageFormat) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(data)?;
    let img = DynamicImage::ImageRgba8(img.resize_to_fill(size, size, FilterType::Lanczos3).to_rgba8());

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)?;
    Ok(buf.into_inner())
}

/// Square PNG covering the whole `size` x `size` box.
pub fn thumbnail_png(data: &[u8], size: u32) -> Result<Vec<u8>, ImageError> {
    encode_square(data, size, ImageFormat::Png)
}

pub fn favicon_ico(data: &[u8], size: u32) -> Result<Vec<u8>, ImageError> {
    encode_square(data, size, ImageFormat::Ico)
}
