//! Image compression before upload
//!
//! Images are validated up front (presence, media type, size), decoded,
//! scaled down to a maximum width with the aspect ratio kept, and
//! re-encoded as JPEG. Nothing here touches the network.

use crate::error::{Result, StorageError};
use crate::types::Payload;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Default maximum output width in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 800;
/// Default JPEG quality (0.8 on a 0–1 scale)
pub const DEFAULT_QUALITY: u8 = 80;
/// Largest accepted input, 10 MiB
pub const MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// An image as handed over by the caller
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    /// Declared media type, e.g. `image/png`
    pub media_type: String,
    pub data: Bytes,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// Compression settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressOptions {
    pub max_width: u32,
    /// JPEG quality, 1–100
    pub quality: u8,
    pub max_input_bytes: usize,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
            max_input_bytes: MAX_INPUT_BYTES,
        }
    }
}

impl CompressOptions {
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }
}

/// Re-encoded image ready for upload
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl CompressedImage {
    pub const MEDIA_TYPE: &'static str = "image/jpeg";

    pub fn into_payload(self) -> Payload {
        Payload::binary(self.data, Self::MEDIA_TYPE)
    }
}

/// Compress with the default quality and size limit.
pub fn compress_image(file: &ImageFile, max_width: u32) -> Result<CompressedImage> {
    compress_with(file, &CompressOptions::default().with_max_width(max_width))
}

/// Check an input without decoding it.
pub fn validate_image(file: &ImageFile, options: &CompressOptions) -> Result<()> {
    if file.data.is_empty() {
        return Err(StorageError::Validation("no image provided".into()));
    }
    if !file.media_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(StorageError::Validation(format!(
            "{} is not an image (media type {:?})",
            file.name, file.media_type
        )));
    }
    if file.data.len() > options.max_input_bytes {
        return Err(StorageError::Validation(format!(
            "{} is {} bytes, larger than the {} byte limit",
            file.name,
            file.data.len(),
            options.max_input_bytes
        )));
    }
    if options.max_width == 0 {
        return Err(StorageError::Validation("max width must be positive".into()));
    }
    Ok(())
}

/// Output dimensions for a source image under `max_width`.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (height as f64 * max_width as f64 / width as f64).round() as u32;
    (max_width, scaled.max(1))
}

/// Validate, decode, scale and re-encode.
pub fn compress_with(file: &ImageFile, options: &CompressOptions) -> Result<CompressedImage> {
    validate_image(file, options)?;

    let source = image::load_from_memory(&file.data)
        .map_err(|e| StorageError::ImageDecode(format!("{}: {}", file.name, e)))?;
    let (original_width, original_height) = (source.width(), source.height());
    let (width, height) = target_dimensions(original_width, original_height, options.max_width);

    let resized = if (width, height) == (original_width, original_height) {
        source
    } else {
        source.resize_exact(width, height, FilterType::Triangle)
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, options.quality))
        .map_err(|e| StorageError::ImageEncode(format!("{}: {}", file.name, e)))?;

    debug!(
        name = %file.name,
        original_bytes = file.data.len(),
        compressed_bytes = out.len(),
        original_width,
        original_height,
        width,
        height,
        "Compressed image"
    );

    Ok(CompressedImage {
        data: Bytes::from(out),
        width,
        height,
        original_width,
        original_height,
    })
}
