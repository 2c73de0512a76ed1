use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const MIN_PHOTO_SIDE: u32 = 100;
const JPEG_QUALITY: u8 = 95;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("image is too small: {width}x{height}, minimum is {MIN_PHOTO_SIDE}x{MIN_PHOTO_SIDE}")]
    TooSmall { width: u32, height: u32 },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

impl PhotoError {
    /// True when the upload itself is at fault and the user should be
    /// asked for a different photo.
    pub fn is_rejection(&self) -> bool {
        matches!(self, PhotoError::TooSmall { .. } | PhotoError::Decode(_))
    }
}

/// Validates `bytes` and stores them as an RGB JPEG under `dir`.
///
/// The destination directory is created if absent and the filename is a
/// fresh UUID, so concurrent saves never collide and nothing is ever
/// overwritten. Returns the path of the new file.
pub fn save_photo(bytes: &[u8], dir: &Path) -> Result<PathBuf, PhotoError> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width < MIN_PHOTO_SIDE || height < MIN_PHOTO_SIDE {
        return Err(PhotoError::TooSmall { width, height });
    }

    let rgb = decoded.to_rgb8();
    fs::create_dir_all(dir)?;

    let path = dir.join(format!("{}.jpg", Uuid::new_v4()));
    let file = File::create(&path)?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;

    debug!("Stored {}x{} photo at {}", width, height, path.display());
    Ok(path)
}
