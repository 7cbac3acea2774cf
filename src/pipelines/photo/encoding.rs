// SPDX-License-Identifier: GPL-3.0-only

//! Async photo encoding
//!
//! Converts captured frames to JPEG and writes them to disk. Encoding and
//! file I/O run on blocking tasks so the caller's runtime never stalls.

use crate::backends::camera::types::CameraFrame;
use crate::errors::PhotoError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Encoded JPEG ready for saving
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// JPEG photo encoder
pub struct PhotoEncoder {
    quality: EncodingQuality,
}

impl PhotoEncoder {
    pub fn new(quality: EncodingQuality) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> EncodingQuality {
        self.quality
    }

    /// Encode a frame as JPEG on a blocking task
    pub async fn encode(&self, frame: CameraFrame) -> Result<EncodedImage, PhotoError> {
        info!(
            width = frame.width,
            height = frame.height,
            quality = self.quality.jpeg_quality(),
            "Starting encoding"
        );

        let quality = self.quality;
        tokio::task::spawn_blocking(move || {
            let image = frame_to_rgb(&frame)?;
            let data = encode_jpeg(&image, quality)?;
            debug!(size = data.len(), "Encoding complete");

            Ok(EncodedImage {
                data,
                width: image.width(),
                height: image.height(),
            })
        })
        .await
        .map_err(|e| PhotoError::EncodingFailed(format!("Encoding task error: {}", e)))?
    }

    /// Write encoded data to `path` on a blocking task
    ///
    /// The parent directory is not created; a missing directory is a save
    /// failure.
    pub async fn save(&self, encoded: EncodedImage, path: PathBuf) -> Result<PathBuf, PhotoError> {
        info!(path = %path.display(), "Saving photo");

        let target = path.clone();
        tokio::task::spawn_blocking(move || std::fs::write(&target, &encoded.data))
            .await
            .map_err(|e| PhotoError::SaveFailed(format!("Save task error: {}", e)))??;

        info!(path = %path.display(), "Photo saved successfully");
        Ok(path)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(EncodingQuality::default())
    }
}

/// Repack a strided RGBA/RGB frame into a tight RGB image
pub fn frame_to_rgb(frame: &CameraFrame) -> Result<RgbImage, PhotoError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(PhotoError::EncodingFailed("Empty frame".to_string()));
    }

    let bpp = frame.format.bytes_per_pixel() as usize;
    let stride = frame.stride as usize;
    let row_bytes = frame.width as usize * bpp;
    let data = frame.data_slice();

    if stride < row_bytes || data.len() < stride * (frame.height as usize - 1) + row_bytes {
        return Err(PhotoError::EncodingFailed(format!(
            "Frame buffer too small for {}x{}",
            frame.width, frame.height
        )));
    }

    let mut rgb = Vec::with_capacity(frame.width as usize * frame.height as usize * 3);
    for row in data.chunks(stride).take(frame.height as usize) {
        for px in row[..row_bytes].chunks_exact(bpp) {
            rgb.extend_from_slice(&px[..3]);
        }
    }

    RgbImage::from_raw(frame.width, frame.height, rgb)
        .ok_or_else(|| PhotoError::EncodingFailed("Failed to create image".to_string()))
}

/// Encode image as JPEG
fn encode_jpeg(image: &RgbImage, quality: EncodingQuality) -> Result<Vec<u8>, PhotoError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());

    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_jpeg_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Medium.jpeg_quality(), 80);
        assert_eq!(EncodingQuality::High.jpeg_quality(), 92);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 98);
    }

    #[test]
    fn test_frame_to_rgb_drops_alpha_and_padding() {
        // 2x2 RGBA with 4 bytes of padding per row
        let data = vec![
            1, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, 0, //
            7, 8, 9, 255, 10, 11, 12, 255, 0, 0, 0, 0,
        ];
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data),
            format: PixelFormat::RGBA,
            stride: 12,
            captured_at: Instant::now(),
        };

        let rgb = frame_to_rgb(&frame).unwrap();
        assert_eq!(rgb.as_raw(), &vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_frame_to_rgb_rejects_short_buffer() {
        let frame = CameraFrame::from_rgba(4, 4, vec![0; 10]);
        assert!(matches!(
            frame_to_rgb(&frame),
            Err(PhotoError::EncodingFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_encode_produces_jpeg_magic() {
        let frame = CameraFrame::from_rgba(8, 8, vec![128; 8 * 8 * 4]);
        let encoded = PhotoEncoder::default().encode(frame).await.unwrap();
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
        assert_eq!((encoded.width, encoded.height), (8, 8));
    }
}
