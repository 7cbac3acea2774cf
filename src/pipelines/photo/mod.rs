// SPDX-License-Identifier: MPL-2.0

//! Async photo capture pipeline
//!
//! ```text
//! CaptureEndpoint → Capture → Encoding (JPEG) → Disk I/O
//!       ↓
//! Preview continues uninterrupted
//! ```
//!
//! A capture request names its destination up front from the current local
//! time (`yyyy-MM-dd-HH-mm-ss-SSS.jpg`) and resolves exactly once to the
//! saved path or a [`PhotoError`]. Requests are never queued or retried, and
//! overlapping requests against the same endpoint run independently.

pub mod capture;
pub mod encoding;

pub use capture::PhotoCapture;
pub use encoding::{EncodedImage, EncodingQuality, PhotoEncoder};

use crate::backends::camera::provider::CaptureEndpoint;
use crate::constants::{PHOTO_EXTENSION, PHOTO_FILENAME_FORMAT};
use crate::errors::PhotoError;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Outcome of one capture request
pub type CaptureResult = Result<PathBuf, PhotoError>;

/// File name for a photo taken at `time`
pub fn photo_filename(time: DateTime<Local>) -> String {
    format!("{}.{}", time.format(PHOTO_FILENAME_FORMAT), PHOTO_EXTENSION)
}

/// Complete photo capture pipeline
pub struct PhotoPipeline {
    encoder: PhotoEncoder,
}

impl PhotoPipeline {
    pub fn new(quality: EncodingQuality) -> Self {
        Self {
            encoder: PhotoEncoder::new(quality),
        }
    }

    /// Take a picture if the screen has a bound endpoint
    ///
    /// Returns `None` without touching the filesystem when `endpoint` is
    /// absent, i.e. the camera is not bound yet or binding failed.
    pub async fn take_picture(
        &self,
        endpoint: Option<&CaptureEndpoint>,
        output_dir: &Path,
    ) -> Option<CaptureResult> {
        let endpoint = endpoint?;
        Some(self.capture_and_save(endpoint, output_dir).await)
    }

    /// Capture, encode and save one photo into `output_dir`
    pub async fn capture_and_save(
        &self,
        endpoint: &CaptureEndpoint,
        output_dir: &Path,
    ) -> CaptureResult {
        let path = output_dir.join(photo_filename(Local::now()));

        let result = async {
            let frame = PhotoCapture::capture_from_endpoint(endpoint).await?;
            let encoded = self.encoder.encode(frame).await?;
            self.encoder.save(encoded, path.clone()).await
        }
        .await;

        match &result {
            Ok(saved) => info!(path = %saved.display(), "Photo capture succeeded"),
            Err(e) => error!(path = %path.display(), error = %e, "Photo capture failed"),
        }
        result
    }
}

impl Default for PhotoPipeline {
    fn default() -> Self {
        Self::new(EncodingQuality::default())
    }
}
