// SPDX-License-Identifier: MPL-2.0

//! Photo capture from a bound camera endpoint
//!
//! Grabs a single frame without interrupting the preview stream. A freshly
//! bound session may not have produced a frame yet, so capture polls for a
//! bounded time before giving up.

use crate::backends::camera::provider::CaptureEndpoint;
use crate::backends::camera::types::{BackendError, CameraFrame};
use crate::constants::timing;
use crate::errors::PhotoError;
use std::time::Duration;
use tracing::{debug, info};

/// Photo capture handler
pub struct PhotoCapture;

impl PhotoCapture {
    /// Capture a frame from the endpoint, waiting up to the default timeout
    pub async fn capture_from_endpoint(endpoint: &CaptureEndpoint) -> Result<CameraFrame, PhotoError> {
        Self::capture_with_timeout(endpoint, timing::FIRST_FRAME_TIMEOUT).await
    }

    /// Capture a frame, polling until one is available or `timeout` elapses
    pub async fn capture_with_timeout(
        endpoint: &CaptureEndpoint,
        timeout: Duration,
    ) -> Result<CameraFrame, PhotoError> {
        info!(device = %endpoint.device().name, "Capturing photo from camera endpoint");

        let poll = async {
            loop {
                match endpoint.capture_still() {
                    Ok(frame) => return Ok(frame),
                    Err(BackendError::NoFrame) => {
                        tokio::time::sleep(timing::FRAME_POLL_INTERVAL).await;
                    }
                    Err(e) => return Err(PhotoError::from(e)),
                }
            }
        };

        let frame = tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| PhotoError::NoFrameAvailable)??;

        debug!(
            width = frame.width,
            height = frame.height,
            format = ?frame.format,
            "Frame captured from endpoint"
        );
        Ok(frame)
    }
}
