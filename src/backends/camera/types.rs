// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackendType {
    /// GStreamer device monitor (PipeWire, V4L2, libcamera sources)
    #[default]
    GStreamer,
    /// Synthetic moving test pattern, no hardware required
    TestPattern,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::GStreamer => write!(f, "gstreamer"),
            CameraBackendType::TestPattern => write!(f, "test-pattern"),
        }
    }
}

impl std::str::FromStr for CameraBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gstreamer" | "gst" => Ok(CameraBackendType::GStreamer),
            "test-pattern" | "test" => Ok(CameraBackendType::TestPattern),
            other => Err(format!(
                "unknown backend '{}' (expected 'gstreamer' or 'test-pattern')",
                other
            )),
        }
    }
}

/// Which way a camera points relative to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
    External,
    /// The platform did not report a location (typical for USB webcams)
    Unknown,
}

impl CameraFacing {
    /// Parse the location string reported by libcamera/PipeWire
    pub fn from_location(location: &str) -> Self {
        match location.trim().to_lowercase().as_str() {
            "front" => CameraFacing::Front,
            "back" | "rear" => CameraFacing::Back,
            "external" => CameraFacing::External,
            _ => CameraFacing::Unknown,
        }
    }

    /// The facing that can never stand in for this one
    pub fn opposite(&self) -> Option<CameraFacing> {
        match self {
            CameraFacing::Front => Some(CameraFacing::Back),
            CameraFacing::Back => Some(CameraFacing::Front),
            _ => None,
        }
    }
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
            CameraFacing::External => write!(f, "external"),
            CameraFacing::Unknown => write!(f, "unknown"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    /// Backend-specific device identifier (node path, device path, ...)
    pub path: String,
    pub facing: CameraFacing,
}

/// Lens selection policy used when binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSelector {
    pub facing: CameraFacing,
}

impl CameraSelector {
    pub const DEFAULT_BACK_CAMERA: CameraSelector = CameraSelector {
        facing: CameraFacing::Back,
    };

    pub const DEFAULT_FRONT_CAMERA: CameraSelector = CameraSelector {
        facing: CameraFacing::Front,
    };

    pub fn new(facing: CameraFacing) -> Self {
        Self { facing }
    }

    /// Pick a device for this selector
    ///
    /// An exact facing match wins. Otherwise the first device that does not
    /// point the opposite way is used, so webcams without a reported location
    /// still satisfy the back-camera selector.
    pub fn select<'a>(&self, devices: &'a [CameraDevice]) -> Option<&'a CameraDevice> {
        devices
            .iter()
            .find(|d| d.facing == self.facing)
            .or_else(|| {
                let opposite = self.facing.opposite();
                devices.iter().find(|d| Some(d.facing) != opposite)
            })
    }
}

impl Default for CameraSelector {
    fn default() -> Self {
        Self::DEFAULT_BACK_CAMERA
    }
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::RGB24 => 3,
        }
    }
}

/// A single frame delivered by a camera stream
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Bytes per row, including any padding
    pub stride: u32,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed RGBA frame
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    pub fn data_slice(&self) -> &[u8] {
        &self.data
    }

    /// RGB value at (x, y), clamped to the frame bounds
    pub fn pixel_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let idx = (y * self.stride + x * self.format.bytes_per_pixel()) as usize;

        match self.data.get(idx..idx + 3) {
            Some(px) => (px[0], px[1], px[2]),
            None => (0, 0, 0),
        }
    }
}

/// Frame sender type for preview streams
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;

/// Frame receiver type for preview streams
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend or pipeline
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// No device satisfies the lens selector
    NoMatchingCamera(CameraFacing),
    /// The lifecycle scope ended before or during binding
    ScopeEnded,
    /// The stream has not produced a frame yet
    NoFrame,
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::NoMatchingCamera(facing) => {
                write!(f, "No camera matches the {} lens selector", facing)
            }
            BackendError::ScopeEnded => write!(f, "Lifecycle scope has ended"),
            BackendError::NoFrame => write!(f, "No frame available yet"),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
