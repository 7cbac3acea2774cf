// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   UI Layer (App)    │
//! └──────────┬──────────┘
//!            │ bind(scope, preview)
//!            ▼
//! ┌─────────────────────┐
//! │    Camera Binder    │  ← Fetches the provider, picks the lens
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │   CameraProvider    │  ← Process-wide handle, one session at a time
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackend Trait │  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴──────┐
//!       ▼           ▼
//!  ┌─────────┐ ┌────────────┐
//!  │GStreamer│ │Test pattern│
//!  └─────────┘ └────────────┘
//! ```

pub mod binder;
pub mod gstreamer;
pub mod lifecycle;
pub mod provider;
pub mod test_pattern;
pub mod types;

pub use binder::{bind, bind_with};
pub use lifecycle::LifecycleScope;
pub use provider::{CameraProvider, CaptureEndpoint, SessionInfo};
pub use types::*;

/// Camera backend trait
///
/// A backend knows how to discover devices and how to open one of them as a
/// running stream. Session ownership lives in [`CameraProvider`].
pub trait CameraBackend: Send + Sync {
    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Check if this backend is available on the current system
    fn is_available(&self) -> bool;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Start streaming from a device
    ///
    /// Every frame is pushed to `preview` (dropped when the receiver is full)
    /// and kept as the latest still for [`CameraStream::capture_still`].
    fn open(
        &self,
        device: &CameraDevice,
        preview: FrameSender,
    ) -> BackendResult<Box<dyn CameraStream>>;
}

/// A running camera stream: the preview and capture use-cases of one device
pub trait CameraStream: Send {
    /// Copy of the most recent frame
    fn capture_still(&self) -> BackendResult<CameraFrame>;

    /// Stop streaming and release the device
    fn close(&mut self) -> BackendResult<()>;
}

/// Get a concrete backend instance for the given type
pub fn get_backend_for_type(backend_type: CameraBackendType) -> Box<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::GStreamer => Box::new(gstreamer::GStreamerBackend::new()),
        CameraBackendType::TestPattern => Box::new(test_pattern::TestPatternBackend::new()),
    }
}
