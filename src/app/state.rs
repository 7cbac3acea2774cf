// SPDX-License-Identifier: GPL-3.0-only

//! Application state management

use crate::backends::camera::lifecycle::LifecycleScope;
use crate::backends::camera::provider::CaptureEndpoint;
use crate::backends::camera::types::{BackendError, CameraFacing, CameraFrame};
use crate::pipelines::photo::CaptureResult;
use crate::storage::PhotoFile;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Navigation destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Gallery of saved photos
    Home,
    /// Live preview with a shutter
    Add,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => crate::constants::routes::HOME,
            Route::Add => crate::constants::routes::ADD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

/// Transient status line message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
    pub expires_at: Instant,
}

impl Notification {
    pub fn info(text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind: NotificationKind::Info,
            text: text.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn error(text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind: NotificationKind::Error,
            text: text.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Direction for moving the gallery selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryStep {
    Next,
    Previous,
}

/// Everything the shell reacts to: user input and completed background work
#[derive(Debug, Clone)]
pub enum Message {
    // ===== User input =====
    AddPhoto,
    Back,
    TakePicture,
    GallerySelect(GalleryStep),
    OpenSelected,
    Refresh,
    Quit,

    // ===== Background results =====
    PermissionResult(bool),
    /// Bind finished for the scope with the given id
    CameraBound {
        scope_id: u64,
        result: Result<CaptureEndpoint, BackendError>,
    },
    /// New live preview frame
    Frame(CameraFrame),
    /// Capture finished for a shutter press under the given scope
    PictureSaved {
        scope_id: u64,
        result: CaptureResult,
    },
    GalleryLoaded(Vec<PhotoFile>),
    PreviewLoaded(PathBuf, Option<CameraFrame>),

    /// Periodic clock, used to expire notifications
    Tick(Instant),
}

/// Side effect requested by [`AppModel::update`](super::AppModel::update)
///
/// The front-end performs it and reports the outcome as a [`Message`].
#[derive(Debug, Clone)]
pub enum Action {
    None,
    ListGallery(PathBuf),
    LoadPreview(PathBuf),
    RequestPermission,
    BindCamera {
        scope: LifecycleScope,
        facing: CameraFacing,
    },
    Capture {
        scope_id: u64,
        endpoint: CaptureEndpoint,
        output_dir: PathBuf,
    },
    Open(PathBuf),
    Quit,
}

impl Action {
    pub fn is_none(&self) -> bool {
        matches!(self, Action::None)
    }
}

/// Main application state
pub struct AppModel {
    /// Back stack, always rooted at [`Route::Home`]
    pub(super) routes: Vec<Route>,
    /// Photos of the output directory, newest first
    pub photos: Vec<PhotoFile>,
    pub selected: usize,
    /// Decoded preview of the selected photo
    pub preview: Option<(PathBuf, CameraFrame)>,
    /// Latest live frame while on the capture screen
    pub live_frame: Option<CameraFrame>,
    /// Capture handle, present once the camera is bound
    pub endpoint: Option<CaptureEndpoint>,
    /// Lifecycle of the capture screen; ends when it is left
    pub scope: Option<LifecycleScope>,
    pub permission_granted: bool,
    pub notification: Option<Notification>,
    pub output_dir: PathBuf,
    pub lens_facing: CameraFacing,
    pub notification_ttl: Duration,
    /// Captures started and not yet reported back
    pub captures_in_flight: usize,
}

impl AppModel {
    pub fn route(&self) -> Route {
        self.routes.last().copied().unwrap_or(Route::Home)
    }

    pub fn selected_photo(&self) -> Option<&PhotoFile> {
        self.photos.get(self.selected)
    }
}
