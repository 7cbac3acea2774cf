// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// chrono format for captured photo filenames (`yyyy-MM-dd-HH-mm-ss-SSS`)
pub const PHOTO_FILENAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

/// Extension of captured photos
pub const PHOTO_EXTENSION: &str = "jpg";

/// Folder created under the user's picture directory
pub const DEFAULT_SAVE_FOLDER: &str = "Snapcam";

/// Directory name under the user's config directory
pub const CONFIG_DIR_NAME: &str = "snapcam";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Navigation destination names
pub mod routes {
    /// Gallery screen
    pub const HOME: &str = "home";

    /// Capture screen
    pub const ADD: &str = "add";
}

/// User-facing notification texts
pub mod messages {
    pub const PHOTO_SAVED: &str = "A picture was added";
    pub const CAPTURE_FAILED: &str = "Something went wrong...";
    pub const PERMISSION_DENIED: &str = "Permission has been denied";
    pub const CAMERA_UNAVAILABLE: &str = "Camera unavailable";
    pub const WAITING_FOR_CAMERA: &str = "Waiting for camera...";
    pub const NO_PHOTOS: &str = "No photos yet. Press 'a' to add one.";
}

/// GStreamer pipeline constants
pub mod pipeline {
    /// Maximum buffer queue size (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;

    /// Preview channel capacity; frames are dropped when the UI falls behind
    pub const PREVIEW_CHANNEL_CAPACITY: usize = 4;

    /// Device class used to discover cameras
    pub const VIDEO_SOURCE_CLASS: &str = "Video/Source";
}

/// Test pattern source constants
pub mod test_pattern {
    pub const WIDTH: u32 = 640;
    pub const HEIGHT: u32 = 480;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// How long a capture waits for the first frame of a fresh session
    pub const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

    /// Poll interval while waiting for a frame
    pub const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Terminal input poll interval (~60 fps redraw)
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Test pattern frame interval (~30 fps)
    pub const TEST_PATTERN_FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// Default lifetime of a transient notification
    pub const NOTIFICATION_SECS: u64 = 2;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// How long a bind waits for the previous session's teardown
    pub const RELEASE_WAIT_TIMEOUT: Duration = Duration::from_secs(STOP_TIMEOUT_SECS + 1);

    /// Budget for background tasks (camera release, saves) when the app exits
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(STOP_TIMEOUT_SECS + 1);
}

/// Image file extensions listed by the gallery
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information utilities
pub mod app_info {
    use std::path::Path;

    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    /// Check if the application is running inside a Flatpak sandbox
    pub fn is_flatpak() -> bool {
        Path::new("/.flatpak-info").exists()
    }
}
