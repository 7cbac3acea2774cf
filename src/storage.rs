// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for the photo output location and gallery listing

use crate::backends::camera::types::CameraFrame;
use crate::config::Config;
use crate::constants::{DEFAULT_SAVE_FOLDER, file_formats};
use crate::errors::StorageError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// A photo on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl PhotoFile {
    /// File name for display
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Enumerate the picture storage roots, most preferred first
///
/// A configured directory comes first, then the XDG pictures directory and
/// finally `~/Pictures`.
pub fn picture_storage_roots(config: &Config) -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Some(dir) = &config.photos_dir {
        roots.push(dir.clone());
    }
    if let Some(dir) = dirs::picture_dir() {
        roots.push(dir.join(DEFAULT_SAVE_FOLDER));
    }
    if let Some(home) = dirs::home_dir() {
        let fallback = home.join("Pictures").join(DEFAULT_SAVE_FOLDER);
        if !roots.contains(&fallback) {
            roots.push(fallback);
        }
    }

    roots
}

/// The directory photos are written to and listed from: the first root
pub fn resolve_output_directory(roots: &[PathBuf]) -> Result<PathBuf, StorageError> {
    roots.first().cloned().ok_or(StorageError::NoStorageRoot)
}

/// Create the output directory if needed
pub fn ensure_output_directory(dir: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(dir)?;
    info!(path = %dir.display(), "Photo directory ready");
    Ok(())
}

/// List photos in `dir`, newest first
///
/// Only regular files with an image extension are returned. Missing or
/// unreadable directories list as empty. The sort is stable, so files with
/// equal timestamps keep the directory's enumeration order.
pub fn list_photos(dir: &Path) -> Vec<PhotoFile> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "Photo directory not readable");
            return Vec::new();
        }
    };

    let mut photos: Vec<PhotoFile> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let ext = path.extension()?.to_string_lossy().into_owned();
            if !file_formats::is_image_extension(&ext) {
                return None;
            }
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some(PhotoFile { path, modified })
        })
        .collect();

    photos.sort_by_key(|photo| std::cmp::Reverse(photo.modified));
    photos
}

/// [`list_photos`] on a blocking thread
pub async fn list_photos_async(dir: PathBuf) -> Vec<PhotoFile> {
    tokio::task::spawn_blocking(move || list_photos(&dir))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Gallery listing task failed");
            Vec::new()
        })
}

/// Decode a photo into a downscaled RGBA frame for the preview pane
pub async fn load_preview(path: PathBuf, max_width: u32, max_height: u32) -> Option<CameraFrame> {
    let bytes = tokio::fs::read(&path).await.ok()?;

    tokio::task::spawn_blocking(move || {
        let img = match image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to decode photo");
                return None;
            }
        };
        let rgba = img.thumbnail(max_width.max(1), max_height.max(1)).to_rgba8();
        let (width, height) = rgba.dimensions();
        debug!(path = %path.display(), width, height, "Loaded preview");
        Some(CameraFrame::from_rgba(width, height, rgba.into_raw()))
    })
    .await
    .ok()?
}
