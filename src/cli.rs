// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Listing the gallery and the output location
//! - Taking a photo without the interactive shell
//! - Showing or writing the config file

use chrono::{DateTime, Local};
use futures::channel::mpsc;
use snapcam::backends::camera::types::{CameraBackendType, CameraSelector};
use snapcam::backends::camera::{LifecycleScope, binder, get_backend_for_type};
use snapcam::backends::camera::provider::CameraProvider;
use snapcam::config::Config;
use snapcam::constants::pipeline;
use snapcam::pipelines::photo::PhotoPipeline;
use snapcam::storage;
use std::path::PathBuf;

/// List all available cameras
pub fn list_cameras(backend_type: CameraBackendType) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(backend_type);
    if !backend.is_available() {
        return Err(format!("Camera backend '{}' is not available", backend_type).into());
    }

    let cameras = backend.enumerate_cameras();
    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let selected = CameraSelector::DEFAULT_BACK_CAMERA
        .select(&cameras)
        .map(|c| c.path.clone());

    println!("Available cameras ({}):", backend_type);
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let marker = if selected.as_deref() == Some(camera.path.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("  [{}] {}{}", index, camera.name, marker);
        println!("      Facing: {}", camera.facing);
        println!("      Path:   {}", camera.path);
        println!();
    }

    Ok(())
}

/// List saved photos, newest first
pub fn list_gallery(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let dir = storage::resolve_output_directory(&storage::picture_storage_roots(config))?;
    let photos = storage::list_photos(&dir);

    if photos.is_empty() {
        println!("No photos in {}", dir.display());
        return Ok(());
    }

    println!("{} photo(s) in {}:", photos.len(), dir.display());
    for photo in &photos {
        let modified: DateTime<Local> = photo.modified.into();
        println!("  {}  {}", modified.format("%Y-%m-%d %H:%M:%S"), photo.file_name());
    }

    Ok(())
}

/// Print the candidate picture roots and the one in use
pub fn print_location(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let roots = storage::picture_storage_roots(config);
    let dir = storage::resolve_output_directory(&roots)?;

    println!("Output directory: {}", dir.display());
    if roots.len() > 1 {
        println!("Candidates:");
        for root in &roots {
            println!("  {}", root.display());
        }
    }
    Ok(())
}

/// Take a photo with the configured backend and lens
pub fn take_photo(
    config: &Config,
    front: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Determine output directory
    let output_dir = match output {
        Some(dir) => dir,
        None => storage::resolve_output_directory(&storage::picture_storage_roots(config))?,
    };
    storage::ensure_output_directory(&output_dir)?;

    let selector = if front {
        CameraSelector::DEFAULT_FRONT_CAMERA
    } else {
        CameraSelector::new(config.lens_facing)
    };
    let photos = PhotoPipeline::new(config.jpeg_quality);

    let rt = tokio::runtime::Runtime::new()?;
    let output_path = rt.block_on(async {
        let provider = CameraProvider::instance(config.backend).await?;
        let scope = LifecycleScope::new();

        // Preview frames are not shown; keep the receiver so sends don't fail
        let (sender, _preview) = mpsc::channel(pipeline::PREVIEW_CHANNEL_CAPACITY);
        let endpoint = binder::bind_with(&provider, &scope, selector, sender).await?;
        println!("Using camera: {}", endpoint.device().name);
        println!("Capturing...");

        let result = photos.capture_and_save(&endpoint, &output_dir).await;
        scope.end();
        result.map_err(Box::<dyn std::error::Error>::from)
    })?;

    println!("Photo saved: {}", output_path.display());
    Ok(())
}

/// Show the effective config, optionally writing it to disk
pub fn show_config(config: &Config, init: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Config::config_path().ok_or("Could not determine config directory")?;

    if init {
        config.save_to(&path)?;
        println!("Config written to {}", path.display());
    } else {
        println!("Config file: {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
