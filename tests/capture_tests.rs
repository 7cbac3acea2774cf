// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the photo capture workflow

use chrono::NaiveDateTime;
use futures::channel::mpsc;
use snapcam::PhotoError;
use snapcam::backends::camera::test_pattern::TestPatternBackend;
use snapcam::backends::camera::types::CameraSelector;
use snapcam::backends::camera::{CameraProvider, LifecycleScope, bind_with};
use snapcam::constants::PHOTO_FILENAME_FORMAT;
use snapcam::pipelines::photo::{EncodingQuality, PhotoPipeline};
use snapcam::storage;

#[tokio::test]
async fn test_capture_writes_timestamped_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CameraProvider::new(Box::new(TestPatternBackend::new()));
    let scope = LifecycleScope::new();
    let (sender, _preview) = mpsc::channel(4);

    let endpoint = bind_with(&provider, &scope, CameraSelector::DEFAULT_BACK_CAMERA, sender)
        .await
        .unwrap();

    let pipeline = PhotoPipeline::new(EncodingQuality::Medium);
    let path = pipeline
        .take_picture(Some(&endpoint), dir.path())
        .await
        .expect("endpoint was bound")
        .unwrap();

    assert_eq!(path.parent(), Some(dir.path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap();
    assert!(
        NaiveDateTime::parse_from_str(stem, PHOTO_FILENAME_FORMAT).is_ok(),
        "unexpected file name {}",
        stem
    );

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

    // The new photo shows up in the gallery
    let photos = storage::list_photos(dir.path());
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].path, path);
}

#[tokio::test]
async fn test_capture_without_endpoint_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = PhotoPipeline::default();

    assert!(pipeline.take_picture(None, dir.path()).await.is_none());
    assert!(storage::list_photos(dir.path()).is_empty());
}

#[tokio::test]
async fn test_capture_after_scope_end_fails() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CameraProvider::new(Box::new(TestPatternBackend::new()));
    let scope = LifecycleScope::new();
    let (sender, _preview) = mpsc::channel(4);

    let endpoint = bind_with(&provider, &scope, CameraSelector::DEFAULT_BACK_CAMERA, sender)
        .await
        .unwrap();
    scope.end();

    let result = PhotoPipeline::default()
        .capture_and_save(&endpoint, dir.path())
        .await;
    assert_eq!(result, Err(PhotoError::SessionEnded));
    assert!(storage::list_photos(dir.path()).is_empty());
}

#[tokio::test]
async fn test_save_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone");
    let provider = CameraProvider::new(Box::new(TestPatternBackend::new()));
    let scope = LifecycleScope::new();
    let (sender, _preview) = mpsc::channel(4);

    let endpoint = bind_with(&provider, &scope, CameraSelector::DEFAULT_BACK_CAMERA, sender)
        .await
        .unwrap();

    let result = PhotoPipeline::default()
        .capture_and_save(&endpoint, &missing)
        .await;
    assert!(matches!(result, Err(PhotoError::SaveFailed(_))));
}
