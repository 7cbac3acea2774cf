// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` dispatches each message to a focused handler. Handlers only
//! mutate the model; anything that touches the camera, the disk or D-Bus is
//! returned as an [`Action`] for the front-end to run.

use super::state::{Action, AppModel, GalleryStep, Message, Notification, Route};
use crate::backends::camera::lifecycle::LifecycleScope;
use crate::backends::camera::provider::CaptureEndpoint;
use crate::backends::camera::types::{BackendError, CameraFrame};
use crate::constants::messages;
use crate::pipelines::photo::CaptureResult;
use crate::storage::PhotoFile;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

impl AppModel {
    /// Main message handler
    pub fn update(&mut self, message: Message) -> Action {
        match message {
            // ===== Navigation =====
            Message::AddPhoto => self.handle_add_photo(),
            Message::PermissionResult(granted) => self.handle_permission_result(granted),
            Message::Back => self.handle_back(),
            Message::Quit => self.handle_quit(),

            // ===== Capture screen =====
            Message::CameraBound { scope_id, result } => self.handle_camera_bound(scope_id, result),
            Message::Frame(frame) => {
                if self.route() == Route::Add && self.endpoint.is_some() {
                    self.live_frame = Some(frame);
                }
                Action::None
            }
            Message::TakePicture => self.handle_take_picture(),
            Message::PictureSaved { scope_id, result } => {
                self.handle_picture_saved(scope_id, result)
            }

            // ===== Gallery =====
            Message::GallerySelect(step) => self.handle_gallery_select(step),
            Message::OpenSelected => match (self.route(), self.selected_photo()) {
                (Route::Home, Some(photo)) => Action::Open(photo.path.clone()),
                _ => Action::None,
            },
            Message::Refresh => match self.route() {
                Route::Home => Action::ListGallery(self.output_dir.clone()),
                Route::Add => Action::None,
            },
            Message::GalleryLoaded(photos) => self.handle_gallery_loaded(photos),
            Message::PreviewLoaded(path, frame) => self.handle_preview_loaded(path, frame),

            Message::Tick(now) => {
                if self.notification.as_ref().is_some_and(|n| n.is_expired(now)) {
                    self.notification = None;
                }
                Action::None
            }
        }
    }

    fn handle_add_photo(&mut self) -> Action {
        if self.route() == Route::Add {
            return Action::None;
        }

        if self.permission_granted {
            self.enter_add()
        } else {
            info!("Camera permission not granted yet, requesting");
            Action::RequestPermission
        }
    }

    fn handle_permission_result(&mut self, granted: bool) -> Action {
        self.permission_granted = granted;

        if !granted {
            warn!("Camera permission denied");
            self.notify_error(messages::PERMISSION_DENIED);
            return Action::None;
        }

        match self.route() {
            Route::Home => self.enter_add(),
            Route::Add => Action::None,
        }
    }

    fn enter_add(&mut self) -> Action {
        let scope = LifecycleScope::new();
        info!(scope = scope.id(), "Navigating to {}", Route::Add.name());

        self.routes.push(Route::Add);
        self.endpoint = None;
        self.live_frame = None;
        self.scope = Some(scope.clone());

        Action::BindCamera {
            scope,
            facing: self.lens_facing,
        }
    }

    fn leave_add(&mut self) {
        if let Some(scope) = self.scope.take() {
            debug!(scope = scope.id(), "Ending capture screen scope");
            scope.end();
        }
        self.endpoint = None;
        self.live_frame = None;
    }

    fn handle_back(&mut self) -> Action {
        match self.route() {
            Route::Add => {
                self.leave_add();
                self.routes.pop();
                info!("Navigating back to {}", self.route().name());
                Action::ListGallery(self.output_dir.clone())
            }
            Route::Home => self.handle_quit(),
        }
    }

    fn handle_quit(&mut self) -> Action {
        self.leave_add();
        self.routes.truncate(1);
        Action::Quit
    }

    fn handle_camera_bound(
        &mut self,
        scope_id: u64,
        result: Result<CaptureEndpoint, BackendError>,
    ) -> Action {
        let current = self
            .scope
            .as_ref()
            .is_some_and(|scope| scope.id() == scope_id && scope.is_active());

        if !current || self.route() != Route::Add {
            debug!(scope_id, "Discarding bind result for a scope that has ended");
            return Action::None;
        }

        match result {
            Ok(endpoint) => {
                info!(device = %endpoint.device().name, "Camera ready");
                self.endpoint = Some(endpoint);
            }
            Err(e) => {
                warn!(error = %e, "Camera binding failed");
                self.notify_error(messages::CAMERA_UNAVAILABLE);
            }
        }
        Action::None
    }

    fn handle_take_picture(&mut self) -> Action {
        if self.route() != Route::Add {
            return Action::None;
        }

        match (&self.endpoint, &self.scope) {
            (Some(endpoint), Some(scope)) => {
                self.captures_in_flight += 1;
                Action::Capture {
                    scope_id: scope.id(),
                    endpoint: endpoint.clone(),
                    output_dir: self.output_dir.clone(),
                }
            }
            _ => {
                debug!("Shutter pressed before the camera was bound, ignoring");
                Action::None
            }
        }
    }

    fn handle_picture_saved(&mut self, scope_id: u64, result: CaptureResult) -> Action {
        self.captures_in_flight = self.captures_in_flight.saturating_sub(1);

        match result {
            Ok(path) => {
                info!(path = %path.display(), scope_id, "Picture added");
                self.notify_info(messages::PHOTO_SAVED);

                // A saved picture returns to the gallery, which relists. A
                // capture from an earlier visit must not close the current one.
                let current = self.scope.as_ref().is_some_and(|scope| scope.id() == scope_id);
                match self.route() {
                    Route::Add if current => {
                        self.leave_add();
                        self.routes.pop();
                        Action::ListGallery(self.output_dir.clone())
                    }
                    Route::Add => {
                        debug!(scope_id, "Picture from an earlier capture screen saved");
                        Action::None
                    }
                    Route::Home => Action::ListGallery(self.output_dir.clone()),
                }
            }
            Err(e) => {
                warn!(error = %e, "Picture was not saved");
                self.notify_error(messages::CAPTURE_FAILED);
                Action::None
            }
        }
    }

    fn handle_gallery_select(&mut self, step: GalleryStep) -> Action {
        if self.route() != Route::Home || self.photos.is_empty() {
            return Action::None;
        }

        let last = self.photos.len() - 1;
        let next = match step {
            GalleryStep::Next => (self.selected + 1).min(last),
            GalleryStep::Previous => self.selected.saturating_sub(1),
        };
        if next == self.selected {
            return Action::None;
        }

        self.selected = next;
        Action::LoadPreview(self.photos[next].path.clone())
    }

    fn handle_gallery_loaded(&mut self, photos: Vec<PhotoFile>) -> Action {
        debug!(count = photos.len(), "Gallery listed");

        // Keep the selection on the same file when it is still there
        let previous = self.selected_photo().map(|p| p.path.clone());
        self.photos = photos;
        self.selected = previous
            .and_then(|path| self.photos.iter().position(|p| p.path == path))
            .unwrap_or(0);

        match self.selected_photo() {
            Some(photo) => {
                let path = photo.path.clone();
                if self.preview.as_ref().is_some_and(|(p, _)| *p == path) {
                    Action::None
                } else {
                    Action::LoadPreview(path)
                }
            }
            None => {
                self.preview = None;
                Action::None
            }
        }
    }

    fn handle_preview_loaded(&mut self, path: PathBuf, frame: Option<CameraFrame>) -> Action {
        if self.selected_photo().is_some_and(|p| p.path == path) {
            self.preview = frame.map(|frame| (path, frame));
        }
        Action::None
    }

    fn notify_info(&mut self, text: &str) {
        self.notification = Some(Notification::info(text, self.notification_ttl));
    }

    fn notify_error(&mut self, text: &str) {
        self.notification = Some(Notification::error(text, self.notification_ttl));
    }

    /// Whether the current notification should still be shown at `now`
    pub fn visible_notification(&self, now: Instant) -> Option<&Notification> {
        self.notification.as_ref().filter(|n| !n.is_expired(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::NotificationKind;
    use crate::backends::camera::provider::CameraProvider;
    use crate::backends::camera::test_pattern::TestPatternBackend;
    use crate::backends::camera::types::CameraSelector;
    use crate::config::Config;
    use crate::errors::PhotoError;
    use std::time::{Duration, SystemTime};

    fn model(granted: bool) -> AppModel {
        let (model, action) = AppModel::new(&Config::default(), PathBuf::from("/photos"), granted);
        assert!(matches!(action, Action::ListGallery(ref dir) if dir == &PathBuf::from("/photos")));
        model
    }

    fn photo(name: &str, secs: u64) -> PhotoFile {
        PhotoFile {
            path: PathBuf::from("/photos").join(name),
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    fn bound_endpoint(provider: &CameraProvider, scope: &LifecycleScope) -> CaptureEndpoint {
        let (sender, _receiver) = futures::channel::mpsc::channel(1);
        provider
            .bind(scope, CameraSelector::DEFAULT_BACK_CAMERA, sender)
            .unwrap()
    }

    fn enter_add(model: &mut AppModel) -> LifecycleScope {
        match model.update(Message::AddPhoto) {
            Action::BindCamera { scope, .. } => scope,
            other => panic!("expected BindCamera, got {:?}", other),
        }
    }

    #[test]
    fn test_starts_on_home() {
        let model = model(true);
        assert_eq!(model.route(), Route::Home);
        assert!(model.endpoint.is_none());
    }

    #[test]
    fn test_add_photo_with_permission_binds_camera() {
        let mut model = model(true);
        let scope = enter_add(&mut model);

        assert_eq!(model.route(), Route::Add);
        assert!(scope.is_active());
        assert_eq!(model.scope.as_ref().map(|s| s.id()), Some(scope.id()));
    }

    #[test]
    fn test_add_photo_without_permission_requests_it() {
        let mut model = model(false);
        assert!(matches!(model.update(Message::AddPhoto), Action::RequestPermission));
        assert_eq!(model.route(), Route::Home);

        let action = model.update(Message::PermissionResult(true));
        assert!(matches!(action, Action::BindCamera { .. }));
        assert_eq!(model.route(), Route::Add);
    }

    #[test]
    fn test_permission_denied_stays_home() {
        let mut model = model(false);
        model.update(Message::AddPhoto);
        let action = model.update(Message::PermissionResult(false));

        assert!(action.is_none());
        assert_eq!(model.route(), Route::Home);
        let notification = model.notification.as_ref().unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.text, messages::PERMISSION_DENIED);
    }

    #[test]
    fn test_back_from_add_ends_scope_and_relists() {
        let mut model = model(true);
        let scope = enter_add(&mut model);

        let action = model.update(Message::Back);
        assert!(matches!(action, Action::ListGallery(_)));
        assert_eq!(model.route(), Route::Home);
        assert!(!scope.is_active());
        assert!(model.scope.is_none());
    }

    #[test]
    fn test_back_from_home_quits() {
        let mut model = model(true);
        assert!(matches!(model.update(Message::Back), Action::Quit));
    }

    #[test]
    fn test_take_picture_before_bind_is_noop() {
        let mut model = model(true);
        enter_add(&mut model);

        assert!(model.update(Message::TakePicture).is_none());
        assert_eq!(model.captures_in_flight, 0);
    }

    #[test]
    fn test_take_picture_after_bind_captures() {
        let provider = CameraProvider::new(Box::new(TestPatternBackend::new()));
        let mut model = model(true);
        let scope = enter_add(&mut model);

        let endpoint = bound_endpoint(&provider, &scope);
        model.update(Message::CameraBound {
            scope_id: scope.id(),
            result: Ok(endpoint),
        });
        assert!(model.endpoint.is_some());

        match model.update(Message::TakePicture) {
            Action::Capture {
                scope_id,
                output_dir,
                ..
            } => {
                assert_eq!(scope_id, scope.id());
                assert_eq!(output_dir, PathBuf::from("/photos"));
            }
            other => panic!("expected Capture, got {:?}", other),
        }
        assert_eq!(model.captures_in_flight, 1);
    }

    #[test]
    fn test_stale_bind_result_is_discarded() {
        let provider = CameraProvider::new(Box::new(TestPatternBackend::new()));
        let mut model = model(true);
        let scope = enter_add(&mut model);
        let endpoint = bound_endpoint(&provider, &scope);

        model.update(Message::Back);
        model.update(Message::CameraBound {
            scope_id: scope.id(),
            result: Ok(endpoint),
        });

        assert!(model.endpoint.is_none());
        assert!(provider.active_session().is_none());
    }

    #[test]
    fn test_bind_failure_notifies() {
        let mut model = model(true);
        let scope = enter_add(&mut model);

        model.update(Message::CameraBound {
            scope_id: scope.id(),
            result: Err(BackendError::DeviceNotFound("no cameras".into())),
        });

        assert!(model.endpoint.is_none());
        assert_eq!(
            model.notification.as_ref().map(|n| n.text.as_str()),
            Some(messages::CAMERA_UNAVAILABLE)
        );
    }

    #[test]
    fn test_picture_saved_returns_home() {
        let mut model = model(true);
        let scope = enter_add(&mut model);

        let action = model.update(Message::PictureSaved {
            scope_id: scope.id(),
            result: Ok(PathBuf::from("/photos/a.jpg")),
        });
        assert!(matches!(action, Action::ListGallery(_)));
        assert_eq!(model.route(), Route::Home);
        assert!(!scope.is_active());

        let notification = model.notification.clone().unwrap();
        assert_eq!(notification.kind, NotificationKind::Info);
        assert_eq!(notification.text, messages::PHOTO_SAVED);
    }

    #[test]
    fn test_picture_failure_stays_on_add() {
        let mut model = model(true);
        let scope = enter_add(&mut model);

        let action = model.update(Message::PictureSaved {
            scope_id: scope.id(),
            result: Err(PhotoError::SessionEnded),
        });
        assert!(action.is_none());
        assert_eq!(model.route(), Route::Add);
        assert!(scope.is_active());

        let notification = model.notification.clone().unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.text, messages::CAPTURE_FAILED);
    }

    #[test]
    fn test_earlier_capture_does_not_close_new_visit() {
        let mut model = model(true);
        let first = enter_add(&mut model);
        model.update(Message::Back);
        let second = enter_add(&mut model);

        let action = model.update(Message::PictureSaved {
            scope_id: first.id(),
            result: Ok(PathBuf::from("/photos/a.jpg")),
        });

        assert!(action.is_none());
        assert_eq!(model.route(), Route::Add);
        assert!(second.is_active());
        assert_eq!(model.scope.as_ref().map(|s| s.id()), Some(second.id()));
        assert_eq!(
            model.notification.as_ref().map(|n| n.text.as_str()),
            Some(messages::PHOTO_SAVED)
        );
    }

    #[test]
    fn test_capture_finishing_on_home_relists() {
        let mut model = model(true);
        let scope = enter_add(&mut model);
        model.update(Message::Back);

        let action = model.update(Message::PictureSaved {
            scope_id: scope.id(),
            result: Ok(PathBuf::from("/photos/a.jpg")),
        });
        assert!(matches!(action, Action::ListGallery(_)));
        assert_eq!(model.route(), Route::Home);
    }

    #[test]
    fn test_tick_expires_notification() {
        let mut model = model(false);
        model.update(Message::PermissionResult(false));
        let expires_at = model.notification.as_ref().unwrap().expires_at;

        model.update(Message::Tick(expires_at - Duration::from_millis(1)));
        assert!(model.notification.is_some());

        model.update(Message::Tick(expires_at));
        assert!(model.notification.is_none());
    }

    #[test]
    fn test_gallery_selection_is_clamped() {
        let mut model = model(true);
        let action = model.update(Message::GalleryLoaded(vec![photo("b.jpg", 300), photo("a.jpg", 100)]));
        assert!(matches!(action, Action::LoadPreview(ref p) if p.ends_with("b.jpg")));

        assert!(model.update(Message::GallerySelect(GalleryStep::Previous)).is_none());
        let action = model.update(Message::GallerySelect(GalleryStep::Next));
        assert!(matches!(action, Action::LoadPreview(ref p) if p.ends_with("a.jpg")));
        assert!(model.update(Message::GallerySelect(GalleryStep::Next)).is_none());

        match model.update(Message::OpenSelected) {
            Action::Open(path) => assert!(path.ends_with("a.jpg")),
            other => panic!("expected Open, got {:?}", other),
        }
    }

    #[test]
    fn test_gallery_reload_keeps_selected_file() {
        let mut model = model(true);
        model.update(Message::GalleryLoaded(vec![photo("b.jpg", 300), photo("a.jpg", 100)]));
        model.update(Message::GallerySelect(GalleryStep::Next));

        model.update(Message::GalleryLoaded(vec![
            photo("c.jpg", 400),
            photo("b.jpg", 300),
            photo("a.jpg", 100),
        ]));
        assert_eq!(model.selected, 2);
    }

    #[test]
    fn test_empty_gallery_clears_preview() {
        let mut model = model(true);
        model.update(Message::GalleryLoaded(vec![photo("a.jpg", 100)]));
        let frame = CameraFrame::from_rgba(1, 1, vec![0, 0, 0, 255]);
        model.update(Message::PreviewLoaded(PathBuf::from("/photos/a.jpg"), Some(frame)));
        assert!(model.preview.is_some());

        assert!(model.update(Message::GalleryLoaded(Vec::new())).is_none());
        assert!(model.preview.is_none());
        assert!(model.selected_photo().is_none());
    }
}
