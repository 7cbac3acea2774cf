// SPDX-License-Identifier: MPL-2.0

//! Navigation shell for snapcam
//!
//! Two destinations: `home` lists the saved photos, `add` shows the live
//! preview and takes pictures. The model is a plain state machine; the
//! terminal front-end renders it and performs the [`Action`]s it returns.
//!
//! # Architecture
//!
//! - `state`: Application state types (AppModel, Message, Action, Route)
//! - `update`: Message handling

mod state;
mod update;

pub use state::{Action, AppModel, GalleryStep, Message, Notification, NotificationKind, Route};

use crate::config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

impl AppModel {
    /// Create the shell on the `home` destination
    ///
    /// Returns the initial action, which lists the gallery.
    pub fn new(config: &Config, output_dir: PathBuf, permission_granted: bool) -> (Self, Action) {
        info!(
            output_dir = %output_dir.display(),
            permission_granted,
            "Starting on home"
        );

        let model = Self {
            routes: vec![Route::Home],
            photos: Vec::new(),
            selected: 0,
            preview: None,
            live_frame: None,
            endpoint: None,
            scope: None,
            permission_granted,
            notification: None,
            lens_facing: config.lens_facing,
            notification_ttl: Duration::from_secs(config.notification_secs),
            captures_in_flight: 0,
            output_dir,
        };
        let action = Action::ListGallery(model.output_dir.clone());
        (model, action)
    }
}
