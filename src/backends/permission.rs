// SPDX-License-Identifier: GPL-3.0-only

//! Camera access permission
//!
//! Inside a Flatpak sandbox camera access goes through the XDG desktop
//! portal (`org.freedesktop.portal.Camera`). Native installs talk to the
//! devices directly, so access is granted without asking.

use crate::constants::app_info;
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, error, info};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

const PORTAL_DESTINATION: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const CAMERA_INTERFACE: &str = "org.freedesktop.portal.Camera";
const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

/// Whether camera access has to be requested before binding
pub fn access_required() -> bool {
    app_info::is_flatpak()
}

/// Ask for camera access; `true` when granted
///
/// Portal errors count as a denial.
pub async fn request_camera_access() -> bool {
    if !access_required() {
        debug!("Native install, camera access granted");
        return true;
    }

    match request_via_portal().await {
        Ok(granted) => {
            info!(granted, "Camera portal responded");
            granted
        }
        Err(e) => {
            error!(error = %e, "Camera portal request failed");
            false
        }
    }
}

async fn request_via_portal() -> Result<bool, String> {
    let connection = zbus::Connection::session()
        .await
        .map_err(|e| format!("Failed to connect to session D-Bus: {}", e))?;

    // The request object path is predictable from our unique name and the
    // handle token; subscribe before calling so the response cannot be missed
    let token = format!("snapcam_{}", std::process::id());
    let sender = connection
        .unique_name()
        .ok_or("Connection has no unique name")?
        .as_str()
        .trim_start_matches(':')
        .replace('.', "_");
    let request_path = format!("{}/request/{}/{}", PORTAL_PATH, sender, token);

    let request = zbus::Proxy::new(
        &connection,
        PORTAL_DESTINATION,
        request_path.as_str(),
        REQUEST_INTERFACE,
    )
    .await
    .map_err(|e| format!("Failed to create request proxy: {}", e))?;
    let mut responses = request
        .receive_signal("Response")
        .await
        .map_err(|e| format!("Failed to subscribe to portal response: {}", e))?;

    let camera = zbus::Proxy::new(&connection, PORTAL_DESTINATION, PORTAL_PATH, CAMERA_INTERFACE)
        .await
        .map_err(|e| format!("Failed to create camera portal proxy: {}", e))?;

    let mut options: HashMap<&str, Value> = HashMap::new();
    options.insert("handle_token", Value::new(token.as_str()));

    let handle: OwnedObjectPath = camera
        .call("AccessCamera", &(options,))
        .await
        .map_err(|e| format!("AccessCamera failed: {}", e))?;
    debug!(handle = %handle, "Camera access requested");

    let message = responses
        .next()
        .await
        .ok_or("Portal closed without a response")?;
    let body = message.body();
    let (response, _results): (u32, HashMap<String, OwnedValue>) = body
        .deserialize()
        .map_err(|e| format!("Malformed portal response: {}", e))?;

    // 0 = granted, 1 = cancelled by user, 2 = other
    Ok(response == 0)
}
