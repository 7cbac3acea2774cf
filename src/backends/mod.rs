// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer
//!
//! - [`camera`]: camera discovery, session binding and frame capture
//! - [`permission`]: camera access gate (XDG portal inside Flatpak)

pub mod camera;
pub mod permission;
