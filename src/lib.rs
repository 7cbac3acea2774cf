// SPDX-License-Identifier: MPL-2.0

//! snapcam - take pictures and browse them from the terminal
//!
//! Two screens: a gallery of saved photos (`home`) and a live camera preview
//! with a shutter (`add`).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Navigation shell state machine
//! - [`backends`]: Camera backends, session binding and the permission gate
//! - [`pipelines`]: Photo capture pipeline
//! - [`config`]: User configuration handling
//! - [`storage`]: Output location and gallery listing
//! - [`terminal`]: ratatui front-end
//!
//! # Example
//!
//! ```ignore
//! // Interactive app:
//! // snapcam
//! // Headless capture with the synthetic camera:
//! // snapcam --backend test-pattern photo
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{Action, AppModel, Message};
pub use config::Config;
pub use errors::{AppError, PhotoError, StorageError};
