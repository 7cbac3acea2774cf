// SPDX-License-Identifier: GPL-3.0-only

//! Camera binding for the capture screen
//!
//! Fetches the process-wide provider, then binds the preview and capture
//! use-cases of the selected lens under the screen's lifecycle scope. Binding
//! blocks on pipeline state changes, so it runs on a blocking task.

use super::lifecycle::LifecycleScope;
use super::provider::{CameraProvider, CaptureEndpoint};
use super::types::{BackendError, BackendResult, CameraBackendType, CameraSelector, FrameSender};
use tracing::{error, info};

/// Bind a camera using the process-wide provider
pub async fn bind(
    backend_type: CameraBackendType,
    scope: &LifecycleScope,
    selector: CameraSelector,
    preview: FrameSender,
) -> BackendResult<CaptureEndpoint> {
    let provider = CameraProvider::instance(backend_type)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to get camera provider"))?;

    bind_with(&provider, scope, selector, preview).await
}

/// Bind a camera using an explicit provider
pub async fn bind_with(
    provider: &CameraProvider,
    scope: &LifecycleScope,
    selector: CameraSelector,
    preview: FrameSender,
) -> BackendResult<CaptureEndpoint> {
    let provider = provider.clone();
    let scope = scope.clone();

    let result = tokio::task::spawn_blocking(move || provider.bind(&scope, selector, preview))
        .await
        .map_err(|e| BackendError::Other(format!("Bind task error: {}", e)))?;

    match &result {
        Ok(endpoint) => info!(
            device = %endpoint.device().name,
            generation = endpoint.generation(),
            "Camera bound to lifecycle"
        ),
        Err(e) => error!(error = %e, "Error binding camera to lifecycle"),
    }

    result
}
