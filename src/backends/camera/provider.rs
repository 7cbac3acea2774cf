// SPDX-License-Identifier: GPL-3.0-only

//! Process-wide camera provider
//!
//! The provider owns the camera hardware on behalf of the whole process.
//! At most one capture session is active at a time: binding always tears
//! down the previous session first, and a session is released as soon as
//! the lifecycle scope it was bound under ends. Inside a tokio runtime that
//! release runs on a blocking task; the next bind waits for it.

use super::lifecycle::LifecycleScope;
use super::types::*;
use super::{CameraBackend, CameraStream, get_backend_for_type};
use crate::constants::timing;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

static INSTANCE: OnceCell<CameraProvider> = OnceCell::const_new();

/// The one live binding of a device to a preview surface
struct ActiveSession {
    generation: u64,
    scope_id: u64,
    device: CameraDevice,
    stream: Box<dyn CameraStream>,
}

impl ActiveSession {
    fn close(mut self) {
        debug!(generation = self.generation, device = %self.device.name, "Closing capture session");
        if let Err(e) = self.stream.close() {
            warn!(error = %e, device = %self.device.name, "Failed to close camera stream");
        }
    }
}

struct ProviderInner {
    backend: Box<dyn CameraBackend>,
    session: Mutex<Option<ActiveSession>>,
    next_generation: AtomicU64,
    /// Sessions released at scope end whose teardown is still running
    closing: Mutex<usize>,
    closed: Condvar,
}

impl ProviderInner {
    fn lock_session(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_closing(&self) -> MutexGuard<'_, usize> {
        match self.closing.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Release the session if it is still the given generation
    ///
    /// With a runtime the teardown runs on a blocking task, so ending a scope
    /// from the UI thread never waits for the pipeline to stop.
    fn release(self: &Arc<Self>, generation: u64, runtime: Option<&Handle>) {
        let released = {
            let mut session = self.lock_session();
            match session.as_ref() {
                Some(active) if active.generation == generation => session.take(),
                _ => None,
            }
        };
        let Some(active) = released else {
            return;
        };

        info!(generation, "Releasing capture session at end of scope");
        match runtime {
            Some(handle) => {
                *self.lock_closing() += 1;
                let inner = Arc::clone(self);
                handle.spawn_blocking(move || {
                    active.close();
                    let mut closing = inner.lock_closing();
                    *closing = closing.saturating_sub(1);
                    inner.closed.notify_all();
                });
            }
            None => active.close(),
        }
    }

    /// Block until background teardowns are done, so the device is free
    fn wait_for_pending_release(&self) {
        let closing = self.lock_closing();
        if *closing == 0 {
            return;
        }

        debug!(pending = *closing, "Waiting for camera release");
        let result = self
            .closed
            .wait_timeout_while(closing, timing::RELEASE_WAIT_TIMEOUT, |pending| *pending > 0);
        if let Ok((_, timeout)) = result
            && timeout.timed_out()
        {
            warn!("Previous camera session is still closing");
        }
    }
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        if let Some(active) = self.lock_session().take() {
            active.close();
        }
    }
}

/// Snapshot of the active session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub generation: u64,
    pub scope_id: u64,
    pub device: CameraDevice,
}

/// Camera provider handle
///
/// Cheap to clone; all clones share the same hardware ownership.
#[derive(Clone)]
pub struct CameraProvider {
    inner: Arc<ProviderInner>,
}

impl CameraProvider {
    /// Create a provider around an explicit backend
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        info!(backend = %backend.backend_type(), "Creating camera provider");

        Self {
            inner: Arc::new(ProviderInner {
                backend,
                session: Mutex::new(None),
                next_generation: AtomicU64::new(1),
                closing: Mutex::new(0),
                closed: Condvar::new(),
            }),
        }
    }

    /// Fetch the process-wide provider, creating it on first use
    ///
    /// The backend type only matters for the first call; later calls return
    /// the already-initialised provider.
    pub async fn instance(backend_type: CameraBackendType) -> BackendResult<CameraProvider> {
        INSTANCE
            .get_or_try_init(|| async move {
                // GStreamer init and device probing block
                let backend = tokio::task::spawn_blocking(move || {
                    let backend = get_backend_for_type(backend_type);
                    if backend.is_available() {
                        Ok(backend)
                    } else {
                        Err(BackendError::NotAvailable(format!(
                            "{} backend is not available",
                            backend_type
                        )))
                    }
                })
                .await
                .map_err(|e| BackendError::Other(format!("Provider task error: {}", e)))??;

                Ok::<_, BackendError>(CameraProvider::new(backend))
            })
            .await
            .cloned()
    }

    pub fn backend_type(&self) -> CameraBackendType {
        self.inner.backend.backend_type()
    }

    pub fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.inner.backend.enumerate_cameras()
    }

    /// Tear down the active session, if any
    pub fn unbind_all(&self) {
        let previous = self.inner.lock_session().take();
        if let Some(active) = previous {
            info!(generation = active.generation, "Unbinding camera session");
            active.close();
        }
    }

    /// Bind the preview and capture use-cases of a device under `scope`
    ///
    /// Any existing session is unbound first. The returned endpoint stays live
    /// until the scope ends or another bind supersedes it.
    pub fn bind(
        &self,
        scope: &LifecycleScope,
        selector: CameraSelector,
        preview: FrameSender,
    ) -> BackendResult<CaptureEndpoint> {
        if !scope.is_active() {
            return Err(BackendError::ScopeEnded);
        }

        self.inner.wait_for_pending_release();
        self.unbind_all();

        let devices = self.inner.backend.enumerate_cameras();
        if devices.is_empty() {
            return Err(BackendError::DeviceNotFound("No cameras found".to_string()));
        }

        let device = selector
            .select(&devices)
            .ok_or(BackendError::NoMatchingCamera(selector.facing))?
            .clone();

        info!(device = %device.name, facing = %device.facing, scope = scope.id(), "Binding camera");

        let mut stream = self.inner.backend.open(&device, preview)?;
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);

        let displaced = {
            let mut session = self.inner.lock_session();

            // The scope may have ended while the device was opening; a newer
            // scope's session must survive that
            if !scope.is_active() {
                drop(session);
                debug!(scope = scope.id(), "Scope ended during bind, discarding stream");
                if let Err(e) = stream.close() {
                    warn!(error = %e, "Failed to close discarded camera stream");
                }
                return Err(BackendError::ScopeEnded);
            }

            session.replace(ActiveSession {
                generation,
                scope_id: scope.id(),
                device: device.clone(),
                stream,
            })
        };
        // A concurrent bind slipped in between unbind and open
        if let Some(active) = displaced {
            active.close();
        }

        let weak = Arc::downgrade(&self.inner);
        let runtime = Handle::try_current().ok();
        scope.on_end(move || {
            if let Some(inner) = weak.upgrade() {
                inner.release(generation, runtime.as_ref());
            }
        });

        if !scope.is_active() {
            return Err(BackendError::ScopeEnded);
        }

        Ok(CaptureEndpoint {
            provider: Arc::downgrade(&self.inner),
            generation,
            device,
        })
    }

    /// Describe the active session
    pub fn active_session(&self) -> Option<SessionInfo> {
        self.inner.lock_session().as_ref().map(|active| SessionInfo {
            generation: active.generation,
            scope_id: active.scope_id,
            device: active.device.clone(),
        })
    }
}

impl std::fmt::Debug for CameraProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraProvider")
            .field("backend_type", &self.backend_type())
            .field("session", &self.active_session())
            .finish()
    }
}

/// Handle to the capture use-case of one session
#[derive(Clone)]
pub struct CaptureEndpoint {
    provider: Weak<ProviderInner>,
    generation: u64,
    device: CameraDevice,
}

impl CaptureEndpoint {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    /// Whether this endpoint's session is still the active one
    pub fn is_live(&self) -> bool {
        self.provider.upgrade().is_some_and(|inner| {
            inner
                .lock_session()
                .as_ref()
                .is_some_and(|active| active.generation == self.generation)
        })
    }

    /// Grab the latest frame of this endpoint's session
    pub fn capture_still(&self) -> BackendResult<CameraFrame> {
        let inner = self.provider.upgrade().ok_or(BackendError::ScopeEnded)?;
        let session = inner.lock_session();

        match session.as_ref() {
            Some(active) if active.generation == self.generation => active.stream.capture_still(),
            _ => Err(BackendError::ScopeEnded),
        }
    }
}

impl std::fmt::Debug for CaptureEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureEndpoint")
            .field("generation", &self.generation)
            .field("device", &self.device.name)
            .finish()
    }
}
