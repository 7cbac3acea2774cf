// SPDX-License-Identifier: MPL-2.0

//! Integration tests for camera session ownership

use futures::channel::mpsc;
use snapcam::backends::camera::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFacing, CameraFrame,
    CameraSelector, FrameSender,
};
use snapcam::backends::camera::{
    CameraBackend, CameraProvider, CameraStream, LifecycleScope, bind_with,
};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const GATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Holds the first open until released; reports when it is waiting
struct OpenGate {
    entered: std_mpsc::Sender<()>,
    release: std_mpsc::Receiver<()>,
}

/// Backend that records open/close calls and serves a fixed frame
#[derive(Clone, Default)]
struct RecordingBackend {
    events: Arc<Mutex<Vec<String>>>,
    devices: Vec<CameraDevice>,
    open_gate: Arc<Mutex<Option<OpenGate>>>,
    close_gate: Arc<Mutex<Option<std_mpsc::Receiver<()>>>>,
}

impl RecordingBackend {
    fn new(devices: Vec<CameraDevice>) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }

    /// Block the first `open` until `release` fires
    fn with_open_gate(self, entered: std_mpsc::Sender<()>, release: std_mpsc::Receiver<()>) -> Self {
        *self.open_gate.lock().unwrap() = Some(OpenGate { entered, release });
        self
    }

    /// Block the first `close` until `release` fires
    fn with_close_gate(self, release: std_mpsc::Receiver<()>) -> Self {
        *self.close_gate.lock().unwrap() = Some(release);
        self
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

struct RecordingStream {
    events: Arc<Mutex<Vec<String>>>,
    path: String,
    close_gate: Arc<Mutex<Option<std_mpsc::Receiver<()>>>>,
}

impl CameraBackend for RecordingBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::TestPattern
    }

    fn is_available(&self) -> bool {
        true
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }

    fn open(
        &self,
        device: &CameraDevice,
        _preview: FrameSender,
    ) -> BackendResult<Box<dyn CameraStream>> {
        self.events.lock().unwrap().push(format!("open {}", device.path));

        let gate = self.open_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.send(()).unwrap();
            gate.release.recv_timeout(GATE_TIMEOUT).unwrap();
        }

        Ok(Box::new(RecordingStream {
            events: Arc::clone(&self.events),
            path: device.path.clone(),
            close_gate: Arc::clone(&self.close_gate),
        }))
    }
}

impl CameraStream for RecordingStream {
    fn capture_still(&self) -> BackendResult<CameraFrame> {
        Ok(CameraFrame::from_rgba(2, 2, vec![200; 16]))
    }

    fn close(&mut self) -> BackendResult<()> {
        let gate = self.close_gate.lock().unwrap().take();
        if let Some(release) = gate {
            release.recv_timeout(GATE_TIMEOUT).unwrap();
        }

        self.events.lock().unwrap().push(format!("close {}", self.path));
        Ok(())
    }
}

fn device(path: &str, facing: CameraFacing) -> CameraDevice {
    CameraDevice {
        name: path.to_string(),
        path: path.to_string(),
        facing,
    }
}

fn preview() -> FrameSender {
    let (sender, _receiver) = mpsc::channel(1);
    sender
}

fn provider_with(devices: Vec<CameraDevice>) -> (CameraProvider, RecordingBackend) {
    let backend = RecordingBackend::new(devices);
    (CameraProvider::new(Box::new(backend.clone())), backend)
}

#[test]
fn test_single_bind_has_one_live_endpoint() {
    let (provider, backend) = provider_with(vec![device("cam0", CameraFacing::Back)]);
    let scope = LifecycleScope::new();

    let endpoint = provider
        .bind(&scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .unwrap();

    assert!(endpoint.is_live());
    assert_eq!(backend.events(), ["open cam0"]);
    let session = provider.active_session().unwrap();
    assert_eq!(session.generation, endpoint.generation());
    assert_eq!(session.scope_id, scope.id());
}

#[test]
fn test_rebind_closes_previous_session_first() {
    let (provider, backend) = provider_with(vec![device("cam0", CameraFacing::Back)]);
    let scope = LifecycleScope::new();

    let first = provider
        .bind(&scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .unwrap();
    let second = provider
        .bind(&scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .unwrap();

    assert!(!first.is_live());
    assert!(second.is_live());
    assert_eq!(backend.events(), ["open cam0", "close cam0", "open cam0"]);
    assert_eq!(first.capture_still().unwrap_err(), BackendError::ScopeEnded);
    assert!(second.capture_still().is_ok());
}

#[test]
fn test_ending_scope_releases_session() {
    let (provider, backend) = provider_with(vec![device("cam0", CameraFacing::Back)]);
    let scope = LifecycleScope::new();
    let endpoint = provider
        .bind(&scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .unwrap();

    scope.end();

    assert!(!endpoint.is_live());
    assert!(provider.active_session().is_none());
    assert_eq!(backend.events(), ["open cam0", "close cam0"]);
}

#[test]
fn test_old_scope_end_keeps_newer_session() {
    let (provider, backend) = provider_with(vec![device("cam0", CameraFacing::Back)]);
    let old_scope = LifecycleScope::new();
    let new_scope = LifecycleScope::new();

    provider
        .bind(&old_scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .unwrap();
    let endpoint = provider
        .bind(&new_scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .unwrap();
    old_scope.end();

    assert!(endpoint.is_live());
    assert_eq!(backend.events(), ["open cam0", "close cam0", "open cam0"]);
}

#[test]
fn test_bind_on_ended_scope_fails() {
    let (provider, backend) = provider_with(vec![device("cam0", CameraFacing::Back)]);
    let scope = LifecycleScope::new();
    scope.end();

    let result = provider.bind(&scope, CameraSelector::DEFAULT_BACK_CAMERA, preview());
    assert_eq!(result.unwrap_err(), BackendError::ScopeEnded);
    assert!(backend.events().is_empty());
}

#[test]
fn test_bind_without_cameras_fails() {
    let (provider, _backend) = provider_with(Vec::new());
    let scope = LifecycleScope::new();

    let result = provider.bind(&scope, CameraSelector::DEFAULT_BACK_CAMERA, preview());
    assert!(matches!(result, Err(BackendError::DeviceNotFound(_))));
}

#[test]
fn test_back_selector_prefers_back_lens() {
    let (provider, _backend) = provider_with(vec![
        device("front", CameraFacing::Front),
        device("back", CameraFacing::Back),
    ]);
    let scope = LifecycleScope::new();

    let endpoint = provider
        .bind(&scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .unwrap();
    assert_eq!(endpoint.device().path, "back");
}

#[test]
fn test_back_selector_rejects_front_only_device() {
    let (provider, _backend) = provider_with(vec![device("front", CameraFacing::Front)]);
    let scope = LifecycleScope::new();

    let result = provider.bind(&scope, CameraSelector::DEFAULT_BACK_CAMERA, preview());
    assert_eq!(
        result.unwrap_err(),
        BackendError::NoMatchingCamera(CameraFacing::Back)
    );
}

#[tokio::test]
async fn test_binder_runs_bind_off_thread() {
    let (provider, backend) = provider_with(vec![device("usb", CameraFacing::Unknown)]);
    let scope = LifecycleScope::new();

    let endpoint = bind_with(&provider, &scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .await
        .unwrap();

    assert_eq!(endpoint.device().path, "usb");
    assert_eq!(backend.events(), ["open usb"]);
}

#[test]
fn test_scope_ending_during_open_keeps_newer_session() {
    let (entered_tx, entered_rx) = std_mpsc::channel();
    let (release_tx, release_rx) = std_mpsc::channel();
    let backend = RecordingBackend::new(vec![device("cam0", CameraFacing::Back)])
        .with_open_gate(entered_tx, release_rx);
    let provider = CameraProvider::new(Box::new(backend.clone()));
    let first = LifecycleScope::new();

    let pending = thread::spawn({
        let provider = provider.clone();
        let first = first.clone();
        move || provider.bind(&first, CameraSelector::DEFAULT_BACK_CAMERA, preview())
    });
    entered_rx.recv_timeout(GATE_TIMEOUT).unwrap();

    // The user leaves and comes back while the first open is still running
    first.end();
    let second = LifecycleScope::new();
    let endpoint = provider
        .bind(&second, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .unwrap();
    assert!(endpoint.is_live());

    release_tx.send(()).unwrap();
    let result = pending.join().unwrap();

    assert_eq!(result.unwrap_err(), BackendError::ScopeEnded);
    assert!(endpoint.is_live());
    assert!(endpoint.capture_still().is_ok());
    let session = provider.active_session().unwrap();
    assert_eq!(session.generation, endpoint.generation());
    assert_eq!(session.scope_id, second.id());
    assert_eq!(backend.events(), ["open cam0", "open cam0", "close cam0"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scope_end_does_not_wait_for_close() {
    let (release_tx, release_rx) = std_mpsc::channel();
    let backend =
        RecordingBackend::new(vec![device("cam0", CameraFacing::Back)]).with_close_gate(release_rx);
    let provider = CameraProvider::new(Box::new(backend.clone()));
    let scope = LifecycleScope::new();

    let endpoint = bind_with(&provider, &scope, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .await
        .unwrap();

    scope.end();

    // The session is gone at once even though the device is still closing
    assert!(!endpoint.is_live());
    assert!(provider.active_session().is_none());
    assert_eq!(backend.events(), ["open cam0"]);

    release_tx.send(()).unwrap();
    tokio::time::timeout(GATE_TIMEOUT, async {
        while backend.events().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(backend.events(), ["open cam0", "close cam0"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rebind_waits_for_background_close() {
    let (release_tx, release_rx) = std_mpsc::channel();
    let backend =
        RecordingBackend::new(vec![device("cam0", CameraFacing::Back)]).with_close_gate(release_rx);
    let provider = CameraProvider::new(Box::new(backend.clone()));
    let first = LifecycleScope::new();

    bind_with(&provider, &first, CameraSelector::DEFAULT_BACK_CAMERA, preview())
        .await
        .unwrap();
    first.end();

    let rebind = tokio::spawn({
        let provider = provider.clone();
        let second = LifecycleScope::new();
        async move {
            let endpoint =
                bind_with(&provider, &second, CameraSelector::DEFAULT_BACK_CAMERA, preview())
                    .await;
            (second, endpoint)
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.events(), ["open cam0"]);

    release_tx.send(()).unwrap();
    let (_second, endpoint) = rebind.await.unwrap();

    assert!(endpoint.unwrap().is_live());
    assert_eq!(backend.events(), ["open cam0", "close cam0", "open cam0"]);
}
