// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Produces a moving colour gradient on a background thread. Useful without
//! camera hardware (CI, containers) and as a deterministic source in tests.

use super::types::*;
use super::{CameraBackend, CameraStream};
use crate::constants::{test_pattern, timing};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Backend serving synthetic test pattern devices
pub struct TestPatternBackend {
    devices: Vec<CameraDevice>,
}

impl TestPatternBackend {
    /// A single rear-facing test pattern device
    pub fn new() -> Self {
        Self::with_devices(vec![CameraDevice {
            name: "Test Pattern".to_string(),
            path: "test-pattern:0".to_string(),
            facing: CameraFacing::Back,
        }])
    }

    pub fn with_devices(devices: Vec<CameraDevice>) -> Self {
        Self { devices }
    }
}

impl Default for TestPatternBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for TestPatternBackend {
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
        preview: FrameSender,
    ) -> BackendResult<Box<dyn CameraStream>> {
        if !self.devices.iter().any(|d| d.path == device.path) {
            return Err(BackendError::DeviceNotFound(device.path.clone()));
        }

        info!(device = %device.name, "Starting test pattern stream");
        Ok(Box::new(TestPatternStream::start(preview)?))
    }
}

/// Running test pattern stream
pub struct TestPatternStream {
    running: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    worker: Option<JoinHandle<()>>,
}

impl TestPatternStream {
    fn start(mut preview: FrameSender) -> BackendResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let latest = Arc::new(Mutex::new(None));

        let worker_running = running.clone();
        let worker_latest = latest.clone();
        let worker = std::thread::Builder::new()
            .name("test-pattern".to_string())
            .spawn(move || {
                let mut tick: u32 = 0;
                while worker_running.load(Ordering::SeqCst) {
                    let frame = render_pattern(test_pattern::WIDTH, test_pattern::HEIGHT, tick);
                    if let Ok(mut slot) = worker_latest.lock() {
                        *slot = Some(frame.clone());
                    }
                    // Preview consumers may lag or be gone; dropping is fine
                    let _ = preview.try_send(frame);

                    tick = tick.wrapping_add(1);
                    std::thread::sleep(timing::TEST_PATTERN_FRAME_INTERVAL);
                }
                debug!(frames = tick, "Test pattern stream stopped");
            })
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        Ok(Self {
            running,
            latest,
            worker: Some(worker),
        })
    }
}

impl CameraStream for TestPatternStream {
    fn capture_still(&self) -> BackendResult<CameraFrame> {
        self.latest
            .lock()
            .map_err(|_| BackendError::Other("Frame slot poisoned".to_string()))?
            .clone()
            .ok_or(BackendError::NoFrame)
    }

    fn close(&mut self) -> BackendResult<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| BackendError::Other("Test pattern thread panicked".to_string()))?;
        }
        Ok(())
    }
}

impl Drop for TestPatternStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to stop test pattern on drop");
        }
    }
}

/// Diagonal gradient that scrolls with `tick`
fn render_pattern(width: u32, height: u32, tick: u32) -> CameraFrame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = ((x + tick * 4) % 256) as u8;
            let g = ((y + tick * 2) % 256) as u8;
            let b = (((x + y) / 2 + tick) % 256) as u8;
            data.extend_from_slice(&[r, g, b, 255]);
        }
    }
    CameraFrame::from_rgba(width, height, data)
}
