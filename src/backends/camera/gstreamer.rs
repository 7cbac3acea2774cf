// SPDX-License-Identifier: MPL-2.0

//! GStreamer camera backend
//!
//! Cameras are discovered with a `DeviceMonitor` on the `Video/Source`
//! class, which covers PipeWire, V4L2 and libcamera providers. Each bound
//! session runs `source ! videoconvert ! appsink(RGBA)`; the appsink callback
//! feeds the preview channel and keeps the latest frame for stills.

use super::types::*;
use super::{CameraBackend, CameraStream};
use crate::constants::{pipeline, timing};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Device properties that carry a stable identifier, in preference order
const PATH_PROPERTIES: &[&str] = &["object.path", "api.v4l2.path", "device.path", "object.id"];

/// Device properties that carry the lens location
const LOCATION_PROPERTIES: &[&str] = &["api.libcamera.location", "camera.location"];

/// GStreamer backend
pub struct GStreamerBackend;

impl GStreamerBackend {
    pub fn new() -> Self {
        Self
    }

    /// Probe the device monitor for video sources
    fn probe_devices() -> Vec<gstreamer::Device> {
        if let Err(e) = gstreamer::init() {
            warn!(error = %e, "GStreamer init failed");
            return Vec::new();
        }

        let monitor = gstreamer::DeviceMonitor::new();
        monitor.add_filter(Some(pipeline::VIDEO_SOURCE_CLASS), None);

        if let Err(e) = monitor.start() {
            warn!(error = %e, "Failed to start device monitor");
            return Vec::new();
        }
        let devices: Vec<gstreamer::Device> = monitor.devices().into_iter().collect();
        monitor.stop();

        debug!(count = devices.len(), "Probed video sources");
        devices
    }

    fn describe(index: usize, device: &gstreamer::Device) -> CameraDevice {
        let properties = device.properties();
        let lookup = |keys: &[&str]| -> Option<String> {
            let props = properties.as_ref()?;
            keys.iter().find_map(|key| {
                props
                    .get::<String>(*key)
                    .ok()
                    .or_else(|| props.get::<i32>(*key).ok().map(|v| v.to_string()))
            })
        };

        let facing = lookup(LOCATION_PROPERTIES)
            .map(|loc| CameraFacing::from_location(&loc))
            .unwrap_or(CameraFacing::Unknown);
        let path = lookup(PATH_PROPERTIES).unwrap_or_else(|| format!("gst-device:{}", index));

        CameraDevice {
            name: device.display_name().to_string(),
            path,
            facing,
        }
    }
}

impl Default for GStreamerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for GStreamerBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::GStreamer
    }

    fn is_available(&self) -> bool {
        gstreamer::init().is_ok() && gstreamer::ElementFactory::find("videoconvert").is_some()
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let cameras: Vec<CameraDevice> = Self::probe_devices()
            .iter()
            .enumerate()
            .map(|(index, device)| Self::describe(index, device))
            .collect();

        for camera in &cameras {
            debug!(name = %camera.name, path = %camera.path, facing = %camera.facing, "Found camera");
        }
        cameras
    }

    fn open(
        &self,
        device: &CameraDevice,
        preview: FrameSender,
    ) -> BackendResult<Box<dyn CameraStream>> {
        // Devices are matched again by identity; the monitor hands out fresh objects
        let source_device = Self::probe_devices()
            .into_iter()
            .enumerate()
            .find(|(index, candidate)| Self::describe(*index, candidate) == *device)
            .map(|(_, candidate)| candidate)
            .ok_or_else(|| BackendError::DeviceNotFound(device.name.clone()))?;

        let stream = GStreamerStream::start(&source_device, preview)?;
        info!(device = %device.name, "GStreamer camera stream started");
        Ok(Box::new(stream))
    }
}

/// Running GStreamer capture pipeline
pub struct GStreamerStream {
    pipeline: gstreamer::Pipeline,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    closed: bool,
}

impl GStreamerStream {
    fn start(device: &gstreamer::Device, preview: FrameSender) -> BackendResult<Self> {
        let init_err = |e: &dyn std::fmt::Display| BackendError::InitializationFailed(e.to_string());

        let source = device.create_element(None).map_err(|e| init_err(&e))?;
        let convert = gstreamer::ElementFactory::make("videoconvert")
            .build()
            .map_err(|e| init_err(&e))?;
        let caps = gstreamer_video::VideoCapsBuilder::new()
            .format(gstreamer_video::VideoFormat::Rgba)
            .build();
        let appsink = AppSink::builder()
            .name("sink")
            .caps(&caps)
            .max_buffers(pipeline::MAX_BUFFERS)
            .drop(true)
            .sync(false)
            .build();

        let pipeline = gstreamer::Pipeline::new();
        let elements = [&source, &convert, appsink.upcast_ref::<gstreamer::Element>()];
        pipeline.add_many(elements).map_err(|e| init_err(&e))?;
        gstreamer::Element::link_many(elements).map_err(|e| init_err(&e))?;

        let latest: Arc<Mutex<Option<CameraFrame>>> = Arc::new(Mutex::new(None));
        let sink_latest = latest.clone();
        let frame_counter = Arc::new(AtomicU64::new(0));

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);
                    let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info = VideoInfo::from_caps(caps).map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to get video info");
                        gstreamer::FlowError::Error
                    })?;
                    let map = buffer.map_readable().map_err(|_| gstreamer::FlowError::Error)?;

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(map.as_slice()),
                        format: PixelFormat::RGBA,
                        stride: video_info.stride()[0] as u32,
                        captured_at: Instant::now(),
                    };

                    if let Ok(mut slot) = sink_latest.lock() {
                        *slot = Some(frame.clone());
                    }

                    let mut sender = preview.clone();
                    if let Err(e) = sender.try_send(frame)
                        && e.is_disconnected()
                        && frame_num % 30 == 0
                    {
                        debug!(frame = frame_num, "Preview receiver dropped");
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| init_err(&e))?;

        Ok(Self {
            pipeline,
            latest,
            closed: false,
        })
    }
}

impl CameraStream for GStreamerStream {
    fn capture_still(&self) -> BackendResult<CameraFrame> {
        self.latest
            .lock()
            .map_err(|_| BackendError::Other("Frame slot poisoned".to_string()))?
            .clone()
            .ok_or(BackendError::NoFrame)
    }

    fn close(&mut self) -> BackendResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(e.to_string()))?;

        // Wait for the state change so the device is free for the next bind
        let (result, _, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        if result.is_err() {
            warn!("Pipeline did not reach NULL state in time");
        }
        Ok(())
    }
}

impl Drop for GStreamerStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to stop GStreamer pipeline on drop");
        }
    }
}
