//! In-memory transport backend.
//!
//! Stands in for the vendor link layer during development and in tests: a
//! scriptable device list, a recorded control-command log, frame injection
//! and synthetic calibration. [`SimDeviceHandle`] shares state with the
//! opened [`SimDevice`], so a test can observe the device after the camera
//! core has taken ownership of the connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::camera::catalog::StreamKind;
use crate::camera::properties::StereoPreset;
use crate::pipeline::{FrameQueue, PipelineGraph};
use crate::transport::{
    ControlCommand, DeviceDescriptor, Frame, FrameMetadata, LinkSpeed, SensorSocket, Transport,
    TransportDevice, TransportError,
};

/// Horizontal field of view baked into the synthetic calibration.
const FOCAL_SCALE: f32 = 0.73;

#[derive(Debug)]
struct SimDeviceState {
    descriptor: DeviceDescriptor,
    board_name: Option<String>,
    sensors: Vec<SensorSocket>,
    online: bool,
    open_count: usize,
    running: bool,
    graph: Option<PipelineGraph>,
    queues: HashMap<String, FrameQueue>,
    control_rx: Option<flume::Receiver<ControlCommand>>,
    controls: Vec<ControlCommand>,
    stereo_preset: Option<StereoPreset>,
    auto_frames: bool,
    auto_sequence: i64,
}

impl SimDeviceState {
    fn pull_controls(&mut self) {
        if let Some(rx) = &self.control_rx {
            while let Ok(cmd) = rx.try_recv() {
                self.controls.push(cmd);
            }
        }
    }
}

/// Shared view of one simulated device, alive across opens.
#[derive(Clone)]
pub struct SimDeviceHandle {
    state: Arc<Mutex<SimDeviceState>>,
}

impl SimDeviceHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, SimDeviceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark the device reachable/unreachable for subsequent opens.
    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
    }

    /// Synthesize one frame per queue drain while the pipeline runs.
    pub fn set_auto_frames(&self, enabled: bool) {
        self.lock().auto_frames = enabled;
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    pub fn pipeline_running(&self) -> bool {
        self.lock().running
    }

    pub fn graph(&self) -> Option<PipelineGraph> {
        self.lock().graph.clone()
    }

    pub fn stereo_preset(&self) -> Option<StereoPreset> {
        self.lock().stereo_preset
    }

    /// Commands received on the control queue so far, in send order.
    pub fn sent_controls(&self) -> Vec<ControlCommand> {
        let mut state = self.lock();
        state.pull_controls();
        state.controls.clone()
    }

    pub fn clear_controls(&self) {
        let mut state = self.lock();
        state.pull_controls();
        state.controls.clear();
    }

    /// Buffered frame count on a named queue.
    pub fn queued(&self, name: &str) -> usize {
        self.lock().queues.get(name).map(|q| q.len()).unwrap_or(0)
    }

    /// Inject a frame for `kind` into its output queue. The frame is sized
    /// from the running graph; returns false when no matching node/queue is
    /// registered.
    pub fn push_frame(&self, kind: StreamKind, sequence: i64) -> bool {
        let mut state = self.lock();
        let Some(graph) = state.graph.clone() else {
            return false;
        };
        let Some((name, width, height, fps)) = node_shape(&graph, kind) else {
            return false;
        };
        let frame = synth_frame(kind, sequence, width, height, fps);
        match state.queues.get_mut(&name) {
            Some(queue) => {
                queue.push(frame);
                true
            }
            None => false,
        }
    }
}

fn node_shape(graph: &PipelineGraph, kind: StreamKind) -> Option<(String, u32, u32, u32)> {
    match kind {
        StreamKind::Color => graph
            .color
            .as_ref()
            .map(|c| (c.stream_name.clone(), c.isp_width, c.isp_height, c.fps)),
        StreamKind::Depth => graph
            .stereo
            .as_ref()
            .map(|s| (s.stream_name.clone(), s.width, s.height, s.fps)),
    }
}

fn synth_frame(kind: StreamKind, sequence: i64, width: u32, height: u32, fps: u32) -> Frame {
    // Payload is a stub; frame geometry travels in the metadata.
    let timestamp_ns = sequence.saturating_mul(1_000_000_000 / fps.max(1) as i64);
    Frame::new(
        Bytes::from(vec![0u8; 64]),
        FrameMetadata {
            kind,
            sequence,
            width,
            height,
            timestamp_ns,
        },
    )
}

/// Simulated discovery + open.
#[derive(Default)]
pub struct SimTransport {
    devices: Vec<SimDeviceHandle>,
}

impl SimTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a simulated device and return its shared handle.
    pub fn add_device(
        &mut self,
        serial: &str,
        board_name: &str,
        sensors: &[SensorSocket],
    ) -> SimDeviceHandle {
        let handle = SimDeviceHandle {
            state: Arc::new(Mutex::new(SimDeviceState {
                descriptor: DeviceDescriptor {
                    serial: serial.to_string(),
                    name: board_name.to_string(),
                },
                board_name: Some(board_name.to_string()),
                sensors: sensors.to_vec(),
                online: true,
                open_count: 0,
                running: false,
                graph: None,
                queues: HashMap::new(),
                control_rx: None,
                controls: Vec::new(),
                stereo_preset: None,
                auto_frames: false,
                auto_sequence: 0,
            })),
        };
        self.devices.push(handle.clone());
        handle
    }
}

impl Transport for SimTransport {
    type Device = SimDevice;

    fn enumerate(&self) -> Vec<DeviceDescriptor> {
        self.devices
            .iter()
            .map(|h| h.lock().descriptor.clone())
            .collect()
    }

    fn open(
        &self,
        descriptor: &DeviceDescriptor,
        _link: LinkSpeed,
    ) -> Result<Self::Device, TransportError> {
        let handle = self
            .devices
            .iter()
            .find(|h| h.lock().descriptor.serial == descriptor.serial)
            .ok_or_else(|| TransportError::Unreachable(descriptor.serial.clone()))?;

        let mut state = handle.lock();
        if !state.online {
            return Err(TransportError::Unreachable(descriptor.serial.clone()));
        }

        // Fresh connection: any previous pipeline is gone.
        state.open_count += 1;
        state.running = false;
        state.graph = None;
        state.queues.clear();
        state.control_rx = None;

        Ok(SimDevice {
            state: Arc::clone(&handle.state),
        })
    }
}

/// An open simulated connection.
pub struct SimDevice {
    state: Arc<Mutex<SimDeviceState>>,
}

impl SimDevice {
    fn lock(&self) -> std::sync::MutexGuard<'_, SimDeviceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TransportDevice for SimDevice {
    fn sensors(&self) -> Vec<SensorSocket> {
        self.lock().sensors.clone()
    }

    fn board_name(&self) -> Option<String> {
        self.lock().board_name.clone()
    }

    fn intrinsics(
        &self,
        socket: SensorSocket,
        width: u32,
        height: u32,
    ) -> Option<[[f32; 3]; 3]> {
        let state = self.lock();
        if !state.sensors.contains(&socket) {
            return None;
        }
        let fx = FOCAL_SCALE * width as f32;
        let (ppx, ppy) = (width as f32 / 2.0, height as f32 / 2.0);
        Some([[fx, 0.0, ppx], [0.0, fx, ppy], [0.0, 0.0, 1.0]])
    }

    fn start_pipeline(&mut self, graph: &PipelineGraph) -> Result<(), TransportError> {
        let mut state = self.lock();
        if graph.is_empty() {
            return Err(TransportError::Pipeline("empty graph".to_string()));
        }
        state.graph = Some(graph.clone());
        state.stereo_preset = graph.stereo.as_ref().map(|s| s.preset);
        state.queues.clear();
        state.running = true;
        Ok(())
    }

    fn pipeline_running(&self) -> bool {
        self.lock().running
    }

    fn create_output_queue(
        &mut self,
        name: &str,
        capacity: usize,
        _overwrite: bool,
    ) -> Result<(), TransportError> {
        self.lock()
            .queues
            .insert(name.to_string(), FrameQueue::new(capacity));
        Ok(())
    }

    fn create_input_queue(
        &mut self,
        _name: &str,
    ) -> Result<flume::Sender<ControlCommand>, TransportError> {
        let (tx, rx) = flume::unbounded();
        self.lock().control_rx = Some(rx);
        Ok(tx)
    }

    fn drain_queue(&mut self, name: &str) -> Vec<Frame> {
        let mut state = self.lock();
        if state.auto_frames && state.running {
            if let Some(graph) = state.graph.clone() {
                state.auto_sequence += 1;
                let sequence = state.auto_sequence;
                for kind in [StreamKind::Color, StreamKind::Depth] {
                    if let Some((queue_name, width, height, fps)) = node_shape(&graph, kind) {
                        if queue_name == name {
                            if let Some(queue) = state.queues.get_mut(&queue_name) {
                                queue.push(synth_frame(kind, sequence, width, height, fps));
                            }
                        }
                    }
                }
            }
        }
        state
            .queues
            .get_mut(name)
            .map(|q| q.drain())
            .unwrap_or_default()
    }

    fn set_stereo_preset(&mut self, preset: StereoPreset) -> Result<(), TransportError> {
        let mut state = self.lock();
        match state.graph.as_mut().and_then(|g| g.stereo.as_mut()) {
            Some(stereo) => {
                stereo.preset = preset;
                state.stereo_preset = Some(preset);
                Ok(())
            }
            None => Err(TransportError::Pipeline(
                "no stereo node in the running graph".to_string(),
            )),
        }
    }
}
