//! Device transport seam.
//!
//! The vendor link layer (device discovery, pipeline upload, stream queues)
//! sits behind the [`Transport`] / [`TransportDevice`] traits so the camera
//! core can run against real hardware or the in-memory [`sim`] backend.

pub mod frame;
pub mod sim;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::properties::StereoPreset;
use crate::pipeline::graph::PipelineGraph;

pub use frame::{Frame, FrameMetadata};

/// A physical sensor socket on the device board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorSocket {
    Rgb,
    Left,
    Right,
}

/// Link speed requested when opening a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkSpeed {
    #[default]
    Super,
    High,
}

/// One entry of an enumeration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub serial: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device `{0}` is not reachable")]
    Unreachable(String),
    #[error("device `{0}` is busy")]
    Busy(String),
    #[error("pipeline rejected: {0}")]
    Pipeline(String),
    #[error("no queue named `{0}`")]
    UnknownQueue(String),
}

/// Exposure part of a camera control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureCommand {
    Auto,
    Manual { exposure_us: i32, iso: i32 },
}

/// White balance part of a camera control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteBalanceCommand {
    Auto { mode: i32 },
    Manual { color_temp: i32 },
}

/// Focus part of a camera control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusCommand {
    Auto { mode: i32 },
    Manual { position: i32 },
}

/// A single message on the color sensor's control queue.
///
/// Only the populated fields are acted on by the device; a translated
/// property change carries the minimal set needed for that change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlCommand {
    pub brightness: Option<i32>,
    pub contrast: Option<i32>,
    pub saturation: Option<i32>,
    pub sharpness: Option<i32>,
    pub exposure: Option<ExposureCommand>,
    pub white_balance: Option<WhiteBalanceCommand>,
    pub focus: Option<FocusCommand>,
}

impl ControlCommand {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Discovery plus device open.
pub trait Transport {
    type Device: TransportDevice;

    /// Snapshot of currently connected devices. Empty when none are present.
    fn enumerate(&self) -> Vec<DeviceDescriptor>;

    /// Open a device from an enumeration snapshot.
    fn open(
        &self,
        descriptor: &DeviceDescriptor,
        link: LinkSpeed,
    ) -> Result<Self::Device, TransportError>;
}

/// An open device connection.
pub trait TransportDevice {
    /// Sensor sockets physically present on the board.
    fn sensors(&self) -> Vec<SensorSocket>;

    /// Board name from on-device calibration storage, if available.
    fn board_name(&self) -> Option<String>;

    /// 3x3 camera matrix for `socket`, scaled to `width` x `height`.
    fn intrinsics(&self, socket: SensorSocket, width: u32, height: u32)
        -> Option<[[f32; 3]; 3]>;

    /// Upload and start a processing graph. Replaces any running graph.
    fn start_pipeline(&mut self, graph: &PipelineGraph) -> Result<(), TransportError>;

    fn pipeline_running(&self) -> bool;

    /// Create a bounded output queue for a named stream.
    fn create_output_queue(
        &mut self,
        name: &str,
        capacity: usize,
        overwrite: bool,
    ) -> Result<(), TransportError>;

    /// Create the control input queue; returns the host-side sender.
    fn create_input_queue(
        &mut self,
        name: &str,
    ) -> Result<flume::Sender<ControlCommand>, TransportError>;

    /// Pull everything currently buffered on a named queue. Non-blocking;
    /// an unknown or empty queue yields an empty vec.
    fn drain_queue(&mut self, name: &str) -> Vec<Frame>;

    /// Retune the running stereo node without a pipeline rebuild.
    fn set_stereo_preset(&mut self, preset: StereoPreset) -> Result<(), TransportError>;
}
