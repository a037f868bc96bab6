//! Lifecycle core for depth-capable cameras: device enumeration, capability
//! probing, independently switchable color/depth streams, runtime-mutable
//! hardware properties and per-tick frame harvesting.
//!
//! The vendor link layer sits behind the [`transport::Transport`] seam, so
//! the same state machine drives real hardware or the in-memory
//! [`transport::sim`] backend. An external caller owns the tick cadence:
//! every call to [`DepthCamera::tick`] consumes deferred operations (device
//! open, pipeline rebuild, property batch) in a fixed order and then drains
//! the output queues, keeping only the newest frame per stream.

pub mod camera;
pub mod pipeline;
pub mod transport;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use camera::catalog::{StreamConfig, StreamKind};
pub use camera::metadata::{Intrinsics, TickMetadata, TickOutput};
pub use camera::properties::{PropKey, Property, PropertyRange, StereoPreset};
pub use camera::{DepthCamera, PipelineState};
pub use transport::{Frame, FrameMetadata};

/// Restorable node configuration, produced and consumed at the host
/// boundary. The serial identifier is authoritative on restore; the index
/// is only a hint, since registry slots shift across enumeration refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub cam_idx: usize,
    pub serial: String,

    pub color_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_res_idx: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_fps_idx: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_fps: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub color_controls: BTreeMap<String, i32>,

    pub depth_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_res_idx: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_fps_idx: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_fps: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depth_controls: BTreeMap<String, i32>,
}
