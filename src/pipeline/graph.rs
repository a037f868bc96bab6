//! Processing-graph description and the live session wrapper.
//!
//! A [`PipelineGraph`] is a plain description of the node layout uploaded to
//! the device; the transport neither shares nor mutates it. Rebuilding a
//! pipeline replaces the whole [`PipelineSession`] atomically.

use crate::camera::catalog::{SensorResolution, StreamConfig};
use crate::camera::properties::StereoPreset;
use crate::transport::ControlCommand;

/// Name of the color sensor's control input queue.
pub const CONTROL_QUEUE: &str = "control";

/// Output queue depth; overflowing queues overwrite their oldest entry.
pub const OUTPUT_QUEUE_DEPTH: usize = 4;

/// Color camera node: one sensor, ISP output, optional cropped scaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorNode {
    pub resolution: SensorResolution,
    /// ISP output size after optional scaling
    pub isp_width: u32,
    pub isp_height: u32,
    pub isp_scale: Option<(u32, u32)>,
    pub fps: u32,
    pub stream_name: String,
}

/// Stereo block: left/right mono pair feeding a depth-matching node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StereoNode {
    pub resolution: SensorResolution,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub preset: StereoPreset,
    pub left_right_check: bool,
    /// Depth output registered to the color sensor's frame of reference
    pub align_to_color: bool,
    pub stream_name: String,
}

/// Complete node layout for one pipeline upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineGraph {
    pub color: Option<ColorNode>,
    pub stereo: Option<StereoNode>,
}

impl PipelineGraph {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.stereo.is_none()
    }

    pub fn with_color(mut self, config: &StreamConfig) -> Self {
        self.color = Some(ColorNode {
            resolution: config.resolution,
            isp_width: config.width,
            isp_height: config.height,
            isp_scale: config.isp_scale,
            fps: config.selected_fps(),
            stream_name: config.stream_name.clone(),
        });
        self
    }

    pub fn with_stereo(mut self, config: &StreamConfig, preset: StereoPreset) -> Self {
        let align_to_color = self.color.is_some();
        self.stereo = Some(StereoNode {
            resolution: config.resolution,
            width: config.width,
            height: config.height,
            fps: config.selected_fps(),
            preset,
            left_right_check: true,
            align_to_color,
            stream_name: config.stream_name.clone(),
        });
        self
    }
}

/// A built pipeline: the uploaded graph, its registered output queues and
/// the control channel when the color node is present. Owned exclusively by
/// the camera core and replaced wholesale on reconfigure.
#[derive(Debug, Default)]
pub struct PipelineSession {
    pub graph: PipelineGraph,
    pub queue_names: Vec<String>,
    pub control: Option<flume::Sender<ControlCommand>>,
}

impl PipelineSession {
    pub fn new(graph: PipelineGraph) -> Self {
        Self {
            graph,
            queue_names: Vec::new(),
            control: None,
        }
    }
}
