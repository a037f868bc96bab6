//! Per-tick outputs: the frame bundle and its metadata record.

use serde::Serialize;

use crate::transport::Frame;

/// Cached calibration for one stream kind at a concrete output resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    /// 3x3 camera matrix
    pub matrix: [[f32; 3]; 3],
}

impl Intrinsics {
    pub fn fx(&self) -> f32 {
        self.matrix[0][0]
    }

    pub fn fy(&self) -> f32 {
        self.matrix[1][1]
    }

    pub fn ppx(&self) -> f32 {
        self.matrix[0][2]
    }

    pub fn ppy(&self) -> f32 {
        self.matrix[1][2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSize {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntrinsicsMeta {
    pub width: u32,
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub ppx: f32,
    pub ppy: f32,
}

impl From<Intrinsics> for IntrinsicsMeta {
    fn from(i: Intrinsics) -> Self {
        Self {
            width: i.width,
            height: i.height,
            fx: i.fx(),
            fy: i.fy(),
            ppx: i.ppx(),
            ppy: i.ppy(),
        }
    }
}

/// Metadata for one stream that produced a frame this tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamMeta {
    pub fps: u32,
    pub frame_num: i64,
    pub timestamp_ns: i64,
    pub intrinsics: Option<IntrinsicsMeta>,
}

/// Metadata record assembled by the harvester. Only emitted when at least
/// one stream produced a frame; per-stream sections are omitted for kinds
/// with no frame available this tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickMetadata {
    pub data_type: &'static str,
    /// Color frame reference dimensions (ISP output size)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<FrameSize>,
    /// Depth frame reference dimensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_reference: Option<FrameSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<StreamMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<StreamMeta>,
}

impl TickMetadata {
    pub fn new() -> Self {
        Self {
            data_type: "metadata",
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.depth.is_none()
    }
}

/// Everything one processing tick produced. Frames from ticks with no new
/// data are not re-emitted; the caller sees `None` rather than a stale
/// repeat.
#[derive(Debug, Clone, Default)]
pub struct TickOutput {
    pub color: Option<Frame>,
    pub depth: Option<Frame>,
    pub metadata: Option<TickMetadata>,
}

impl TickOutput {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.depth.is_none() && self.metadata.is_none()
    }
}
