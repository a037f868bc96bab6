//! Fixed stream-configuration catalogs populated at device-probe time.

use serde::{Deserialize, Serialize};

/// The two sensing pipelines this core manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Color,
    Depth,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Color => "color",
            StreamKind::Depth => "depth",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor resolution preset selected on the camera node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorResolution {
    // color sensor
    Color4K,
    Color1080P,
    // mono pair
    Mono800P,
    Mono720P,
    Mono480P,
    Mono400P,
}

/// One catalog entry. A clone of an entry becomes the active config for its
/// stream kind when the stream is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Display label, e.g. "1920 x 1080"
    pub label: String,
    /// Output queue name on the device
    pub stream_name: String,
    pub kind: StreamKind,
    pub resolution: SensorResolution,
    /// Output size; for ISP-scaled color tiers this is the scaled size
    pub width: u32,
    pub height: u32,
    /// Cropped ISP scaling ratio (numerator, denominator)
    pub isp_scale: Option<(u32, u32)>,
    /// Supported frame rates, descending
    pub fps_list: Vec<u32>,
    /// Index into `fps_list`
    pub fps_idx: usize,
}

impl StreamConfig {
    /// Selected frame rate; falls back to the first listed rate when the
    /// index is stale.
    pub fn selected_fps(&self) -> u32 {
        self.fps_list
            .get(self.fps_idx)
            .or_else(|| self.fps_list.first())
            .copied()
            .unwrap_or(30)
    }
}

fn depth_tier(label: &str, resolution: SensorResolution, width: u32, height: u32) -> StreamConfig {
    StreamConfig {
        label: label.to_string(),
        stream_name: "Depth".to_string(),
        kind: StreamKind::Depth,
        resolution,
        width,
        height,
        isp_scale: None,
        fps_list: vec![120, 60, 30, 15],
        fps_idx: 0,
    }
}

fn color_tier(
    label: &str,
    resolution: SensorResolution,
    width: u32,
    height: u32,
    isp_scale: Option<(u32, u32)>,
) -> StreamConfig {
    StreamConfig {
        label: label.to_string(),
        stream_name: "RGB".to_string(),
        kind: StreamKind::Color,
        resolution,
        width,
        height,
        isp_scale,
        fps_list: vec![60, 30, 15],
        fps_idx: 0,
    }
}

/// Mono-pair tiers offered by every depth-capable device.
pub fn depth_stream_configs() -> Vec<StreamConfig> {
    vec![
        depth_tier("1280 x 800", SensorResolution::Mono800P, 1280, 800),
        depth_tier("1280 x 720", SensorResolution::Mono720P, 1280, 720),
        depth_tier("640 x 480", SensorResolution::Mono480P, 640, 480),
        depth_tier("640 x 400", SensorResolution::Mono400P, 640, 400),
    ]
}

/// Color tiers; the sub-1080p entries crop-scale the 1080p sensor readout.
pub fn color_stream_configs() -> Vec<StreamConfig> {
    vec![
        color_tier("3840 x 2160", SensorResolution::Color4K, 3840, 2160, None),
        color_tier("1920 x 1080", SensorResolution::Color1080P, 1920, 1080, None),
        color_tier(
            "1280 x 720",
            SensorResolution::Color1080P,
            1280,
            720,
            Some((2, 3)),
        ),
        color_tier(
            "960 x 540",
            SensorResolution::Color1080P,
            960,
            540,
            Some((1, 2)),
        ),
        color_tier(
            "640 x 360",
            SensorResolution::Color1080P,
            640,
            360,
            Some((1, 3)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_have_fixed_tiers() {
        assert_eq!(depth_stream_configs().len(), 4);
        assert_eq!(color_stream_configs().len(), 5);
    }

    #[test]
    fn stale_fps_index_falls_back() {
        let mut cfg = depth_stream_configs().remove(0);
        cfg.fps_idx = 99;
        assert_eq!(cfg.selected_fps(), 120);
    }
}
