use std::sync::Arc;

use bytes::Bytes;

use crate::camera::catalog::StreamKind;

/// Frame data with zero-copy semantics
#[derive(Debug, Clone)]
pub struct Frame {
    /// Immutable frame data - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,
}

/// Frame metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMetadata {
    pub kind: StreamKind,
    pub sequence: i64,
    pub width: u32,
    pub height: u32,
    /// Device timestamp, nanoseconds since stream start
    pub timestamp_ns: i64,
}

impl Frame {
    pub fn new(data: Bytes, meta: FrameMetadata) -> Self {
        Self {
            data,
            meta: Arc::new(meta),
        }
    }
}
