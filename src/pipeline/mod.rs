pub mod graph;
pub mod queue;

pub use graph::{PipelineGraph, PipelineSession, CONTROL_QUEUE, OUTPUT_QUEUE_DEPTH};
pub use queue::FrameQueue;
