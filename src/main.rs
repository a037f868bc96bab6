//! Demo driver: a simulated depth camera run through the full lifecycle.

use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use tracing::{debug, info};

use depthcam::transport::sim::SimTransport;
use depthcam::transport::SensorSocket;
use depthcam::{DepthCamera, StreamKind};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter("depthcam=debug")
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("depthcam launching...");

    // One simulated device with a full sensor complement
    let mut transport = SimTransport::new();
    let handle = transport.add_device(
        "14442C10D13EABCE00",
        "OAK-D",
        &[SensorSocket::Rgb, SensorSocket::Left, SensorSocket::Right],
    );
    handle.set_auto_frames(true);

    let camera = DepthCamera::new(transport);
    info!(devices = camera.device_count(), "enumeration complete");

    camera.init_device(1, true);
    if !camera.is_initialized() {
        return Err(eyre!("simulated device failed to open"));
    }
    info!(
        name = %camera.device_name(),
        color = camera.has_color(),
        depth = camera.has_depth(),
        "device ready"
    );

    // Enable both streams; the pipeline is built on the first tick
    let color_cfg = camera
        .stream_configs(StreamKind::Color)
        .into_iter()
        .find(|cfg| cfg.label == "1920 x 1080")
        .ok_or_else(|| eyre!("missing color tier"))?;
    let depth_cfg = camera
        .stream_configs(StreamKind::Depth)
        .into_iter()
        .find(|cfg| cfg.label == "1280 x 800")
        .ok_or_else(|| eyre!("missing depth tier"))?;
    camera.enable_stream(&color_cfg, false);
    camera.enable_stream(&depth_cfg, false);

    let mut ticks = tokio::time::interval(Duration::from_millis(33));
    let mut frames: u64 = 0;

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let output = camera.tick();
                if output.color.is_some() || output.depth.is_some() {
                    frames += 1;
                }
                if let Some(metadata) = &output.metadata {
                    if frames % 30 == 1 {
                        debug!(metadata = %serde_json::to_string(metadata)?, "tick");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(frames, "shutting down");
                break;
            }
        }
    }

    Ok(())
}
