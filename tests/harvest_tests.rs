//! Frame harvesting and metadata assembly tests.

use depthcam::transport::sim::{SimDeviceHandle, SimTransport};
use depthcam::transport::SensorSocket;
use depthcam::{DepthCamera, StreamKind};

const SERIAL: &str = "14442C10D13EABCE00";

fn streaming_camera(labels: &[(StreamKind, &str)]) -> (DepthCamera<SimTransport>, SimDeviceHandle) {
    let mut transport = SimTransport::new();
    let handle = transport.add_device(
        SERIAL,
        "OAK-D Pro",
        &[SensorSocket::Rgb, SensorSocket::Left, SensorSocket::Right],
    );
    let camera = DepthCamera::new(transport);
    camera.init_device(1, true);
    for (kind, label) in labels {
        let cfg = camera
            .stream_configs(*kind)
            .into_iter()
            .find(|cfg| cfg.label == *label)
            .expect("catalog entry");
        assert!(camera.enable_stream(&cfg, true));
    }
    (camera, handle)
}

#[test]
fn underrun_yields_no_output() {
    let (camera, _handle) = streaming_camera(&[(StreamKind::Color, "1920 x 1080")]);

    let output = camera.tick();
    assert!(output.color.is_none());
    assert!(output.depth.is_none());
    assert!(output.metadata.is_none());

    // intrinsics are still computed for the streaming kind
    assert!(camera.intrinsics(StreamKind::Color).is_some());
}

#[test]
fn newest_frame_wins_and_backlog_is_discarded() {
    let (camera, handle) = streaming_camera(&[(StreamKind::Color, "1920 x 1080")]);

    // six injected frames against a depth-4 queue: the oldest two are gone
    for seq in 1..=6 {
        assert!(handle.push_frame(StreamKind::Color, seq));
    }
    assert_eq!(handle.queued("RGB"), 4);

    let output = camera.tick();
    let frame = output.color.expect("newest frame");
    assert_eq!(frame.meta.sequence, 6);
    assert_eq!((frame.meta.width, frame.meta.height), (1920, 1080));
    assert_eq!(handle.queued("RGB"), 0);
}

#[test]
fn stale_frames_are_not_reemitted() {
    let (camera, handle) = streaming_camera(&[(StreamKind::Color, "1920 x 1080")]);

    assert!(handle.push_frame(StreamKind::Color, 1));
    assert!(camera.tick().color.is_some());

    // no new data this tick: the caller sees "no new frame", not a repeat
    let output = camera.tick();
    assert!(output.color.is_none());
    assert!(output.metadata.is_none());
}

#[test]
fn metadata_covers_only_streams_with_frames() {
    let (camera, handle) = streaming_camera(&[
        (StreamKind::Color, "1920 x 1080"),
        (StreamKind::Depth, "1280 x 800"),
    ]);

    assert!(handle.push_frame(StreamKind::Depth, 1));
    let output = camera.tick();

    assert!(output.color.is_none());
    assert!(output.depth.is_some());
    let meta = output.metadata.expect("metadata");
    assert!(meta.color.is_none());
    let depth = meta.depth.expect("depth section");
    assert_eq!(depth.frame_num, 1);
    assert_eq!(depth.fps, 120);

    // depth output is aligned to the color frame of reference
    let reference = meta.depth_reference.expect("reference size");
    assert_eq!((reference.w, reference.h), (1920, 1080));
    let intr = depth.intrinsics.expect("depth intrinsics");
    assert_eq!((intr.width, intr.height), (1920, 1080));
    assert!((intr.ppx - 960.0).abs() < f32::EPSILON);
    assert!((intr.fx - 0.73 * 1920.0).abs() < 0.5);
}

#[test]
fn both_streams_harvest_in_one_tick() {
    let (camera, handle) = streaming_camera(&[
        (StreamKind::Color, "1280 x 720"),
        (StreamKind::Depth, "640 x 480"),
    ]);

    assert!(handle.push_frame(StreamKind::Color, 3));
    assert!(handle.push_frame(StreamKind::Depth, 7));
    let output = camera.tick();

    assert_eq!(output.color.expect("color").meta.sequence, 3);
    assert_eq!(output.depth.expect("depth").meta.sequence, 7);
    let meta = output.metadata.expect("metadata");
    assert_eq!(meta.reference.expect("color reference").w, 1280);
    assert_eq!(meta.color.expect("color section").fps, 60);
    assert_eq!(meta.depth.expect("depth section").fps, 120);
}

#[test]
fn depth_alone_uses_the_mono_sensor_size() {
    let (camera, handle) = streaming_camera(&[(StreamKind::Depth, "640 x 400")]);

    assert!(handle.push_frame(StreamKind::Depth, 1));
    let output = camera.tick();

    let meta = output.metadata.expect("metadata");
    let reference = meta.depth_reference.expect("reference size");
    assert_eq!((reference.w, reference.h), (640, 400));
    let intr = meta.depth.expect("depth section").intrinsics.expect("intrinsics");
    assert_eq!((intr.width, intr.height), (640, 400));
}

#[test]
fn metadata_serializes_with_its_tag() {
    let (camera, handle) = streaming_camera(&[(StreamKind::Color, "960 x 540")]);

    assert!(handle.push_frame(StreamKind::Color, 42));
    let meta = camera.tick().metadata.expect("metadata");
    let json = serde_json::to_string(&meta).expect("serializable");

    assert!(json.contains("\"data_type\":\"metadata\""));
    assert!(json.contains("\"frame_num\":42"));
    // omitted sections stay out of the record entirely
    assert!(!json.contains("\"depth\""));
}

#[test]
fn frames_with_a_selected_lower_rate_report_it() {
    let mut transport = SimTransport::new();
    let handle = transport.add_device(SERIAL, "OAK-D", &[SensorSocket::Rgb]);
    let camera = DepthCamera::new(transport);
    camera.init_device(1, true);

    let mut cfg = camera
        .stream_configs(StreamKind::Color)
        .into_iter()
        .find(|cfg| cfg.label == "1920 x 1080")
        .expect("catalog entry");
    cfg.fps_idx = 1; // 30 fps
    assert!(camera.enable_stream(&cfg, true));

    assert!(handle.push_frame(StreamKind::Color, 1));
    let meta = camera.tick().metadata.expect("metadata");
    assert_eq!(meta.color.expect("color section").fps, 30);
}
