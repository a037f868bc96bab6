//! Device lifecycle and stream state machine tests.

use depthcam::transport::sim::{SimDeviceHandle, SimTransport};
use depthcam::transport::SensorSocket;
use depthcam::{DepthCamera, StreamConfig, StreamKind};

const SERIAL: &str = "14442C10D13EABCE00";

fn full_device() -> (DepthCamera<SimTransport>, SimDeviceHandle) {
    let mut transport = SimTransport::new();
    let handle = transport.add_device(
        SERIAL,
        "OAK-D Pro",
        &[SensorSocket::Rgb, SensorSocket::Left, SensorSocket::Right],
    );
    (DepthCamera::new(transport), handle)
}

fn config(camera: &DepthCamera<SimTransport>, kind: StreamKind, label: &str) -> StreamConfig {
    camera
        .stream_configs(kind)
        .into_iter()
        .find(|cfg| cfg.label == label)
        .expect("catalog entry")
}

#[test]
fn enumeration_is_stable_across_refreshes() {
    let (camera, _handle) = full_device();

    let first = camera.device_labels();
    camera.refresh_devices();
    let second = camera.device_labels();

    assert_eq!(first, second);
    assert_eq!(first[0], "None");
    assert_eq!(camera.device_count(), 1);
    assert_eq!(camera.serial_at(1).as_deref(), Some(SERIAL));
    assert_eq!(camera.serial_at(0), None);
    assert_eq!(camera.serial_at(99), None);
}

#[test]
fn empty_enumeration_is_not_an_error() {
    let camera: DepthCamera<SimTransport> = DepthCamera::new(SimTransport::new());
    assert_eq!(camera.device_count(), 0);
    assert_eq!(camera.device_labels(), vec!["None".to_string()]);

    // selecting a nonexistent slot degrades to "no device"
    camera.init_device(1, true);
    assert!(!camera.is_initialized());
}

#[test]
fn open_probes_capabilities() {
    let (camera, handle) = full_device();
    camera.init_device(1, true);

    assert!(camera.is_initialized());
    assert_eq!(handle.open_count(), 1);
    assert!(camera.has_color());
    assert!(camera.has_depth());
    assert_eq!(camera.device_name(), "OAK-D Pro");
    assert_eq!(camera.stream_configs(StreamKind::Color).len(), 5);
    assert_eq!(camera.stream_configs(StreamKind::Depth).len(), 4);
    assert_eq!(camera.properties(StreamKind::Color).len(), 11);
    assert_eq!(camera.properties(StreamKind::Depth).len(), 1);
}

#[test]
fn color_only_device_has_no_depth_catalog() {
    let mut transport = SimTransport::new();
    transport.add_device("serial-rgb", "RGB Cam", &[SensorSocket::Rgb]);
    let camera = DepthCamera::new(transport);
    camera.init_device(1, true);

    assert!(camera.has_color());
    assert!(!camera.has_depth());
    assert!(camera.stream_configs(StreamKind::Depth).is_empty());
    assert!(camera.properties(StreamKind::Depth).is_empty());

    // enabling the missing capability is refused
    let depth_cfg = depthcam::camera::catalog::depth_stream_configs().remove(0);
    assert!(!camera.enable_stream(&depth_cfg, false));
    assert!(!camera.is_reconfiguring());
}

#[test]
fn open_failure_resets_to_uninitialized() {
    let (camera, handle) = full_device();
    handle.set_online(false);

    camera.init_device(1, true);
    assert!(!camera.is_initialized());
    assert!(!camera.has_color());
    assert!(camera.stream_configs(StreamKind::Color).is_empty());
    // the enumeration snapshot is unaffected
    assert_eq!(camera.serial_at(1).as_deref(), Some(SERIAL));

    // the device coming back is picked up by a later explicit init
    handle.set_online(true);
    camera.init_device(1, true);
    assert!(camera.is_initialized());
}

#[test]
fn deferred_init_opens_on_next_tick() {
    let (camera, handle) = full_device();

    camera.init_device(1, false);
    assert!(!camera.is_initialized());
    assert_eq!(handle.open_count(), 0);

    camera.tick();
    assert!(camera.is_initialized());
    assert_eq!(handle.open_count(), 1);
}

#[test]
fn enable_then_tick_leaves_streaming_equal_enabled() {
    let (camera, _handle) = full_device();
    camera.init_device(1, true);

    for (kind, label) in [
        (StreamKind::Color, "1920 x 1080"),
        (StreamKind::Depth, "1280 x 800"),
    ] {
        let cfg = config(&camera, kind, label);
        assert!(camera.enable_stream(&cfg, false));
        assert!(camera.is_reconfiguring());

        camera.tick();
        let state = camera.state();
        assert_eq!(state.color_streaming, state.color_enabled);
        assert_eq!(state.depth_streaming, state.depth_enabled);
        assert!(!state.needs_reconfigure);
    }

    let state = camera.state();
    assert!(state.color_streaming && state.depth_streaming);
}

#[test]
fn disable_never_rebuilds_synchronously() {
    let (camera, handle) = full_device();
    camera.init_device(1, true);
    assert!(camera.enable_stream(&config(&camera, StreamKind::Color, "1920 x 1080"), true));
    assert!(camera.enable_stream(&config(&camera, StreamKind::Depth, "1280 x 800"), true));
    let opens = handle.open_count();

    camera.disable_stream(StreamKind::Color);

    // reported state drops immediately, but nothing is torn down yet:
    // the device still runs the old graph until the next tick
    assert!(camera.is_reconfiguring());
    assert!(handle.graph().expect("running graph").color.is_some());
    assert_eq!(handle.open_count(), opens);
    let state = camera.state();
    assert!(!state.color_streaming);
    assert!(!state.color_enabled);
    assert!(state.depth_streaming);

    camera.tick();
    let state = camera.state();
    assert!(!state.color_streaming);
    assert!(state.depth_streaming);
    let graph = handle.graph().expect("rebuilt graph");
    assert!(graph.color.is_none());
    assert!(graph.stereo.is_some());
    assert_eq!(handle.open_count(), opens + 1);
}

#[test]
fn rebuild_while_streaming_reopens_the_device() {
    let (camera, handle) = full_device();
    camera.init_device(1, true);

    // first enable starts from an idle device: no reconnect
    assert!(camera.enable_stream(&config(&camera, StreamKind::Color, "1280 x 720"), true));
    assert_eq!(handle.open_count(), 1);
    assert!(handle.pipeline_running());

    // second enable happens mid-stream: full reconnect
    assert!(camera.enable_stream(&config(&camera, StreamKind::Depth, "1280 x 800"), true));
    assert_eq!(handle.open_count(), 2);

    let graph = handle.graph().expect("graph");
    let color = graph.color.expect("color node");
    let stereo = graph.stereo.expect("stereo node");
    assert_eq!((color.isp_width, color.isp_height), (1280, 720));
    assert_eq!(color.isp_scale, Some((2, 3)));
    assert!(stereo.left_right_check);
    assert!(stereo.align_to_color);
}

#[test]
fn rebuild_with_nothing_enabled_is_a_plain_teardown() {
    let (camera, handle) = full_device();
    camera.init_device(1, true);
    assert!(camera.enable_stream(&config(&camera, StreamKind::Color, "1920 x 1080"), true));

    camera.disable_stream(StreamKind::Color);
    camera.tick();

    let state = camera.state();
    assert!(state.initialized);
    assert!(!state.color_streaming && !state.depth_streaming);
    assert!(!state.needs_reconfigure);
    // the device connection itself stays open
    assert_eq!(handle.open_count(), 2);
}

#[test]
fn scenario_color_then_depth_then_disable_color() {
    let (camera, handle) = full_device();
    camera.init_device(1, true);

    // color at 1920 x 1080
    assert!(camera.enable_stream(&config(&camera, StreamKind::Color, "1920 x 1080"), false));
    assert!(camera.state().color_enabled);
    camera.tick();
    assert!(camera.state().color_streaming);
    let color_intr = camera.intrinsics(StreamKind::Color).expect("color intrinsics");
    assert_eq!((color_intr.width, color_intr.height), (1920, 1080));

    // depth joins at 1280 x 800; its intrinsics are sized to the color frame
    assert!(camera.enable_stream(&config(&camera, StreamKind::Depth, "1280 x 800"), false));
    camera.tick();
    let state = camera.state();
    assert!(state.color_streaming && state.depth_streaming);
    let depth_intr = camera.intrinsics(StreamKind::Depth).expect("depth intrinsics");
    assert_eq!((depth_intr.width, depth_intr.height), (1920, 1080));
    assert!((depth_intr.ppx() - 960.0).abs() < f32::EPSILON);

    // color leaves; depth is unaffected and re-sized to the mono sensor
    camera.disable_stream(StreamKind::Color);
    camera.tick();
    let state = camera.state();
    assert!(!state.color_streaming);
    assert!(state.depth_streaming);
    assert!(handle.graph().expect("graph").color.is_none());
    camera.tick();
    let depth_intr = camera.intrinsics(StreamKind::Depth).expect("depth intrinsics");
    assert_eq!((depth_intr.width, depth_intr.height), (1280, 800));
}

#[test]
fn reinit_tears_down_streams_and_catalogs() {
    let (camera, _handle) = full_device();
    camera.init_device(1, true);
    assert!(camera.enable_stream(&config(&camera, StreamKind::Color, "1920 x 1080"), true));
    assert!(camera.state().color_streaming);

    // selecting "None" drops everything
    camera.init_device(0, true);
    let state = camera.state();
    assert!(!state.initialized);
    assert!(!state.color_enabled && !state.color_streaming);
    assert!(camera.stream_configs(StreamKind::Color).is_empty());
    assert_eq!(camera.device_name(), "");
}
