//! Depth-capable camera source core.
//!
//! One [`DepthCamera`] owns the device connection, the stream state machine
//! and the per-tick frame harvest. All mutation funnels through a single
//! mutex; deferred work (init, rebuild, property batch) is recorded in
//! [`PendingOps`] and consumed once per [`DepthCamera::tick`] in a fixed
//! order, so a freshly opened device is always reconfigured before frames
//! are read and property changes land before the frame that reflects them.

pub mod catalog;
pub mod metadata;
pub mod properties;
pub mod registry;

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use crate::camera::catalog::{
    color_stream_configs, depth_stream_configs, StreamConfig, StreamKind,
};
use crate::camera::metadata::{FrameSize, Intrinsics, StreamMeta, TickMetadata, TickOutput};
use crate::camera::properties::{PropKey, Property, PropertyStore, StereoPreset};
use crate::camera::registry::DeviceRegistry;
use crate::pipeline::graph::{PipelineGraph, PipelineSession, CONTROL_QUEUE, OUTPUT_QUEUE_DEPTH};
use crate::transport::{
    ControlCommand, DeviceDescriptor, ExposureCommand, FocusCommand, Frame, LinkSpeed,
    SensorSocket, Transport, TransportDevice, WhiteBalanceCommand,
};
use crate::NodeState;

/// Display name used when calibration storage has no board name.
pub const GENERIC_DEVICE_NAME: &str = "Depth Camera";

/// Option index meaning "Off" in the white balance mode list.
const WB_MODE_OFF: i32 = 0;
/// Option index meaning "Off" (manual) in the focus mode list.
const FOCUS_MODE_OFF: i32 = 0;

/// Catalog tiers selected when a persisted record carries no index.
const DEFAULT_COLOR_TIER: usize = 2;
const DEFAULT_DEPTH_TIER: usize = 2;

/// Snapshot of the authoritative pipeline state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineState {
    pub initialized: bool,
    pub color_streaming: bool,
    pub depth_streaming: bool,
    pub color_enabled: bool,
    pub depth_enabled: bool,
    pub has_color: bool,
    pub has_depth: bool,
    pub needs_reconfigure: bool,
    pub pending_properties: bool,
}

/// Deferred operations, consumed once per tick in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PendingOps {
    init: Option<usize>,
    reconfigure: bool,
    apply_props: bool,
}

struct Inner<D> {
    registry: DeviceRegistry,
    device: Option<D>,
    session: Option<PipelineSession>,
    descriptor: Option<DeviceDescriptor>,
    device_name: String,
    active_index: usize,
    pending: PendingOps,
    initialized: bool,
    has_color: bool,
    has_depth: bool,
    color_enabled: bool,
    depth_enabled: bool,
    color_streaming: bool,
    depth_streaming: bool,
    color_configs: Vec<StreamConfig>,
    depth_configs: Vec<StreamConfig>,
    color_props: PropertyStore,
    depth_props: PropertyStore,
    active_color: Option<StreamConfig>,
    active_depth: Option<StreamConfig>,
    color_intrinsics: Option<Intrinsics>,
    depth_intrinsics: Option<Intrinsics>,
}

impl<D: TransportDevice> Inner<D> {
    fn new() -> Self {
        Self {
            registry: DeviceRegistry::new(),
            device: None,
            session: None,
            descriptor: None,
            device_name: String::new(),
            active_index: 0,
            pending: PendingOps::default(),
            initialized: false,
            has_color: false,
            has_depth: false,
            color_enabled: false,
            depth_enabled: false,
            color_streaming: false,
            depth_streaming: false,
            color_configs: Vec::new(),
            depth_configs: Vec::new(),
            color_props: PropertyStore::default(),
            depth_props: PropertyStore::default(),
            active_color: None,
            active_depth: None,
            color_intrinsics: None,
            depth_intrinsics: None,
        }
    }

    fn state(&self) -> PipelineState {
        PipelineState {
            initialized: self.initialized,
            color_streaming: self.color_streaming,
            depth_streaming: self.depth_streaming,
            color_enabled: self.color_enabled,
            depth_enabled: self.depth_enabled,
            has_color: self.has_color,
            has_depth: self.has_depth,
            needs_reconfigure: self.pending.reconfigure,
            pending_properties: self.pending.apply_props,
        }
    }

    /// Drop the connection and every per-device artifact; back to the
    /// UNINITIALIZED state with no device selected.
    fn reset_to_uninitialized(&mut self) {
        self.device = None;
        self.session = None;
        self.descriptor = None;
        self.active_index = 0;
        self.initialized = false;
        self.device_name.clear();
        self.has_color = false;
        self.has_depth = false;
        self.color_enabled = false;
        self.depth_enabled = false;
        self.color_streaming = false;
        self.depth_streaming = false;
        self.active_color = None;
        self.active_depth = None;
        self.color_intrinsics = None;
        self.depth_intrinsics = None;
        self.color_configs.clear();
        self.depth_configs.clear();
        self.color_props.clear();
        self.depth_props.clear();
    }

    /// Open sequence: tear down whatever is live, open the device at the
    /// registry slot, probe its sensors and populate the catalogs. A failed
    /// open logs and leaves the core uninitialized with no device selected.
    fn init_device<T: Transport<Device = D>>(&mut self, transport: &T, index: usize) {
        self.reset_to_uninitialized();

        let Some(descriptor) = self.registry.descriptor_at(index).cloned() else {
            // slot 0 or a stale index: plain deselect
            return;
        };

        let device = match transport.open(&descriptor, LinkSpeed::Super) {
            Ok(device) => device,
            Err(err) => {
                error!(serial = %descriptor.serial, %err, "failed to open device");
                return;
            }
        };

        let sensors = device.sensors();
        let has_left = sensors.contains(&SensorSocket::Left);
        let has_right = sensors.contains(&SensorSocket::Right);
        self.has_depth = has_left && has_right;
        self.has_color = sensors.contains(&SensorSocket::Rgb);

        if self.has_depth {
            self.depth_configs = depth_stream_configs();
            self.depth_props = PropertyStore::depth();
        }
        if self.has_color {
            self.color_configs = color_stream_configs();
            self.color_props = PropertyStore::color();
        }

        self.device_name = device
            .board_name()
            .unwrap_or_else(|| GENERIC_DEVICE_NAME.to_string());

        info!(
            serial = %descriptor.serial,
            name = %self.device_name,
            color = self.has_color,
            depth = self.has_depth,
            "device opened"
        );

        self.device = Some(device);
        self.descriptor = Some(descriptor);
        self.active_index = index;
        self.initialized = true;
    }

    /// Full pipeline rebuild. The transport does not support incremental
    /// graph edits, so a streaming device is reconnected from scratch and a
    /// new session replaces the old one wholesale.
    fn reconfigure<T: Transport<Device = D>>(&mut self, transport: &T) {
        if !self.initialized {
            self.pending.reconfigure = false;
            return;
        }

        // a live session means the device has a running pipeline; the
        // transport cannot edit it in place, so reconnect from scratch
        if self.session.is_some() {
            self.session = None;
            self.device = None;
            if let Some(descriptor) = self.descriptor.clone() {
                match transport.open(&descriptor, LinkSpeed::Super) {
                    Ok(device) => self.device = Some(device),
                    Err(err) => {
                        error!(serial = %descriptor.serial, %err, "device lost during rebuild");
                        self.reset_to_uninitialized();
                        self.pending.reconfigure = false;
                        return;
                    }
                }
            }
        }

        self.color_streaming = false;
        self.depth_streaming = false;
        self.session = None;

        if self.color_enabled || self.depth_enabled {
            let mut graph = PipelineGraph::default();
            if self.color_enabled {
                if let Some(cfg) = &self.active_color {
                    self.color_intrinsics = None;
                    graph = graph.with_color(cfg);
                    self.color_streaming = true;
                }
            }
            if self.depth_enabled {
                if let Some(cfg) = &self.active_depth {
                    self.depth_intrinsics = None;
                    let preset =
                        StereoPreset::from_value(self.depth_props.value(PropKey::StereoPreset))
                            .unwrap_or_default();
                    graph = graph.with_stereo(cfg, preset);
                    self.depth_streaming = true;
                }
            }

            if !graph.is_empty() {
                let Some(device) = self.device.as_mut() else {
                    self.color_streaming = false;
                    self.depth_streaming = false;
                    self.pending.reconfigure = false;
                    return;
                };

                if !device.pipeline_running() {
                    if let Err(err) = device.start_pipeline(&graph) {
                        error!(%err, "pipeline start failed");
                        self.color_streaming = false;
                        self.depth_streaming = false;
                        self.pending.reconfigure = false;
                        return;
                    }
                }

                let mut session = PipelineSession::new(graph.clone());
                if let Some(color) = &graph.color {
                    session.queue_names.push(color.stream_name.clone());
                }
                if let Some(stereo) = &graph.stereo {
                    session.queue_names.push(stereo.stream_name.clone());
                }
                for name in &session.queue_names {
                    if let Err(err) = device.create_output_queue(name, OUTPUT_QUEUE_DEPTH, true) {
                        warn!(queue = %name, %err, "output queue not created");
                    }
                }
                if self.color_enabled {
                    match device.create_input_queue(CONTROL_QUEUE) {
                        Ok(tx) => session.control = Some(tx),
                        Err(err) => warn!(%err, "control queue not created"),
                    }
                }

                self.session = Some(session);
                self.push_all_color_controls();
            }
        }

        self.pending.reconfigure = false;
        debug!(
            color = self.color_streaming,
            depth = self.depth_streaming,
            "pipeline rebuilt"
        );
    }

    fn send_control(&self, cmd: ControlCommand) {
        if let Some(tx) = self.session.as_ref().and_then(|s| s.control.as_ref()) {
            if tx.send(cmd).is_err() {
                warn!("control queue closed");
            }
        }
    }

    /// Push the complete current color property set as one command.
    fn push_all_color_controls(&self) {
        if !(self.initialized && self.color_enabled && self.color_streaming) {
            return;
        }
        let props = &self.color_props;
        let mut cmd = ControlCommand {
            brightness: Some(props.value(PropKey::Brightness)),
            contrast: Some(props.value(PropKey::Contrast)),
            saturation: Some(props.value(PropKey::Saturation)),
            sharpness: Some(props.value(PropKey::Sharpness)),
            ..Default::default()
        };

        cmd.exposure = Some(if props.value(PropKey::AutoExposure) != 0 {
            ExposureCommand::Auto
        } else {
            ExposureCommand::Manual {
                exposure_us: props.value(PropKey::Exposure),
                iso: props.value(PropKey::Iso),
            }
        });

        let wb_mode = props.value(PropKey::WhiteBalanceMode);
        cmd.white_balance = Some(if wb_mode == WB_MODE_OFF {
            WhiteBalanceCommand::Manual {
                color_temp: props.value(PropKey::WhiteBalance),
            }
        } else {
            WhiteBalanceCommand::Auto { mode: wb_mode }
        });

        let focus_mode = props.value(PropKey::FocusMode);
        cmd.focus = Some(if focus_mode == FOCUS_MODE_OFF {
            FocusCommand::Manual {
                position: props.value(PropKey::FocusPos),
            }
        } else {
            FocusCommand::Auto { mode: focus_mode }
        });

        self.send_control(cmd);
    }

    /// Translate one color property into the minimal command set for it.
    /// `None` means the change needs no command right now (e.g. a manual
    /// white balance value while the mode is automatic).
    fn translate_color_control(&mut self, key: PropKey) -> Option<ControlCommand> {
        let props = &mut self.color_props;
        let mut cmd = ControlCommand::default();
        match key {
            PropKey::Brightness => cmd.brightness = Some(props.value(key)),
            PropKey::Contrast => cmd.contrast = Some(props.value(key)),
            PropKey::Saturation => cmd.saturation = Some(props.value(key)),
            PropKey::Sharpness => cmd.sharpness = Some(props.value(key)),
            PropKey::Exposure | PropKey::Iso => {
                // a manual value implies switching auto-exposure off
                props.set_value(PropKey::AutoExposure, 0);
                cmd.exposure = Some(ExposureCommand::Manual {
                    exposure_us: props.value(PropKey::Exposure),
                    iso: props.value(PropKey::Iso),
                });
            }
            PropKey::AutoExposure => {
                cmd.exposure = Some(if props.value(PropKey::AutoExposure) != 0 {
                    ExposureCommand::Auto
                } else {
                    ExposureCommand::Manual {
                        exposure_us: props.value(PropKey::Exposure),
                        iso: props.value(PropKey::Iso),
                    }
                });
            }
            PropKey::WhiteBalanceMode => {
                let mode = props.value(PropKey::WhiteBalanceMode);
                cmd.white_balance = Some(if mode == WB_MODE_OFF {
                    WhiteBalanceCommand::Manual {
                        color_temp: props.value(PropKey::WhiteBalance),
                    }
                } else {
                    WhiteBalanceCommand::Auto { mode }
                });
            }
            PropKey::WhiteBalance => {
                if props.value(PropKey::WhiteBalanceMode) != WB_MODE_OFF {
                    return None;
                }
                cmd.white_balance = Some(WhiteBalanceCommand::Manual {
                    color_temp: props.value(PropKey::WhiteBalance),
                });
            }
            PropKey::FocusMode => {
                let mode = props.value(PropKey::FocusMode);
                cmd.focus = Some(if mode == FOCUS_MODE_OFF {
                    FocusCommand::Manual {
                        position: props.value(PropKey::FocusPos),
                    }
                } else {
                    FocusCommand::Auto { mode }
                });
            }
            PropKey::FocusPos => {
                if props.value(PropKey::FocusMode) != FOCUS_MODE_OFF {
                    return None;
                }
                cmd.focus = Some(FocusCommand::Manual {
                    position: props.value(PropKey::FocusPos),
                });
            }
            PropKey::StereoPreset => return None,
        }
        Some(cmd)
    }

    fn push_color_control(&mut self, key: PropKey) {
        if let Some(cmd) = self.translate_color_control(key) {
            self.send_control(cmd);
        }
    }

    /// Re-apply the stored preset to the live stereo node.
    fn apply_stereo_preset(&mut self) {
        let Some(preset) = StereoPreset::from_value(self.depth_props.value(PropKey::StereoPreset))
        else {
            return;
        };
        if let Some(device) = self.device.as_mut() {
            if let Err(err) = device.set_stereo_preset(preset) {
                warn!(%err, "stereo preset not applied");
            }
        }
    }

    fn set_property(&mut self, kind: StreamKind, key: PropKey, value: i32, immediate: bool) -> bool {
        if key.kind() != kind {
            return false;
        }
        match kind {
            StreamKind::Color => {
                if !self.color_props.set_value(key, value) {
                    return false;
                }
                if !(self.initialized && self.color_enabled && self.color_streaming) {
                    // stored; the next full push picks it up
                    return true;
                }
                if immediate {
                    self.push_color_control(key);
                } else {
                    self.color_props.mark_dirty(key);
                    self.pending.apply_props = true;
                }
                true
            }
            StreamKind::Depth => {
                if !self.depth_props.set_value(key, value) {
                    return false;
                }
                // the stereo preset always takes effect immediately; it
                // mutates the live node, no rebuild involved
                if self.initialized && self.depth_enabled && self.depth_streaming {
                    self.apply_stereo_preset();
                }
                true
            }
        }
    }

    /// Batched application of every dirty property, in store order. When
    /// both the exposure mode and a manual exposure value land in the same
    /// batch, the mode wins: auto-exposure is re-sent as the final command.
    fn apply_pending_properties(&mut self) {
        let mut manual_exposure_touched = false;
        let mut auto_exposure_touched = false;

        let push = self.initialized && self.color_enabled && self.color_streaming;
        for key in self.color_props.dirty_keys() {
            match key {
                PropKey::AutoExposure => auto_exposure_touched = true,
                PropKey::Exposure => manual_exposure_touched = true,
                _ => {}
            }
            if push {
                self.push_color_control(key);
            }
            self.color_props.clear_dirty(key);
        }
        if auto_exposure_touched && manual_exposure_touched {
            self.color_props.set_value(PropKey::AutoExposure, 1);
            if push {
                self.push_color_control(PropKey::AutoExposure);
            }
        }

        let reapply = self.initialized && self.depth_enabled && self.depth_streaming;
        for key in self.depth_props.dirty_keys() {
            if key == PropKey::StereoPreset && reapply {
                self.apply_stereo_preset();
            }
            self.depth_props.clear_dirty(key);
        }

        self.pending.apply_props = false;
    }

    /// Reference size for depth output: the color ISP size when color is
    /// streaming (depth is aligned to it), else the mono sensor size.
    fn depth_reference_size(&self) -> (u32, u32) {
        if self.color_streaming {
            if let Some(cfg) = &self.active_color {
                return (cfg.width, cfg.height);
            }
        }
        self.active_depth
            .as_ref()
            .map(|cfg| (cfg.width, cfg.height))
            .unwrap_or((0, 0))
    }

    fn update_calibration(&mut self) {
        let Some(device) = self.device.as_ref() else {
            return;
        };
        if self.depth_streaming && self.depth_intrinsics.is_none() {
            let (width, height) = self.depth_reference_size();
            self.depth_intrinsics =
                device
                    .intrinsics(SensorSocket::Right, width, height)
                    .map(|matrix| Intrinsics {
                        width,
                        height,
                        matrix,
                    });
        }
        if self.color_streaming && self.color_intrinsics.is_none() {
            if let Some(cfg) = &self.active_color {
                self.color_intrinsics = device
                    .intrinsics(SensorSocket::Rgb, cfg.width, cfg.height)
                    .map(|matrix| Intrinsics {
                        width: cfg.width,
                        height: cfg.height,
                        matrix,
                    });
            }
        }
    }

    /// Drain every registered queue, keep the newest frame per stream and
    /// assemble the metadata record. Backlog is intentionally discarded.
    fn harvest(&mut self) -> TickOutput {
        let mut output = TickOutput::default();
        if !self.initialized || !(self.color_streaming || self.depth_streaming) {
            return output;
        }

        if (self.color_streaming && self.color_intrinsics.is_none())
            || (self.depth_streaming && self.depth_intrinsics.is_none())
        {
            self.update_calibration();
        }

        let queue_names = self
            .session
            .as_ref()
            .map(|s| s.queue_names.clone())
            .unwrap_or_default();
        let Some(device) = self.device.as_mut() else {
            return output;
        };

        let mut newest_color: Option<Frame> = None;
        let mut newest_depth: Option<Frame> = None;
        for name in &queue_names {
            let Some(frame) = device.drain_queue(name).into_iter().last() else {
                continue;
            };
            if self.depth_enabled
                && self
                    .active_depth
                    .as_ref()
                    .is_some_and(|cfg| &cfg.stream_name == name)
            {
                newest_depth = Some(frame);
            } else if self.color_enabled
                && self
                    .active_color
                    .as_ref()
                    .is_some_and(|cfg| &cfg.stream_name == name)
            {
                newest_color = Some(frame);
            }
        }

        let mut meta = TickMetadata::new();
        if let Some(frame) = &newest_depth {
            let (w, h) = self.depth_reference_size();
            meta.depth_reference = Some(FrameSize { w, h });
            meta.depth = Some(StreamMeta {
                fps: self
                    .active_depth
                    .as_ref()
                    .map(|cfg| cfg.selected_fps())
                    .unwrap_or(0),
                frame_num: frame.meta.sequence,
                timestamp_ns: frame.meta.timestamp_ns,
                intrinsics: self.depth_intrinsics.map(Into::into),
            });
        }
        if let Some(frame) = &newest_color {
            if let Some(cfg) = &self.active_color {
                meta.reference = Some(FrameSize {
                    w: cfg.width,
                    h: cfg.height,
                });
            }
            meta.color = Some(StreamMeta {
                fps: self
                    .active_color
                    .as_ref()
                    .map(|cfg| cfg.selected_fps())
                    .unwrap_or(0),
                frame_num: frame.meta.sequence,
                timestamp_ns: frame.meta.timestamp_ns,
                intrinsics: self.color_intrinsics.map(Into::into),
            });
        }

        output.color = newest_color;
        output.depth = newest_depth;
        if !meta.is_empty() {
            output.metadata = Some(meta);
        }
        output
    }
}

/// The camera source node. Generic over the device transport so the same
/// state machine runs against real hardware or the simulation backend.
pub struct DepthCamera<T: Transport> {
    transport: T,
    inner: Mutex<Inner<T::Device>>,
}

impl<T: Transport> DepthCamera<T> {
    /// Create the node and take an initial enumeration snapshot.
    pub fn new(transport: T) -> Self {
        let mut inner = Inner::new();
        inner.registry.refresh(&transport);
        Self {
            transport,
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T::Device>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-query connected devices. Does not affect an open device.
    pub fn refresh_devices(&self) {
        self.lock().registry.refresh(&self.transport);
    }

    /// Number of enumerated devices (the "None" slot not counted).
    pub fn device_count(&self) -> usize {
        self.lock().registry.count()
    }

    /// Selection labels; slot 0 is "None".
    pub fn device_labels(&self) -> Vec<String> {
        self.lock().registry.labels().to_vec()
    }

    /// Serial at a 1-based registry slot; `None` for slot 0 or out of range.
    pub fn serial_at(&self, index: usize) -> Option<String> {
        self.lock().registry.serial_at(index).map(str::to_string)
    }

    /// Display name of the open device; empty while uninitialized.
    pub fn device_name(&self) -> String {
        self.lock().device_name.clone()
    }

    /// Select and open the device at a registry slot. With `immediate`
    /// false only the request is recorded; the open happens on the next
    /// tick so a UI-driven call never blocks on device I/O.
    pub fn init_device(&self, index: usize, immediate: bool) {
        if immediate {
            self.lock().init_device(&self.transport, index);
        } else {
            self.lock().pending.init = Some(index);
        }
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state()
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn is_reconfiguring(&self) -> bool {
        self.lock().pending.reconfigure
    }

    pub fn has_color(&self) -> bool {
        self.lock().has_color
    }

    pub fn has_depth(&self) -> bool {
        self.lock().has_depth
    }

    /// Supported configurations for a stream kind; empty without the
    /// capability.
    pub fn stream_configs(&self, kind: StreamKind) -> Vec<StreamConfig> {
        let inner = self.lock();
        match kind {
            StreamKind::Color => inner.color_configs.clone(),
            StreamKind::Depth => inner.depth_configs.clone(),
        }
    }

    /// The active config for a kind; `None` while the kind is disabled.
    pub fn active_config(&self, kind: StreamKind) -> Option<StreamConfig> {
        let inner = self.lock();
        match kind {
            StreamKind::Color => inner.color_enabled.then(|| inner.active_color.clone()).flatten(),
            StreamKind::Depth => inner.depth_enabled.then(|| inner.active_depth.clone()).flatten(),
        }
    }

    /// Enable a stream with the given config. Returns false when the open
    /// device lacks the capability for the config's kind. With `immediate`
    /// the pipeline is rebuilt synchronously, otherwise on the next tick.
    pub fn enable_stream(&self, config: &StreamConfig, immediate: bool) -> bool {
        let mut inner = self.lock();
        match config.kind {
            StreamKind::Color if inner.has_color => {
                inner.active_color = Some(config.clone());
                inner.color_enabled = true;
            }
            StreamKind::Depth if inner.has_depth => {
                inner.active_depth = Some(config.clone());
                inner.depth_enabled = true;
            }
            _ => return false,
        }
        if immediate {
            inner.reconfigure(&self.transport);
        } else {
            inner.pending.reconfigure = true;
        }
        true
    }

    /// Disable a stream. The streaming flag drops right away (a stream is
    /// never reported streaming while disabled) but the physical teardown
    /// is always deferred to the next tick so buffers are never invalidated
    /// mid-use.
    pub fn disable_stream(&self, kind: StreamKind) {
        let mut inner = self.lock();
        match kind {
            StreamKind::Color => {
                inner.color_enabled = false;
                inner.color_streaming = false;
            }
            StreamKind::Depth => {
                inner.depth_enabled = false;
                inner.depth_streaming = false;
            }
        }
        inner.pending.reconfigure = true;
    }

    /// Property snapshot for a kind, in store order.
    pub fn properties(&self, kind: StreamKind) -> Vec<(PropKey, Property)> {
        let inner = self.lock();
        let store = match kind {
            StreamKind::Color => &inner.color_props,
            StreamKind::Depth => &inner.depth_props,
        };
        store.iter().map(|(k, p)| (k, p.clone())).collect()
    }

    /// Current value; the neutral 0 for an absent kind or key.
    pub fn property(&self, kind: StreamKind, key: PropKey) -> i32 {
        let inner = self.lock();
        match kind {
            StreamKind::Color => inner.color_props.value(key),
            StreamKind::Depth => inner.depth_props.value(key),
        }
    }

    /// Boundary read by documented name; 0 when unknown.
    pub fn property_by_name(&self, kind: StreamKind, name: &str) -> i32 {
        match PropKey::parse(kind, name) {
            Some(key) => self.property(kind, key),
            None => 0,
        }
    }

    /// Store a property value and push it to hardware, immediately or on
    /// the next batch apply. Callers clamp to the property's range; the
    /// store does not. Returns false for a key the probed catalog lacks.
    pub fn set_property(&self, kind: StreamKind, key: PropKey, value: i32, immediate: bool) -> bool {
        self.lock().set_property(kind, key, value, immediate)
    }

    /// Boundary mutation by documented name; unknown names are a silent
    /// no-op returning false.
    pub fn set_property_by_name(
        &self,
        kind: StreamKind,
        name: &str,
        value: i32,
        immediate: bool,
    ) -> bool {
        match PropKey::parse(kind, name) {
            Some(key) => self.set_property(kind, key, value, immediate),
            None => false,
        }
    }

    /// Restore a kind's properties to their defaults and schedule one
    /// batch apply.
    pub fn reset_properties(&self, kind: StreamKind) {
        let mut inner = self.lock();
        match kind {
            StreamKind::Color => inner.color_props.reset_to_defaults(),
            StreamKind::Depth => inner.depth_props.reset_to_defaults(),
        }
        inner.pending.apply_props = true;
    }

    /// Cached calibration for a kind; populated while the kind streams.
    pub fn intrinsics(&self, kind: StreamKind) -> Option<Intrinsics> {
        let inner = self.lock();
        match kind {
            StreamKind::Color => inner.color_intrinsics,
            StreamKind::Depth => inner.depth_intrinsics,
        }
    }

    /// One processing tick: consume pending operations in fixed order
    /// (init, rebuild, property batch), then harvest the output queues.
    pub fn tick(&self) -> TickOutput {
        let mut inner = self.lock();
        if let Some(index) = inner.pending.init.take() {
            inner.init_device(&self.transport, index);
        }
        if inner.pending.reconfigure {
            inner.reconfigure(&self.transport);
        }
        if inner.pending.apply_props {
            inner.apply_pending_properties();
        }
        inner.harvest()
    }

    /// Capture the restorable configuration; `None` while uninitialized.
    pub fn save_state(&self) -> Option<NodeState> {
        let inner = self.lock();
        if !inner.initialized || inner.active_index == 0 {
            return None;
        }
        let mut state = NodeState {
            cam_idx: inner.active_index,
            serial: inner
                .descriptor
                .as_ref()
                .map(|d| d.serial.clone())
                .unwrap_or_default(),
            color_enabled: inner.color_enabled,
            depth_enabled: inner.depth_enabled,
            ..Default::default()
        };
        if inner.color_enabled {
            if let Some(cfg) = &inner.active_color {
                state.color_res_idx = inner
                    .color_configs
                    .iter()
                    .position(|c| c.label == cfg.label);
                state.color_fps_idx = Some(cfg.fps_idx);
                state.color_fps = Some(cfg.selected_fps());
            }
            state.color_controls = inner
                .color_props
                .iter()
                .map(|(k, p)| (k.name().to_string(), p.value))
                .collect();
        }
        if inner.depth_enabled {
            if let Some(cfg) = &inner.active_depth {
                state.depth_res_idx = inner
                    .depth_configs
                    .iter()
                    .position(|c| c.label == cfg.label);
                state.depth_fps_idx = Some(cfg.fps_idx);
                state.depth_fps = Some(cfg.selected_fps());
            }
            state.depth_controls = inner
                .depth_props
                .iter()
                .map(|(k, p)| (k.name().to_string(), p.value))
                .collect();
        }
        Some(state)
    }

    /// Restore a persisted configuration. The saved serial is matched
    /// against a fresh enumeration (indices are unstable across refreshes);
    /// with no match the node remains unselected and false is returned.
    /// Stream rebuilds are deferred to the next tick.
    pub fn restore_state(&self, state: &NodeState) -> bool {
        if state.cam_idx == 0 || state.serial.is_empty() {
            return false;
        }
        let mut inner = self.lock();
        inner.registry.refresh(&self.transport);

        let index = if inner.registry.serial_at(state.cam_idx) == Some(state.serial.as_str()) {
            Some(state.cam_idx)
        } else {
            inner.registry.index_of_serial(&state.serial)
        };
        let Some(index) = index else {
            info!(serial = %state.serial, "saved device not present, leaving unselected");
            return false;
        };

        inner.init_device(&self.transport, index);
        if !inner.initialized {
            return false;
        }

        if state.color_enabled && inner.has_color {
            let res_idx = state.color_res_idx.unwrap_or(DEFAULT_COLOR_TIER);
            if let Some(mut cfg) = inner.color_configs.get(res_idx).cloned() {
                if let Some(fps_idx) = state.color_fps_idx {
                    if fps_idx < cfg.fps_list.len() {
                        cfg.fps_idx = fps_idx;
                    }
                }
                for (name, value) in &state.color_controls {
                    if let Some(key) = PropKey::parse(StreamKind::Color, name) {
                        inner.color_props.set_value(key, *value);
                    }
                }
                inner.active_color = Some(cfg);
                inner.color_enabled = true;
                inner.pending.reconfigure = true;
            }
        }
        if state.depth_enabled && inner.has_depth {
            let res_idx = state.depth_res_idx.unwrap_or(DEFAULT_DEPTH_TIER);
            if let Some(mut cfg) = inner.depth_configs.get(res_idx).cloned() {
                if let Some(fps_idx) = state.depth_fps_idx {
                    if fps_idx < cfg.fps_list.len() {
                        cfg.fps_idx = fps_idx;
                    }
                }
                for (name, value) in &state.depth_controls {
                    if let Some(key) = PropKey::parse(StreamKind::Depth, name) {
                        inner.depth_props.set_value(key, *value);
                    }
                }
                inner.active_depth = Some(cfg);
                inner.depth_enabled = true;
                inner.pending.reconfigure = true;
            }
        }
        true
    }
}
