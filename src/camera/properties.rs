//! Runtime-mutable hardware properties.
//!
//! Keys are a closed enum internally; the documented string names
//! (`"Brightness"`, `"Auto_Exposure"`, ...) only exist at the external
//! GUI/persistence boundary via [`PropKey::name`] and [`PropKey::parse`].

use crate::camera::catalog::StreamKind;

/// Property identifier. Declaration order is the store's iteration order,
/// which fixes the order of a batched apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKey {
    // color sensor
    Brightness,
    Contrast,
    Saturation,
    Sharpness,
    AutoExposure,
    Exposure,
    Iso,
    WhiteBalanceMode,
    WhiteBalance,
    FocusMode,
    FocusPos,
    // stereo block
    StereoPreset,
}

impl PropKey {
    pub const COLOR: [PropKey; 11] = [
        PropKey::Brightness,
        PropKey::Contrast,
        PropKey::Saturation,
        PropKey::Sharpness,
        PropKey::AutoExposure,
        PropKey::Exposure,
        PropKey::Iso,
        PropKey::WhiteBalanceMode,
        PropKey::WhiteBalance,
        PropKey::FocusMode,
        PropKey::FocusPos,
    ];

    pub const DEPTH: [PropKey; 1] = [PropKey::StereoPreset];

    pub fn kind(self) -> StreamKind {
        match self {
            PropKey::StereoPreset => StreamKind::Depth,
            _ => StreamKind::Color,
        }
    }

    /// Boundary name, as used by the GUI and the persisted state record.
    pub fn name(self) -> &'static str {
        match self {
            PropKey::Brightness => "Brightness",
            PropKey::Contrast => "Contrast",
            PropKey::Saturation => "Saturation",
            PropKey::Sharpness => "Sharpness",
            PropKey::AutoExposure => "Auto_Exposure",
            PropKey::Exposure => "Exposure",
            PropKey::Iso => "ISO",
            PropKey::WhiteBalanceMode => "White_Balance_Mode",
            PropKey::WhiteBalance => "White_Balance",
            PropKey::FocusMode => "Focus_Mode",
            PropKey::FocusPos => "Focus_Pos",
            PropKey::StereoPreset => "Preset",
        }
    }

    /// Resolve a boundary name for a stream kind. Unknown names yield `None`.
    pub fn parse(kind: StreamKind, name: &str) -> Option<PropKey> {
        let keys: &[PropKey] = match kind {
            StreamKind::Color => &Self::COLOR,
            StreamKind::Depth => &Self::DEPTH,
        };
        keys.iter().copied().find(|k| k.name() == name)
    }
}

/// Valid range of a property, fixed at capability-probe time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyRange {
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub step: f32,
}

/// Current state of one adjustable property. Values are integer-coded:
/// booleans are 0/1, enumerated modes index into `options`.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub value: i32,
    pub range: PropertyRange,
    /// Human-readable labels; non-empty means enumerated/selectable
    pub options: Vec<String>,
    pub dirty: bool,
}

impl Property {
    fn ranged(min: i32, max: i32, default: i32, step: f32) -> Self {
        Self {
            value: default,
            range: PropertyRange {
                min,
                max,
                default,
                step,
            },
            options: Vec::new(),
            dirty: false,
        }
    }

    fn enumerated(default: i32, options: &[&str]) -> Self {
        Self {
            value: default,
            range: PropertyRange {
                min: 0,
                max: options.len() as i32 - 1,
                default,
                step: 1.0,
            },
            options: options.iter().map(|s| s.to_string()).collect(),
            dirty: false,
        }
    }

    pub fn is_enumerated(&self) -> bool {
        !self.options.is_empty()
    }
}

/// Hardware tuning profile of the stereo-matching node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StereoPreset {
    #[default]
    HighAccuracy,
    HighDensity,
}

impl StereoPreset {
    pub fn from_value(value: i32) -> Option<StereoPreset> {
        match value {
            0 => Some(StereoPreset::HighAccuracy),
            1 => Some(StereoPreset::HighDensity),
            _ => None,
        }
    }
}

/// Per-stream-kind property map with a fixed iteration order.
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    entries: Vec<(PropKey, Property)>,
}

impl PropertyStore {
    /// Catalog for a color-capable device, ranges matching the sensor limits.
    pub fn color() -> Self {
        let entries = vec![
            (PropKey::Brightness, Property::ranged(-10, 10, 0, 0.25)),
            (PropKey::Contrast, Property::ranged(-10, 10, 0, 0.25)),
            (PropKey::Saturation, Property::ranged(-10, 10, 0, 0.25)),
            (PropKey::Sharpness, Property::ranged(0, 4, 0, 0.1)),
            (PropKey::AutoExposure, Property::ranged(0, 1, 1, 0.1)),
            (PropKey::Exposure, Property::ranged(1, 33000, 20000, 500.0)),
            (PropKey::Iso, Property::ranged(100, 1600, 800, 50.0)),
            (
                PropKey::WhiteBalanceMode,
                Property::enumerated(
                    1,
                    &[
                        "Off",
                        "Auto",
                        "Incandescent",
                        "Fluorescent",
                        "Warm Fluorescent",
                        "Daylight",
                        "Cloudy Daylight",
                        "Twilight",
                        "Shade",
                    ],
                ),
            ),
            (
                PropKey::WhiteBalance,
                Property::ranged(200, 12000, 4000, 1000.0),
            ),
            (
                PropKey::FocusMode,
                Property::enumerated(
                    1,
                    &[
                        "Off",
                        "Auto",
                        "Macro",
                        "Continuous Video",
                        "Continuous Picture",
                        "EDOF",
                    ],
                ),
            ),
            (PropKey::FocusPos, Property::ranged(0, 255, 150, 3.0)),
        ];
        Self { entries }
    }

    /// Catalog for a depth-capable device.
    pub fn depth() -> Self {
        let entries = vec![(
            PropKey::StereoPreset,
            Property::enumerated(0, &["High Accuracy", "High Density"]),
        )];
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, key: PropKey) -> Option<&Property> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, key: PropKey) -> Option<&mut Property> {
        self.entries
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, p)| p)
    }

    /// Current value, or the neutral 0 when the key is absent.
    pub fn value(&self, key: PropKey) -> i32 {
        self.get(key).map(|p| p.value).unwrap_or(0)
    }

    /// Store a value. Returns false (no state change) for absent keys.
    pub fn set_value(&mut self, key: PropKey, value: i32) -> bool {
        match self.get_mut(key) {
            Some(prop) => {
                prop.value = value;
                true
            }
            None => false,
        }
    }

    pub fn mark_dirty(&mut self, key: PropKey) -> bool {
        match self.get_mut(key) {
            Some(prop) => {
                prop.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Restore every property to its recorded default and mark it dirty.
    pub fn reset_to_defaults(&mut self) {
        for (_, prop) in &mut self.entries {
            prop.value = prop.range.default;
            prop.dirty = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropKey, &Property)> {
        self.entries.iter().map(|(k, p)| (*k, p))
    }

    /// Keys currently flagged dirty, in store order.
    pub fn dirty_keys(&self) -> Vec<PropKey> {
        self.entries
            .iter()
            .filter(|(_, p)| p.dirty)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn clear_dirty(&mut self, key: PropKey) {
        if let Some(prop) = self.get_mut(key) {
            prop.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_names_round_trip() {
        for key in PropKey::COLOR {
            assert_eq!(PropKey::parse(StreamKind::Color, key.name()), Some(key));
        }
        assert_eq!(
            PropKey::parse(StreamKind::Depth, "Preset"),
            Some(PropKey::StereoPreset)
        );
        assert_eq!(PropKey::parse(StreamKind::Color, "Preset"), None);
        assert_eq!(PropKey::parse(StreamKind::Color, "Bogus"), None);
    }

    #[test]
    fn absent_key_reads_neutral_zero() {
        let store = PropertyStore::depth();
        assert_eq!(store.value(PropKey::Brightness), 0);
        assert!(!store.clone().set_value(PropKey::Brightness, 5));
    }

    #[test]
    fn enumerated_range_tracks_option_count() {
        let store = PropertyStore::color();
        let wb = store.get(PropKey::WhiteBalanceMode).unwrap();
        assert!(wb.is_enumerated());
        assert_eq!(wb.range.max, 8);
        let focus = store.get(PropKey::FocusMode).unwrap();
        assert_eq!(focus.range.max, 5);
    }
}
