//! Device enumeration registry.
//!
//! Indices are 1-based with slot 0 reserved for "no device selected"; they
//! are only stable within one enumeration snapshot. Anything persisted must
//! re-validate against the serial identifier after a refresh.

use tracing::debug;

use crate::transport::{DeviceDescriptor, Transport};

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    labels: Vec<String>,
    descriptors: Vec<DeviceDescriptor>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            labels: vec!["None".to_string()],
            descriptors: Vec::new(),
        }
    }

    /// Re-query connected devices and rebuild the index mapping. Safe to call
    /// at any time; an already-open device is unaffected.
    pub fn refresh<T: Transport>(&mut self, transport: &T) {
        self.labels.clear();
        self.labels.push("None".to_string());

        self.descriptors = transport.enumerate();
        for descriptor in &self.descriptors {
            self.labels.push(descriptor.serial.clone());
        }
        debug!(count = self.descriptors.len(), "device list refreshed");
    }

    /// Number of physical devices (the "None" slot is not counted).
    pub fn count(&self) -> usize {
        self.descriptors.len()
    }

    /// Selection labels, slot 0 being "None".
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn descriptor_at(&self, index: usize) -> Option<&DeviceDescriptor> {
        if index == 0 {
            return None;
        }
        self.descriptors.get(index - 1)
    }

    pub fn serial_at(&self, index: usize) -> Option<&str> {
        self.descriptor_at(index).map(|d| d.serial.as_str())
    }

    /// 1-based slot holding `serial` in the current snapshot.
    pub fn index_of_serial(&self, serial: &str) -> Option<usize> {
        self.descriptors
            .iter()
            .position(|d| d.serial == serial)
            .map(|pos| pos + 1)
    }
}
