use crate::{Backend, InferError};
use std::fmt;

/// Opaque name of a compute device as reported by the backend, e.g. `CPU` or `CUDA.0`.
///
/// The part before the first `.` is the device class, the part after it the ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    name: String,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn cpu() -> Self {
        Self::new("CPU")
    }

    pub fn with_ordinal(class: &str, ordinal: usize) -> Self {
        Self::new(format!("{class}.{ordinal}"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }

    /// Ordinal after the class, `None` when absent or not a number.
    pub fn ordinal(&self) -> Option<usize> {
        self.name.split_once('.').and_then(|(_, n)| n.parse().ok())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Drop every device whose name contains `excluded`, keeping the order of the rest.
///
/// An empty `excluded` string keeps everything.
pub fn filter_devices(raw: impl IntoIterator<Item = Device>, excluded: &str) -> Vec<Device> {
    raw.into_iter()
        .filter(|device| excluded.is_empty() || !device.name().contains(excluded))
        .collect()
}

/// Last enumerated set of usable devices.
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    devices: Vec<Device>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-enumerate through `backend`, replacing the cached list. Returns the new count.
    ///
    /// On failure the previous list is kept.
    pub fn refresh<B: Backend>(
        &mut self,
        backend: &B,
        excluded: &str,
    ) -> Result<usize, InferError> {
        let raw = backend.available_devices()?;
        let total = raw.len();
        self.devices = filter_devices(raw, excluded);
        log::debug!(
            "enumerated {} devices ({} excluded by '{}')",
            self.devices.len(),
            total - self.devices.len(),
            excluded
        );
        Ok(self.devices.len())
    }

    pub fn get(&self, index: usize) -> Result<&Device, InferError> {
        self.devices.get(index).ok_or(InferError::DeviceIndex {
            index,
            count: self.devices.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }
}

/// Priority-ordered, non-empty list of devices to compile for.
///
/// The backend tries them in order and falls back to the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTarget {
    devices: Vec<Device>,
}

impl DeviceTarget {
    pub fn single(device: Device) -> Self {
        Self {
            devices: vec![device],
        }
    }

    /// Parse a comma separated priority list such as `"TensorRT.0,CUDA.0,CPU"`.
    pub fn parse(priorities: &str) -> Result<Self, InferError> {
        let devices: Vec<Device> = priorities
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Device::new)
            .collect();
        if devices.is_empty() {
            return Err(InferError::UnsupportedDevice(format!(
                "empty device priority list '{priorities}'"
            )));
        }
        Ok(Self { devices })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, device) in self.devices.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{device}")?;
        }
        Ok(())
    }
}
