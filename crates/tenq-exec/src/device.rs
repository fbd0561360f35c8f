//! Compute device selection and engine status reporting

use std::fmt;
use std::str::FromStr;

use tenq_core::ArgumentError;

/// Requested or active compute device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Device {
    /// Let the engine pick (accelerator when available).
    #[default]
    Auto,
    Cpu,
    Gpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Gpu => "gpu",
        };
        f.write_str(s)
    }
}

impl FromStr for Device {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "gpu" | "cuda" => Ok(Device::Gpu),
            other => Err(ArgumentError::Parameter {
                op: "device".to_string(),
                reason: format!("unknown device '{}'", other),
            }),
        }
    }
}

/// Snapshot of an engine's device state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EngineStatus {
    /// Engine name
    pub engine: &'static str,
    /// Device last requested by the caller
    pub requested: Device,
    /// Device operations actually run on
    pub active: Device,
    /// Whether an accelerator was detected
    pub gpu_available: bool,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} engine: requested {}, active {}, gpu {}",
            self.engine,
            self.requested,
            self.active,
            if self.gpu_available {
                "available"
            } else {
                "unavailable"
            }
        )
    }
}

/// Tracks the requested device and resolves the active one.
///
/// A GPU request on a host without an accelerator falls back to the CPU.
#[derive(Clone, Debug)]
pub struct DeviceSelector {
    requested: Device,
    gpu_available: bool,
}

impl DeviceSelector {
    pub fn new(gpu_available: bool) -> Self {
        Self {
            requested: Device::Auto,
            gpu_available,
        }
    }

    pub fn request(&mut self, device: Device) {
        if device == Device::Gpu && !self.gpu_available {
            tracing::warn!("gpu requested but unavailable, running on cpu");
        }
        self.requested = device;
    }

    pub fn requested(&self) -> Device {
        self.requested
    }

    pub fn active(&self) -> Device {
        match self.requested {
            Device::Cpu => Device::Cpu,
            Device::Auto | Device::Gpu if self.gpu_available => Device::Gpu,
            _ => Device::Cpu,
        }
    }

    pub fn gpu_available(&self) -> bool {
        self.gpu_available
    }

    pub fn status(&self, engine: &'static str) -> EngineStatus {
        EngineStatus {
            engine,
            requested: self.requested,
            active: self.active(),
            gpu_available: self.gpu_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_request_falls_back_without_accelerator() {
        let mut sel = DeviceSelector::new(false);
        sel.request(Device::Gpu);
        assert_eq!(sel.requested(), Device::Gpu);
        assert_eq!(sel.active(), Device::Cpu);
    }

    #[test]
    fn test_auto_prefers_accelerator() {
        let mut sel = DeviceSelector::new(true);
        assert_eq!(sel.active(), Device::Gpu);
        sel.request(Device::Cpu);
        assert_eq!(sel.active(), Device::Cpu);
    }

    #[test]
    fn test_parse() {
        assert_eq!("CPU".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("".parse::<Device>().unwrap(), Device::Auto);
        assert!("tpu".parse::<Device>().is_err());
    }
}
