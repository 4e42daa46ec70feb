//! Compute device selection
//!
//! Only the CPU backend exists in this build. Requesting another device is
//! not an error: the net logs a warning and falls back to the CPU, both at
//! initialization and when loading weights saved on another device.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Device a net's module and tensors live on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
    /// CUDA GPU with its ordinal
    Cuda(usize),
}

impl Device {
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }

    /// Whether this build can execute on the device
    pub fn is_available(&self) -> bool {
        self.is_cpu()
    }

    /// The device itself if available, otherwise the CPU (with a warning)
    pub fn resolve(self) -> Device {
        if self.is_available() {
            return self;
        }
        warn!(requested = %self, "device is not available, falling back to cpu");
        Device::Cpu
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidValue {
            key: "device".into(),
            reason: format!("expected 'cpu', 'cuda' or 'cuda:N', got '{s}'"),
        };
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|n| n.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(invalid),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(0) => f.write_str("cuda"),
            Device::Cuda(n) => write!(f, "cuda:{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:1".parse::<Device>().unwrap(), Device::Cuda(1));
        assert_eq!(Device::Cuda(1).to_string(), "cuda:1");
        assert_eq!(Device::Cuda(0).to_string(), "cuda");
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
    }

    #[test]
    fn test_fallback_to_cpu() {
        assert_eq!(Device::Cuda(0).resolve(), Device::Cpu);
        assert_eq!(Device::Cpu.resolve(), Device::Cpu);
        assert!(!Device::Cuda(3).is_available());
    }
}
