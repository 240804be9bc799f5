use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Compute device a runner (and every tensor it produces) is bound to.
///
/// Ordinals distinguish multiple accelerators on one host; `cuda` with no
/// ordinal names the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Device {
    Cpu,
    Cuda(u32),
}

/// Error returned when a device name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized device name: {name:?} (expected cpu, cuda, or cuda:N)")]
pub struct DeviceParseError {
    /// The name that failed to parse.
    pub name: String,
}

impl FromStr for Device {
    type Err = DeviceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            other => {
                if let Some(ordinal) = other.strip_prefix("cuda:")
                    && let Ok(ordinal) = ordinal.parse::<u32>()
                {
                    return Ok(Device::Cuda(ordinal));
                }
                Err(DeviceParseError {
                    name: other.to_string(),
                })
            },
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}
