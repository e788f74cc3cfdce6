// flora-inference 🚀 AGPL-3.0 License

//! Hardware device selection.
use std::fmt;
use std::str::FromStr;

use crate::error::{ClassifyError, Result};

/// Hardware device for the forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// CPU (Central Processing Unit).
    Cpu,
    /// CUDA (Compute Unified Device Architecture) for NVIDIA GPUs.
    /// The argument specifies the device index (e.g., 0 for the first GPU).
    Cuda(usize),
    /// `CoreML` (Apple Core Machine Learning).
    CoreMl,
}

impl Device {
    /// Resolve the accelerator preference from the CLI.
    ///
    /// `yes` requests the accelerated device, `no` forces the CPU.
    ///
    /// # Errors
    ///
    /// Returns a config error for any other value.
    pub fn from_accelerator(preference: &str) -> Result<Self> {
        match preference {
            "yes" => Ok(Self::Cuda(0)),
            "no" => Ok(Self::Cpu),
            other => Err(ClassifyError::ConfigError(format!(
                "Invalid accelerator preference '{other}' (expected yes or no)"
            ))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(i) => write!(f, "cuda:{i}"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.to_lowercase();
        match s.as_str() {
            "cpu" => Ok(Self::Cpu),
            "coreml" => Ok(Self::CoreMl),
            _ => s.strip_prefix("cuda").map_or_else(
                || Err(format!("Unknown device: {s}")),
                |rest| {
                    let index = parse_device_index(rest).unwrap_or(0);
                    Ok(Self::Cuda(index))
                },
            ),
        }
    }
}

/// Helper to parse device index from string (e.g. ":0")
fn parse_device_index(s: &str) -> Option<usize> {
    if s.is_empty() {
        return None;
    }
    s.strip_prefix(':')
        .and_then(|index_str| index_str.parse::<usize>().ok())
}
