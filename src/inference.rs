// flora-inference 🚀 AGPL-3.0 License

//! Inference configuration.

use crate::device::Device;

/// Configuration for the classification session.
///
/// Uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use flora_inference::{Device, InferenceConfig};
///
/// let config = InferenceConfig::new()
///     .with_device(Device::Cpu)
///     .with_threads(4);
/// ```
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Compute device for the forward pass. `None` selects the CPU.
    pub device: Option<Device>,
    /// Number of intra-op threads for ONNX Runtime.
    /// Setting this to `0` allows ONNX Runtime to choose the optimal number.
    pub num_threads: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: None,
            num_threads: 0,
        }
    }
}

impl InferenceConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the compute device.
    #[must_use]
    pub const fn with_device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Set the number of intra-op threads. `0` lets ONNX Runtime decide.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = InferenceConfig::default();
        assert!(config.device.is_none());
        assert_eq!(config.num_threads, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = InferenceConfig::new()
            .with_device(Device::Cuda(1))
            .with_threads(8);

        assert_eq!(config.device, Some(Device::Cuda(1)));
        assert_eq!(config.num_threads, 8);
    }
}
