//! Execution hints and configuration

use crate::device::Device;

/// Default floor applied to probabilities before taking a logarithm.
pub const DEFAULT_LOG_EPSILON: f64 = 1e-12;

/// Execution hints for controlling engine behavior
#[derive(Clone, Debug, PartialEq)]
pub struct ExecHints {
    /// Require the broadcast flag on every operand whose shape differs
    /// from the output shape
    pub strict_broadcast: bool,
    /// Floor for probabilities in cross-entropy
    pub log_epsilon: f64,
    /// Initial device request
    pub device: Device,
}

impl Default for ExecHints {
    fn default() -> Self {
        Self {
            strict_broadcast: true,
            log_epsilon: DEFAULT_LOG_EPSILON,
            device: Device::Auto,
        }
    }
}

impl ExecHints {
    /// Create new execution hints with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict broadcast checking
    pub fn with_strict_broadcast(mut self, strict: bool) -> Self {
        self.strict_broadcast = strict;
        self
    }

    /// Set the cross-entropy probability floor
    pub fn with_log_epsilon(mut self, eps: f64) -> Self {
        self.log_epsilon = eps;
        self
    }

    /// Set the initial device
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}
