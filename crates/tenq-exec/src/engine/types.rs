//! Reference host engine

use crate::device::DeviceSelector;
use crate::hints::ExecHints;

/// CPU engine running every operation on the host.
///
/// No accelerator is ever reported, so a GPU request resolves to the CPU.
#[derive(Clone, Debug)]
pub struct CpuEngine {
    pub(crate) hints: ExecHints,
    pub(crate) device: DeviceSelector,
    pub(crate) executed: u64,
    pub(crate) failed: u64,
}

impl CpuEngine {
    /// Create an engine with default hints
    pub fn new() -> Self {
        Self::with_hints(ExecHints::default())
    }

    /// Create an engine with explicit hints
    pub fn with_hints(hints: ExecHints) -> Self {
        let mut device = DeviceSelector::new(false);
        device.request(hints.device);
        Self {
            hints,
            device,
            executed: 0,
            failed: 0,
        }
    }

    /// Toggle strict broadcast checking
    pub fn with_strict_broadcast(mut self, strict: bool) -> Self {
        self.hints.strict_broadcast = strict;
        self
    }

    /// Set the cross-entropy probability floor
    pub fn with_log_epsilon(mut self, eps: f64) -> Self {
        self.hints.log_epsilon = eps;
        self
    }

    pub fn hints(&self) -> &ExecHints {
        &self.hints
    }

    /// Number of operations that completed successfully
    pub fn executed_ops(&self) -> u64 {
        self.executed
    }

    /// Number of operations that returned an error
    pub fn failed_ops(&self) -> u64 {
        self.failed
    }
}
