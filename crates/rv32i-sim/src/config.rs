//! Simulator configuration.

use crate::{logging::LogLevel, memory::DEFAULT_MEMORY_SIZE};

/// Default step ceiling for a bulk run.
pub const DEFAULT_MAX_STEPS: u64 = 10_000;

/// Default number of trace entries kept.
pub const DEFAULT_TRACE_CAPACITY: usize = 100;

/// Settings for a [`Machine`](crate::Machine) or [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Data memory size in bytes.
    pub memory_size: usize,
    /// Steps a bulk run may take before it is aborted.
    pub max_steps: u64,
    pub log_level: LogLevel,
    /// Trace ring buffer capacity.
    pub trace_capacity: usize,
    /// Whether `assemble_and_run` keeps registers and memory from the
    /// previous run (only pc and the halt flag are reset).
    pub preserve_state_on_run: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            max_steps: DEFAULT_MAX_STEPS,
            log_level: LogLevel::None,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
            preserve_state_on_run: true,
        }
    }
}

impl SimConfig {
    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    /// Set the maximum number of steps for a bulk run.
    pub fn with_max_steps(mut self, limit: u64) -> Self {
        self.max_steps = limit;
        self
    }

    /// Set the logging level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }

    pub fn with_preserve_state_on_run(mut self, preserve: bool) -> Self {
        self.preserve_state_on_run = preserve;
        self
    }
}
