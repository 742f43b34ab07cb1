//! Simulator for a subset of the RISC-V 32-bit integer instruction set.
//!
//! Programs come from [`rv32i_asm::assemble`]. The program counter is an
//! instruction index, memory is a flat little-endian byte array, and every
//! instruction either applies its whole effect or fails without changing
//! anything.

#![no_std]

extern crate alloc;

mod config;
mod error;
mod executor;
mod helpers;
mod logging;
mod machine;
mod memory;
mod session;
mod snapshot;
mod state;

pub use config::{SimConfig, DEFAULT_MAX_STEPS, DEFAULT_TRACE_CAPACITY};
pub use error::{ErrorKind, ErrorReport, ExecError, MemoryAccessKind, MemoryError, SimError};
pub use executor::{alu, execute_instruction, ExecutionResult};
pub use helpers::{
    debug_program, debug_program_with_config, expect_error, expect_memory_error, expect_ok,
    expect_register,
};
pub use logging::{Effect, InstLog, LogLevel};
pub use machine::{Machine, StepResult};
pub use memory::{Memory, DEFAULT_MEMORY_SIZE};
pub use session::Session;
pub use snapshot::{MemoryCell, Snapshot};
pub use state::ProcessorState;
