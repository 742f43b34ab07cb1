//! Error types for the simulator.

use alloc::{
    boxed::Box,
    string::{String, ToString},
};
use core::fmt;

use rv32i_asm::{AsmError, OperandError};
use serde::Serialize;

use crate::snapshot::Snapshot;

/// Kind of memory access that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryAccessKind {
    Read,
    Write,
}

impl fmt::Display for MemoryAccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryAccessKind::Read => f.write_str("read"),
            MemoryAccessKind::Write => f.write_str("write"),
        }
    }
}

/// Access outside `[0, size)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "memory {kind} of {width} byte(s) at address {address} is out of bounds (size: {size} bytes)"
)]
pub struct MemoryError {
    pub address: i64,
    pub width: usize,
    pub kind: MemoryAccessKind,
    pub size: usize,
}

/// Failure while executing a single instruction. State is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error(transparent)]
    MemoryOutOfBounds(#[from] MemoryError),
    /// Branch or jump to a negative instruction index.
    #[error("jump target {target} is not a valid instruction index")]
    InvalidJumpTarget { target: i64 },
}

/// Errors surfaced by the machine and session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimError {
    /// Source failed to assemble. The session is left unchanged.
    #[error(transparent)]
    Assemble(#[from] AsmError),
    /// Source was empty or whitespace only.
    #[error("source is empty")]
    EmptySource,
    /// Source assembled to zero instructions.
    #[error("source contains no instructions")]
    NoInstructions,
    /// `step` called with nothing assembled.
    #[error("no program loaded")]
    NoProgramLoaded,
    /// An instruction failed at run time.
    #[error("line {line}: error executing {opcode} at pc {pc}: {source}")]
    Execution {
        pc: u32,
        line: usize,
        opcode: &'static str,
        source: ExecError,
    },
    /// Step ceiling reached during a bulk run.
    #[error("execution exceeded {limit} steps without halting")]
    RunawayExecution {
        limit: u64,
        snapshot: Box<Snapshot>,
    },
}

/// Error taxonomy name reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    SyntaxError,
    InvalidRegister,
    InvalidImmediate,
    InvalidMemoryOperand,
    UnknownInstruction,
    MemoryOutOfBounds,
    InvalidJumpTarget,
    RunawayExecution,
    NoProgramLoaded,
    EmptySource,
    NoInstructions,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::InvalidRegister => "InvalidRegister",
            ErrorKind::InvalidImmediate => "InvalidImmediate",
            ErrorKind::InvalidMemoryOperand => "InvalidMemoryOperand",
            ErrorKind::UnknownInstruction => "UnknownInstruction",
            ErrorKind::MemoryOutOfBounds => "MemoryOutOfBounds",
            ErrorKind::InvalidJumpTarget => "InvalidJumpTarget",
            ErrorKind::RunawayExecution => "RunawayExecution",
            ErrorKind::NoProgramLoaded => "NoProgramLoaded",
            ErrorKind::EmptySource => "EmptySource",
            ErrorKind::NoInstructions => "NoInstructions",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured `{kind, message}` form of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::Assemble(err) => match err {
                AsmError::Syntax { .. }
                | AsmError::UndefinedLabel { .. }
                | AsmError::DuplicateLabel { .. } => ErrorKind::SyntaxError,
                AsmError::UnknownInstruction { .. } => ErrorKind::UnknownInstruction,
                AsmError::Operand { source, .. } => match source {
                    OperandError::InvalidRegister { .. } => ErrorKind::InvalidRegister,
                    OperandError::InvalidImmediate { .. } => ErrorKind::InvalidImmediate,
                    OperandError::InvalidMemoryOperand { .. } => ErrorKind::InvalidMemoryOperand,
                },
            },
            SimError::EmptySource => ErrorKind::EmptySource,
            SimError::NoInstructions => ErrorKind::NoInstructions,
            SimError::NoProgramLoaded => ErrorKind::NoProgramLoaded,
            SimError::Execution { source, .. } => match source {
                ExecError::MemoryOutOfBounds(_) => ErrorKind::MemoryOutOfBounds,
                ExecError::InvalidJumpTarget { .. } => ErrorKind::InvalidJumpTarget,
            },
            SimError::RunawayExecution { .. } => ErrorKind::RunawayExecution,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Partial state attached to a runaway run.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            SimError::RunawayExecution { snapshot, .. } => Some(snapshot.as_ref()),
            _ => None,
        }
    }

    /// 1-based source line, when the error is tied to one.
    pub fn line(&self) -> Option<usize> {
        match self {
            SimError::Assemble(err) => Some(err.line()),
            SimError::Execution { line, .. } => Some(*line),
            _ => None,
        }
    }
}
