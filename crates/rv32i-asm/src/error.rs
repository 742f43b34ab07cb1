//! Error types for the assembler.

use alloc::string::String;

/// A single operand token that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperandError {
    /// Not `x0`..`x31` or `0`..`31`.
    #[error("invalid register `{token}`")]
    InvalidRegister { token: String },
    /// Not a decimal, `0x` or `0b` literal, or does not fit in 32 bits.
    #[error("invalid immediate `{token}`")]
    InvalidImmediate { token: String },
    /// Neither `offset(reg)` nor a bare integer.
    #[error("invalid memory operand `{token}`")]
    InvalidMemoryOperand { token: String },
}

impl OperandError {
    /// The offending token.
    pub fn token(&self) -> &str {
        match self {
            OperandError::InvalidRegister { token }
            | OperandError::InvalidImmediate { token }
            | OperandError::InvalidMemoryOperand { token } => token,
        }
    }
}

/// Errors that abort assembly. No partial program is produced.
///
/// Every variant carries the 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsmError {
    /// Malformed line: bad label, wrong operand count.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    /// Branch or jump names a label that was never defined.
    #[error("line {line}: undefined label `{label}`")]
    UndefinedLabel { line: usize, label: String },
    /// Label defined more than once.
    #[error("line {line}: label `{label}` already defined on line {first_line}")]
    DuplicateLabel {
        line: usize,
        label: String,
        first_line: usize,
    },
    /// Mnemonic is not part of the supported instruction set.
    #[error("line {line}: unknown instruction `{mnemonic}`")]
    UnknownInstruction { line: usize, mnemonic: String },
    /// An operand of a known instruction failed to decode.
    #[error("line {line}: error decoding {opcode}: {source}")]
    Operand {
        line: usize,
        opcode: &'static str,
        source: OperandError,
    },
}

impl AsmError {
    /// Get the 1-based source line where the error occurred.
    pub fn line(&self) -> usize {
        match self {
            AsmError::Syntax { line, .. }
            | AsmError::UndefinedLabel { line, .. }
            | AsmError::DuplicateLabel { line, .. }
            | AsmError::UnknownInstruction { line, .. }
            | AsmError::Operand { line, .. } => *line,
        }
    }
}
