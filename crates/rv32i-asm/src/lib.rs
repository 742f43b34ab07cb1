//! Assembler for a subset of the RISC-V 32-bit integer instruction set.
//!
//! Source text is turned into a flat [`Program`] of typed [`Inst`] values.
//! Labels are resolved in two passes into signed offsets relative to the
//! instruction that follows the branch or jump, so the program counter is
//! an instruction index rather than a byte address.

#![no_std]

extern crate alloc;

mod asm;
mod error;
mod inst;
mod operand;
mod regs;

pub use asm::{assemble, Program};
pub use error::{AsmError, OperandError};
pub use inst::{AluImmOp, AluOp, BranchCond, Inst, LoadWidth, StoreWidth};
pub use operand::{parse_immediate, parse_literal, parse_memory_operand, MemOperand};
pub use regs::Gpr;
