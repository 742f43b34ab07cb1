//! Per-instruction execution trace.

use core::fmt;

use rv32i_asm::{Gpr, Inst};

/// Trace verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// No trace is kept.
    #[default]
    None,
    /// Keep an entry for each executed instruction.
    Instructions,
}

/// State change caused by one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// ALU result, register or immediate form.
    Arithmetic {
        rd: Gpr,
        lhs: i32,
        rhs: i32,
        rd_old: i32,
        rd_new: i32,
    },
    Load {
        rd: Gpr,
        addr: i64,
        value: i32,
        rd_old: i32,
    },
    Store {
        addr: i64,
        mem_old: i32,
        mem_new: i32,
    },
    Branch {
        lhs: i32,
        rhs: i32,
        /// `Some` when taken.
        target: Option<u32>,
    },
    Jump {
        rd: Gpr,
        /// `None` if `rd` is `x0`.
        link: Option<i32>,
        target: u32,
    },
    /// `LUI` / `AUIPC`
    Upper { rd: Gpr, rd_old: i32, rd_new: i32 },
    Halt,
}

/// Trace entry for a single executed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstLog {
    /// 1-based step number within the current run.
    pub step: u64,
    pub pc: u32,
    pub inst: Inst,
    pub effect: Effect,
}

impl InstLog {
    pub(crate) fn new(pc: u32, inst: Inst, effect: Effect) -> Self {
        Self {
            step: 0,
            pc,
            inst,
            effect,
        }
    }

    /// Set the step number for this entry.
    pub fn with_step(mut self, step: u64) -> Self {
        self.step = step;
        self
    }
}

impl fmt::Display for InstLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:4}] {:4}: {}", self.step, self.pc, self.inst)?;

        match &self.effect {
            Effect::Arithmetic {
                rd,
                lhs,
                rhs,
                rd_old,
                rd_new,
            } => {
                write!(f, "\n    {}: {} -> {}", rd, rd_old, rd_new)?;
                write!(f, " (lhs={}, rhs={})", lhs, rhs)?;
            }
            Effect::Load {
                rd,
                addr,
                value,
                rd_old,
            } => {
                write!(f, "\n    {}: {} -> {}", rd, rd_old, value)?;
                write!(f, " (mem[{}])", addr)?;
            }
            Effect::Store {
                addr,
                mem_old,
                mem_new,
            } => {
                write!(f, "\n    mem[{}]: {} -> {}", addr, mem_old, mem_new)?;
            }
            Effect::Branch { lhs, rhs, target } => {
                match target {
                    Some(target) => write!(f, "\n    branch taken: {} -> {}", self.pc, target)?,
                    None => write!(f, "\n    branch not taken")?,
                }
                write!(f, " (lhs={}, rhs={})", lhs, rhs)?;
            }
            Effect::Jump { rd, link, target } => {
                if let Some(link) = link {
                    write!(f, "\n    {}: -> {}", rd, link)?;
                }
                write!(f, "\n    jump: {} -> {}", self.pc, target)?;
            }
            Effect::Upper { rd, rd_old, rd_new } => {
                write!(f, "\n    {}: {} -> {}", rd, rd_old, rd_new)?;
            }
            Effect::Halt => write!(f, "\n    halt")?,
        }

        Ok(())
    }
}
