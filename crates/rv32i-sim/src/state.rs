//! Architectural register state.

use rv32i_asm::Gpr;

/// Register file, program counter and halt flag.
///
/// `pc` is an index into the instruction list, not a byte address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessorState {
    regs: [i32; 32],
    pub pc: u32,
    pub halted: bool,
}

impl ProcessorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a register. `x0` is always zero.
    pub fn read(&self, reg: Gpr) -> i32 {
        if reg == Gpr::ZERO {
            0
        } else {
            self.regs[reg.index()]
        }
    }

    /// Write a register. Writes to `x0` are discarded.
    pub fn write(&mut self, reg: Gpr, value: i32) {
        if reg != Gpr::ZERO {
            self.regs[reg.index()] = value;
        }
    }

    pub fn regs(&self) -> &[i32; 32] {
        &self.regs
    }

    /// Rewind to the first instruction, keeping registers.
    pub fn restart(&mut self) {
        self.pc = 0;
        self.halted = false;
    }

    /// Zero everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
