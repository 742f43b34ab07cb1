//! Instruction executor.

use rv32i_asm::{AluOp, Gpr, Inst, LoadWidth, StoreWidth};

use crate::{
    error::ExecError,
    logging::{Effect, InstLog},
    memory::Memory,
    state::ProcessorState,
};

/// Result of executing a single instruction.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// New pc value (`None` means pc += 1)
    pub new_pc: Option<u32>,
    /// Whether the machine stopped (`HLT`)
    pub halted: bool,
    /// Log entry for this instruction
    pub log: InstLog,
}

/// Evaluate an ALU operation with 32-bit wraparound.
///
/// Shift amounts use the low 5 bits of `b`.
pub fn alu(op: AluOp, a: i32, b: i32) -> i32 {
    let shamt = (b as u32) & 0x1f;
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Sll => ((a as u32) << shamt) as i32,
        AluOp::Slt => (a < b) as i32,
        AluOp::Sltu => ((a as u32) < (b as u32)) as i32,
        AluOp::Xor => a ^ b,
        AluOp::Srl => ((a as u32) >> shamt) as i32,
        AluOp::Sra => a >> shamt,
        AluOp::Or => a | b,
        AluOp::And => a & b,
    }
}

/// Check that a computed target is a valid instruction index.
fn jump_target(target: i64) -> Result<u32, ExecError> {
    u32::try_from(target).map_err(|_| ExecError::InvalidJumpTarget { target })
}

/// `pc + 1 + offset`
fn relative_target(pc: u32, offset: i32) -> Result<u32, ExecError> {
    jump_target(pc as i64 + 1 + offset as i64)
}

fn effective_address(state: &ProcessorState, base: Gpr, offset: i32) -> i64 {
    state.read(base) as i64 + offset as i64
}

fn load(memory: &Memory, width: LoadWidth, addr: i64) -> Result<i32, ExecError> {
    let value = match width {
        LoadWidth::Byte => memory.read_byte_signed(addr)?,
        LoadWidth::ByteUnsigned => memory.read_byte(addr)? as i32,
        LoadWidth::Half => memory.read_half(addr)?,
        LoadWidth::HalfUnsigned => memory.read_half_unsigned(addr)?,
        LoadWidth::Word => memory.read_word(addr)?,
    };
    Ok(value)
}

/// Execute one instruction against `state` and `memory`.
///
/// On error nothing has been modified. `state.pc` is read but never written;
/// the caller applies [`ExecutionResult::new_pc`].
pub fn execute_instruction(
    inst: &Inst,
    state: &mut ProcessorState,
    memory: &mut Memory,
) -> Result<ExecutionResult, ExecError> {
    let pc = state.pc;
    let mut new_pc: Option<u32> = None;
    let mut halted = false;

    let effect = match *inst {
        Inst::Alu { op, rd, rs1, rs2 } => {
            let lhs = state.read(rs1);
            let rhs = state.read(rs2);
            let rd_old = state.read(rd);
            state.write(rd, alu(op, lhs, rhs));
            Effect::Arithmetic {
                rd,
                lhs,
                rhs,
                rd_old,
                rd_new: state.read(rd),
            }
        }
        Inst::AluImm { op, rd, rs1, imm } => {
            let lhs = state.read(rs1);
            let rd_old = state.read(rd);
            state.write(rd, alu(op.alu_op(), lhs, imm));
            Effect::Arithmetic {
                rd,
                lhs,
                rhs: imm,
                rd_old,
                rd_new: state.read(rd),
            }
        }
        Inst::Load {
            width,
            rd,
            base,
            offset,
        } => {
            let addr = effective_address(state, base, offset);
            let value = load(memory, width, addr)?;
            let rd_old = state.read(rd);
            state.write(rd, value);
            Effect::Load {
                rd,
                addr,
                value,
                rd_old,
            }
        }
        Inst::Store {
            width,
            rs2,
            base,
            offset,
        } => {
            let addr = effective_address(state, base, offset);
            let value = state.read(rs2);

            // Read old value before write
            let mem_old = match width {
                StoreWidth::Byte => memory.read_byte(addr).map(i32::from),
                StoreWidth::Half => memory.read_half_unsigned(addr),
                StoreWidth::Word => memory.read_word(addr),
            }
            .unwrap_or(0);
            let mem_new = match width {
                StoreWidth::Byte => value & 0xff,
                StoreWidth::Half => value & 0xffff,
                StoreWidth::Word => value,
            };

            match width {
                StoreWidth::Byte => memory.write_byte(addr, value)?,
                StoreWidth::Half => memory.write_half(addr, value)?,
                StoreWidth::Word => memory.write_word(addr, value)?,
            }
            Effect::Store {
                addr,
                mem_old,
                mem_new,
            }
        }
        Inst::Lui { rd, imm } => {
            let rd_old = state.read(rd);
            state.write(rd, imm.wrapping_shl(12));
            Effect::Upper {
                rd,
                rd_old,
                rd_new: state.read(rd),
            }
        }
        Inst::Auipc { rd, imm } => {
            let rd_old = state.read(rd);
            state.write(rd, (pc as i32).wrapping_add(imm.wrapping_shl(12)));
            Effect::Upper {
                rd,
                rd_old,
                rd_new: state.read(rd),
            }
        }
        Inst::Branch {
            cond,
            rs1,
            rs2,
            offset,
        } => {
            let lhs = state.read(rs1);
            let rhs = state.read(rs2);
            let target = if cond.holds(lhs, rhs) {
                Some(relative_target(pc, offset)?)
            } else {
                None
            };
            new_pc = target;
            Effect::Branch { lhs, rhs, target }
        }
        Inst::Jal { rd, offset } => {
            let target = relative_target(pc, offset)?;
            let link = pc.wrapping_add(1) as i32;
            state.write(rd, link);
            new_pc = Some(target);
            Effect::Jump {
                rd,
                link: (rd != Gpr::ZERO).then_some(link),
                target,
            }
        }
        Inst::Jalr { rd, rs1, offset } => {
            // rs1 is read before rd is written, so `JALR x1, x1, 0` works
            let target = jump_target(state.read(rs1) as i64 + offset as i64)?;
            let link = pc.wrapping_add(1) as i32;
            state.write(rd, link);
            new_pc = Some(target);
            Effect::Jump {
                rd,
                link: (rd != Gpr::ZERO).then_some(link),
                target,
            }
        }
        Inst::Halt => {
            halted = true;
            Effect::Halt
        }
    };

    Ok(ExecutionResult {
        new_pc,
        halted,
        log: InstLog::new(pc, *inst, effect),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv32i_asm::BranchCond;

    #[test]
    fn test_alu_ops() {
        assert_eq!(alu(AluOp::Add, i32::MAX, 1), i32::MIN);
        assert_eq!(alu(AluOp::Sub, i32::MIN, 1), i32::MAX);
        assert_eq!(alu(AluOp::Sll, 1, 33), 2);
        assert_eq!(alu(AluOp::Slt, -1, 0), 1);
        assert_eq!(alu(AluOp::Sltu, -1, 0), 0);
        assert_eq!(alu(AluOp::Xor, 0b1100, 0b1010), 0b0110);
        assert_eq!(alu(AluOp::Srl, -8, 1), 0x7FFF_FFFC);
        assert_eq!(alu(AluOp::Sra, -8, 1), -4);
        assert_eq!(alu(AluOp::Sra, -8, 32), -8);
        assert_eq!(alu(AluOp::Or, 0b1100, 0b1010), 0b1110);
        assert_eq!(alu(AluOp::And, 0b1100, 0b1010), 0b1000);
    }

    #[test]
    fn test_branch_taken_redirects() {
        let mut state = ProcessorState::new();
        let mut mem = Memory::new(16);
        state.pc = 5;
        let inst = Inst::Branch {
            cond: BranchCond::Eq,
            rs1: Gpr::ZERO,
            rs2: Gpr::ZERO,
            offset: -1,
        };
        let result = execute_instruction(&inst, &mut state, &mut mem).unwrap();
        assert_eq!(result.new_pc, Some(5));
        assert!(!result.halted);
    }

    #[test]
    fn test_branch_not_taken_advances() {
        let mut state = ProcessorState::new();
        let mut mem = Memory::new(16);
        state.write(Gpr::new(1), 1);
        let inst = Inst::Branch {
            cond: BranchCond::Eq,
            rs1: Gpr::new(1),
            rs2: Gpr::ZERO,
            offset: 10,
        };
        let result = execute_instruction(&inst, &mut state, &mut mem).unwrap();
        assert_eq!(result.new_pc, None);
    }

    #[test]
    fn test_negative_jump_target_changes_nothing() {
        let mut state = ProcessorState::new();
        let mut mem = Memory::new(16);
        let inst = Inst::Jal {
            rd: Gpr::RA,
            offset: -2,
        };
        let err = execute_instruction(&inst, &mut state, &mut mem).unwrap_err();
        assert_eq!(err, ExecError::InvalidJumpTarget { target: -1 });
        assert_eq!(state.read(Gpr::RA), 0);
    }

    #[test]
    fn test_failed_load_changes_nothing() {
        let mut state = ProcessorState::new();
        let mut mem = Memory::new(16);
        state.write(Gpr::new(2), 7);
        let inst = Inst::Load {
            width: LoadWidth::Word,
            rd: Gpr::new(2),
            base: Gpr::ZERO,
            offset: 14,
        };
        assert!(execute_instruction(&inst, &mut state, &mut mem).is_err());
        assert_eq!(state.read(Gpr::new(2)), 7);
    }

    #[test]
    fn test_halt() {
        let mut state = ProcessorState::new();
        let mut mem = Memory::new(16);
        let result = execute_instruction(&Inst::Halt, &mut state, &mut mem).unwrap();
        assert!(result.halted);
        assert_eq!(result.new_pc, None);
        assert_eq!(result.log.effect, Effect::Halt);
    }
}
