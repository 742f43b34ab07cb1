//! Typed RV32I instruction set.
//!
//! The assembler resolves every operand up front, so an [`Inst`] carries only
//! registers and integers. Branch and `JAL` offsets are relative to the next
//! instruction index; `JALR` offsets are added to a register to form an
//! absolute index.

use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::fmt;

use crate::regs::Gpr;

/// Register-register ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

impl AluOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::Sll => "SLL",
            AluOp::Slt => "SLT",
            AluOp::Sltu => "SLTU",
            AluOp::Xor => "XOR",
            AluOp::Srl => "SRL",
            AluOp::Sra => "SRA",
            AluOp::Or => "OR",
            AluOp::And => "AND",
        }
    }
}

/// Register-immediate ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluImmOp {
    Addi,
    Slli,
    Slti,
    Sltiu,
    Xori,
    Srli,
    Srai,
    Ori,
    Andi,
}

impl AluImmOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            AluImmOp::Addi => "ADDI",
            AluImmOp::Slli => "SLLI",
            AluImmOp::Slti => "SLTI",
            AluImmOp::Sltiu => "SLTIU",
            AluImmOp::Xori => "XORI",
            AluImmOp::Srli => "SRLI",
            AluImmOp::Srai => "SRAI",
            AluImmOp::Ori => "ORI",
            AluImmOp::Andi => "ANDI",
        }
    }

    /// The register-register operation computing the same function.
    pub fn alu_op(self) -> AluOp {
        match self {
            AluImmOp::Addi => AluOp::Add,
            AluImmOp::Slli => AluOp::Sll,
            AluImmOp::Slti => AluOp::Slt,
            AluImmOp::Sltiu => AluOp::Sltu,
            AluImmOp::Xori => AluOp::Xor,
            AluImmOp::Srli => AluOp::Srl,
            AluImmOp::Srai => AluOp::Sra,
            AluImmOp::Ori => AluOp::Or,
            AluImmOp::Andi => AluOp::And,
        }
    }
}

/// Load width and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadWidth {
    Byte,
    Half,
    Word,
    ByteUnsigned,
    HalfUnsigned,
}

impl LoadWidth {
    pub fn mnemonic(self) -> &'static str {
        match self {
            LoadWidth::Byte => "LB",
            LoadWidth::Half => "LH",
            LoadWidth::Word => "LW",
            LoadWidth::ByteUnsigned => "LBU",
            LoadWidth::HalfUnsigned => "LHU",
        }
    }

    /// Access size in bytes.
    pub fn bytes(self) -> usize {
        match self {
            LoadWidth::Byte | LoadWidth::ByteUnsigned => 1,
            LoadWidth::Half | LoadWidth::HalfUnsigned => 2,
            LoadWidth::Word => 4,
        }
    }
}

/// Store width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWidth {
    Byte,
    Half,
    Word,
}

impl StoreWidth {
    pub fn mnemonic(self) -> &'static str {
        match self {
            StoreWidth::Byte => "SB",
            StoreWidth::Half => "SH",
            StoreWidth::Word => "SW",
        }
    }

    /// Access size in bytes.
    pub fn bytes(self) -> usize {
        match self {
            StoreWidth::Byte => 1,
            StoreWidth::Half => 2,
            StoreWidth::Word => 4,
        }
    }
}

/// Branch comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCond {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

impl BranchCond {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BranchCond::Eq => "BEQ",
            BranchCond::Ne => "BNE",
            BranchCond::Lt => "BLT",
            BranchCond::Ge => "BGE",
            BranchCond::Ltu => "BLTU",
            BranchCond::Geu => "BGEU",
        }
    }

    /// Evaluate the comparison. `Ltu`/`Geu` compare the unsigned bit patterns.
    pub fn holds(self, a: i32, b: i32) -> bool {
        match self {
            BranchCond::Eq => a == b,
            BranchCond::Ne => a != b,
            BranchCond::Lt => a < b,
            BranchCond::Ge => a >= b,
            BranchCond::Ltu => (a as u32) < (b as u32),
            BranchCond::Geu => (a as u32) >= (b as u32),
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    /// `rd = rs1 op rs2`
    Alu {
        op: AluOp,
        rd: Gpr,
        rs1: Gpr,
        rs2: Gpr,
    },
    /// `rd = rs1 op imm`
    AluImm {
        op: AluImmOp,
        rd: Gpr,
        rs1: Gpr,
        imm: i32,
    },
    /// `rd = mem[base + offset]`
    Load {
        width: LoadWidth,
        rd: Gpr,
        base: Gpr,
        offset: i32,
    },
    /// `mem[base + offset] = rs2`
    Store {
        width: StoreWidth,
        rs2: Gpr,
        base: Gpr,
        offset: i32,
    },
    /// `rd = imm << 12`
    Lui { rd: Gpr, imm: i32 },
    /// `rd = pc + (imm << 12)`
    Auipc { rd: Gpr, imm: i32 },
    /// `if cond(rs1, rs2) { pc = pc + 1 + offset }`
    Branch {
        cond: BranchCond,
        rs1: Gpr,
        rs2: Gpr,
        offset: i32,
    },
    /// `rd = pc + 1; pc = pc + 1 + offset`
    Jal { rd: Gpr, offset: i32 },
    /// `rd = pc + 1; pc = rs1 + offset`
    Jalr { rd: Gpr, rs1: Gpr, offset: i32 },
    /// Stop the machine.
    Halt,
}

impl Inst {
    /// Canonical upper-case mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Inst::Alu { op, .. } => op.mnemonic(),
            Inst::AluImm { op, .. } => op.mnemonic(),
            Inst::Load { width, .. } => width.mnemonic(),
            Inst::Store { width, .. } => width.mnemonic(),
            Inst::Lui { .. } => "LUI",
            Inst::Auipc { .. } => "AUIPC",
            Inst::Branch { cond, .. } => cond.mnemonic(),
            Inst::Jal { .. } => "JAL",
            Inst::Jalr { .. } => "JALR",
            Inst::Halt => "HLT",
        }
    }

    /// Resolved operands in source order.
    pub fn operands(&self) -> Vec<String> {
        match *self {
            Inst::Alu { rd, rs1, rs2, .. } => {
                vec![rd.to_string(), rs1.to_string(), rs2.to_string()]
            }
            Inst::AluImm { rd, rs1, imm, .. } => {
                vec![rd.to_string(), rs1.to_string(), imm.to_string()]
            }
            Inst::Load {
                rd, base, offset, ..
            } => vec![rd.to_string(), format!("{}({})", offset, base)],
            Inst::Store {
                rs2, base, offset, ..
            } => vec![rs2.to_string(), format!("{}({})", offset, base)],
            Inst::Lui { rd, imm } | Inst::Auipc { rd, imm } => {
                vec![rd.to_string(), imm.to_string()]
            }
            Inst::Branch {
                rs1, rs2, offset, ..
            } => vec![rs1.to_string(), rs2.to_string(), offset.to_string()],
            Inst::Jal { rd, offset } => vec![rd.to_string(), offset.to_string()],
            Inst::Jalr { rd, rs1, offset } => {
                vec![rd.to_string(), rs1.to_string(), offset.to_string()]
            }
            Inst::Halt => Vec::new(),
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        for (i, operand) in self.operands().iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}

/// Instruction kind selected by a mnemonic, before operands are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mnemonic {
    Alu(AluOp),
    AluImm(AluImmOp),
    Load(LoadWidth),
    Store(StoreWidth),
    Lui,
    Auipc,
    Branch(BranchCond),
    Jal,
    Jalr,
    Halt,
}

impl Mnemonic {
    /// Look up an upper-cased mnemonic, including the accepted aliases.
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        let m = match name {
            "ADD" => Mnemonic::Alu(AluOp::Add),
            "SUB" => Mnemonic::Alu(AluOp::Sub),
            "SLL" => Mnemonic::Alu(AluOp::Sll),
            "SLT" => Mnemonic::Alu(AluOp::Slt),
            "SLTU" => Mnemonic::Alu(AluOp::Sltu),
            "XOR" => Mnemonic::Alu(AluOp::Xor),
            "SRL" => Mnemonic::Alu(AluOp::Srl),
            "SRA" => Mnemonic::Alu(AluOp::Sra),
            "OR" => Mnemonic::Alu(AluOp::Or),
            "AND" => Mnemonic::Alu(AluOp::And),
            "ADDI" => Mnemonic::AluImm(AluImmOp::Addi),
            "SLLI" => Mnemonic::AluImm(AluImmOp::Slli),
            "SLTI" => Mnemonic::AluImm(AluImmOp::Slti),
            "SLTIU" => Mnemonic::AluImm(AluImmOp::Sltiu),
            "XORI" => Mnemonic::AluImm(AluImmOp::Xori),
            "SRLI" => Mnemonic::AluImm(AluImmOp::Srli),
            "SRAI" => Mnemonic::AluImm(AluImmOp::Srai),
            "ORI" => Mnemonic::AluImm(AluImmOp::Ori),
            "ANDI" => Mnemonic::AluImm(AluImmOp::Andi),
            "LB" => Mnemonic::Load(LoadWidth::Byte),
            "LH" | "LHW" => Mnemonic::Load(LoadWidth::Half),
            "LW" => Mnemonic::Load(LoadWidth::Word),
            "LBU" => Mnemonic::Load(LoadWidth::ByteUnsigned),
            "LHU" | "LHWU" => Mnemonic::Load(LoadWidth::HalfUnsigned),
            "SB" => Mnemonic::Store(StoreWidth::Byte),
            "SH" | "SHW" => Mnemonic::Store(StoreWidth::Half),
            "SW" => Mnemonic::Store(StoreWidth::Word),
            "LUI" => Mnemonic::Lui,
            "AUIPC" => Mnemonic::Auipc,
            "BEQ" => Mnemonic::Branch(BranchCond::Eq),
            "BNE" => Mnemonic::Branch(BranchCond::Ne),
            "BLT" => Mnemonic::Branch(BranchCond::Lt),
            "BGE" => Mnemonic::Branch(BranchCond::Ge),
            "BLTU" => Mnemonic::Branch(BranchCond::Ltu),
            "BGEU" => Mnemonic::Branch(BranchCond::Geu),
            "JAL" => Mnemonic::Jal,
            "JALR" => Mnemonic::Jalr,
            "HLT" | "HALT" => Mnemonic::Halt,
            _ => return None,
        };
        Some(m)
    }

    /// Canonical name, used in error messages.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Mnemonic::Alu(op) => op.mnemonic(),
            Mnemonic::AluImm(op) => op.mnemonic(),
            Mnemonic::Load(width) => width.mnemonic(),
            Mnemonic::Store(width) => width.mnemonic(),
            Mnemonic::Lui => "LUI",
            Mnemonic::Auipc => "AUIPC",
            Mnemonic::Branch(cond) => cond.mnemonic(),
            Mnemonic::Jal => "JAL",
            Mnemonic::Jalr => "JALR",
            Mnemonic::Halt => "HLT",
        }
    }
}
