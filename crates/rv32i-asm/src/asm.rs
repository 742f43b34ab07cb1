//! Two-pass assembler.
//!
//! Pass 1 records the instruction index each label points at. Pass 2 decodes
//! every instruction line and rewrites label targets into offsets relative to
//! the following instruction (`target - index - 1`).

use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};

use nom::{
    bytes::complete::{take_while, take_while1},
    combinator::{all_consuming, recognize},
    sequence::pair,
    IResult,
};

use crate::{
    error::{AsmError, OperandError},
    inst::{Inst, Mnemonic},
    operand::{parse_immediate, parse_literal, parse_memory_operand, to_word},
    regs::Gpr,
};

/// An assembled program: instructions in index order with their source lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    insts: Vec<Inst>,
    lines: Vec<usize>,
}

impl Program {
    /// Instruction at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Inst> {
        self.insts.get(index)
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Inst> {
        self.insts.iter()
    }

    /// 1-based source line of the instruction at `index`.
    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.lines.get(index).copied()
    }
}

impl FromIterator<Inst> for Program {
    /// Build a program without source lines; every line reports as 0.
    fn from_iter<I: IntoIterator<Item = Inst>>(iter: I) -> Self {
        let insts: Vec<Inst> = iter.into_iter().collect();
        let lines = alloc::vec![0; insts.len()];
        Program { insts, lines }
    }
}

/// What a source line contributes after comment stripping.
enum Line<'a> {
    Blank,
    Label(&'a str),
    Instruction(&'a str),
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find('#'), line.find("//")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    line[..end].trim()
}

fn classify(raw: &str) -> Line<'_> {
    let content = strip_comment(raw);
    if content.is_empty() {
        Line::Blank
    } else if let Some(label) = content.strip_suffix(':') {
        Line::Label(label.trim())
    } else {
        Line::Instruction(content)
    }
}

fn is_identifier(name: &str) -> bool {
    let parsed: IResult<&str, &str> = all_consuming(recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '.'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    )))(name);
    parsed.is_ok()
}

struct Label {
    index: usize,
    line: usize,
}

/// Assemble source text into a [`Program`].
///
/// Labels are lines ending in `:`; they do not occupy an instruction index.
/// Comments start at `#` or `//`. Operands are separated by whitespace or
/// commas and mnemonics are case-insensitive.
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    let mut labels: BTreeMap<&str, Label> = BTreeMap::new();
    let mut count = 0;

    for (n, raw) in source.lines().enumerate() {
        let line = n + 1;
        match classify(raw) {
            Line::Blank => {}
            Line::Label(name) => {
                if !is_identifier(name) {
                    return Err(AsmError::Syntax {
                        line,
                        message: alloc::format!("invalid label name `{}`", name),
                    });
                }
                if let Some(first) = labels.get(name) {
                    return Err(AsmError::DuplicateLabel {
                        line,
                        label: name.to_string(),
                        first_line: first.line,
                    });
                }
                labels.insert(name, Label { index: count, line });
            }
            Line::Instruction(_) => count += 1,
        }
    }

    let mut insts = Vec::with_capacity(count);
    let mut lines = Vec::with_capacity(count);

    for (n, raw) in source.lines().enumerate() {
        let line = n + 1;
        if let Line::Instruction(text) = classify(raw) {
            let ctx = LineContext {
                line,
                index: insts.len(),
                labels: &labels,
            };
            insts.push(ctx.decode(text)?);
            lines.push(line);
        }
    }

    log::debug!(
        "assembled {} instructions, {} labels",
        insts.len(),
        labels.len()
    );

    Ok(Program { insts, lines })
}

struct LineContext<'a> {
    line: usize,
    index: usize,
    labels: &'a BTreeMap<&'a str, Label>,
}

impl LineContext<'_> {
    fn decode(&self, text: &str) -> Result<Inst, AsmError> {
        let mut tokens = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty());
        // `text` is non-empty and trimmed, so there is always a first token
        let first = tokens.next().unwrap_or_default();
        let ops: Vec<&str> = tokens.collect();

        let name = first.to_ascii_uppercase();
        let mnemonic = Mnemonic::lookup(&name).ok_or_else(|| AsmError::UnknownInstruction {
            line: self.line,
            mnemonic: name.clone(),
        })?;

        let inst = match mnemonic {
            Mnemonic::Alu(op) => {
                self.expect(mnemonic, &ops, 3)?;
                Inst::Alu {
                    op,
                    rd: self.reg(mnemonic, ops[0])?,
                    rs1: self.reg(mnemonic, ops[1])?,
                    rs2: self.reg(mnemonic, ops[2])?,
                }
            }
            Mnemonic::AluImm(op) => {
                self.expect(mnemonic, &ops, 3)?;
                Inst::AluImm {
                    op,
                    rd: self.reg(mnemonic, ops[0])?,
                    rs1: self.reg(mnemonic, ops[1])?,
                    imm: self.imm(mnemonic, ops[2])?,
                }
            }
            Mnemonic::Load(width) => {
                self.expect(mnemonic, &ops, 2)?;
                let rd = self.reg(mnemonic, ops[0])?;
                let mem = parse_memory_operand(ops[1]).map_err(|e| self.operand(mnemonic, e))?;
                Inst::Load {
                    width,
                    rd,
                    base: mem.base,
                    offset: mem.offset,
                }
            }
            Mnemonic::Store(width) => {
                self.expect(mnemonic, &ops, 2)?;
                let rs2 = self.reg(mnemonic, ops[0])?;
                let mem = parse_memory_operand(ops[1]).map_err(|e| self.operand(mnemonic, e))?;
                Inst::Store {
                    width,
                    rs2,
                    base: mem.base,
                    offset: mem.offset,
                }
            }
            Mnemonic::Lui | Mnemonic::Auipc => {
                self.expect(mnemonic, &ops, 2)?;
                let rd = self.reg(mnemonic, ops[0])?;
                let imm = self.imm(mnemonic, ops[1])?;
                if mnemonic == Mnemonic::Lui {
                    Inst::Lui { rd, imm }
                } else {
                    Inst::Auipc { rd, imm }
                }
            }
            Mnemonic::Branch(cond) => {
                self.expect(mnemonic, &ops, 3)?;
                Inst::Branch {
                    cond,
                    rs1: self.reg(mnemonic, ops[0])?,
                    rs2: self.reg(mnemonic, ops[1])?,
                    offset: self.target(mnemonic, ops[2])?,
                }
            }
            Mnemonic::Jal => {
                self.expect(mnemonic, &ops, 2)?;
                Inst::Jal {
                    rd: self.reg(mnemonic, ops[0])?,
                    offset: self.target(mnemonic, ops[1])?,
                }
            }
            Mnemonic::Jalr => match ops.len() {
                // JALR rd, offset(rs1)
                2 => {
                    let rd = self.reg(mnemonic, ops[0])?;
                    let mem =
                        parse_memory_operand(ops[1]).map_err(|e| self.operand(mnemonic, e))?;
                    Inst::Jalr {
                        rd,
                        rs1: mem.base,
                        offset: mem.offset,
                    }
                }
                _ => {
                    self.expect(mnemonic, &ops, 3)?;
                    Inst::Jalr {
                        rd: self.reg(mnemonic, ops[0])?,
                        rs1: self.reg(mnemonic, ops[1])?,
                        offset: self.target(mnemonic, ops[2])?,
                    }
                }
            },
            Mnemonic::Halt => {
                self.expect(mnemonic, &ops, 0)?;
                Inst::Halt
            }
        };

        Ok(inst)
    }

    fn expect(&self, mnemonic: Mnemonic, ops: &[&str], n: usize) -> Result<(), AsmError> {
        if ops.len() == n {
            Ok(())
        } else {
            Err(AsmError::Syntax {
                line: self.line,
                message: alloc::format!(
                    "{} expects {} operand{}, found {}",
                    mnemonic.name(),
                    n,
                    if n == 1 { "" } else { "s" },
                    ops.len()
                ),
            })
        }
    }

    fn operand(&self, mnemonic: Mnemonic, source: OperandError) -> AsmError {
        AsmError::Operand {
            line: self.line,
            opcode: mnemonic.name(),
            source,
        }
    }

    fn reg(&self, mnemonic: Mnemonic, token: &str) -> Result<Gpr, AsmError> {
        Gpr::parse(token).map_err(|e| self.operand(mnemonic, e))
    }

    fn imm(&self, mnemonic: Mnemonic, token: &str) -> Result<i32, AsmError> {
        parse_immediate(token).map_err(|e| self.operand(mnemonic, e))
    }

    /// Branch/jump target: a literal offset or a label.
    fn target(&self, mnemonic: Mnemonic, token: &str) -> Result<i32, AsmError> {
        let invalid = || {
            self.operand(
                mnemonic,
                OperandError::InvalidImmediate {
                    token: token.to_string(),
                },
            )
        };

        if let Some(value) = parse_literal(token) {
            return to_word(value).ok_or_else(invalid);
        }

        match self.labels.get(token) {
            Some(label) => {
                let offset = label.index as i64 - self.index as i64 - 1;
                to_word(offset).ok_or_else(invalid)
            }
            None if is_identifier(token) => Err(AsmError::UndefinedLabel {
                line: self.line,
                label: String::from(token),
            }),
            None => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::{AluImmOp, AluOp, BranchCond, LoadWidth, StoreWidth};
    use alloc::vec;

    fn x(n: u8) -> Gpr {
        Gpr::new(n)
    }

    #[test]
    fn test_basic_program() {
        let program = assemble("ADDI x1,x0,10\nADDI x2,x0,5\nADD x3,x1,x2\nHLT").unwrap();
        assert_eq!(program.len(), 4);
        assert_eq!(
            program.get(2),
            Some(&Inst::Alu {
                op: AluOp::Add,
                rd: x(3),
                rs1: x(1),
                rs2: x(2)
            })
        );
        assert_eq!(program.get(3), Some(&Inst::Halt));
        assert_eq!(program.line_of(3), Some(4));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = "
            # header comment
            addi x1, x0, 1   # trailing
            // another style

            addi x2, x0, 2 // trailing too
            hlt
        ";
        let program = assemble(source).unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.line_of(0), Some(3));
        assert_eq!(program.line_of(1), Some(6));
    }

    #[test]
    fn test_forward_label_offset() {
        let source = "JAL x1, target\nADDI x2, x0, 5\ntarget:\nADDI x2, x0, 1\nHLT";
        let program = assemble(source).unwrap();
        assert_eq!(
            program.get(0),
            Some(&Inst::Jal {
                rd: x(1),
                offset: 1
            })
        );
    }

    #[test]
    fn test_backward_and_self_label() {
        let source = "start:\nADDI x1, x1, 1\nloop:\nJAL x0, loop\nBNE x1, x0, start";
        let program = assemble(source).unwrap();
        assert_eq!(
            program.get(1),
            Some(&Inst::Jal {
                rd: Gpr::ZERO,
                offset: -1
            })
        );
        assert_eq!(
            program.get(2),
            Some(&Inst::Branch {
                cond: BranchCond::Ne,
                rs1: x(1),
                rs2: Gpr::ZERO,
                offset: -3
            })
        );
    }

    #[test]
    fn test_numeric_branch_offset() {
        let program = assemble("BEQ x1, x2, -2\nBLTU x1, x2, 0x3").unwrap();
        assert_eq!(
            program.get(0),
            Some(&Inst::Branch {
                cond: BranchCond::Eq,
                rs1: x(1),
                rs2: x(2),
                offset: -2
            })
        );
        assert_eq!(
            program.get(1),
            Some(&Inst::Branch {
                cond: BranchCond::Ltu,
                rs1: x(1),
                rs2: x(2),
                offset: 3
            })
        );
    }

    #[test]
    fn test_label_at_end() {
        let program = assemble("JAL x0, end\nHLT\nend:").unwrap();
        assert_eq!(
            program.get(0),
            Some(&Inst::Jal {
                rd: Gpr::ZERO,
                offset: 1
            })
        );
    }

    #[test]
    fn test_memory_forms() {
        let program = assemble("LW x3, 0(x1)\nSB x2, -1(x4)\nLHW x5, 0x10\nSHW x6, 2(X7)").unwrap();
        assert_eq!(
            program.get(0),
            Some(&Inst::Load {
                width: LoadWidth::Word,
                rd: x(3),
                base: x(1),
                offset: 0
            })
        );
        assert_eq!(
            program.get(1),
            Some(&Inst::Store {
                width: StoreWidth::Byte,
                rs2: x(2),
                base: x(4),
                offset: -1
            })
        );
        assert_eq!(
            program.get(2),
            Some(&Inst::Load {
                width: LoadWidth::Half,
                rd: x(5),
                base: Gpr::ZERO,
                offset: 16
            })
        );
        assert_eq!(
            program.get(3),
            Some(&Inst::Store {
                width: StoreWidth::Half,
                rs2: x(6),
                base: x(7),
                offset: 2
            })
        );
    }

    #[test]
    fn test_jalr_forms() {
        let program = assemble("JALR x1, x2, 4\njalr x1, 8(x2)").unwrap();
        assert_eq!(
            program.get(0),
            Some(&Inst::Jalr {
                rd: x(1),
                rs1: x(2),
                offset: 4
            })
        );
        assert_eq!(
            program.get(1),
            Some(&Inst::Jalr {
                rd: x(1),
                rs1: x(2),
                offset: 8
            })
        );
    }

    #[test]
    fn test_lowercase_and_halt_alias() {
        let program = assemble("addi x1, x0, 0b11\nhalt").unwrap();
        assert_eq!(
            program.get(0),
            Some(&Inst::AluImm {
                op: AluImmOp::Addi,
                rd: x(1),
                rs1: Gpr::ZERO,
                imm: 3
            })
        );
        assert_eq!(program.get(1), Some(&Inst::Halt));
    }

    #[test]
    fn test_is_identifier() {
        for name in ["loop", "_start", ".L1", "end_2", "a.b"] {
            assert!(is_identifier(name), "{:?}", name);
        }
        for name in ["", "1abc", "my label", "a-b", "x:"] {
            assert!(!is_identifier(name), "{:?}", name);
        }
    }

    #[test]
    fn test_empty_source() {
        assert!(assemble("").unwrap().is_empty());
        let program = assemble("  \n# only a comment\nlabel:\n").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn test_unknown_instruction() {
        assert_eq!(
            assemble("ADDI x1, x0, 1\nMUL x1, x2, x3"),
            Err(AsmError::UnknownInstruction {
                line: 2,
                mnemonic: "MUL".to_string()
            })
        );
    }

    #[test]
    fn test_undefined_label() {
        let err = assemble("\nBEQ x1, x2, nowhere").unwrap_err();
        assert_eq!(
            err,
            AsmError::UndefinedLabel {
                line: 2,
                label: "nowhere".to_string()
            }
        );
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_duplicate_label() {
        assert_eq!(
            assemble("a:\nHLT\na:\nHLT"),
            Err(AsmError::DuplicateLabel {
                line: 3,
                label: "a".to_string(),
                first_line: 1
            })
        );
    }

    #[test]
    fn test_invalid_label_name() {
        let err = assemble("HLT\n1abc:").unwrap_err();
        assert!(matches!(err, AsmError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_operand_count() {
        let err = assemble("ADD x1, x2").unwrap_err();
        assert!(matches!(err, AsmError::Syntax { line: 1, .. }));
        let err = assemble("HLT x1").unwrap_err();
        assert!(matches!(err, AsmError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_invalid_register_reports_opcode_and_token() {
        let err = assemble("HLT\nADD x1, x2, x32").unwrap_err();
        assert_eq!(
            err,
            AsmError::Operand {
                line: 2,
                opcode: "ADD",
                source: OperandError::InvalidRegister {
                    token: "x32".to_string()
                }
            }
        );
        assert_eq!(
            err.to_string(),
            "line 2: error decoding ADD: invalid register `x32`"
        );
    }

    #[test]
    fn test_invalid_immediate_and_memory_operand() {
        assert!(matches!(
            assemble("ADDI x1, x0, 12z"),
            Err(AsmError::Operand {
                source: OperandError::InvalidImmediate { .. },
                ..
            })
        ));
        assert!(matches!(
            assemble("LW x1, 4[x2]"),
            Err(AsmError::Operand {
                source: OperandError::InvalidMemoryOperand { .. },
                ..
            })
        ));
        assert!(matches!(
            assemble("BEQ x1, x2, 4x"),
            Err(AsmError::Operand {
                source: OperandError::InvalidImmediate { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_program_from_iter() {
        let program: Program = vec![Inst::Halt].into_iter().collect();
        assert_eq!(program.len(), 1);
        assert_eq!(program.line_of(0), Some(0));
    }
}
