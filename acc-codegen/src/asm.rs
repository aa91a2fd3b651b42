//! Abstract Aster64 instructions
//!
//! The lowering core appends these to an output buffer; a later
//! emission layer turns them into assembly text or machine encoding.
//! Instructions carry zero to three operands. Floating variants carry
//! a format tag selecting the precision the unit operates at.

use acc_common::{FloatFormat, LabelId};
use std::fmt;

use crate::operand::Operand;

/// Abstract opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // moves and address formation
    Ldi,
    Lea,
    Mov,
    Fmov,

    // loads, by width and signedness
    Lb,
    Lbu,
    Lc,
    Lcu,
    Lh,
    Lhu,
    Lw,
    /// Floating load; width from the format tag
    Lf,

    // stores
    Sb,
    Sc,
    Sh,
    Sw,
    Sf,

    // integer arithmetic and logic
    Add,
    Sub,
    Mul,
    Mulu,
    Div,
    Divu,
    Mod,
    Modu,
    And,
    Or,
    Xor,
    Shl,
    Shlu,
    Shr,
    Shru,
    Asr,
    Neg,
    Com,

    // in-register width adjustment
    Sxb,
    Sxc,
    Sxh,

    // floating arithmetic
    Fneg,
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    /// Single to quad widening
    Fcvtsq,
    Itof,
    Ftoi,

    // system
    Csrrw,
    Nop,

    // read-modify-write memory forms
    Inc,
    Dec,

    // calls and stack
    Push,
    Jal,

    // branches
    Bra,
    Beq,
    Bne,
    Blt,
    Ble,
    Bgt,
    Bge,
    Bltu,
    Bleu,
    Bgtu,
    Bgeu,
    Fbeq,
    Fbne,
    Fblt,
    Fble,
    Fbgt,
    Fbge,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Ldi => "ldi",
            Opcode::Lea => "lea",
            Opcode::Mov => "mov",
            Opcode::Fmov => "fmov",
            Opcode::Lb => "lb",
            Opcode::Lbu => "lbu",
            Opcode::Lc => "lc",
            Opcode::Lcu => "lcu",
            Opcode::Lh => "lh",
            Opcode::Lhu => "lhu",
            Opcode::Lw => "lw",
            Opcode::Lf => "lf",
            Opcode::Sb => "sb",
            Opcode::Sc => "sc",
            Opcode::Sh => "sh",
            Opcode::Sw => "sw",
            Opcode::Sf => "sf",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Mulu => "mulu",
            Opcode::Div => "div",
            Opcode::Divu => "divu",
            Opcode::Mod => "mod",
            Opcode::Modu => "modu",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::Shlu => "shlu",
            Opcode::Shr => "shr",
            Opcode::Shru => "shru",
            Opcode::Asr => "asr",
            Opcode::Neg => "neg",
            Opcode::Com => "com",
            Opcode::Sxb => "sxb",
            Opcode::Sxc => "sxc",
            Opcode::Sxh => "sxh",
            Opcode::Fneg => "fneg",
            Opcode::Fadd => "fadd",
            Opcode::Fsub => "fsub",
            Opcode::Fmul => "fmul",
            Opcode::Fdiv => "fdiv",
            Opcode::Fcvtsq => "fcvtsq",
            Opcode::Itof => "itof",
            Opcode::Ftoi => "ftoi",
            Opcode::Csrrw => "csrrw",
            Opcode::Nop => "nop",
            Opcode::Inc => "inc",
            Opcode::Dec => "dec",
            Opcode::Push => "push",
            Opcode::Jal => "jal",
            Opcode::Bra => "bra",
            Opcode::Beq => "beq",
            Opcode::Bne => "bne",
            Opcode::Blt => "blt",
            Opcode::Ble => "ble",
            Opcode::Bgt => "bgt",
            Opcode::Bge => "bge",
            Opcode::Bltu => "bltu",
            Opcode::Bleu => "bleu",
            Opcode::Bgtu => "bgtu",
            Opcode::Bgeu => "bgeu",
            Opcode::Fbeq => "fbeq",
            Opcode::Fbne => "fbne",
            Opcode::Fblt => "fblt",
            Opcode::Fble => "fble",
            Opcode::Fbgt => "fbgt",
            Opcode::Fbge => "fbge",
        };
        write!(f, "{}", name)
    }
}

/// One element of the output stream: an instruction or a label binding
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Op {
        op: Opcode,
        /// Precision tag for floating variants
        fmt: Option<FloatFormat>,
        ops: Vec<Operand>,
    },
    Label(LabelId),
}

impl Instr {
    pub fn new(op: Opcode, ops: Vec<Operand>) -> Self {
        Instr::Op { op, fmt: None, ops }
    }

    pub fn with_fmt(op: Opcode, fmt: FloatFormat, ops: Vec<Operand>) -> Self {
        Instr::Op {
            op,
            fmt: Some(fmt),
            ops,
        }
    }

    /// Opcode of an instruction element, if it is one
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Instr::Op { op, .. } => Some(*op),
            Instr::Label(_) => None,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(lab) => write!(f, "L{}:", lab),
            Instr::Op { op, fmt: tag, ops } => {
                write!(f, "    {}", op)?;
                if let Some(tag) = tag {
                    write!(f, ".{}", tag)?;
                }
                for (i, operand) in ops.iter().enumerate() {
                    if i == 0 {
                        write!(f, " {}", operand)?;
                    } else {
                        write!(f, ",{}", operand)?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::Reg;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_instruction_display() {
        let add = Instr::new(
            Opcode::Add,
            vec![
                Operand::reg_direct(Reg(3)),
                Operand::reg_direct(Reg(3)),
                Operand::reg_direct(Reg(4)),
            ],
        );
        assert_eq!(format!("{}", add), "    add r3,r3,r4");

        let ldi = Instr::new(Opcode::Ldi, vec![Operand::reg_direct(Reg(3)), Operand::immed(10)]);
        assert_eq!(format!("{}", ldi), "    ldi r3,#10");

        assert_eq!(format!("{}", Instr::Label(4)), "L4:");
    }

    #[test]
    fn test_float_format_tag() {
        let fadd = Instr::with_fmt(
            Opcode::Fadd,
            FloatFormat::Double,
            vec![
                Operand::reg_direct(Reg(3)),
                Operand::reg_direct(Reg(3)),
                Operand::reg_direct(Reg(4)),
            ],
        );
        assert_eq!(format!("{}", fadd), "    fadd.d r3,r3,r4");
    }

    #[test]
    fn test_memory_operand_display() {
        let lw = Instr::new(
            Opcode::Lw,
            vec![Operand::reg_direct(Reg(3)), Operand::indexed(Reg::FP, -24)],
        );
        assert_eq!(format!("{}", lw), "    lw r3,-24[fp]");
    }
}
