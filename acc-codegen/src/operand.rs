//! Operand descriptors (addressing modes)
//!
//! Every lowering step produces a fresh `Operand` describing where its
//! value lives: an immediate, a register of either file, or one of the
//! memory forms. The legalizer rewrites operands in place; the scratch
//! pool uses the `temp` flags to decide whether releasing one means
//! anything.

use acc_common::{FloatFormat, LabelId};
use std::fmt;

use crate::reg::Reg;

/// Which memory region a displacement is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seg {
    Code,
    #[default]
    Data,
    Stack,
}

/// Displacement of a memory operand, or the value of an immediate one
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Disp {
    #[default]
    None,
    Imm(i64),
    /// Internal numbered label
    Label(LabelId),
    /// Named symbol, resolved by the emission layer
    Sym(String),
    /// Floating literal, placed in the literal pool by the emission layer
    Float(f64),
}

impl Disp {
    /// Integer value when this is a plain immediate
    pub fn imm(&self) -> Option<i64> {
        match self {
            Disp::Imm(i) => Some(*i),
            _ => None,
        }
    }
}

/// Addressing mode tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddrMode {
    /// Immediate; value in `disp`
    Imm,
    /// Integer register
    #[default]
    Reg,
    /// Floating register
    FpReg,
    /// Memory at `[reg]`
    Ind,
    /// Memory at `[reg + disp]`
    Indexed,
    /// Memory at `[reg + sreg * scale]`
    Indexed2,
    /// Memory at an absolute/symbolic address
    Direct,
    /// Register-set bit mask (prologue bookkeeping, opaque here)
    Mask,
}

impl AddrMode {
    /// True for the memory forms
    pub fn is_mem(&self) -> bool {
        matches!(
            self,
            AddrMode::Ind | AddrMode::Indexed | AddrMode::Indexed2 | AddrMode::Direct
        )
    }
}

/// Description of where a computed value lives.
///
/// Lifecycle: produced by a lowering call, consumed by its caller, and
/// either released back to the scratch pool or passed further up. Never
/// retained past the statement it was computed for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Operand {
    pub mode: AddrMode,
    /// Primary register (base register for the indexed forms)
    pub reg: Reg,
    /// Secondary/index register for `Indexed2`
    pub sreg: Reg,
    pub scale: u8,
    pub disp: Disp,
    pub seg: Seg,
    pub unsigned: bool,
    pub float: bool,
    pub volatile_ref: bool,
    /// Primary register came from the scratch pool
    pub temp: bool,
    /// Secondary register came from the scratch pool
    pub temp2: bool,
    pub fmt: FloatFormat,
    /// Pool nesting depth at allocation, for release-order checking
    pub depth: u8,
    pub depth2: u8,
}

impl Operand {
    /// Immediate operand carrying an integer value
    pub fn immed(value: i64) -> Self {
        Operand {
            mode: AddrMode::Imm,
            disp: Disp::Imm(value),
            ..Default::default()
        }
    }

    /// Direct reference to an internal data label
    pub fn label(lab: LabelId) -> Self {
        Operand {
            mode: AddrMode::Direct,
            disp: Disp::Label(lab),
            unsigned: true,
            ..Default::default()
        }
    }

    /// Branch target: direct reference to a code label
    pub fn code_label(lab: LabelId) -> Self {
        Operand {
            mode: AddrMode::Direct,
            disp: Disp::Label(lab),
            seg: Seg::Code,
            unsigned: true,
            ..Default::default()
        }
    }

    /// Direct reference to a named symbol
    pub fn sym(name: &str) -> Self {
        Operand {
            mode: AddrMode::Direct,
            disp: Disp::Sym(name.to_string()),
            ..Default::default()
        }
    }

    /// Register-direct operand (not a scratch register)
    pub fn reg_direct(reg: Reg) -> Self {
        Operand {
            mode: AddrMode::Reg,
            reg,
            ..Default::default()
        }
    }

    /// Floating-register operand (not a scratch register)
    pub fn fp_reg(reg: Reg) -> Self {
        Operand {
            mode: AddrMode::FpReg,
            reg,
            float: true,
            ..Default::default()
        }
    }

    /// The hardwired zero register
    pub fn zero() -> Self {
        Operand::reg_direct(Reg::ZERO)
    }

    /// Memory at `[reg]`
    pub fn indirect(reg: Reg) -> Self {
        Operand {
            mode: AddrMode::Ind,
            reg,
            ..Default::default()
        }
    }

    /// Memory at `[reg + offset]`
    pub fn indexed(reg: Reg, offset: i64) -> Self {
        Operand {
            mode: AddrMode::Indexed,
            reg,
            disp: Disp::Imm(offset),
            ..Default::default()
        }
    }

    /// Memory at `[reg + displacement]` with a symbolic displacement
    pub fn indexed_disp(reg: Reg, disp: Disp) -> Self {
        Operand {
            mode: AddrMode::Indexed,
            reg,
            disp,
            ..Default::default()
        }
    }

    /// True when two operands name the identical location: same mode,
    /// registers and displacement. Used to skip the reconciliation move
    /// after a conditional's false branch.
    pub fn same_location(&self, other: &Operand) -> bool {
        self.mode == other.mode
            && self.reg == other.reg
            && self.sreg == other.sreg
            && self.disp == other.disp
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            AddrMode::Imm => match &self.disp {
                Disp::Imm(i) => write!(f, "#{}", i),
                Disp::Label(l) => write!(f, "#L{}", l),
                Disp::Sym(s) => write!(f, "#{}", s),
                Disp::Float(v) => write!(f, "#{}", v),
                Disp::None => write!(f, "#0"),
            },
            AddrMode::Reg => write!(f, "{}", self.reg),
            AddrMode::FpReg => write!(f, "f{}", self.reg.0),
            AddrMode::Ind => write!(f, "[{}]", self.reg),
            AddrMode::Indexed => match &self.disp {
                Disp::Imm(i) => write!(f, "{}[{}]", i, self.reg),
                Disp::Label(l) => write!(f, "L{}[{}]", l, self.reg),
                Disp::Sym(s) => write!(f, "{}[{}]", s, self.reg),
                _ => write!(f, "0[{}]", self.reg),
            },
            AddrMode::Indexed2 => {
                write!(f, "[{}+{}*{}]", self.reg, self.sreg, self.scale.max(1))
            }
            AddrMode::Direct => match &self.disp {
                Disp::Label(l) => write!(f, "L{}", l),
                Disp::Sym(s) => write!(f, "{}", s),
                Disp::Imm(i) => write!(f, "{}", i),
                Disp::Float(v) => write!(f, "{}", v),
                Disp::None => write!(f, "0"),
            },
            AddrMode::Mask => match &self.disp {
                Disp::Imm(i) => write!(f, "mask:{:#x}", i),
                _ => write!(f, "mask:0"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_display() {
        assert_eq!(format!("{}", Operand::immed(42)), "#42");
        assert_eq!(format!("{}", Operand::reg_direct(Reg(5))), "r5");
        assert_eq!(format!("{}", Operand::indirect(Reg(4))), "[r4]");
        assert_eq!(format!("{}", Operand::indexed(Reg::FP, -16)), "-16[fp]");
        assert_eq!(format!("{}", Operand::label(3)), "L3");
    }

    #[test]
    fn test_same_location() {
        let a = Operand::indexed(Reg::FP, -8);
        let b = Operand::indexed(Reg::FP, -8);
        let c = Operand::indexed(Reg::FP, -16);
        assert!(a.same_location(&b));
        assert!(!a.same_location(&c));

        let r = Operand::reg_direct(Reg(5));
        let mut r2 = Operand::reg_direct(Reg(5));
        r2.temp = true;
        // provenance flags do not affect location identity
        assert!(r.same_location(&r2));
    }
}
