//! Aster64 register model
//!
//! The target has 64 general registers. r0 is hardwired to zero. A
//! small window of registers (r3-r10) is reserved as the expression
//! evaluation scratch pool; the remaining dedicated roles follow the
//! target ABI. Floating values travel in a separate register file of
//! the same width; an `Operand`'s mode says which file a number names.

use std::fmt;

/// A register number, interpreted against the integer or floating file
/// depending on the addressing mode it appears under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Reg(pub u8);

impl Reg {
    /// Hardwired zero
    pub const ZERO: Reg = Reg(0);
    /// Return value
    pub const RV: Reg = Reg(1);
    /// First expression scratch register
    pub const FIRST_TEMP: Reg = Reg(3);
    /// Number of scratch registers in the pool window
    pub const TEMP_COUNT: u8 = 8;
    /// Global data pointer
    pub const GP: Reg = Reg(26);
    /// Class context pointer
    pub const CLP: Reg = Reg(27);
    /// Link register
    pub const LR: Reg = Reg(29);
    /// Frame pointer
    pub const FP: Reg = Reg(30);
    /// Stack pointer
    pub const SP: Reg = Reg(31);
    /// Exchange register for moving bits between the integer and
    /// floating files during extended-precision conversions
    pub const FPX: Reg = Reg(63);

    /// True for registers inside the scratch pool window
    pub fn is_scratch(&self) -> bool {
        self.0 >= Self::FIRST_TEMP.0 && self.0 < Self::FIRST_TEMP.0 + Self::TEMP_COUNT
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reg::GP => write!(f, "gp"),
            Reg::CLP => write!(f, "clp"),
            Reg::LR => write!(f, "lr"),
            Reg::FP => write!(f, "fp"),
            Reg::SP => write!(f, "sp"),
            Reg(n) => write!(f, "r{}", n),
        }
    }
}
