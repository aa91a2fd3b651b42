//! Basic machine-level definitions shared across compiler phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label identifier for code generation
pub type LabelId = u32;

/// Size of a machine word in bytes
pub const SIZE_OF_WORD: u32 = 8;

/// Size of a double-precision float in bytes
pub const SIZE_OF_FPD: u32 = 8;

/// Size of a triple-precision float in bytes
pub const SIZE_OF_FPT: u32 = 12;

/// Size of a quad-precision float in bytes
pub const SIZE_OF_FPQ: u32 = 16;

/// Floating-point format tag attached to floating instruction variants.
///
/// The Aster64 floating unit implements four widths of the same opcode
/// family; the tag selects which one an instruction operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FloatFormat {
    /// Single precision (32 bits)
    Single,
    /// Double precision (64 bits)
    #[default]
    Double,
    /// Triple precision (96 bits)
    Triple,
    /// Quad precision (128 bits)
    Quad,
}

impl FloatFormat {
    /// Format for a floating type of the given bit precision
    pub fn from_precision(precision: u16) -> Self {
        match precision {
            32 => FloatFormat::Single,
            64 => FloatFormat::Double,
            96 => FloatFormat::Triple,
            128 => FloatFormat::Quad,
            _ => FloatFormat::Triple,
        }
    }

    /// Size of a value of this format in bytes
    pub fn size(&self) -> u32 {
        match self {
            FloatFormat::Single => 4,
            FloatFormat::Double => SIZE_OF_FPD,
            FloatFormat::Triple => SIZE_OF_FPT,
            FloatFormat::Quad => SIZE_OF_FPQ,
        }
    }
}

impl fmt::Display for FloatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloatFormat::Single => write!(f, "s"),
            FloatFormat::Double => write!(f, "d"),
            FloatFormat::Triple => write!(f, "t"),
            FloatFormat::Quad => write!(f, "q"),
        }
    }
}
