//! Aster64 C Compiler - Target Description
//!
//! This crate defines the Aster64 register model, the operand
//! descriptors (addressing modes) the lowering core trades in, and the
//! abstract instruction set handed to the emission layer.

pub mod asm;
pub mod operand;
pub mod reg;

pub use asm::{Instr, Opcode};
pub use operand::{AddrMode, Disp, Operand, Seg};
pub use reg::Reg;
