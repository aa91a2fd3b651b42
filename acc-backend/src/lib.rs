//! Aster64 C Compiler - Expression Lowering
//!
//! One-pass translation of typed expression trees into abstract
//! Aster64 instructions. The entry point is [`LoweringContext`]: feed
//! it one statement tree at a time through [`LoweringContext::lower_stmt`]
//! or [`LoweringContext::lower_expr`], then drain the buffer with
//! [`LoweringContext::take_instructions`].
//!
//! The design is a single recursive walk. Every node is lowered to an
//! operand descriptor, then coerced to whatever the consuming
//! instruction can accept ("legalized"). Scratch registers come from a
//! strict LIFO pool; an expression too deep for the pool is a reported
//! error, not a spill.

pub mod cse;
pub mod lower;
pub mod regpool;
pub mod size;

#[cfg(test)]
mod tests;

pub use cse::{CseCandidate, CseSet};
pub use lower::{LoweringContext, Request};
pub use regpool::TempPool;

/// Tunables for the lowering pass.
///
/// Defaults match the normal compilation model: globals addressed
/// through the global pointer and four predicate registers available
/// to nested conditionals.
#[derive(Debug, Clone)]
pub struct LoweringOptions {
    /// Address named globals as offsets from the global pointer
    /// register instead of absolute addresses
    pub use_gp: bool,
    /// Highest predicate register; nested conditionals walk downward
    pub pred_top: u8,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        LoweringOptions {
            use_gp: true,
            pred_top: 15,
        }
    }
}
