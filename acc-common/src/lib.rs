//! Aster64 C Compiler - Common Types and Utilities
//!
//! This crate contains the shared types used by the code generation
//! core: the typed expression tree handed over by the front end, the
//! error taxonomy, and basic machine-width definitions.

pub mod error;
pub mod tree;
pub mod types;

pub use error::{CodegenError, Diagnostic, ErrorReporter, Severity};
pub use tree::{ExprKind, ExprNode, TypeInfo, TypeKind};
pub use types::*;
