//! Error handling for the Aster64 compiler back end
//!
//! Code generation failures are internal invariant violations, not
//! source-level errors: the tree arriving here is assumed well typed.
//! A failure abandons the current statement's instruction stream and is
//! reported to the host driver, which decides whether to continue with
//! the next unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by the expression-lowering core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("null expression node handed to the code generator")]
    NullNode,

    #[error("no lowering rule for node kind {kind}")]
    UnloweredNode { kind: String },

    #[error("scratch register pool exhausted ({bank} bank)")]
    PoolExhausted { bank: &'static str },

    #[error("scratch register r{reg} released out of LIFO order")]
    RegisterOrder { reg: u8 },

    #[error("scratch register released but none are live")]
    RegisterUnderflow,

    #[error("scratch pool not empty at statement boundary (depth {depth})")]
    PoolImbalance { depth: u8 },

    #[error("legalization request {request:#x} has no satisfiable mode for {mode}")]
    Unsatisfiable { request: u16, mode: String },
}

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A single diagnostic message produced during lowering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        Ok(())
    }
}

/// Collector for diagnostics raised while lowering a translation unit
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
            error_count: 0,
        }
    }

    /// Record a lowering failure as an error diagnostic
    pub fn report(&mut self, err: &CodegenError) {
        self.diagnostics.push(Diagnostic::error(err.to_string()));
        self.error_count += 1;
    }

    pub fn error(&mut self, message: String) {
        self.diagnostics.push(Diagnostic::error(message));
        self.error_count += 1;
    }

    pub fn warning(&mut self, message: String) {
        self.diagnostics.push(Diagnostic::warning(message));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
