//! Expression lowering context
//!
//! [`LoweringContext`] owns everything one function's worth of lowering
//! needs: the output instruction buffer, the scratch register pool, the
//! label counter and the diagnostic collector. Statements are lowered
//! one at a time; the pool must return to empty between them.
//!
//! The recursive walk lives in the submodules, all as methods on the
//! context: `expr` dispatches on node kind, `legalize` coerces results
//! to what the consumer accepts, `deref` builds memory operands,
//! `binary` and `assign` cover the operator families and `control` the
//! jump-based forms.

mod assign;
mod binary;
mod bitfield;
mod control;
mod deref;
mod expr;
mod legalize;

use acc_codegen::{Instr, Opcode, Operand};
use acc_common::{CodegenError, ErrorReporter, ExprNode, FloatFormat, LabelId};
use log::debug;

use crate::regpool::TempPool;
use crate::size::natural_size;
use crate::LoweringOptions;

use std::ops::BitOr;

/// Capability set a consumer passes down: which operand forms it can
/// accept. A legalization request is satisfied by any one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request(u16);

impl Request {
    /// Integer register
    pub const REG: Request = Request(0x0001);
    /// Floating register
    pub const FPREG: Request = Request(0x0002);
    /// Any immediate
    pub const IMM: Request = Request(0x0004);
    /// Immediate, but only the value zero
    pub const IMM0: Request = Request(0x0008);
    /// Immediate in [0,64)
    pub const IMM6: Request = Request(0x0010);
    /// Immediate in [0,256)
    pub const IMM8: Request = Request(0x0020);
    /// Any memory form
    pub const MEM: Request = Request(0x0040);
    /// Force a fresh copy: an operand outside the scratch pool is
    /// rematerialized even when its form is already acceptable
    pub const VOL: Request = Request(0x0080);
    /// Value will be discarded; side effects only
    pub const NOVALUE: Request = Request(0x0100);

    /// Every value-producing form
    pub const ALL: Request = Request(0x0001 | 0x0002 | 0x0004 | 0x0040);

    /// True when any member of `other` is present
    pub fn contains(self, other: Request) -> bool {
        self.0 & other.0 != 0
    }

    /// This request with the members of `other` removed
    pub fn without(self, other: Request) -> Request {
        Request(self.0 & !other.0)
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl BitOr for Request {
    type Output = Request;
    fn bitor(self, rhs: Request) -> Request {
        Request(self.0 | rhs.0)
    }
}

/// State for lowering one function body
pub struct LoweringContext {
    out: Vec<Instr>,
    pub pool: TempPool,
    next_label: LabelId,
    pub(crate) opts: LoweringOptions,
    /// Next predicate register a nested conditional may claim
    pub(crate) pred_reg: u8,
    reporter: ErrorReporter,
}

impl LoweringContext {
    pub fn new() -> Self {
        Self::with_options(LoweringOptions::default())
    }

    pub fn with_options(opts: LoweringOptions) -> Self {
        let pred_reg = opts.pred_top;
        LoweringContext {
            out: Vec::new(),
            pool: TempPool::new(),
            next_label: 1,
            opts,
            pred_reg,
            reporter: ErrorReporter::new(),
        }
    }

    /// Lower one statement-level expression for its side effects.
    ///
    /// The scratch pool must be empty on entry and is checked empty on
    /// exit; a statement that leaks a register is a lowering bug and is
    /// reported as such.
    pub fn lower_stmt(&mut self, node: &ExprNode) -> Result<(), CodegenError> {
        let result = self.lower_stmt_inner(node);
        if let Err(ref e) = result {
            self.reporter.report(e);
        }
        result
    }

    fn lower_stmt_inner(&mut self, node: &ExprNode) -> Result<(), CodegenError> {
        debug!("lower_stmt: {:?}", node.kind);
        let size = natural_size(node)?;
        let ap = self.lower_expr(node, Request::ALL | Request::NOVALUE, size)?;
        self.pool.release(&ap)?;
        if !self.pool.balanced() {
            return Err(CodegenError::PoolImbalance {
                depth: self.pool.depth(),
            });
        }
        Ok(())
    }

    /// Drain the output buffer
    pub fn take_instructions(&mut self) -> Vec<Instr> {
        std::mem::take(&mut self.out)
    }

    pub fn instructions(&self) -> &[Instr] {
        &self.out
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Allocate a fresh internal label number
    pub fn next_label(&mut self) -> LabelId {
        let lab = self.next_label;
        self.next_label += 1;
        lab
    }

    /// Bind a label at the current position in the stream
    pub fn place_label(&mut self, lab: LabelId) {
        self.out.push(Instr::Label(lab));
    }

    pub(crate) fn emit(&mut self, op: Opcode, ops: Vec<Operand>) {
        self.out.push(Instr::new(op, ops));
    }

    /// Current position in the output stream
    pub(crate) fn position(&self) -> usize {
        self.out.len()
    }

    /// Insert an instruction at an earlier position in the stream
    pub(crate) fn emit_at(&mut self, at: usize, op: Opcode, ops: Vec<Operand>) {
        self.out.insert(at, Instr::new(op, ops));
    }

    pub(crate) fn emit_fp(&mut self, op: Opcode, fmt: FloatFormat, ops: Vec<Operand>) {
        self.out.push(Instr::with_fmt(op, fmt, ops));
    }
}

impl Default for LoweringContext {
    fn default() -> Self {
        Self::new()
    }
}
