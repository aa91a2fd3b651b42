//! Binary operator lowering
//!
//! All the three-address forms: a result register is claimed first, so
//! it sits below both operand temporaries and survives their release.
//! Multiplication moves a constant left operand to the right, where
//! the instruction can carry it inline. Division and remainder never
//! reorder their operands.

use acc_codegen::{Opcode, Operand};
use acc_common::{CodegenError, ExprKind, ExprNode, FloatFormat};

use super::{LoweringContext, Request};

impl LoweringContext {
    pub(crate) fn gen_unary(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let t = self.pool.acquire()?;
        let ap = self.lower_expr(lhs, Request::REG, size)?;
        if node.ty.is_float() {
            let op = if op == Opcode::Neg { Opcode::Fneg } else { op };
            let fmt = FloatFormat::from_precision(node.ty.precision);
            self.emit_fp(op, fmt, vec![t.clone(), ap.clone()]);
        } else {
            self.emit(op, vec![t.clone(), ap.clone()]);
        }
        self.pool.release(&ap)?;
        let mut t = t;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }

    pub(crate) fn gen_binary(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let is_float = matches!(
            op,
            Opcode::Fadd | Opcode::Fsub | Opcode::Fmul | Opcode::Fdiv
        );

        let t = self.pool.acquire()?;
        let (ap1, ap2) = if is_float {
            let ap1 = self.lower_expr(lhs, Request::REG, size)?;
            let mut ap2 = self.lower_expr(rhs, Request::REG, size)?;
            if ap1.fmt != ap2.fmt && ap2.fmt == FloatFormat::Single {
                self.emit(Opcode::Fcvtsq, vec![ap2.clone(), ap2.clone()]);
                ap2.fmt = ap1.fmt;
            }
            self.emit_fp(op, ap1.fmt, vec![t.clone(), ap1.clone(), ap2.clone()]);
            (ap1, ap2)
        } else {
            let ap1 = self.lower_expr(lhs, Request::REG, size)?;
            let ap2 = self.lower_expr(rhs, Request::REG | Request::IMM, size)?;
            self.emit(op, vec![t.clone(), ap1.clone(), ap2.clone()]);
            (ap1, ap2)
        };
        self.pool.release(&ap2)?;
        self.pool.release(&ap1)?;
        let mut t = t;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }

    /// Shift amounts fit the six-bit immediate form
    pub(crate) fn gen_shift(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let t = self.pool.acquire()?;
        let ap1 = self.lower_expr(lhs, Request::REG, size)?;
        let ap2 = self.lower_expr(rhs, Request::REG | Request::IMM6, size)?;
        self.emit(op, vec![t.clone(), ap1.clone(), ap2.clone()]);
        self.pool.release(&ap2)?;
        self.pool.release(&ap1)?;
        let mut t = t;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }

    pub(crate) fn gen_multiply(
        &mut self,
        node: &ExprNode,
        flags: Request,
        _size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let mut lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let mut rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        if lhs.kind == ExprKind::IntConst {
            std::mem::swap(&mut lhs, &mut rhs);
        }
        let t = self.pool.acquire()?;
        let ap1 = self.lower_expr(lhs, Request::REG, 8)?;
        let ap2 = self.lower_expr(rhs, Request::REG | Request::IMM, 8)?;
        self.emit(op, vec![t.clone(), ap1.clone(), ap2.clone()]);
        self.pool.release(&ap2)?;
        self.pool.release(&ap1)?;
        let mut t = t;
        self.make_legal(&mut t, flags, 2)?;
        Ok(t)
    }

    pub(crate) fn gen_moddiv(
        &mut self,
        node: &ExprNode,
        flags: Request,
        _size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let t = self.pool.acquire()?;
        let ap1 = self.lower_expr(lhs, Request::REG, 8)?;
        let ap2 = self.lower_expr(rhs, Request::REG | Request::IMM, 8)?;
        self.emit(op, vec![t.clone(), ap1.clone(), ap2.clone()]);
        self.pool.release(&ap2)?;
        self.pool.release(&ap1)?;
        let mut t = t;
        self.make_legal(&mut t, flags, 2)?;
        Ok(t)
    }
}
