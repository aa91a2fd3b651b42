//! Jump-based lowering: short-circuit control flow, fused
//! compare-and-branch, boolean materialization and the conditional
//! operator.
//!
//! Relational and logical operators in branch context never produce a
//! value. `true_jump`/`false_jump` walk the condition tree emitting
//! branches directly; a `false_jump` of a comparison emits the
//! inverted comparison. Only in value context does a boolean become a
//! 0/1 register through a small branch diamond.

use acc_codegen::{Opcode, Operand, Reg};
use acc_common::{CodegenError, ExprKind, ExprNode, LabelId};

use super::{LoweringContext, Request};
use crate::size::natural_size;

/// Branch opcode for a comparison node, optionally inverted
fn branch_op(kind: ExprKind, invert: bool) -> Option<Opcode> {
    use ExprKind::*;
    let (plain, inverted) = match kind {
        Eq => (Opcode::Beq, Opcode::Bne),
        Ne => (Opcode::Bne, Opcode::Beq),
        Lt => (Opcode::Blt, Opcode::Bge),
        Le => (Opcode::Ble, Opcode::Bgt),
        Gt => (Opcode::Bgt, Opcode::Ble),
        Ge => (Opcode::Bge, Opcode::Blt),
        Ult => (Opcode::Bltu, Opcode::Bgeu),
        Ule => (Opcode::Bleu, Opcode::Bgtu),
        Ugt => (Opcode::Bgtu, Opcode::Bleu),
        Uge => (Opcode::Bgeu, Opcode::Bltu),
        Feq => (Opcode::Fbeq, Opcode::Fbne),
        Fne => (Opcode::Fbne, Opcode::Fbeq),
        Flt => (Opcode::Fblt, Opcode::Fbge),
        Fle => (Opcode::Fble, Opcode::Fbgt),
        Fgt => (Opcode::Fbgt, Opcode::Fble),
        Fge => (Opcode::Fbge, Opcode::Fblt),
        _ => return None,
    };
    Some(if invert { inverted } else { plain })
}

fn is_float_branch(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::Fbeq | Opcode::Fbne | Opcode::Fblt | Opcode::Fble | Opcode::Fbgt | Opcode::Fbge
    )
}

impl LoweringContext {
    /// Lower both comparison operands and emit one fused
    /// compare-and-branch to `label`
    fn compare_branch(
        &mut self,
        node: &ExprNode,
        op: Opcode,
        label: LabelId,
    ) -> Result<(), CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let size = natural_size(node)?;
        let ap1 = self.lower_expr(lhs, Request::REG, size)?;
        let rflags = if is_float_branch(op) {
            Request::REG
        } else {
            Request::REG | Request::IMM8
        };
        let ap2 = self.lower_expr(rhs, rflags, size)?;
        if is_float_branch(op) {
            self.emit_fp(
                op,
                ap1.fmt,
                vec![ap1.clone(), ap2.clone(), Operand::code_label(label)],
            );
        } else {
            self.emit(
                op,
                vec![ap1.clone(), ap2.clone(), Operand::code_label(label)],
            );
        }
        self.pool.release(&ap2)?;
        self.pool.release(&ap1)
    }

    /// Branch to `label` when the condition is true
    pub fn true_jump(&mut self, node: &ExprNode, label: LabelId) -> Result<(), CodegenError> {
        if let Some(op) = branch_op(node.kind, false) {
            return self.compare_branch(node, op, label);
        }
        match node.kind {
            ExprKind::LogAnd => {
                let lab0 = self.next_label();
                let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
                let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
                self.false_jump(lhs, lab0)?;
                self.true_jump(rhs, label)?;
                self.place_label(lab0);
                Ok(())
            }
            ExprKind::LogOr => {
                let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
                let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
                self.true_jump(lhs, label)?;
                self.true_jump(rhs, label)
            }
            ExprKind::LogNot => {
                let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
                self.false_jump(lhs, label)
            }
            _ => {
                let siz1 = natural_size(node)?;
                let ap = self.lower_expr(node, Request::REG, siz1)?;
                self.pool.release(&ap)?;
                self.emit(
                    Opcode::Bne,
                    vec![ap, Operand::zero(), Operand::code_label(label)],
                );
                Ok(())
            }
        }
    }

    /// Branch to `label` when the condition is false
    pub fn false_jump(&mut self, node: &ExprNode, label: LabelId) -> Result<(), CodegenError> {
        if let Some(op) = branch_op(node.kind, true) {
            return self.compare_branch(node, op, label);
        }
        match node.kind {
            ExprKind::LogAnd => {
                let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
                let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
                self.false_jump(lhs, label)?;
                self.false_jump(rhs, label)
            }
            ExprKind::LogOr => {
                let lab0 = self.next_label();
                let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
                let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
                self.true_jump(lhs, lab0)?;
                self.false_jump(rhs, label)?;
                self.place_label(lab0);
                Ok(())
            }
            ExprKind::LogNot => {
                let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
                self.true_jump(lhs, label)
            }
            _ => {
                let siz1 = natural_size(node)?;
                let ap = self.lower_expr(node, Request::REG, siz1)?;
                self.pool.release(&ap)?;
                self.emit(
                    Opcode::Beq,
                    vec![ap, Operand::zero(), Operand::code_label(label)],
                );
                Ok(())
            }
        }
    }

    /// A boolean in value context becomes 0 or 1 through a branch
    /// diamond around two load-immediates
    pub(crate) fn lower_boolean(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
    ) -> Result<Operand, CodegenError> {
        let t = self.pool.acquire()?;
        let false_lab = self.next_label();
        let end_lab = self.next_label();
        self.false_jump(node, false_lab)?;
        self.emit(Opcode::Ldi, vec![t.clone(), Operand::immed(1)]);
        self.emit(Opcode::Bra, vec![Operand::code_label(end_lab)]);
        self.place_label(false_lab);
        self.emit(Opcode::Ldi, vec![t.clone(), Operand::immed(0)]);
        self.place_label(end_lab);
        let mut t = t;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }

    /// The conditional operator. Both arms are lowered into registers;
    /// when they resolve to the same location no join move is needed.
    /// Otherwise the false arm's value moves into the true arm's
    /// scratch register, or, when the true arm owns a dedicated
    /// register, into a fresh scratch register written on both paths.
    pub(crate) fn gen_ternary(
        &mut self,
        node: &ExprNode,
        _flags: Request,
        size: u32,
    ) -> Result<Operand, CodegenError> {
        let cond = node.lhs().ok_or(CodegenError::NullNode)?;
        let colon = node.rhs().ok_or(CodegenError::NullNode)?;
        let true_arm = colon.lhs().ok_or(CodegenError::NullNode)?;
        let false_arm = colon.rhs().ok_or(CodegenError::NullNode)?;

        if self.pred_reg > 0 {
            self.pred_reg -= 1;
        }
        let false_lab = self.next_label();
        let end_lab = self.next_label();

        self.false_jump(cond, false_lab)?;
        let ap1 = self.lower_expr(true_arm, Request::REG, size)?;
        let join_at = self.position();
        self.emit(Opcode::Bra, vec![Operand::code_label(end_lab)]);
        self.place_label(false_lab);
        let ap2 = self.lower_expr(false_arm, Request::REG, size)?;

        let result = if ap1.same_location(&ap2) {
            ap1
        } else if ap1.temp {
            self.emit(Opcode::Mov, vec![ap1.clone(), ap2.clone()]);
            self.pool.release(&ap2)?;
            ap1
        } else {
            // The true arm kept a dedicated register. Join in a fresh
            // scratch register, patched into the true branch before
            // its exit jump. Reacquiring after the release hands back
            // the false arm's register, so its value is already there.
            self.pool.release(&ap2)?;
            let t = self.pool.acquire()?;
            if !ap2.temp {
                self.emit(Opcode::Mov, vec![t.clone(), ap2.clone()]);
            }
            self.emit_at(join_at, Opcode::Mov, vec![t.clone(), ap1.clone()]);
            t
        };
        self.place_label(end_lab);
        self.pred_reg += 1;
        Ok(result)
    }

    /// Call lowering: arguments pushed right to left, link through
    /// `lr`, result in the return-value register
    pub(crate) fn gen_call(
        &mut self,
        node: &ExprNode,
        flags: Request,
    ) -> Result<Operand, CodegenError> {
        let callee = node.lhs().ok_or(CodegenError::NullNode)?;

        let mut args: Vec<&ExprNode> = Vec::new();
        let mut cursor = node.rhs();
        while let Some(arg) = cursor {
            if arg.kind == ExprKind::Comma {
                if let Some(head) = arg.lhs() {
                    args.push(head);
                }
                cursor = arg.rhs();
            } else {
                args.push(arg);
                break;
            }
        }

        for &arg in args.iter().rev() {
            let ap = self.lower_expr(arg, Request::REG, 8)?;
            self.emit(Opcode::Push, vec![ap.clone()]);
            self.pool.release(&ap)?;
        }

        match callee.kind {
            ExprKind::NameRef | ExprKind::CodeNameRef => {
                let name = callee.name.as_deref().unwrap_or("");
                self.emit(
                    Opcode::Jal,
                    vec![Operand::reg_direct(Reg::LR), Operand::sym(name)],
                );
            }
            _ => {
                let ap = self.lower_expr(callee, Request::REG, 8)?;
                self.emit(Opcode::Jal, vec![Operand::reg_direct(Reg::LR), ap.clone()]);
                self.pool.release(&ap)?;
            }
        }

        if !args.is_empty() {
            self.emit(
                Opcode::Add,
                vec![
                    Operand::reg_direct(Reg::SP),
                    Operand::reg_direct(Reg::SP),
                    Operand::immed(8 * args.len() as i64),
                ],
            );
        }

        let mut result = Operand::reg_direct(Reg::RV);
        if !flags.contains(Request::NOVALUE) {
            self.make_legal(&mut result, flags, 8)?;
        }
        Ok(result)
    }
}
