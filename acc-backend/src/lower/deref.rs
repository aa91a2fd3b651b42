//! Memory operand formation
//!
//! A dereference node becomes a memory operand whose shape depends on
//! what the address expression looks like. Recognized shapes avoid any
//! address arithmetic: stack locals index off the frame pointer, class
//! members off the class pointer, globals off the global pointer, and
//! a register plus register sum becomes a two-register operand. Only
//! an address with no recognizable shape is computed into a register.

use acc_codegen::{AddrMode, Disp, Operand, Reg, Seg};
use acc_common::{CodegenError, ExprKind, ExprNode, FloatFormat};

use super::{LoweringContext, Request};
use crate::size::reference_size;

fn is_reg_node(node: &ExprNode) -> bool {
    matches!(node.kind, ExprKind::RegVar | ExprKind::TempRef)
}

impl LoweringContext {
    /// Lower an address sum into an indexed operand. Always yields one
    /// of the memory forms; registers feeding it are carried forward
    /// inside the operand rather than released.
    pub(crate) fn lower_index(&mut self, node: &ExprNode) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;

        if is_reg_node(lhs) && is_reg_node(rhs) {
            let mut ap1 = self.lower_expr(lhs, Request::REG, 8)?;
            let ap2 = self.lower_expr(rhs, Request::REG, 8)?;
            ap1.mode = AddrMode::Indexed2;
            ap1.sreg = ap2.reg;
            ap1.temp2 = ap2.temp;
            ap1.depth2 = ap2.depth;
            ap1.disp = Disp::Imm(0);
            ap1.scale = node.scale;
            return Ok(ap1);
        }

        let ap1 = self.lower_expr(lhs, Request::REG | Request::IMM, 8)?;
        if ap1.mode == AddrMode::Imm {
            let mut ap2 = self.lower_expr(rhs, Request::REG, 8)?;
            ap2.mode = AddrMode::Indexed;
            ap2.disp = ap1.disp.clone();
            ap2.unsigned = ap1.unsigned;
            return Ok(ap2);
        }

        let mut ap2 = self.lower_expr(rhs, Request::ALL, 8)?;
        if ap2.mode == AddrMode::Imm && ap1.mode == AddrMode::Reg {
            ap2.mode = AddrMode::Indexed;
            ap2.reg = ap1.reg;
            ap2.temp = ap1.temp;
            ap2.depth = ap1.depth;
            return Ok(ap2);
        }
        if ap2.mode == AddrMode::Ind && ap1.mode == AddrMode::Reg {
            ap2.mode = AddrMode::Indexed2;
            ap2.sreg = ap1.reg;
            ap2.temp2 = ap1.temp;
            ap2.depth2 = ap1.depth;
            ap2.scale = node.scale;
            return Ok(ap2);
        }
        if ap2.mode == AddrMode::Direct && ap1.mode == AddrMode::Reg {
            ap2.mode = AddrMode::Indexed;
            ap2.reg = ap1.reg;
            ap2.temp = ap1.temp;
            ap2.depth = ap1.depth;
            return Ok(ap2);
        }

        self.make_legal(&mut ap2, Request::REG, 8)?;
        let mut ap1 = ap1;
        ap1.mode = AddrMode::Indexed2;
        ap1.sreg = ap2.reg;
        ap1.temp2 = ap2.temp;
        ap1.depth2 = ap2.depth;
        ap1.disp = Disp::Imm(0);
        ap1.scale = node.scale;
        Ok(ap1)
    }

    /// Lower a dereference node to an operand the caller can consume.
    /// `signed` carries the load signedness the node kind dictates.
    pub(crate) fn lower_deref(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        signed: bool,
    ) -> Result<Operand, CodegenError> {
        let siz1 = reference_size(node)?;
        let base = node.lhs().ok_or(CodegenError::NullNode)?;

        let mut ap1 = match base.kind {
            ExprKind::Add => {
                let mut ap = self.lower_index(base)?;
                ap.unsigned = !signed;
                ap.seg = Seg::Data;
                ap
            }
            ExprKind::AutoCon => {
                let mut ap = Operand::indexed(Reg::FP, base.value);
                ap.seg = Seg::Stack;
                ap.unsigned = !signed;
                ap
            }
            ExprKind::ClassCon => {
                let mut ap = Operand::indexed(Reg::CLP, base.value);
                ap.seg = Seg::Data;
                ap.unsigned = !signed;
                ap
            }
            ExprKind::AutoFloatCon => {
                let mut ap = Operand::indexed(Reg::FP, base.value);
                ap.seg = Seg::Stack;
                ap.float = true;
                ap.fmt = match base.ty.precision {
                    32 => FloatFormat::Single,
                    _ => FloatFormat::Double,
                };
                self.make_legal(&mut ap, flags, size)?;
                return Ok(ap);
            }
            ExprKind::LabelRef if self.opts.use_gp => {
                let mut ap = Operand::indexed_disp(Reg::GP, Disp::Label(base.value as u32));
                ap.seg = Seg::Data;
                ap.unsigned = !signed;
                ap.volatile_ref = node.volatile_ref;
                ap
            }
            ExprKind::NameRef if self.opts.use_gp => {
                let name = base.name.as_deref().unwrap_or("");
                let mut ap = Operand::indexed_disp(Reg::GP, Disp::Sym(name.to_string()));
                ap.seg = Seg::Data;
                ap.unsigned = !signed;
                ap.volatile_ref = node.volatile_ref;
                ap
            }
            ExprKind::RegVar => {
                let mut ap = if base.by_address {
                    Operand::indirect(Reg(base.value as u8))
                } else {
                    Operand::reg_direct(Reg(base.value as u8))
                };
                ap.unsigned = !signed;
                self.make_legal(&mut ap, flags, size)?;
                return Ok(ap);
            }
            ExprKind::FpRegVar => {
                let mut ap = if base.by_address {
                    Operand::indirect(Reg(base.value as u8))
                } else {
                    Operand::fp_reg(Reg(base.value as u8))
                };
                ap.float = true;
                self.make_legal(&mut ap, flags, size)?;
                return Ok(ap);
            }
            _ => {
                let mut ap = self.lower_expr(base, Request::REG | Request::IMM, 8)?;
                if ap.mode == AddrMode::Reg {
                    if self.opts.use_gp {
                        ap.mode = AddrMode::Indexed2;
                        ap.sreg = Reg::GP;
                        ap.scale = 1;
                    } else {
                        ap.mode = AddrMode::Ind;
                    }
                    ap.disp = Disp::None;
                } else if self.opts.use_gp {
                    ap.mode = AddrMode::Indexed;
                    ap.reg = Reg::GP;
                    ap.seg = Seg::Data;
                } else {
                    ap.mode = AddrMode::Direct;
                }
                ap.unsigned = !signed;
                ap.volatile_ref = node.volatile_ref;
                ap
            }
        };

        if !node.unsigned {
            self.sign_extend(&ap1, siz1, size)?;
        } else {
            self.make_legal(&mut ap1, flags, siz1)?;
        }
        self.make_legal(&mut ap1, flags, size)?;
        Ok(ap1)
    }
}
