//! Assignment lowering
//!
//! Plain assignment, the read-modify-write operator family, and the
//! increment forms. A destination that legalizes to a register gets a
//! register move; a memory destination gets a store, with the special
//! cases the target offers: storing the zero register for a zero
//! constant, and the inc/dec memory forms for small half-word bumps.
//! Aggregate copies larger than a word go through the runtime's
//! memcpy_ helper.

use acc_codegen::{AddrMode, Disp, Opcode, Operand, Reg};
use acc_common::{CodegenError, ExprNode, FloatFormat};

use super::{LoweringContext, Request};
use crate::size::{natural_size, reference_size};

impl LoweringContext {
    pub(crate) fn gen_assign(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;

        if lhs.is_bitfield_ref() {
            return self.gen_bitfield_assign(node, flags, size);
        }

        let ssize = reference_size(lhs)?;
        let (mut ap1, mut ap2);
        if size > 8 {
            ap1 = self.lower_expr(lhs, Request::MEM, ssize)?;
            ap2 = self.lower_expr(rhs, Request::MEM, size)?;
        } else {
            ap1 = self.lower_expr(lhs, Request::REG | Request::FPREG | Request::MEM, ssize)?;
            ap2 = self.lower_expr(rhs, Request::ALL, size)?;
            if lhs.unsigned && !rhs.unsigned {
                self.zero_extend(&mut ap2, size, ssize)?;
            }
        }

        if ap1.mode == AddrMode::Reg || ap1.mode == AddrMode::FpReg {
            match ap2.mode {
                AddrMode::Reg | AddrMode::FpReg => {
                    self.emit(Opcode::Mov, vec![ap1.clone(), ap2.clone()]);
                }
                AddrMode::Imm => {
                    self.emit(Opcode::Ldi, vec![ap1.clone(), ap2.clone()]);
                }
                _ => self.gen_load(&ap1, &ap2, ssize, size),
            }
        } else {
            match ap2.mode {
                AddrMode::Reg | AddrMode::FpReg => self.gen_store(&ap2, &ap1, ssize),
                AddrMode::Imm if ap2.disp == Disp::Imm(0) => {
                    self.gen_store(&Operand::zero(), &ap1, ssize);
                }
                AddrMode::Imm => {
                    let t = self.pool.acquire()?;
                    self.emit(Opcode::Ldi, vec![t.clone(), ap2.clone()]);
                    self.gen_store(&t, &ap1, ssize);
                    self.pool.release(&t)?;
                }
                _ if ssize > 8 => self.gen_block_copy(&ap1, &ap2, size)?,
                _ => {
                    let t = self.pool.acquire()?;
                    self.gen_load(&t, &ap2, ssize, size);
                    self.gen_store(&t, &ap1, ssize);
                    self.pool.release(&t)?;
                }
            }
        }
        self.pool.release(&ap2)?;
        self.make_legal(&mut ap1, flags, size)?;
        Ok(ap1)
    }

    /// Memory-to-memory aggregate copy through the runtime helper
    fn gen_block_copy(
        &mut self,
        dst: &Operand,
        src: &Operand,
        size: u32,
    ) -> Result<(), CodegenError> {
        let t = self.pool.acquire()?;
        self.emit(Opcode::Ldi, vec![t.clone(), Operand::immed(size as i64)]);
        self.emit(Opcode::Push, vec![t.clone(), src.clone(), dst.clone()]);
        self.emit(
            Opcode::Jal,
            vec![Operand::reg_direct(Reg::LR), Operand::sym("memcpy_")],
        );
        self.emit(
            Opcode::Add,
            vec![
                Operand::reg_direct(Reg::SP),
                Operand::reg_direct(Reg::SP),
                Operand::immed(24),
            ],
        );
        self.pool.release(&t)
    }

    /// Read-modify-write against a memory operand
    pub(crate) fn gen_memop(
        &mut self,
        op: Opcode,
        ap1: &Operand,
        ap2: &Operand,
        ssize: u32,
    ) -> Result<(), CodegenError> {
        if ap1.float {
            let t = self.pool.acquire()?;
            self.gen_load(&t, ap1, ssize, ssize);
            self.emit_fp(op, ap1.fmt, vec![t.clone(), t.clone(), ap2.clone()]);
            self.gen_store(&t, ap1, ssize);
            return self.pool.release(&t);
        }
        if ap1.mode != AddrMode::Indexed2 && ssize == 2 {
            if let Some(i) = ap2.disp.imm() {
                if ap2.mode == AddrMode::Imm {
                    if op == Opcode::Add && (-16..16).contains(&i) {
                        self.emit(Opcode::Inc, vec![ap1.clone(), ap2.clone()]);
                        return Ok(());
                    }
                    if op == Opcode::Sub && (-15..15).contains(&i) {
                        self.emit(Opcode::Dec, vec![ap1.clone(), ap2.clone()]);
                        return Ok(());
                    }
                }
            }
        }
        let t = self.pool.acquire()?;
        self.gen_load(&t, ap1, ssize, ssize);
        self.emit(op, vec![t.clone(), t.clone(), ap2.clone()]);
        self.gen_store(&t, ap1, ssize);
        self.pool.release(&t)
    }

    /// `++`/`--`; `op` is `Add` or `Sub` and the delta rides in the
    /// node's constant payload
    pub(crate) fn gen_autoincdec(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let siz1 = natural_size(lhs)?;
        let delta = Operand::immed(node.value);

        if flags.contains(Request::NOVALUE) {
            let ap1 = self.lower_expr(lhs, Request::ALL, siz1)?;
            if ap1.mode != AddrMode::Reg {
                self.gen_memop(op, &ap1, &delta, size)?;
            } else {
                self.emit(op, vec![ap1.clone(), ap1.clone(), delta]);
            }
            return Ok(ap1);
        }

        let mut ap2 = self.lower_expr(lhs, Request::ALL, siz1)?;
        if ap2.mode == AddrMode::Reg {
            self.emit(op, vec![ap2.clone(), ap2.clone(), delta]);
        } else {
            self.gen_memop(op, &ap2, &delta, siz1)?;
        }
        self.make_legal(&mut ap2, flags, siz1)?;
        Ok(ap2)
    }

    /// `+=` and `-=`
    pub(crate) fn gen_assign_add(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let ssize = natural_size(lhs)?;
        let size = size.max(ssize);

        let (mut ap1, ap2, op) = if node.ty.is_float() {
            let ap1 = self.lower_expr(lhs, Request::REG | Request::FPREG | Request::MEM, ssize)?;
            let ap2 = self.lower_expr(rhs, Request::REG, size)?;
            let op = match op {
                Opcode::Add => Opcode::Fadd,
                _ => Opcode::Fsub,
            };
            (ap1, ap2, op)
        } else {
            let ap1 = self.lower_expr(lhs, Request::ALL, ssize)?;
            let ap2 = self.lower_expr(rhs, Request::REG | Request::IMM, size)?;
            (ap1, ap2, op)
        };

        match ap1.mode {
            AddrMode::Reg => {
                self.emit(op, vec![ap1.clone(), ap1.clone(), ap2.clone()]);
            }
            AddrMode::FpReg => {
                self.emit_fp(op, ap1.fmt, vec![ap1.clone(), ap1.clone(), ap2.clone()]);
                self.pool.release(&ap2)?;
                self.make_legal(&mut ap1, flags, size)?;
                return Ok(ap1);
            }
            _ => self.gen_memop(op, &ap1, &ap2, ssize)?,
        }
        self.pool.release(&ap2)?;
        if !ap1.float && !ap1.unsigned {
            self.sign_extend(&ap1, ssize, size)?;
        }
        self.make_legal(&mut ap1, flags, size)?;
        Ok(ap1)
    }

    /// `&=`, `|=` and `^=`
    pub(crate) fn gen_assign_logic(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let ssize = natural_size(lhs)?;
        let size = size.max(ssize);

        let mut ap1 = self.lower_expr(lhs, Request::ALL, ssize)?;
        let ap2 = self.lower_expr(rhs, Request::REG | Request::IMM, size)?;
        if ap1.mode == AddrMode::Reg {
            self.emit(op, vec![ap1.clone(), ap1.clone(), ap2.clone()]);
        } else {
            self.gen_memop(op, &ap1, &ap2, ssize)?;
        }
        self.pool.release(&ap2)?;
        if !ap1.unsigned {
            self.sign_extend(&ap1, ssize, size)?;
        }
        self.make_legal(&mut ap1, flags, size)?;
        Ok(ap1)
    }

    /// `<<=`, `>>=` and the unsigned right-shift form
    pub(crate) fn gen_assign_shift(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let ssize = natural_size(lhs)?;
        let size = size.max(ssize);

        let mut ap1 = self.lower_expr(lhs, Request::ALL, ssize)?;
        let ap2 = self.lower_expr(rhs, Request::REG | Request::IMM6, size)?;
        if ap1.mode == AddrMode::Reg {
            self.emit(op, vec![ap1.clone(), ap1.clone(), ap2.clone()]);
        } else {
            self.gen_memop(op, &ap1, &ap2, ssize)?;
        }
        self.pool.release(&ap2)?;
        if !ap1.unsigned {
            self.sign_extend(&ap1, ssize, size)?;
        }
        self.make_legal(&mut ap1, flags, size)?;
        Ok(ap1)
    }

    /// `*=`
    pub(crate) fn gen_assign_multiply(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let ssize = natural_size(lhs)?;
        let size = size.max(ssize);

        if node.ty.is_float() {
            let mut ap1 =
                self.lower_expr(lhs, Request::REG | Request::FPREG | Request::MEM, ssize)?;
            let ap2 = self.lower_expr(rhs, Request::REG, size)?;
            if ap1.mode == AddrMode::FpReg {
                self.emit_fp(
                    Opcode::Fmul,
                    ap1.fmt,
                    vec![ap1.clone(), ap1.clone(), ap2.clone()],
                );
            } else if ap1.mode == AddrMode::Reg {
                self.emit_fp(
                    Opcode::Fmul,
                    FloatFormat::from_precision(node.ty.precision),
                    vec![ap1.clone(), ap1.clone(), ap2.clone()],
                );
            } else {
                self.gen_memop(Opcode::Fmul, &ap1, &ap2, ssize)?;
            }
            self.pool.release(&ap2)?;
            self.make_legal(&mut ap1, flags, size)?;
            return Ok(ap1);
        }

        let mut ap1 = self.lower_expr(lhs, Request::ALL.without(Request::IMM), ssize)?;
        let ap2 = self.lower_expr(rhs, Request::REG | Request::IMM, size)?;
        if ap1.mode == AddrMode::Reg {
            self.emit(op, vec![ap1.clone(), ap1.clone(), ap2.clone()]);
        } else {
            self.gen_memop(op, &ap1, &ap2, ssize)?;
        }
        self.pool.release(&ap2)?;
        self.sign_extend(&ap1, ssize, size)?;
        self.make_legal(&mut ap1, flags, size)?;
        Ok(ap1)
    }

    /// `/=` and `%=`; the quotient is built in a scratch register and
    /// written back, since the destination may be narrower than the
    /// division width
    pub(crate) fn gen_assign_moddiv(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let siz1 = natural_size(lhs)?;

        if node.ty.is_float() {
            let mut ap1 = self.lower_expr(lhs, Request::REG, siz1)?;
            let ap2 = self.lower_expr(rhs, Request::REG, size)?;
            self.emit_fp(
                Opcode::Fdiv,
                FloatFormat::from_precision(node.ty.precision),
                vec![ap1.clone(), ap1.clone(), ap2.clone()],
            );
            self.pool.release(&ap2)?;
            self.make_legal(&mut ap1, flags, size)?;
            return Ok(ap1);
        }

        let mut t = self.pool.acquire()?;
        let ap2 = self.lower_expr(lhs, Request::ALL.without(Request::IMM), siz1)?;
        if ap2.mode == AddrMode::Reg {
            if ap2.reg != t.reg {
                self.emit(Opcode::Mov, vec![t.clone(), ap2.clone()]);
            }
        } else {
            self.gen_load(&t, &ap2, siz1, siz1);
        }
        let ap3 = self.lower_expr(rhs, Request::REG | Request::IMM, 8)?;
        self.emit(op, vec![t.clone(), t.clone(), ap3.clone()]);
        self.pool.release(&ap3)?;
        if ap2.mode == AddrMode::Reg {
            self.emit(Opcode::Mov, vec![ap2.clone(), t.clone()]);
        } else {
            self.gen_store(&t, &ap2, siz1);
        }
        self.pool.release(&ap2)?;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }
}
