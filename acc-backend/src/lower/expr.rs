//! Expression dispatch
//!
//! One match arm per node kind. Every arm produces an operand already
//! legalized against the caller's request, so consumers never see a
//! form they cannot take.

use acc_codegen::{AddrMode, Disp, Opcode, Operand, Reg, Seg};
use acc_common::{CodegenError, ExprKind, ExprNode, FloatFormat};
use log::trace;

use super::{LoweringContext, Request};
use crate::size::natural_size;

impl LoweringContext {
    /// Lower one expression tree to an operand holding its value.
    /// `flags` is the set of operand forms the caller accepts and
    /// `size` the evaluation width in bytes.
    pub fn lower_expr(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
    ) -> Result<Operand, CodegenError> {
        use ExprKind::*;
        trace!("lower_expr {:?} size {}", node.kind, size);
        match node.kind {
            IntConst => {
                let mut ap = Operand::immed(node.value);
                ap.unsigned = node.unsigned;
                self.make_legal(&mut ap, flags, size)?;
                Ok(ap)
            }
            FloatConst => {
                let mut ap = Operand {
                    mode: AddrMode::Direct,
                    disp: Disp::Float(node.fvalue),
                    float: true,
                    fmt: FloatFormat::from_precision(node.ty.precision),
                    ..Default::default()
                };
                self.make_legal(&mut ap, flags, size)?;
                Ok(ap)
            }

            LabelRef => self.lower_address_of(Disp::Label(node.value as u32), flags, size),
            NameRef => {
                let name = node.name.as_deref().unwrap_or("").to_string();
                self.lower_address_of(Disp::Sym(name), flags, size)
            }
            CodeLabelRef => {
                let mut ap = Operand {
                    mode: AddrMode::Imm,
                    disp: Disp::Label(node.value as u32),
                    seg: Seg::Code,
                    unsigned: node.unsigned,
                    ..Default::default()
                };
                self.make_legal(&mut ap, flags, size)?;
                Ok(ap)
            }
            CodeNameRef => {
                let mut ap = Operand {
                    mode: AddrMode::Imm,
                    disp: Disp::Sym(node.name.clone().unwrap_or_default()),
                    seg: Seg::Code,
                    unsigned: node.unsigned,
                    ..Default::default()
                };
                self.make_legal(&mut ap, flags, size)?;
                Ok(ap)
            }

            AutoCon => self.lower_lea(Operand::indexed(Reg::FP, node.value), Seg::Stack, flags, size),
            ClassCon => self.lower_lea(Operand::indexed(Reg::CLP, node.value), Seg::Data, flags, size),
            AutoFloatCon => {
                let mut base = Operand::indexed(Reg::FP, node.value);
                base.float = true;
                self.lower_lea(base, Seg::Stack, flags, size)
            }

            RefByte | RefChar | RefHalf | RefWord | Ref32 => {
                self.lower_deref(node, flags, size, true)
            }
            RefByteU | RefCharU | RefHalfU | RefWordU | Ref32U | RefStruct => {
                let mut ap = self.lower_deref(node, flags, size, false)?;
                ap.unsigned = true;
                Ok(ap)
            }
            RefFloat | RefDouble | RefTriple | RefQuad => {
                let mut ap = self.lower_deref(node, flags, size, true)?;
                ap.float = true;
                ap.fmt = FloatFormat::from_precision(node.ty.precision);
                Ok(ap)
            }
            BitRefByte | BitRefByteU | BitRefChar | BitRefCharU | BitRefHalf | BitRefHalfU
            | BitRefWord | BitRefWordU => self.gen_bitfield_extract(node, flags, size),

            RegVar | TempRef => {
                let mut ap = Operand::reg_direct(Reg(node.value as u8));
                self.make_legal(&mut ap, flags, size)?;
                Ok(ap)
            }
            FpRegVar | TempFpRef => {
                let mut ap = Operand::fp_reg(Reg(node.value as u8));
                ap.fmt = FloatFormat::from_precision(node.ty.precision);
                self.make_legal(&mut ap, flags, size)?;
                Ok(ap)
            }

            Neg => self.gen_unary(node, flags, size, Opcode::Neg),
            Com => self.gen_unary(node, flags, size, Opcode::Com),

            Add => self.gen_binary(node, flags, size, Opcode::Add),
            Sub => self.gen_binary(node, flags, size, Opcode::Sub),
            And => self.gen_binary(node, flags, size, Opcode::And),
            Or => self.gen_binary(node, flags, size, Opcode::Or),
            Xor => self.gen_binary(node, flags, size, Opcode::Xor),
            Fadd => self.gen_binary(node, flags, size, Opcode::Fadd),
            Fsub => self.gen_binary(node, flags, size, Opcode::Fsub),
            Fmul => self.gen_binary(node, flags, size, Opcode::Fmul),
            Fdiv => self.gen_binary(node, flags, size, Opcode::Fdiv),

            Mul => self.gen_multiply(node, flags, size, Opcode::Mul),
            Mulu => self.gen_multiply(node, flags, size, Opcode::Mulu),
            Div => self.gen_moddiv(node, flags, size, Opcode::Div),
            Divu => self.gen_moddiv(node, flags, size, Opcode::Divu),
            Mod => self.gen_moddiv(node, flags, size, Opcode::Mod),
            Modu => self.gen_moddiv(node, flags, size, Opcode::Modu),

            Shl => self.gen_shift(node, flags, size, Opcode::Shl),
            Shlu => self.gen_shift(node, flags, size, Opcode::Shlu),
            Shr => self.gen_shift(node, flags, size, Opcode::Asr),
            Shru => self.gen_shift(node, flags, size, Opcode::Shru),
            Asr => self.gen_shift(node, flags, size, Opcode::Asr),

            Assign => self.gen_assign(node, flags, size),
            AsAdd => self.gen_assign_add(node, flags, size, Opcode::Add),
            AsSub => self.gen_assign_add(node, flags, size, Opcode::Sub),
            AsAnd => self.gen_assign_logic(node, flags, size, Opcode::And),
            AsOr => self.gen_assign_logic(node, flags, size, Opcode::Or),
            AsXor => self.gen_assign_logic(node, flags, size, Opcode::Xor),
            AsShl => self.gen_assign_shift(node, flags, size, Opcode::Shl),
            AsShr => self.gen_assign_shift(node, flags, size, Opcode::Asr),
            AsShru => self.gen_assign_shift(node, flags, size, Opcode::Shru),
            AsMul => self.gen_assign_multiply(node, flags, size, Opcode::Mul),
            AsMulu => self.gen_assign_multiply(node, flags, size, Opcode::Mulu),
            AsDiv => self.gen_assign_moddiv(node, flags, size, Opcode::Div),
            AsDivu => self.gen_assign_moddiv(node, flags, size, Opcode::Divu),
            AsMod => self.gen_assign_moddiv(node, flags, size, Opcode::Mod),
            AsModu => self.gen_assign_moddiv(node, flags, size, Opcode::Modu),
            AutoInc => self.gen_autoincdec(node, flags, size, Opcode::Add),
            AutoDec => self.gen_autoincdec(node, flags, size, Opcode::Sub),

            Eq | Ne | Lt | Le | Gt | Ge | Ult | Ule | Ugt | Uge | Feq | Fne | Flt | Fle | Fgt
            | Fge | LogAnd | LogOr | LogNot => self.lower_boolean(node, flags, size),

            Cond => self.gen_ternary(node, flags, size),
            Comma => {
                let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
                let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
                let natsize = natural_size(lhs)?;
                let ap = self.lower_expr(lhs, Request::ALL | Request::NOVALUE, natsize)?;
                self.pool.release(&ap)?;
                self.lower_expr(rhs, flags, size)
            }
            Call => self.gen_call(node, flags),

            Cbu | Cubw => self.lower_mask(node, flags, size, 0xFF),
            Ccu | Cucw => self.lower_mask(node, flags, size, 0xFFFF),
            Chu | Cuhw => self.lower_mask(node, flags, size, 0xFFFF_FFFF),
            Cbw => self.lower_sext(node, flags, size, Opcode::Sxb),
            Ccw => self.lower_sext(node, flags, size, Opcode::Sxc),
            Chw => self.lower_sext(node, flags, size, Opcode::Sxh),

            I2D => self.lower_itof_direct(node, flags, size, FloatFormat::Double),
            I2T => self.lower_itof_wide(node, flags, size, FloatFormat::Triple),
            I2Q => self.lower_itof_wide(node, flags, size, FloatFormat::Quad),
            D2I => self.lower_ftoi_direct(node, flags, size, FloatFormat::Double),
            T2I => self.lower_ftoi_wide(node, flags, size, FloatFormat::Triple),
            Q2I => self.lower_ftoi_wide(node, flags, size, FloatFormat::Quad),
            S2Q => {
                let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
                let t = self.pool.acquire()?;
                let ap2 = self.lower_expr(lhs, Request::FPREG, 8)?;
                self.emit(Opcode::Fcvtsq, vec![t.clone(), ap2.clone()]);
                self.pool.release(&ap2)?;
                let mut t = t;
                t.fmt = FloatFormat::Quad;
                self.make_legal(&mut t, flags, size)?;
                Ok(t)
            }

            _ => Err(CodegenError::UnloweredNode {
                kind: format!("{:?}", node.kind),
            }),
        }
    }

    /// Address of a data-segment symbol or label: formed with `lea`
    /// off the global pointer when that model is in effect, otherwise
    /// left as an immediate
    fn lower_address_of(
        &mut self,
        disp: Disp,
        flags: Request,
        size: u32,
    ) -> Result<Operand, CodegenError> {
        if self.opts.use_gp {
            let t = self.pool.acquire()?;
            let mut addr = Operand::indexed_disp(Reg::GP, disp);
            addr.seg = Seg::Data;
            self.emit(Opcode::Lea, vec![t.clone(), addr]);
            let mut t = t;
            self.make_legal(&mut t, flags, size)?;
            return Ok(t);
        }
        let mut ap = Operand {
            mode: AddrMode::Imm,
            disp,
            ..Default::default()
        };
        self.make_legal(&mut ap, flags, size)?;
        Ok(ap)
    }

    /// Address of a frame or class member slot
    fn lower_lea(
        &mut self,
        mut base: Operand,
        seg: Seg,
        flags: Request,
        size: u32,
    ) -> Result<Operand, CodegenError> {
        base.seg = seg;
        let t = self.pool.acquire()?;
        self.emit(Opcode::Lea, vec![t.clone(), base]);
        let mut t = t;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }

    fn lower_mask(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        mask: i64,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let mut ap = self.lower_expr(lhs, Request::REG, size)?;
        self.emit(
            Opcode::And,
            vec![ap.clone(), ap.clone(), Operand::immed(mask)],
        );
        ap.unsigned = true;
        self.make_legal(&mut ap, flags, size)?;
        Ok(ap)
    }

    fn lower_sext(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        op: Opcode,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let mut ap = self.lower_expr(lhs, Request::REG, size)?;
        self.emit(op, vec![ap.clone(), ap.clone()]);
        self.make_legal(&mut ap, flags, size)?;
        Ok(ap)
    }

    /// Integer to double: a straight `itof`
    fn lower_itof_direct(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        fmt: FloatFormat,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let t = self.pool.acquire()?;
        let ap2 = self.lower_expr(lhs, Request::REG, 8)?;
        self.emit_fp(Opcode::Itof, fmt, vec![t.clone(), ap2.clone()]);
        self.pool.release(&ap2)?;
        let mut t = t;
        t.fmt = fmt;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }

    /// Integer to an extended precision: the value crosses to the
    /// floating unit through the exchange CSR, with two pipeline nops
    /// before the exchange register is readable
    fn lower_itof_wide(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        fmt: FloatFormat,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let t = self.pool.acquire()?;
        let ap2 = self.lower_expr(lhs, Request::REG, 8)?;
        self.emit(
            Opcode::Csrrw,
            vec![Operand::zero(), Operand::immed(0x18), ap2.clone()],
        );
        self.emit(Opcode::Nop, vec![]);
        self.emit(Opcode::Nop, vec![]);
        self.emit_fp(
            Opcode::Itof,
            fmt,
            vec![t.clone(), Operand::reg_direct(Reg::FPX)],
        );
        self.pool.release(&ap2)?;
        let mut t = t;
        t.fmt = fmt;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }

    fn lower_ftoi_direct(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        fmt: FloatFormat,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let t = self.pool.acquire()?;
        let ap2 = self.lower_expr(lhs, Request::REG, 8)?;
        self.emit_fp(Opcode::Ftoi, fmt, vec![t.clone(), ap2.clone()]);
        self.pool.release(&ap2)?;
        let mut t = t;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }

    /// Extended precision to integer: the mirror of the widening path
    fn lower_ftoi_wide(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
        fmt: FloatFormat,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let t = self.pool.acquire()?;
        let ap2 = self.lower_expr(lhs, Request::FPREG, 8)?;
        self.emit_fp(
            Opcode::Ftoi,
            fmt,
            vec![Operand::reg_direct(Reg::FPX), ap2.clone()],
        );
        self.emit(Opcode::Nop, vec![]);
        self.emit(Opcode::Nop, vec![]);
        self.emit(
            Opcode::Csrrw,
            vec![t.clone(), Operand::immed(0x18), Operand::zero()],
        );
        self.pool.release(&ap2)?;
        let mut t = t;
        self.make_legal(&mut t, flags, size)?;
        Ok(t)
    }
}
