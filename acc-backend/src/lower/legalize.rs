//! Operand legalization
//!
//! Every lowered operand passes through `make_legal` before its
//! consumer sees it. If the operand already has an acceptable form it
//! is left untouched; otherwise it is coerced, almost always by
//! loading into a scratch register. A request tagged `VOL` skips the
//! in-place acceptance check for anything not already in a scratch
//! register, forcing a fresh copy where a fresh evaluation was
//! requested.

use acc_codegen::{AddrMode, Opcode, Operand};
use acc_common::CodegenError;

use super::{LoweringContext, Request};

impl LoweringContext {
    /// Coerce `ap` into one of the forms `flags` accepts, for a value
    /// of `size` bytes.
    pub fn make_legal(
        &mut self,
        ap: &mut Operand,
        flags: Request,
        size: u32,
    ) -> Result<(), CodegenError> {
        if flags.contains(Request::NOVALUE) {
            return Ok(());
        }
        if !flags.contains(
            Request::ALL | Request::IMM0 | Request::IMM6 | Request::IMM8 | Request::NOVALUE,
        ) {
            return Err(CodegenError::Unsatisfiable {
                request: flags.bits(),
                mode: format!("{:?}", ap.mode),
            });
        }

        if !flags.contains(Request::VOL) || ap.temp {
            match ap.mode {
                AddrMode::Imm => {
                    let i = ap.disp.imm().unwrap_or(0);
                    if flags.contains(Request::IMM8) {
                        if (0..256).contains(&i) {
                            return Ok(());
                        }
                    } else if flags.contains(Request::IMM6) {
                        if (0..64).contains(&i) {
                            return Ok(());
                        }
                    } else if flags.contains(Request::IMM0) {
                        if i == 0 {
                            return Ok(());
                        }
                    } else if flags.contains(Request::IMM) {
                        return Ok(());
                    }
                }
                AddrMode::Reg => {
                    if flags.contains(Request::REG) {
                        return Ok(());
                    }
                }
                AddrMode::FpReg => {
                    if flags.contains(Request::FPREG) {
                        return Ok(());
                    }
                }
                _ if ap.mode.is_mem() => {
                    if flags.contains(Request::MEM) {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }

        if flags.contains(Request::REG) {
            // the operand's own register may be reusable
            self.pool.release(ap)?;
            let t = self.pool.acquire()?;
            self.move_into(&t, ap, size);
            let fmt = ap.fmt;
            let unsigned = ap.unsigned;
            *ap = t;
            ap.fmt = fmt;
            ap.unsigned = unsigned;
            return Ok(());
        }

        if flags.contains(Request::FPREG) {
            self.pool.release(ap)?;
            let t = self.pool.acquire_fp()?;
            self.move_into(&t, ap, size);
            let fmt = ap.fmt;
            *ap = t;
            ap.fmt = fmt;
            return Ok(());
        }

        // A restricted immediate class was wanted and the value does
        // not qualify. Land it in a register; every instruction that
        // takes a restricted immediate also takes a register. Anything
        // else left in the request has no reachable form.
        if !flags.contains(Request::IMM | Request::IMM0 | Request::IMM6 | Request::IMM8) {
            return Err(CodegenError::Unsatisfiable {
                request: flags.bits(),
                mode: format!("{:?}", ap.mode),
            });
        }
        let mut size = size;
        if size == 1 {
            self.pool.release(ap)?;
            let t = self.pool.acquire()?;
            self.move_into(&t, ap, 1);
            if ap.unsigned {
                self.emit(
                    Opcode::And,
                    vec![t.clone(), t.clone(), Operand::immed(255)],
                );
            } else {
                self.emit(Opcode::Sxb, vec![t.clone(), t.clone()]);
            }
            let unsigned = ap.unsigned;
            *ap = t;
            ap.unsigned = unsigned;
            size = 2;
        }
        self.pool.release(ap)?;
        let t = self.pool.acquire()?;
        self.move_into(&t, ap, size);
        let unsigned = ap.unsigned;
        *ap = t;
        ap.unsigned = unsigned;
        Ok(())
    }

    /// Bring the value of `src` into register `dst`, whatever form
    /// `src` currently has
    fn move_into(&mut self, dst: &Operand, src: &Operand, size: u32) {
        match src.mode {
            AddrMode::Imm => self.emit(Opcode::Ldi, vec![dst.clone(), src.clone()]),
            AddrMode::Reg | AddrMode::FpReg => {
                self.emit(Opcode::Mov, vec![dst.clone(), src.clone()])
            }
            _ => self.gen_load(dst, src, size, size),
        }
    }

    /// Emit a load of `size` bytes from memory operand `src` into
    /// register `dst`. A signed load narrower than the surrounding
    /// evaluation width (`ssize`) is widened in the register.
    pub(crate) fn gen_load(&mut self, dst: &Operand, src: &Operand, ssize: u32, size: u32) {
        if dst.mode == AddrMode::FpReg {
            self.emit_fp(Opcode::Lf, src.fmt, vec![dst.clone(), src.clone()]);
            return;
        }
        if dst.unsigned || src.unsigned {
            let op = match size {
                1 => Opcode::Lbu,
                2 => Opcode::Lcu,
                4 => Opcode::Lhu,
                _ => Opcode::Lw,
            };
            self.emit(op, vec![dst.clone(), src.clone()]);
        } else {
            let op = match size {
                1 => Opcode::Lb,
                2 => Opcode::Lc,
                4 => Opcode::Lh,
                _ => Opcode::Lw,
            };
            self.emit(op, vec![dst.clone(), src.clone()]);
            if ssize > size {
                self.extend_in_reg(dst, size);
            }
        }
    }

    /// Emit a store of `size` bytes from register `src` to memory
    /// operand `dst`
    pub(crate) fn gen_store(&mut self, src: &Operand, dst: &Operand, size: u32) {
        if src.mode == AddrMode::FpReg {
            self.emit_fp(Opcode::Sf, src.fmt, vec![src.clone(), dst.clone()]);
            return;
        }
        let op = match size {
            1 => Opcode::Sb,
            2 => Opcode::Sc,
            4 => Opcode::Sh,
            _ => Opcode::Sw,
        };
        self.emit(op, vec![src.clone(), dst.clone()]);
    }

    /// Widen a signed value from `from` bytes to `to` bytes. Register
    /// operands are extended in place; memory operands through a
    /// scratch register and a store-back.
    pub(crate) fn sign_extend(
        &mut self,
        ap: &Operand,
        from: u32,
        to: u32,
    ) -> Result<(), CodegenError> {
        if from == to || ap.unsigned {
            return Ok(());
        }
        match ap.mode {
            AddrMode::Reg => {
                self.extend_in_reg(ap, from);
                Ok(())
            }
            AddrMode::FpReg => Ok(()),
            _ => {
                let t = self.pool.acquire()?;
                self.gen_load(&t, ap, from, from);
                self.extend_in_reg(&t, from);
                self.gen_store(&t, ap, to);
                self.pool.release(&t)
            }
        }
    }

    fn extend_in_reg(&mut self, ap: &Operand, from: u32) {
        let op = match from {
            1 => Opcode::Sxb,
            2 => Opcode::Sxc,
            4 => Opcode::Sxh,
            _ => return,
        };
        self.emit(op, vec![ap.clone(), ap.clone()]);
    }

    /// Mask a value down to `to` bytes of zero-extended payload
    pub(crate) fn zero_extend(
        &mut self,
        ap: &mut Operand,
        from: u32,
        to: u32,
    ) -> Result<(), CodegenError> {
        if ap.mode != AddrMode::Reg {
            self.make_legal(ap, Request::REG, from)?;
        }
        let mask: i64 = match to {
            1 => 0xFF,
            2 => 0xFFFF,
            4 => 0xFFFF_FFFF,
            _ => return Ok(()),
        };
        self.emit(
            Opcode::And,
            vec![ap.clone(), ap.clone(), Operand::immed(mask)],
        );
        Ok(())
    }
}
