//! Bitfield access
//!
//! Fields are carved out of their containing word with shift and mask
//! sequences. Extraction of a signed field shifts the field to the top
//! of the register and arithmetic-shifts it back down; an unsigned
//! field is shifted down and masked. Insertion clears the field in the
//! loaded word, ors in the shifted value, and stores the word back.

use acc_codegen::{Opcode, Operand};
use acc_common::{CodegenError, ExprKind, ExprNode};

use super::{LoweringContext, Request};
use crate::size::reference_size;

fn field_mask(width: u8) -> i64 {
    if width >= 64 {
        -1
    } else {
        (1i64 << width) - 1
    }
}

fn is_signed_field(kind: ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::BitRefByte | ExprKind::BitRefChar | ExprKind::BitRefHalf | ExprKind::BitRefWord
    )
}

impl LoweringContext {
    /// Value-context read of a bitfield reference
    pub(crate) fn gen_bitfield_extract(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
    ) -> Result<Operand, CodegenError> {
        let signed = is_signed_field(node.kind);
        let off = node.bit_offset as i64;
        let width = node.bit_width;
        let mut ap = self.lower_deref(node, Request::REG, size, signed)?;
        if signed {
            let up = 64 - off - width as i64;
            if up > 0 {
                self.emit(
                    Opcode::Shl,
                    vec![ap.clone(), ap.clone(), Operand::immed(up)],
                );
            }
            let down = 64 - width as i64;
            if down > 0 {
                self.emit(
                    Opcode::Asr,
                    vec![ap.clone(), ap.clone(), Operand::immed(down)],
                );
            }
        } else {
            if off > 0 {
                self.emit(
                    Opcode::Shru,
                    vec![ap.clone(), ap.clone(), Operand::immed(off)],
                );
            }
            self.emit(
                Opcode::And,
                vec![ap.clone(), ap.clone(), Operand::immed(field_mask(width))],
            );
            ap.unsigned = true;
        }
        self.make_legal(&mut ap, flags, size)?;
        Ok(ap)
    }

    /// Assignment whose destination is a bitfield reference. The value
    /// operand doubles as the expression result, so it is lowered
    /// first and the containing word's registers stack above it.
    pub(crate) fn gen_bitfield_assign(
        &mut self,
        node: &ExprNode,
        flags: Request,
        size: u32,
    ) -> Result<Operand, CodegenError> {
        let lhs = node.lhs().ok_or(CodegenError::NullNode)?;
        let rhs = node.rhs().ok_or(CodegenError::NullNode)?;
        let ssize = reference_size(lhs)?;
        let off = lhs.bit_offset as i64;
        let width = lhs.bit_width;
        let mask = field_mask(width);

        let mut ap2 = self.lower_expr(rhs, Request::REG, size)?;
        let ap1 = self.lower_deref(lhs, Request::MEM, ssize, false)?;

        let t = self.pool.acquire()?;
        self.gen_load(&t, &ap1, ssize, ssize);
        self.emit(
            Opcode::And,
            vec![t.clone(), t.clone(), Operand::immed(!(mask << off))],
        );
        let u = self.pool.acquire()?;
        self.emit(
            Opcode::Shl,
            vec![u.clone(), ap2.clone(), Operand::immed(off)],
        );
        self.emit(
            Opcode::And,
            vec![u.clone(), u.clone(), Operand::immed(mask << off)],
        );
        self.emit(Opcode::Or, vec![t.clone(), t.clone(), u.clone()]);
        self.gen_store(&t, &ap1, ssize);
        self.pool.release(&u)?;
        self.pool.release(&t)?;
        self.pool.release(&ap1)?;

        // the result is the value as the field will hold it
        if is_signed_field(lhs.kind) {
            let down = 64 - width as i64;
            if down > 0 {
                self.emit(
                    Opcode::Shl,
                    vec![ap2.clone(), ap2.clone(), Operand::immed(down)],
                );
                self.emit(
                    Opcode::Asr,
                    vec![ap2.clone(), ap2.clone(), Operand::immed(down)],
                );
            }
        } else {
            self.emit(
                Opcode::And,
                vec![ap2.clone(), ap2.clone(), Operand::immed(mask)],
            );
            ap2.unsigned = true;
        }
        self.make_legal(&mut ap2, flags, size)?;
        Ok(ap2)
    }
}
