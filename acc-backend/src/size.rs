//! Evaluation width oracles
//!
//! Two questions come up constantly during lowering: how wide a value
//! an expression naturally produces, and how wide the storage behind a
//! reference is. Both are answered from the node alone. Integer
//! constants report the narrowest width that holds the value, so a
//! small literal never forces a wide operation on its own; binary
//! operators take the wider of their children.

use acc_common::{
    CodegenError, ExprKind, ExprNode, SIZE_OF_FPD, SIZE_OF_FPQ, SIZE_OF_FPT, SIZE_OF_WORD,
};

/// Natural evaluation width of an expression, in bytes
pub fn natural_size(node: &ExprNode) -> Result<u32, CodegenError> {
    use ExprKind::*;
    match node.kind {
        IntConst => {
            if (-32768..=32767).contains(&node.value) {
                Ok(2)
            } else if (-2147483648..=2147483647).contains(&node.value) {
                Ok(4)
            } else {
                Ok(8)
            }
        }
        FloatConst => Ok(node.ty.float_size()),

        LabelRef | CodeLabelRef | NameRef | CodeNameRef | AutoCon | AutoFloatCon | ClassCon
        | TempRef | RegVar | FpRegVar | Call | Cbw | Ccw | Chw | Cbu | Ccu | Chu | Cubw | Cucw
        | Cuhw => Ok(SIZE_OF_WORD),

        TempFpRef => Ok(node.ty.float_size()),

        RefByte | RefByteU | BitRefByte | BitRefByteU => Ok(1),
        RefChar | RefCharU | BitRefChar | BitRefCharU => Ok(2),
        RefHalf | RefHalfU | Ref32 | Ref32U | BitRefHalf | BitRefHalfU => Ok(4),
        RefWord | RefWordU | BitRefWord | BitRefWordU => Ok(SIZE_OF_WORD),
        RefFloat => Ok(SIZE_OF_FPD),
        RefDouble => Ok(SIZE_OF_FPD),
        RefTriple => Ok(SIZE_OF_FPT),
        RefQuad => Ok(SIZE_OF_FPQ),
        RefStruct => {
            let n = node.value as u32;
            Ok(if n == 0 { SIZE_OF_WORD } else { n })
        }

        Neg | Com | LogNot | Assign | AutoInc | AutoDec => child_size(node.lhs()),

        Add | Sub | Mul | Mulu | Div | Divu | Mod | Modu | And | Or | Xor | Shl | Shlu | Shr
        | Shru | Asr | Fadd | Fsub | Fmul | Fdiv | Eq | Ne | Lt | Le | Gt | Ge | Ult | Ule
        | Ugt | Uge | Feq | Fne | Flt | Fle | Fgt | Fge | LogAnd | LogOr | AsAdd | AsSub
        | AsAnd | AsOr | AsXor | AsShl | AsShr | AsShru | AsMul | AsMulu | AsDiv | AsDivu
        | AsMod | AsModu => {
            let l = child_size(node.lhs())?;
            let r = child_size(node.rhs())?;
            Ok(l.max(r))
        }

        Comma | Cond | Colon => child_size(node.rhs()),

        D2I | T2I | Q2I => Ok(SIZE_OF_WORD),
        I2D => Ok(SIZE_OF_FPD),
        I2T => Ok(SIZE_OF_FPT),
        I2Q | S2Q => Ok(SIZE_OF_FPQ),
    }
}

fn child_size(child: Option<&ExprNode>) -> Result<u32, CodegenError> {
    match child {
        Some(n) => natural_size(n),
        None => Err(CodegenError::NullNode),
    }
}

/// Width of the storage a reference node designates, in bytes.
///
/// Differs from the natural size only where evaluation widens: a
/// register variable is stored at full word width, and non-reference
/// nodes fall back to their natural size.
pub fn reference_size(node: &ExprNode) -> Result<u32, CodegenError> {
    use ExprKind::*;
    match node.kind {
        RefByte | RefByteU | BitRefByte | BitRefByteU => Ok(1),
        RefChar | RefCharU | BitRefChar | BitRefCharU => Ok(2),
        RefHalf | RefHalfU | Ref32 | Ref32U | BitRefHalf | BitRefHalfU => Ok(4),
        RefWord | RefWordU | BitRefWord | BitRefWordU => Ok(SIZE_OF_WORD),
        RefFloat | RefDouble => Ok(SIZE_OF_FPD),
        RefTriple => Ok(SIZE_OF_FPT),
        RefQuad => Ok(SIZE_OF_FPQ),
        RefStruct => natural_size(node),
        RegVar | FpRegVar | TempRef | TempFpRef => Ok(SIZE_OF_WORD),
        _ => natural_size(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acc_common::TypeInfo;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_constant_widths() {
        assert_eq!(natural_size(&ExprNode::int_const(100)).unwrap(), 2);
        assert_eq!(natural_size(&ExprNode::int_const(-32768)).unwrap(), 2);
        assert_eq!(natural_size(&ExprNode::int_const(40000)).unwrap(), 4);
        assert_eq!(natural_size(&ExprNode::int_const(1 << 40)).unwrap(), 8);
    }

    #[test]
    fn test_binary_takes_wider_child() {
        let e = ExprNode::binary(
            ExprKind::Add,
            TypeInfo::word(),
            ExprNode::int_const(5),
            ExprNode::int_const(1 << 33),
        );
        assert_eq!(natural_size(&e).unwrap(), 8);
    }

    #[test]
    fn test_reference_widths() {
        let b = ExprNode::deref(ExprKind::RefByte, ExprNode::auto_con(-1));
        let h = ExprNode::deref(ExprKind::RefHalf, ExprNode::auto_con(-8));
        assert_eq!(natural_size(&b).unwrap(), 1);
        assert_eq!(reference_size(&b).unwrap(), 1);
        assert_eq!(natural_size(&h).unwrap(), 4);
    }

    #[test]
    fn test_comma_takes_right_side() {
        let e = ExprNode::binary(
            ExprKind::Comma,
            TypeInfo::word(),
            ExprNode::int_const(1 << 40),
            ExprNode::int_const(7),
        );
        assert_eq!(natural_size(&e).unwrap(), 2);
    }

    #[test]
    fn test_missing_child_is_an_error() {
        let e = ExprNode::leaf(ExprKind::Neg, TypeInfo::word());
        assert_eq!(natural_size(&e).unwrap_err(), CodegenError::NullNode);
    }
}
