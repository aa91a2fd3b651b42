//! Typed expression tree consumed by the code generation core
//!
//! The front end builds one tree per statement and hands it over fully
//! type checked. The tree is strictly that - a tree, not a graph: every
//! node owns its children and no child is shared between parents. The
//! back end treats it as read only.

use crate::types::{SIZE_OF_FPD, SIZE_OF_FPQ, SIZE_OF_FPT};

/// Scalar type categories known to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// 8-bit integer
    Byte,
    /// 16-bit integer
    Char,
    /// 32-bit integer
    Half,
    /// 64-bit integer
    Word,
    Float,
    Double,
    Triple,
    Quad,
    Pointer,
    Struct,
    Void,
}

/// Type descriptor attached to every expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub kind: TypeKind,
    /// Bit precision; meaningful for floating types
    pub precision: u16,
    pub unsigned: bool,
}

impl TypeInfo {
    pub fn word() -> Self {
        TypeInfo {
            kind: TypeKind::Word,
            precision: 64,
            unsigned: false,
        }
    }

    pub fn double() -> Self {
        TypeInfo {
            kind: TypeKind::Double,
            precision: 64,
            unsigned: false,
        }
    }

    /// True for all floating categories
    pub fn is_float(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Float | TypeKind::Double | TypeKind::Triple | TypeKind::Quad
        )
    }

    /// Byte width of a floating value of this type
    pub fn float_size(&self) -> u32 {
        match self.kind {
            TypeKind::Quad => SIZE_OF_FPQ,
            TypeKind::Triple => SIZE_OF_FPT,
            _ => SIZE_OF_FPD,
        }
    }
}

/// Expression node kinds.
///
/// Grouped the way the lowering dispatcher consumes them: constants,
/// storage references, dereferences, operators, assignment family,
/// control forms and conversions. Widths in the dereference names are
/// byte (8), char (16), half (32), word (64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    // constants and label references
    IntConst,
    FloatConst,
    /// Internal (numbered) label in the data segment
    LabelRef,
    /// Internal label in the code segment
    CodeLabelRef,
    /// Named global symbol
    NameRef,
    /// Named symbol resolved against the code segment
    CodeNameRef,

    // storage references (addresses, not values)
    /// Stack-frame local; `value` holds the frame offset
    AutoCon,
    /// Stack-frame local of floating type
    AutoFloatCon,
    /// Class member; `value` holds the member offset
    ClassCon,
    /// Variable living in a declared register; `value` is the register
    RegVar,
    FpRegVar,
    TempRef,
    TempFpRef,

    // dereferences
    RefByte,
    RefByteU,
    RefChar,
    RefCharU,
    RefHalf,
    RefHalfU,
    RefWord,
    RefWordU,
    Ref32,
    Ref32U,
    RefFloat,
    RefDouble,
    RefTriple,
    RefQuad,
    RefStruct,
    BitRefByte,
    BitRefByteU,
    BitRefChar,
    BitRefCharU,
    BitRefHalf,
    BitRefHalfU,
    BitRefWord,
    BitRefWordU,

    // unary operators
    Neg,
    Com,

    // integer binary operators
    Add,
    Sub,
    Mul,
    Mulu,
    Div,
    Divu,
    Mod,
    Modu,
    And,
    Or,
    Xor,
    Shl,
    Shlu,
    Shr,
    Shru,
    Asr,

    // floating binary operators
    Fadd,
    Fsub,
    Fmul,
    Fdiv,

    // comparisons
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Ult,
    Ule,
    Ugt,
    Uge,
    Feq,
    Fne,
    Flt,
    Fle,
    Fgt,
    Fge,

    // logical combinators
    LogAnd,
    LogOr,
    LogNot,

    // assignment family
    Assign,
    AsAdd,
    AsSub,
    AsAnd,
    AsOr,
    AsXor,
    AsShl,
    AsShr,
    AsShru,
    AsMul,
    AsMulu,
    AsDiv,
    AsDivu,
    AsMod,
    AsModu,
    AutoInc,
    AutoDec,

    // control forms
    /// Ternary conditional; `rhs` is a `Colon` pair
    Cond,
    /// Pair node holding the two arms of a conditional
    Colon,
    /// Comma operator; left side evaluated for effect only
    Comma,
    /// Function call; `lhs` is the callee, `rhs` the argument chain
    Call,

    // width conversions (sign extend)
    Cbw,
    Ccw,
    Chw,
    // width conversions (mask)
    Cbu,
    Ccu,
    Chu,
    Cubw,
    Cucw,
    Cuhw,
    // cross-domain conversions
    I2D,
    I2T,
    I2Q,
    D2I,
    T2I,
    Q2I,
    S2Q,
}

/// One node of the expression tree.
///
/// The payload fields are a union in spirit: `value` is the integer
/// constant, frame offset, register number, label number or increment
/// delta depending on the kind; `name` is set for named symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub ty: TypeInfo,
    pub unsigned: bool,
    pub volatile_ref: bool,
    pub const_folded: bool,
    /// True when the symbol behind this node is bound to inline expansion
    pub inline_hint: bool,
    /// Register variables only: storage class wants the address, not the value
    pub by_address: bool,
    pub value: i64,
    pub fvalue: f64,
    pub name: Option<String>,
    /// Index scale for two-register addressing
    pub scale: u8,
    pub bit_offset: u8,
    pub bit_width: u8,
    pub lhs: Option<Box<ExprNode>>,
    pub rhs: Option<Box<ExprNode>>,
}

impl ExprNode {
    /// Leaf node with no payload beyond the kind and type
    pub fn leaf(kind: ExprKind, ty: TypeInfo) -> Self {
        ExprNode {
            kind,
            ty,
            unsigned: ty.unsigned,
            volatile_ref: false,
            const_folded: false,
            inline_hint: false,
            by_address: false,
            value: 0,
            fvalue: 0.0,
            name: None,
            scale: 0,
            bit_offset: 0,
            bit_width: 0,
            lhs: None,
            rhs: None,
        }
    }

    pub fn int_const(value: i64) -> Self {
        let mut n = ExprNode::leaf(ExprKind::IntConst, TypeInfo::word());
        n.value = value;
        n
    }

    pub fn float_const(value: f64) -> Self {
        let mut n = ExprNode::leaf(ExprKind::FloatConst, TypeInfo::double());
        n.fvalue = value;
        n
    }

    /// Stack local at the given frame offset
    pub fn auto_con(offset: i64) -> Self {
        let mut n = ExprNode::leaf(ExprKind::AutoCon, TypeInfo::word());
        n.value = offset;
        n
    }

    pub fn name_ref(name: &str) -> Self {
        let mut n = ExprNode::leaf(ExprKind::NameRef, TypeInfo::word());
        n.name = Some(name.to_string());
        n
    }

    pub fn reg_var(reg: i64) -> Self {
        let mut n = ExprNode::leaf(ExprKind::RegVar, TypeInfo::word());
        n.value = reg;
        n
    }

    pub fn unary(kind: ExprKind, ty: TypeInfo, operand: ExprNode) -> Self {
        let mut n = ExprNode::leaf(kind, ty);
        n.lhs = Some(Box::new(operand));
        n
    }

    pub fn binary(kind: ExprKind, ty: TypeInfo, lhs: ExprNode, rhs: ExprNode) -> Self {
        let mut n = ExprNode::leaf(kind, ty);
        n.lhs = Some(Box::new(lhs));
        n.rhs = Some(Box::new(rhs));
        n
    }

    /// Dereference of `base` with the width/signedness encoded in `kind`
    pub fn deref(kind: ExprKind, base: ExprNode) -> Self {
        let mut n = ExprNode::leaf(kind, TypeInfo::word());
        n.lhs = Some(Box::new(base));
        n
    }

    pub fn lhs(&self) -> Option<&ExprNode> {
        self.lhs.as_deref()
    }

    pub fn rhs(&self) -> Option<&ExprNode> {
        self.rhs.as_deref()
    }

    /// True for nodes that denote a storage location
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::RefByte
                | ExprKind::RefByteU
                | ExprKind::RefChar
                | ExprKind::RefCharU
                | ExprKind::RefHalf
                | ExprKind::RefHalfU
                | ExprKind::RefWord
                | ExprKind::RefWordU
                | ExprKind::Ref32
                | ExprKind::Ref32U
                | ExprKind::RefFloat
                | ExprKind::RefDouble
                | ExprKind::RefTriple
                | ExprKind::RefQuad
                | ExprKind::RefStruct
                | ExprKind::BitRefByte
                | ExprKind::BitRefByteU
                | ExprKind::BitRefChar
                | ExprKind::BitRefCharU
                | ExprKind::BitRefHalf
                | ExprKind::BitRefHalfU
                | ExprKind::BitRefWord
                | ExprKind::BitRefWordU
                | ExprKind::RegVar
                | ExprKind::FpRegVar
                | ExprKind::TempRef
                | ExprKind::TempFpRef
        )
    }

    /// True for the bitfield dereference kinds
    pub fn is_bitfield_ref(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::BitRefByte
                | ExprKind::BitRefByteU
                | ExprKind::BitRefChar
                | ExprKind::BitRefCharU
                | ExprKind::BitRefHalf
                | ExprKind::BitRefHalfU
                | ExprKind::BitRefWord
                | ExprKind::BitRefWordU
        )
    }
}
