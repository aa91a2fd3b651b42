//! End-to-end lowering tests: build a statement tree, lower it, and
//! check the emitted instruction text and the pool invariants.

use acc_codegen::{Operand, Reg};
use acc_common::{CodegenError, ExprKind, ExprNode, TypeInfo};
use pretty_assertions::assert_eq;

use crate::lower::{LoweringContext, Request};
use crate::LoweringOptions;

fn test_context() -> LoweringContext {
    let _ = env_logger::builder().is_test(true).try_init();
    LoweringContext::new()
}

fn asm(ctx: &LoweringContext) -> Vec<String> {
    ctx.instructions().iter().map(|i| i.to_string()).collect()
}

fn word(off: i64) -> ExprNode {
    ExprNode::deref(ExprKind::RefWord, ExprNode::auto_con(off))
}

fn half_word(off: i64) -> ExprNode {
    ExprNode::deref(ExprKind::RefChar, ExprNode::auto_con(off))
}

fn add(lhs: ExprNode, rhs: ExprNode) -> ExprNode {
    ExprNode::binary(ExprKind::Add, TypeInfo::word(), lhs, rhs)
}

fn assign(lhs: ExprNode, rhs: ExprNode) -> ExprNode {
    ExprNode::binary(ExprKind::Assign, TypeInfo::word(), lhs, rhs)
}

fn cmp(kind: ExprKind, lhs: ExprNode, rhs: ExprNode) -> ExprNode {
    ExprNode::binary(kind, TypeInfo::word(), lhs, rhs)
}

#[test]
fn test_constant_into_register() {
    let mut ctx = test_context();
    let ap = ctx.lower_expr(&ExprNode::int_const(42), Request::REG, 2).unwrap();
    assert_eq!(asm(&ctx), vec!["    ldi r3,#42"]);
    ctx.pool.release(&ap).unwrap();
    assert!(ctx.pool.balanced());
}

#[test]
fn test_word_add_statement() {
    let mut ctx = test_context();
    let stmt = assign(word(-16), add(word(-8), ExprNode::int_const(1)));
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec!["    lw r4,-8[fp]", "    add r3,r4,#1", "    sw r3,-16[fp]"]
    );
    assert!(ctx.pool.balanced());
}

#[test]
fn test_half_word_add_keeps_width() {
    let mut ctx = test_context();
    let stmt = assign(half_word(-8), add(half_word(-8), ExprNode::int_const(1)));
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec!["    lc r4,-8[fp]", "    add r3,r4,#1", "    sc r3,-8[fp]"]
    );
}

#[test]
fn test_half_word_increment_uses_memory_form() {
    let mut ctx = test_context();
    let mut stmt = ExprNode::unary(ExprKind::AutoInc, TypeInfo::word(), half_word(-8));
    stmt.value = 1;
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(asm(&ctx), vec!["    inc -8[fp],#1"]);
}

#[test]
fn test_compound_add_uses_memory_form() {
    let mut ctx = test_context();
    let stmt = ExprNode::binary(
        ExprKind::AsAdd,
        TypeInfo::word(),
        half_word(-8),
        ExprNode::int_const(2),
    );
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(asm(&ctx), vec!["    inc -8[fp],#2"]);
    assert!(ctx.pool.balanced());
}

#[test]
fn test_nested_adds_reuse_registers_lifo() {
    let mut ctx = test_context();
    let e = add(add(word(-8), word(-16)), add(word(-24), word(-32)));
    let ap = ctx.lower_expr(&e, Request::REG, 8).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r5,-8[fp]",
            "    lw r6,-16[fp]",
            "    add r4,r5,r6",
            "    lw r6,-24[fp]",
            "    lw r7,-32[fp]",
            "    add r5,r6,r7",
            "    add r3,r4,r5",
        ]
    );
    ctx.pool.release(&ap).unwrap();
    assert!(ctx.pool.balanced());
}

#[test]
fn test_expression_too_deep_is_an_error() {
    let mut ctx = test_context();
    let mut e = word(-8);
    for _ in 0..8 {
        e = add(word(-16), e);
    }
    let err = ctx.lower_expr(&e, Request::REG, 8).unwrap_err();
    assert_eq!(err, CodegenError::PoolExhausted { bank: "int" });
}

#[test]
fn test_store_of_zero_uses_zero_register() {
    let mut ctx = test_context();
    let stmt = assign(word(-8), ExprNode::int_const(0));
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(asm(&ctx), vec!["    sw r0,-8[fp]"]);
}

#[test]
fn test_assign_into_register_variable() {
    let mut ctx = test_context();
    let stmt = assign(ExprNode::reg_var(12), ExprNode::int_const(5));
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(asm(&ctx), vec!["    ldi r12,#5"]);
}

#[test]
fn test_global_load_through_gp() {
    let mut ctx = test_context();
    let g = ExprNode::deref(ExprKind::RefWord, ExprNode::name_ref("counter"));
    let stmt = assign(word(-8), g);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(asm(&ctx), vec!["    lw r3,counter[gp]", "    sw r3,-8[fp]"]);
}

#[test]
fn test_global_load_absolute_without_gp() {
    let mut ctx = LoweringContext::with_options(LoweringOptions {
        use_gp: false,
        ..Default::default()
    });
    let g = ExprNode::deref(ExprKind::RefWord, ExprNode::name_ref("counter"));
    let stmt = assign(word(-8), g);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(asm(&ctx), vec!["    lw r3,counter", "    sw r3,-8[fp]"]);
}

#[test]
fn test_address_of_local() {
    let mut ctx = test_context();
    let stmt = assign(word(-8), ExprNode::auto_con(-32));
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(asm(&ctx), vec!["    lea r3,-32[fp]", "    sw r3,-8[fp]"]);
}

#[test]
fn test_multiply_moves_constant_right() {
    let mut ctx = test_context();
    let e = ExprNode::binary(
        ExprKind::Mul,
        TypeInfo::word(),
        ExprNode::int_const(2),
        word(-16),
    );
    let stmt = assign(word(-8), e);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec!["    lw r4,-16[fp]", "    mul r3,r4,#2", "    sw r3,-8[fp]"]
    );
}

#[test]
fn test_divide_keeps_operand_order() {
    let mut ctx = test_context();
    let e = ExprNode::binary(
        ExprKind::Div,
        TypeInfo::word(),
        ExprNode::int_const(2),
        word(-16),
    );
    let stmt = assign(word(-8), e);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    ldi r4,#2",
            "    lw r5,-16[fp]",
            "    div r3,r4,r5",
            "    sw r3,-8[fp]",
        ]
    );
}

#[test]
fn test_shift_amount_in_six_bit_immediate() {
    let mut ctx = test_context();
    let e = ExprNode::binary(ExprKind::Shl, TypeInfo::word(), word(-16), ExprNode::int_const(3));
    let stmt = assign(word(-8), e);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec!["    lw r4,-16[fp]", "    shl r3,r4,#3", "    sw r3,-8[fp]"]
    );
}

#[test]
fn test_oversized_shift_amount_goes_to_register() {
    let mut ctx = test_context();
    let e = ExprNode::binary(
        ExprKind::Shl,
        TypeInfo::word(),
        word(-16),
        ExprNode::int_const(100),
    );
    let stmt = assign(word(-8), e);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r4,-16[fp]",
            "    ldi r5,#100",
            "    shl r3,r4,r5",
            "    sw r3,-8[fp]",
        ]
    );
}

#[test]
fn test_false_jump_inverts_comparison() {
    let mut ctx = test_context();
    let cond = cmp(ExprKind::Lt, word(-8), ExprNode::int_const(0));
    ctx.false_jump(&cond, 10).unwrap();
    assert_eq!(asm(&ctx), vec!["    lw r3,-8[fp]", "    bge r3,#0,L10"]);
    assert!(ctx.pool.balanced());
}

#[test]
fn test_unsigned_comparison_branches_unsigned() {
    let mut ctx = test_context();
    let cond = cmp(ExprKind::Ult, word(-8), word(-16));
    ctx.false_jump(&cond, 3).unwrap();
    assert_eq!(
        asm(&ctx),
        vec!["    lw r3,-8[fp]", "    lw r4,-16[fp]", "    bgeu r3,r4,L3"]
    );
}

#[test]
fn test_logical_and_short_circuits() {
    let mut ctx = test_context();
    let cond = ExprNode::binary(
        ExprKind::LogAnd,
        TypeInfo::word(),
        cmp(ExprKind::Lt, word(-8), ExprNode::int_const(0)),
        cmp(ExprKind::Ne, word(-16), ExprNode::int_const(0)),
    );
    ctx.false_jump(&cond, 10).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r3,-8[fp]",
            "    bge r3,#0,L10",
            "    lw r3,-16[fp]",
            "    beq r3,#0,L10",
        ]
    );
}

#[test]
fn test_logical_or_true_jump_takes_either() {
    let mut ctx = test_context();
    let cond = ExprNode::binary(
        ExprKind::LogOr,
        TypeInfo::word(),
        cmp(ExprKind::Lt, word(-8), ExprNode::int_const(0)),
        cmp(ExprKind::Lt, word(-16), ExprNode::int_const(0)),
    );
    ctx.true_jump(&cond, 7).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r3,-8[fp]",
            "    blt r3,#0,L7",
            "    lw r3,-16[fp]",
            "    blt r3,#0,L7",
        ]
    );
}

#[test]
fn test_plain_value_condition_tests_against_zero() {
    let mut ctx = test_context();
    ctx.true_jump(&word(-8), 4).unwrap();
    assert_eq!(asm(&ctx), vec!["    lw r3,-8[fp]", "    bne r3,r0,L4"]);
}

#[test]
fn test_boolean_materialized_only_in_value_context() {
    let mut ctx = test_context();
    let stmt = assign(word(-8), cmp(ExprKind::Lt, word(-16), word(-24)));
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r4,-16[fp]",
            "    lw r5,-24[fp]",
            "    bge r4,r5,L1",
            "    ldi r3,#1",
            "    bra L2",
            "L1:",
            "    ldi r3,#0",
            "L2:",
            "    sw r3,-8[fp]",
        ]
    );
    assert!(ctx.pool.balanced());
}

#[test]
fn test_conditional_operator_unifies_result() {
    let mut ctx = test_context();
    let colon = ExprNode::binary(ExprKind::Colon, TypeInfo::word(), word(-24), word(-32));
    let cond = ExprNode::binary(
        ExprKind::Cond,
        TypeInfo::word(),
        cmp(ExprKind::Lt, word(-16), ExprNode::int_const(0)),
        colon,
    );
    let stmt = assign(word(-8), cond);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r3,-16[fp]",
            "    bge r3,#0,L1",
            "    lw r3,-24[fp]",
            "    bra L2",
            "L1:",
            "    lw r4,-32[fp]",
            "    mov r3,r4",
            "L2:",
            "    sw r3,-8[fp]",
        ]
    );
    assert!(ctx.pool.balanced());
}

#[test]
fn test_conditional_with_shared_register_arm_needs_no_join_move() {
    let mut ctx = test_context();
    let colon = ExprNode::binary(
        ExprKind::Colon,
        TypeInfo::word(),
        ExprNode::reg_var(12),
        ExprNode::reg_var(12),
    );
    let cond = ExprNode::binary(
        ExprKind::Cond,
        TypeInfo::word(),
        cmp(ExprKind::Lt, word(-16), ExprNode::int_const(0)),
        colon,
    );
    let ap = ctx.lower_expr(&cond, Request::REG, 8).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r3,-16[fp]",
            "    bge r3,#0,L1",
            "    bra L2",
            "L1:",
            "L2:",
        ]
    );
    assert!(!ap.temp);
    ctx.pool.release(&ap).unwrap();
    assert!(ctx.pool.balanced());
}

#[test]
fn test_conditional_with_register_variable_arm_joins_in_scratch() {
    let mut ctx = test_context();
    let colon = ExprNode::binary(
        ExprKind::Colon,
        TypeInfo::word(),
        ExprNode::reg_var(12),
        word(-32),
    );
    let cond = ExprNode::binary(
        ExprKind::Cond,
        TypeInfo::word(),
        cmp(ExprKind::Lt, word(-16), ExprNode::int_const(0)),
        colon,
    );
    let stmt = assign(word(-8), cond);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r3,-16[fp]",
            "    bge r3,#0,L1",
            "    mov r3,r12",
            "    bra L2",
            "L1:",
            "    lw r3,-32[fp]",
            "L2:",
            "    sw r3,-8[fp]",
        ]
    );
    assert!(ctx.pool.balanced());
}

#[test]
fn test_comma_discards_left_side() {
    let mut ctx = test_context();
    let e = ExprNode::binary(
        ExprKind::Comma,
        TypeInfo::word(),
        word(-8),
        ExprNode::int_const(7),
    );
    let ap = ctx.lower_expr(&e, Request::REG, 2).unwrap();
    assert_eq!(asm(&ctx), vec!["    ldi r3,#7"]);
    ctx.pool.release(&ap).unwrap();
    assert!(ctx.pool.balanced());
}

#[test]
fn test_volatile_request_forces_fresh_register() {
    let mut ctx = test_context();
    let ap = ctx
        .lower_expr(&ExprNode::reg_var(12), Request::REG | Request::VOL, 8)
        .unwrap();
    assert_eq!(asm(&ctx), vec!["    mov r3,r12"]);
    assert!(ap.temp);
    ctx.pool.release(&ap).unwrap();
}

#[test]
fn test_register_request_leaves_register_variable_alone() {
    let mut ctx = test_context();
    let ap = ctx.lower_expr(&ExprNode::reg_var(12), Request::REG, 8).unwrap();
    assert!(asm(&ctx).is_empty());
    assert!(!ap.temp);
}

#[test]
fn test_int_to_double_conversion() {
    let mut ctx = test_context();
    let e = ExprNode::unary(ExprKind::I2D, TypeInfo::double(), word(-8));
    let ap = ctx.lower_expr(&e, Request::REG, 8).unwrap();
    assert_eq!(asm(&ctx), vec!["    lw r4,-8[fp]", "    itof.d r3,r4"]);
    ctx.pool.release(&ap).unwrap();
}

#[test]
fn test_quad_to_int_crosses_exchange_register() {
    let mut ctx = test_context();
    let mut src = ExprNode::leaf(ExprKind::FpRegVar, TypeInfo::double());
    src.value = 20;
    let e = ExprNode::unary(ExprKind::Q2I, TypeInfo::word(), src);
    let ap = ctx.lower_expr(&e, Request::REG, 8).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    ftoi.q r63,f20",
            "    nop",
            "    nop",
            "    csrrw r3,#24,r0",
        ]
    );
    ctx.pool.release(&ap).unwrap();
}

#[test]
fn test_float_add_through_memory_operands() {
    let mut ctx = test_context();
    let fderef = |off: i64| {
        let mut base = ExprNode::leaf(ExprKind::AutoFloatCon, TypeInfo::double());
        base.value = off;
        let mut n = ExprNode::deref(ExprKind::RefDouble, base);
        n.ty = TypeInfo::double();
        n
    };
    let e = ExprNode::binary(ExprKind::Fadd, TypeInfo::double(), fderef(-16), fderef(-24));
    let stmt = ExprNode::binary(ExprKind::Assign, TypeInfo::double(), fderef(-8), e);
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r4,-16[fp]",
            "    lw r5,-24[fp]",
            "    fadd.d r3,r4,r5",
            "    sw r3,-8[fp]",
        ]
    );
}

#[test]
fn test_bitfield_extract_unsigned() {
    let mut ctx = test_context();
    let mut field = ExprNode::deref(ExprKind::BitRefWordU, ExprNode::auto_con(-8));
    field.unsigned = true;
    field.bit_offset = 4;
    field.bit_width = 8;
    let ap = ctx.lower_expr(&field, Request::REG, 8).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    lw r3,-8[fp]",
            "    shru r3,r3,#4",
            "    and r3,r3,#255",
        ]
    );
    ctx.pool.release(&ap).unwrap();
}

#[test]
fn test_bitfield_assign_inserts_field() {
    let mut ctx = test_context();
    let mut field = ExprNode::deref(ExprKind::BitRefWordU, ExprNode::auto_con(-8));
    field.unsigned = true;
    field.bit_offset = 4;
    field.bit_width = 8;
    let stmt = ExprNode::binary(
        ExprKind::Assign,
        TypeInfo::word(),
        field,
        ExprNode::int_const(3),
    );
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    ldi r3,#3",
            "    lw r4,-8[fp]",
            "    and r4,r4,#-4081",
            "    shl r5,r3,#4",
            "    and r5,r5,#4080",
            "    or r4,r4,r5",
            "    sw r4,-8[fp]",
            "    and r3,r3,#255",
        ]
    );
    assert!(ctx.pool.balanced());
}

#[test]
fn test_call_pushes_args_and_links() {
    let mut ctx = test_context();
    let call = ExprNode::binary(
        ExprKind::Call,
        TypeInfo::word(),
        ExprNode::name_ref("putchar"),
        ExprNode::int_const(65),
    );
    ctx.lower_stmt(&call).unwrap();
    assert_eq!(
        asm(&ctx),
        vec![
            "    ldi r3,#65",
            "    push r3",
            "    jal lr,putchar",
            "    add sp,sp,#8",
        ]
    );
    assert!(ctx.pool.balanced());
}

#[test]
fn test_in_range_immediate_consumes_no_register() {
    let mut ctx = test_context();
    let ap = ctx
        .lower_expr(&ExprNode::int_const(5), Request::REG | Request::IMM, 8)
        .unwrap();
    assert!(asm(&ctx).is_empty());
    assert!(!ap.temp);
    assert!(ctx.pool.balanced());
}

#[test]
fn test_compound_or_is_a_single_read_modify_write() {
    let mut ctx = test_context();
    let stmt = ExprNode::binary(
        ExprKind::AsOr,
        TypeInfo::word(),
        word(-8),
        ExprNode::int_const(15),
    );
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(
        asm(&ctx),
        vec!["    lw r3,-8[fp]", "    or r3,r3,#15", "    sw r3,-8[fp]"]
    );
    assert!(ctx.pool.balanced());
}

#[test]
fn test_compound_add_to_register_destination_is_one_instruction() {
    let mut ctx = test_context();
    let stmt = ExprNode::binary(
        ExprKind::AsAdd,
        TypeInfo::word(),
        ExprNode::reg_var(12),
        ExprNode::int_const(2),
    );
    ctx.lower_stmt(&stmt).unwrap();
    assert_eq!(asm(&ctx), vec!["    add r12,r12,#2"]);
    assert!(ctx.pool.balanced());
}

#[test]
fn test_extension_at_equal_widths_emits_nothing() {
    let mut ctx = test_context();
    let ap = Operand::indexed(Reg::FP, -8);
    ctx.sign_extend(&ap, 8, 8).unwrap();
    let mut unsigned = Operand::indexed(Reg::FP, -8);
    unsigned.unsigned = true;
    ctx.sign_extend(&unsigned, 2, 8).unwrap();
    assert!(asm(&ctx).is_empty());
}

#[test]
fn test_unlowerable_node_reports_diagnostic() {
    let mut ctx = test_context();
    let e = ExprNode::binary(
        ExprKind::Colon,
        TypeInfo::word(),
        ExprNode::int_const(1),
        ExprNode::int_const(2),
    );
    let err = ctx.lower_stmt(&e).unwrap_err();
    assert!(matches!(err, CodegenError::UnloweredNode { .. }));
    assert!(ctx.reporter().has_errors());
}

#[test]
fn test_unsatisfiable_request_is_an_error() {
    let mut ctx = test_context();
    let mut ap = Operand::immed(9);
    let err = ctx.make_legal(&mut ap, Request::VOL, 8).unwrap_err();
    assert!(matches!(err, CodegenError::Unsatisfiable { .. }));
}

#[test]
fn test_memory_only_request_rejects_an_immediate() {
    let mut ctx = test_context();
    let mut ap = Operand::immed(5);
    let err = ctx.make_legal(&mut ap, Request::MEM, 8).unwrap_err();
    assert!(matches!(err, CodegenError::Unsatisfiable { .. }));
    assert!(ctx.instructions().is_empty());
}

#[test]
fn test_take_instructions_drains_buffer() {
    let mut ctx = test_context();
    ctx.lower_stmt(&assign(word(-8), ExprNode::int_const(0))).unwrap();
    let first = ctx.take_instructions();
    assert_eq!(first.len(), 1);
    assert!(ctx.instructions().is_empty());
}
