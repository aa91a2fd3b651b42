//! Common subexpression screening
//!
//! Before lowering, repeated subtrees can be gathered into candidates
//! and ranked. The rank says how much keeping the value in a register
//! would pay: zero means the value is cheaper to rematerialize than to
//! hold, so the candidate should be dropped. Lvalues count double
//! because a retained address saves both the recomputation and a load.

use acc_common::{ExprKind, ExprNode};

/// A subtree observed more than zero times, with its usage count
#[derive(Debug, Clone, PartialEq)]
pub struct CseCandidate {
    pub expr: ExprNode,
    /// Times the subtree's value is actually consumed
    pub uses: u32,
    /// Seen only in contexts that discard the value
    pub voided: bool,
}

impl CseCandidate {
    /// Benefit estimate for keeping this value in a register.
    ///
    /// Zero for values not worth holding: discarded values, short
    /// integer constants an instruction can carry inline, named
    /// symbols, callables and anything volatile.
    pub fn desirability(&self) -> u32 {
        if self.voided {
            return 0;
        }
        let e = &self.expr;
        if e.kind == ExprKind::IntConst && (-32768..=32767).contains(&e.value) {
            return 0;
        }
        if matches!(e.kind, ExprKind::NameRef | ExprKind::CodeNameRef) {
            return 0;
        }
        if e.volatile_ref || e.inline_hint {
            return 0;
        }
        if e.is_lvalue() {
            2 * self.uses
        } else {
            self.uses
        }
    }
}

/// Accumulator that counts structurally identical subtrees
#[derive(Debug, Default)]
pub struct CseSet {
    entries: Vec<CseCandidate>,
}

impl CseSet {
    pub fn new() -> Self {
        CseSet::default()
    }

    /// Record one occurrence of a subtree. `value_used` is false when
    /// the occurrence sits in a void context.
    pub fn observe(&mut self, expr: &ExprNode, value_used: bool) {
        for entry in &mut self.entries {
            if entry.expr == *expr {
                if value_used {
                    entry.uses += 1;
                } else {
                    entry.voided = true;
                }
                return;
            }
        }
        self.entries.push(CseCandidate {
            expr: expr.clone(),
            uses: if value_used { 1 } else { 0 },
            voided: !value_used,
        });
    }

    /// Candidates worth keeping, best first
    pub fn candidates(&self) -> Vec<&CseCandidate> {
        let mut out: Vec<&CseCandidate> = self
            .entries
            .iter()
            .filter(|c| c.desirability() > 0)
            .collect();
        out.sort_by(|a, b| b.desirability().cmp(&a.desirability()));
        out
    }
}
