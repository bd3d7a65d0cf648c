//! Assertion helpers for verifying lattice algebraic laws.
//!
//! These check properties over a given set of sample elements and collect
//! all violations into a single report, so you can see every failing law
//! at once rather than fixing them one at a time.
//!
//! The domains here are join-semilattices: `join`, a partial order, and
//! (where the type has them) bottom/top elements and a widening operator.
//! There is deliberately no meet — the shape domain does not have one.

use std::fmt::{Debug, Write};

use bufscan_lattice::{AbstractValue, HasBottom, HasTop, Lattice};

/// Collect violations into a `Vec<String>`, then panic with a combined
/// report if any were found.
fn report(violations: Vec<String>) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("{} lattice law violation(s):\n", violations.len());
    for (i, v) in violations.iter().enumerate() {
        let _ = write!(msg, "  {}. {}\n", i + 1, v);
    }
    panic!("{msg}");
}

/// Check that `join` is commutative, associative, and idempotent over the
/// given elements.
pub fn assert_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    report(violations);
}

/// Check that `is_subseteq` is a partial order consistent with `join`:
/// reflexive, transitive, an upper bound for both operands, and
/// `a ⊑ b` exactly when `join(a, b) == b`.
pub fn assert_order_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_order_laws(elements, &mut violations);
    report(violations);
}

/// Check join laws and ordering consistency together. The main entry
/// point for a [`Lattice`] implementation; pass a representative set of
/// elements — the more diverse the set, the better the coverage.
pub fn assert_semilattice_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    check_order_laws(elements, &mut violations);
    report(violations);
}

/// Check that `bottom()` is below every element and is the identity for
/// `join`.
pub fn assert_bottom_laws<L: HasBottom + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    let bot = L::bottom();
    for x in elements {
        if !bot.is_subseteq(x) {
            violations.push(format!(
                "bottom not below element: bottom().is_subseteq({x:?}) = false"
            ));
        }
        if bot.join(x) != *x {
            violations.push(format!(
                "bottom identity violated: bottom().join({x:?}) != {x:?}"
            ));
        }
    }
    report(violations);
}

/// Check that `top()` is above every element and absorbs `join`.
pub fn assert_top_laws<L: HasTop + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    let top = L::top();
    for x in elements {
        if !x.is_subseteq(&top) {
            violations.push(format!(
                "element not below top: {x:?}.is_subseteq(top()) = false"
            ));
        }
        if top.join(x) != top {
            violations.push(format!(
                "top annihilation violated: top().join({x:?}) != top()"
            ));
        }
    }
    report(violations);
}

/// Check that widening covers both operands at every supplied iteration
/// count: `a ⊑ widen(a, b, n)` and `b ⊑ widen(a, b, n)`.
pub fn assert_widen_covers<L: AbstractValue + Debug>(elements: &[L], iteration_counts: &[usize]) {
    let mut violations = Vec::new();
    for a in elements {
        for b in elements {
            for &n in iteration_counts {
                let w = a.widen(b, n);
                if !a.is_subseteq(&w) {
                    violations.push(format!(
                        "widen does not cover prev: {a:?}.is_subseteq({a:?}.widen({b:?}, {n})) = false"
                    ));
                }
                if !b.is_subseteq(&w) {
                    violations.push(format!(
                        "widen does not cover next: {b:?}.is_subseteq({a:?}.widen({b:?}, {n})) = false"
                    ));
                }
            }
        }
    }
    report(violations);
}

// ---- internal helpers that push violations instead of panicking ----

fn check_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        // idempotent
        if a.join(a) != *a {
            v.push(format!("join not idempotent: {a:?}.join({a:?}) != {a:?}"));
        }
        for b in elements {
            // commutative
            if a.join(b) != b.join(a) {
                v.push(format!(
                    "join not commutative: {a:?}.join({b:?}) != {b:?}.join({a:?})"
                ));
            }
            // associative
            for c in elements {
                if a.join(b).join(c) != a.join(&b.join(c)) {
                    v.push(format!(
                        "join not associative: ({a:?}.join({b:?})).join({c:?}) != {a:?}.join({b:?}.join({c:?}))"
                    ));
                }
            }
        }
    }
}

fn check_order_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        // reflexive
        if !a.is_subseteq(a) {
            v.push(format!("order not reflexive: {a:?}.is_subseteq({a:?}) = false"));
        }
        for b in elements {
            let joined = a.join(b);
            // join is an upper bound
            if !a.is_subseteq(&joined) {
                v.push(format!("join not an upper bound: {a:?} not below {joined:?}"));
            }
            if !b.is_subseteq(&joined) {
                v.push(format!("join not an upper bound: {b:?} not below {joined:?}"));
            }
            // consistency with join
            let sub = a.is_subseteq(b);
            let join_agrees = joined == *b;
            if sub != join_agrees {
                v.push(format!(
                    "ordering inconsistent with join: {a:?}.is_subseteq({b:?}) = {sub}, \
                     but {a:?}.join({b:?}) == {b:?} is {join_agrees}"
                ));
            }
            // transitive
            for c in elements {
                if a.is_subseteq(b) && b.is_subseteq(c) && !a.is_subseteq(c) {
                    v.push(format!(
                        "order not transitive: {a:?} ⊑ {b:?} ⊑ {c:?} but not {a:?} ⊑ {c:?}"
                    ));
                }
            }
        }
    }
}
