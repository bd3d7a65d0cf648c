//! Bounded symbolic interval domain.
//!
//! An [`Interval`] is a pair of [`Bound`]s, each of which is an infinity
//! or an affine expression over [`Symbol`]s. Symbols let a callee summary
//! talk about quantities the callee cannot know (parameter extents);
//! [`Interval::subst`] replaces them with caller-context ranges when the
//! summary is instantiated. All arithmetic saturates and all comparisons
//! involving symbols are only partially decidable; every operation
//! resolves the undecidable cases toward the safe over-approximation.

mod bound;

use std::collections::BTreeSet;
use std::fmt;

use bufscan_lattice::{AbstractValue, HasBottom, HasTop, Lattice, TriBool};

pub use bound::{Affine, Bound, Symbol};

/// Number of fixpoint revisits during which widening still behaves as a
/// plain join. Delaying the jump to infinite bounds keeps short loops
/// precise while unbounded chains still terminate.
pub const WIDENING_DELAY: usize = 2;

/// Comparison operator for branch-condition pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Lt,
    Le,
    Gt,
    Ge,
}

/// An interval `[lo, hi]`. `lo > hi` represents bottom (empty); the
/// canonical empty form is `[+oo, -oo]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

impl Interval {
    pub fn new(lo: i64, hi: i64) -> Self {
        if lo > hi {
            Self::bottom()
        } else {
            Interval {
                lo: Bound::int(lo),
                hi: Bound::int(hi),
            }
        }
    }

    pub fn constant(v: i64) -> Self {
        Interval::new(v, v)
    }

    pub fn zero() -> Self {
        Interval::constant(0)
    }

    /// The exact singleton `[s, s]` for a symbol.
    pub fn of_symbol(sym: Symbol) -> Self {
        Interval {
            lo: Bound::sym(sym),
            hi: Bound::sym(sym),
        }
    }

    /// Build from bounds, collapsing a definitely-empty pair to bottom.
    pub fn of_bounds(lo: Bound, hi: Bound) -> Self {
        let itv = Interval { lo, hi };
        if itv.is_empty() { Self::bottom() } else { itv }
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lo, &self.hi) {
            (Bound::PosInf, _) | (_, Bound::NegInf) => true,
            (Bound::NegInf, _) | (_, Bound::PosInf) => false,
            (lo, hi) => lo.le(hi) == Some(false),
        }
    }

    /// The exact value, if this interval is a symbol-free singleton.
    pub fn is_const(&self) -> Option<i64> {
        match (self.lo.as_int(), self.hi.as_int()) {
            (Some(l), Some(h)) if l == h => Some(l),
            _ => None,
        }
    }

    pub fn has_symbols(&self) -> bool {
        self.lo.has_symbols() || self.hi.has_symbols()
    }

    /// Canonicalize: any definitely-empty interval becomes bottom.
    /// Idempotent.
    pub fn normalize(&self) -> Self {
        if self.is_empty() {
            Self::bottom()
        } else {
            self.clone()
        }
    }

    pub fn meet(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::bottom();
        }
        Self::of_bounds(
            Bound::max_lower_keep_left(&self.lo, &other.lo),
            Bound::min_upper_keep_left(&self.hi, &other.hi),
        )
    }

    // -- Arithmetic ---------------------------------------------------------

    pub fn plus(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::bottom();
        }
        Self::of_bounds(self.lo.add(&other.lo), self.hi.add(&other.hi))
    }

    pub fn minus(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::bottom();
        }
        Self::of_bounds(self.lo.sub(&other.hi), self.hi.sub(&other.lo))
    }

    pub fn neg(&self) -> Self {
        if self.is_empty() {
            return Self::bottom();
        }
        Self::of_bounds(self.hi.neg(), self.lo.neg())
    }

    pub fn mult(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::bottom();
        }
        if let Some(c) = self.is_const() {
            return other.mult_const(c);
        }
        if let Some(c) = other.is_const() {
            return self.mult_const(c);
        }
        let products = [
            Bound::mul_numeric(&self.lo, &other.lo),
            Bound::mul_numeric(&self.lo, &other.hi),
            Bound::mul_numeric(&self.hi, &other.lo),
            Bound::mul_numeric(&self.hi, &other.hi),
        ];
        // A symbolic operand without a constant partner has no linear
        // product form; give up the whole range.
        let Some(products) = products.into_iter().collect::<Option<Vec<_>>>() else {
            return Self::top();
        };
        let lo = products
            .iter()
            .fold(Bound::PosInf, |acc, b| Bound::min_lower(&acc, b));
        let hi = products
            .iter()
            .fold(Bound::NegInf, |acc, b| Bound::max_upper(&acc, b));
        Self::of_bounds(lo, hi)
    }

    pub fn mult_const(&self, k: i64) -> Self {
        if self.is_empty() {
            return Self::bottom();
        }
        if k == 0 {
            return Self::zero();
        }
        if k > 0 {
            Self::of_bounds(self.lo.scale(k), self.hi.scale(k))
        } else {
            Self::of_bounds(self.hi.scale(k), self.lo.scale(k))
        }
    }

    /// Divide by a nonzero constant, rounding outward. A zero divisor is
    /// a caller contract violation.
    pub fn div_const(&self, k: i64) -> Self {
        if k == 0 {
            panic!("interval division by zero");
        }
        if self.is_empty() {
            return Self::bottom();
        }
        if k < 0 {
            return self.neg().div_const(-k);
        }
        let lo = self.lo.div_round(k, false).unwrap_or(Bound::NegInf);
        let hi = self.hi.div_round(k, true).unwrap_or(Bound::PosInf);
        Self::of_bounds(lo, hi)
    }

    // -- Symbols ------------------------------------------------------------

    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.lo.collect_symbols(&mut out);
        self.hi.collect_symbols(&mut out);
        out
    }

    /// Replace every symbol with its caller-context range. A symbol the
    /// evaluator cannot resolve loses the affected bound to infinity, so
    /// no symbol survives substitution on a resolved-or-dropped basis.
    pub fn subst<F>(&self, eval: &F) -> Self
    where
        F: Fn(Symbol) -> Option<Interval>,
    {
        if self.is_empty() {
            return Self::bottom();
        }
        Self::of_bounds(
            subst_bound(&self.lo, eval, false),
            subst_bound(&self.hi, eval, true),
        )
    }

    // -- Branch-condition narrowing -----------------------------------------

    /// Narrow under `self op other`. Undecidable symbolic endpoints keep
    /// the original bound, so the result never grows.
    pub fn prune_comp(&self, op: CompOp, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::bottom();
        }
        let (lo, hi) = match op {
            CompOp::Lt => (
                self.lo.clone(),
                Bound::min_upper_keep_left(&self.hi, &other.hi.add(&Bound::int(-1))),
            ),
            CompOp::Le => (
                self.lo.clone(),
                Bound::min_upper_keep_left(&self.hi, &other.hi),
            ),
            CompOp::Gt => (
                Bound::max_lower_keep_left(&self.lo, &other.lo.add(&Bound::int(1))),
                self.hi.clone(),
            ),
            CompOp::Ge => (
                Bound::max_lower_keep_left(&self.lo, &other.lo),
                self.hi.clone(),
            ),
        };
        Self::of_bounds(lo, hi)
    }

    /// Narrow under `self == other`.
    pub fn prune_eq(&self, other: &Self) -> Self {
        self.meet(other)
    }

    /// Narrow under `self != other`. Only an exact-constant comparand can
    /// trim, and only at the endpoints.
    pub fn prune_ne(&self, other: &Self) -> Self {
        if self.is_empty() {
            return Self::bottom();
        }
        let Some(c) = other.is_const() else {
            return self.clone();
        };
        let mut lo = self.lo.clone();
        let mut hi = self.hi.clone();
        if lo == Bound::int(c) {
            lo = Bound::int(c.saturating_add(1));
        }
        if hi == Bound::int(c) {
            hi = Bound::int(c.saturating_sub(1));
        }
        Self::of_bounds(lo, hi)
    }

    // -- Three-valued comparison --------------------------------------------

    /// Partially decidable equality of the concretized value sets.
    pub fn cmp_eq(a: &Self, b: &Self) -> TriBool {
        if a.is_empty() || b.is_empty() {
            return TriBool::Unknown;
        }
        if a.hi.lt(&b.lo) == Some(true) || b.hi.lt(&a.lo) == Some(true) {
            return TriBool::False;
        }
        if a.lo == a.hi && b.lo == b.hi && a.lo == b.lo {
            return TriBool::True;
        }
        TriBool::Unknown
    }

    /// Partially decidable disequality.
    pub fn cmp_ne(a: &Self, b: &Self) -> TriBool {
        Self::cmp_eq(a, b).negate()
    }
}

fn subst_bound<F>(bound: &Bound, eval: &F, upper: bool) -> Bound
where
    F: Fn(Symbol) -> Option<Interval>,
{
    let unresolved = if upper { Bound::PosInf } else { Bound::NegInf };
    let Bound::Fin(aff) = bound else {
        return bound.clone();
    };
    let mut acc = Bound::int(aff.constant_part());
    for (sym, coeff) in aff.term_iter() {
        let Some(itv) = eval(sym) else {
            return unresolved;
        };
        if itv.is_empty() {
            return unresolved;
        }
        // For the lower end a positive coefficient pulls in the symbol's
        // lower bound and a negative one its upper bound; dually above.
        let end = if (coeff > 0) == upper { &itv.hi } else { &itv.lo };
        acc = acc.add(&end.scale(coeff));
    }
    acc
}

// -- Lattice impls ----------------------------------------------------------

impl Lattice for Interval {
    fn join(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        Interval {
            lo: Bound::min_lower(&self.lo, &other.lo),
            hi: Bound::max_upper(&self.hi, &other.hi),
        }
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        other.lo.le(&self.lo) == Some(true) && self.hi.le(&other.hi) == Some(true)
    }
}

impl HasBottom for Interval {
    fn bottom() -> Self {
        Interval {
            lo: Bound::PosInf,
            hi: Bound::NegInf,
        }
    }
}

impl HasTop for Interval {
    fn top() -> Self {
        Interval {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }
}

impl AbstractValue for Interval {
    fn widen(&self, next: &Self, iters: usize) -> Self {
        if self.is_empty() {
            return next.clone();
        }
        if next.is_empty() {
            return self.clone();
        }
        if iters < WIDENING_DELAY {
            return self.join(next);
        }
        let lo = match next.lo.lt(&self.lo) {
            Some(false) => self.lo.clone(),
            Some(true) | None => Bound::NegInf,
        };
        let hi = match self.hi.lt(&next.hi) {
            Some(false) => self.hi.clone(),
            Some(true) | None => Bound::PosInf,
        };
        Interval { lo, hi }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "bot")
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bufscan_test_utils::lattice::{
        assert_bottom_laws, assert_semilattice_laws, assert_top_laws, assert_widen_covers,
    };

    fn samples() -> Vec<Interval> {
        let s = Symbol::new(7);
        vec![
            Interval::bottom(),
            Interval::zero(),
            Interval::constant(42),
            Interval::new(0, 10),
            Interval::new(-5, 5),
            Interval::of_symbol(s),
            Interval::of_bounds(Bound::int(0), Bound::sym(s)),
            Interval::top(),
        ]
    }

    #[test]
    fn interval_lattice_laws() {
        let elements = samples();
        assert_semilattice_laws(&elements);
        assert_bottom_laws(&elements);
        assert_top_laws(&elements);
    }

    #[test]
    fn widen_covers_operands() {
        assert_widen_covers(&samples(), &[0, 1, WIDENING_DELAY, WIDENING_DELAY + 3]);
    }

    #[test]
    fn widen_is_delayed() {
        let a = Interval::new(0, 5);
        let b = Interval::new(0, 10);
        assert_eq!(a.widen(&b, 0), Interval::new(0, 10));
        let w = a.widen(&b, WIDENING_DELAY);
        assert_eq!(w.lo, Bound::int(0));
        assert_eq!(w.hi, Bound::PosInf);

        let c = Interval::new(-5, 5);
        let w = a.widen(&c, WIDENING_DELAY);
        assert_eq!(w.lo, Bound::NegInf);
        assert_eq!(w.hi, Bound::int(5));
    }

    #[test]
    fn arithmetic_basics() {
        let a = Interval::new(1, 5);
        let b = Interval::new(10, 20);
        assert_eq!(a.plus(&b), Interval::new(11, 25));
        assert_eq!(b.minus(&a), Interval::new(5, 19));
        assert_eq!(a.mult(&b), Interval::new(10, 100));
        assert_eq!(Interval::new(-2, 3).mult_const(-4), Interval::new(-12, 8));
        assert_eq!(a.plus(&Interval::bottom()), Interval::bottom());
    }

    #[test]
    fn division_rounds_outward() {
        assert_eq!(Interval::new(0, 16).div_const(2), Interval::new(0, 8));
        assert_eq!(Interval::new(1, 7).div_const(2), Interval::new(0, 4));
        assert_eq!(Interval::new(-7, -1).div_const(2), Interval::new(-4, 0));
        assert_eq!(Interval::new(2, 6).div_const(-2), Interval::new(-3, -1));
    }

    #[test]
    fn symbolic_division_drops_inexact_bounds() {
        let s = Symbol::new(8);
        let itv = Interval::of_symbol(s);
        let halved = itv.div_const(2);
        assert_eq!(halved, Interval::top());
        let doubled = itv.mult_const(4).div_const(2);
        assert_eq!(doubled, Interval::of_symbol(s).mult_const(2));
    }

    #[test]
    fn symbolic_join_loses_only_the_undecidable_end() {
        let s = Symbol::new(9);
        let sym = Interval::of_symbol(s);
        let joined = sym.join(&Interval::constant(3));
        assert_eq!(joined.lo, Bound::NegInf);
        assert_eq!(joined.hi, Bound::PosInf);
        let same = sym.join(&Interval::of_symbol(s));
        assert_eq!(same, sym);
    }

    #[test]
    fn prune_comp_truncates() {
        let x = Interval::new(0, 10);
        let y = Interval::constant(5);
        assert_eq!(x.prune_comp(CompOp::Lt, &y), Interval::new(0, 4));
        assert_eq!(x.prune_comp(CompOp::Le, &y), Interval::new(0, 5));
        assert_eq!(x.prune_comp(CompOp::Gt, &y), Interval::new(6, 10));
        assert_eq!(x.prune_comp(CompOp::Ge, &y), Interval::new(5, 10));
        // Contradictory condition empties the range.
        assert_eq!(
            Interval::constant(9).prune_comp(CompOp::Lt, &Interval::constant(3)),
            Interval::bottom()
        );
    }

    #[test]
    fn prune_never_widens() {
        let samples = samples();
        for a in &samples {
            for b in &samples {
                assert!(a.prune_eq(b).is_subseteq(a), "prune_eq grew {a} vs {b}");
                assert!(a.prune_ne(b).is_subseteq(a), "prune_ne grew {a} vs {b}");
                for op in [CompOp::Lt, CompOp::Le, CompOp::Gt, CompOp::Ge] {
                    assert!(
                        a.prune_comp(op, b).is_subseteq(a),
                        "prune_comp({op:?}) grew {a} vs {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn prune_ne_trims_endpoints() {
        let x = Interval::new(0, 10);
        assert_eq!(x.prune_ne(&Interval::constant(0)), Interval::new(1, 10));
        assert_eq!(x.prune_ne(&Interval::constant(10)), Interval::new(0, 9));
        assert_eq!(x.prune_ne(&Interval::constant(5)), x);
        assert_eq!(x.prune_ne(&Interval::new(0, 3)), x);
    }

    #[test]
    fn subst_eliminates_resolved_symbols() {
        let s = Symbol::new(10);
        let t = Symbol::new(11);
        let itv = Interval::of_bounds(Bound::int(0), Bound::sym(s));
        let eval = |sym: Symbol| (sym == s).then(|| Interval::new(3, 7));
        let out = itv.subst(&eval);
        assert_eq!(out, Interval::new(0, 7));
        assert!(out.symbols().is_empty());

        // Unresolved symbols surrender the affected bound.
        let unresolved = Interval::of_symbol(t).subst(&eval);
        assert_eq!(unresolved, Interval::top());
    }

    #[test]
    fn subst_respects_coefficient_sign() {
        let s = Symbol::new(12);
        // [-s, -s] under s -> [2, 5] is [-5, -2].
        let itv = Interval::of_symbol(s).mult_const(-1);
        let eval = |sym: Symbol| (sym == s).then(|| Interval::new(2, 5));
        assert_eq!(itv.subst(&eval), Interval::new(-5, -2));
    }

    #[test]
    fn cmp_eq_three_valued() {
        assert_eq!(
            Interval::cmp_eq(&Interval::constant(3), &Interval::constant(3)),
            TriBool::True
        );
        assert_eq!(
            Interval::cmp_eq(&Interval::new(0, 2), &Interval::new(5, 9)),
            TriBool::False
        );
        assert_eq!(
            Interval::cmp_eq(&Interval::new(0, 5), &Interval::new(3, 9)),
            TriBool::Unknown
        );
        let s = Symbol::new(13);
        assert_eq!(
            Interval::cmp_eq(&Interval::of_symbol(s), &Interval::of_symbol(s)),
            TriBool::True
        );
        assert_eq!(
            Interval::cmp_ne(&Interval::new(0, 2), &Interval::new(5, 9)),
            TriBool::True
        );
    }

    #[test]
    fn normalize_collapses_empty_forms() {
        let weird = Interval {
            lo: Bound::int(4),
            hi: Bound::int(1),
        };
        assert_eq!(weird.normalize(), Interval::bottom());
        assert_eq!(
            Interval::top().normalize().normalize(),
            Interval::top()
        );
    }
}
