use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// Opaque symbolic identifier standing for a caller-supplied numeric
/// quantity, e.g. the unknown extent of an array parameter. Symbols are
/// eliminated by substitution when a callee summary is instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn new(id: u32) -> Self {
        Symbol(id)
    }

    /// Allocate a process-unique symbol.
    pub fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        Symbol(NEXT.fetch_add(1, AtomicOrdering::Relaxed))
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Affine form `constant + Σ coeff·symbol`. Invariant: no zero
/// coefficients are stored, so structural equality is canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affine {
    constant: i64,
    terms: BTreeMap<Symbol, i64>,
}

impl Affine {
    pub fn constant(c: i64) -> Self {
        Self {
            constant: c,
            terms: BTreeMap::new(),
        }
    }

    pub fn symbol(sym: Symbol) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(sym, 1);
        Self { constant: 0, terms }
    }

    pub fn as_constant(&self) -> Option<i64> {
        self.terms.is_empty().then_some(self.constant)
    }

    pub fn has_symbols(&self) -> bool {
        !self.terms.is_empty()
    }

    pub fn constant_part(&self) -> i64 {
        self.constant
    }

    pub fn term_iter(&self) -> impl Iterator<Item = (Symbol, i64)> + '_ {
        self.terms.iter().map(|(s, c)| (*s, *c))
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut terms = self.terms.clone();
        for (sym, coeff) in &other.terms {
            let entry = terms.entry(*sym).or_insert(0);
            *entry = entry.saturating_add(*coeff);
            if *entry == 0 {
                terms.remove(sym);
            }
        }
        Self {
            constant: self.constant.saturating_add(other.constant),
            terms,
        }
    }

    pub fn neg(&self) -> Self {
        self.scale(-1)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    pub fn scale(&self, k: i64) -> Self {
        if k == 0 {
            return Self::constant(0);
        }
        Self {
            constant: self.constant.saturating_mul(k),
            terms: self
                .terms
                .iter()
                .map(|(s, c)| (*s, c.saturating_mul(k)))
                .collect(),
        }
    }

    /// Order is decidable only when both sides carry the same symbolic
    /// terms, in which case the constants decide.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        (self.terms == other.terms).then(|| self.constant.cmp(&other.constant))
    }

    /// Divide by `k > 0`, rounding the constant in the requested
    /// direction. Fails when a symbolic coefficient does not divide
    /// exactly; the caller must then give up the bound entirely.
    pub fn div_round(&self, k: i64, round_up: bool) -> Option<Self> {
        debug_assert!(k > 0);
        let mut terms = BTreeMap::new();
        for (sym, coeff) in &self.terms {
            if coeff % k != 0 {
                return None;
            }
            terms.insert(*sym, coeff / k);
        }
        let constant = if round_up {
            div_ceil(self.constant, k)
        } else {
            self.constant.div_euclid(k)
        };
        Some(Self { constant, terms })
    }

    pub fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        out.extend(self.terms.keys().copied());
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    debug_assert!(b > 0);
    let q = a.div_euclid(b);
    if a.rem_euclid(b) != 0 { q + 1 } else { q }
}

impl fmt::Display for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "{}", self.constant);
        }
        let mut first = true;
        for (sym, coeff) in &self.terms {
            match (*coeff, first) {
                (1, true) => write!(f, "{sym}")?,
                (1, false) => write!(f, "+{sym}")?,
                (-1, _) => write!(f, "-{sym}")?,
                (c, true) => write!(f, "{c}{sym}")?,
                (c, false) if c > 0 => write!(f, "+{c}{sym}")?,
                (c, false) => write!(f, "{c}{sym}")?,
            }
            first = false;
        }
        match self.constant {
            0 => Ok(()),
            c if c > 0 => write!(f, "+{c}"),
            c => write!(f, "{c}"),
        }
    }
}

/// One end of an interval: an affine expression or an infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    NegInf,
    Fin(Affine),
    PosInf,
}

impl Bound {
    pub fn int(v: i64) -> Self {
        Bound::Fin(Affine::constant(v))
    }

    pub fn sym(sym: Symbol) -> Self {
        Bound::Fin(Affine::symbol(sym))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Bound::Fin(aff) => aff.as_constant(),
            Bound::NegInf | Bound::PosInf => None,
        }
    }

    pub fn has_symbols(&self) -> bool {
        match self {
            Bound::Fin(aff) => aff.has_symbols(),
            Bound::NegInf | Bound::PosInf => false,
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            // Mismatched infinities cannot arise from non-empty operands;
            // resolve them downward like a saturating add would.
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
            (Bound::Fin(a), Bound::Fin(b)) => Bound::Fin(a.add(b)),
        }
    }

    pub fn neg(&self) -> Self {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
            Bound::Fin(aff) => Bound::Fin(aff.neg()),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Multiply by a known constant. Sign flips the infinities; zero
    /// collapses everything to zero.
    pub fn scale(&self, k: i64) -> Self {
        if k == 0 {
            return Bound::int(0);
        }
        match (self, k > 0) {
            (Bound::NegInf, true) | (Bound::PosInf, false) => Bound::NegInf,
            (Bound::PosInf, true) | (Bound::NegInf, false) => Bound::PosInf,
            (Bound::Fin(aff), _) => Bound::Fin(aff.scale(k)),
        }
    }

    /// Partially decidable `self <= other`.
    pub fn le(&self, other: &Self) -> Option<bool> {
        match (self, other) {
            (Bound::NegInf, _) | (_, Bound::PosInf) => Some(true),
            (Bound::PosInf, _) | (_, Bound::NegInf) => Some(false),
            (Bound::Fin(a), Bound::Fin(b)) => a.compare(b).map(|o| o != Ordering::Greater),
        }
    }

    /// Partially decidable `self < other`.
    pub fn lt(&self, other: &Self) -> Option<bool> {
        match (self, other) {
            (Bound::NegInf, Bound::NegInf) | (Bound::PosInf, Bound::PosInf) => Some(false),
            (Bound::NegInf, _) | (_, Bound::PosInf) => Some(true),
            (Bound::PosInf, _) | (_, Bound::NegInf) => Some(false),
            (Bound::Fin(a), Bound::Fin(b)) => a.compare(b).map(|o| o == Ordering::Less),
        }
    }

    /// Lower end of a join: the smaller bound, or `-∞` when the order is
    /// undecidable (the only sound under-approximation of "smaller").
    pub fn min_lower(a: &Self, b: &Self) -> Self {
        match a.le(b) {
            Some(true) => a.clone(),
            Some(false) => b.clone(),
            None => Bound::NegInf,
        }
    }

    /// Upper end of a join: the larger bound, or `+∞` when undecidable.
    pub fn max_upper(a: &Self, b: &Self) -> Self {
        match a.le(b) {
            Some(true) => b.clone(),
            Some(false) => a.clone(),
            None => Bound::PosInf,
        }
    }

    /// Lower end of a meet, keeping `a` when the order is undecidable.
    /// Staying inside the left operand keeps refinement sound without a
    /// decision procedure for symbolic bounds.
    pub fn max_lower_keep_left(a: &Self, b: &Self) -> Self {
        match a.le(b) {
            Some(true) => b.clone(),
            Some(false) | None => a.clone(),
        }
    }

    /// Upper end of a meet, keeping `a` when the order is undecidable.
    pub fn min_upper_keep_left(a: &Self, b: &Self) -> Self {
        match a.le(b) {
            Some(true) | None => a.clone(),
            Some(false) => b.clone(),
        }
    }

    /// Product of two symbol-free bounds. `None` if either side carries
    /// symbols, which the caller over-approximates away.
    pub fn mul_numeric(a: &Self, b: &Self) -> Option<Self> {
        if a.has_symbols() || b.has_symbols() {
            return None;
        }
        Some(match (a, b) {
            _ if a.as_int() == Some(0) || b.as_int() == Some(0) => Bound::int(0),
            (Bound::NegInf, Bound::NegInf) | (Bound::PosInf, Bound::PosInf) => Bound::PosInf,
            (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => Bound::NegInf,
            (Bound::NegInf, Bound::Fin(c)) | (Bound::Fin(c), Bound::NegInf) => {
                if c.constant_part() > 0 {
                    Bound::NegInf
                } else {
                    Bound::PosInf
                }
            }
            (Bound::PosInf, Bound::Fin(c)) | (Bound::Fin(c), Bound::PosInf) => {
                if c.constant_part() > 0 {
                    Bound::PosInf
                } else {
                    Bound::NegInf
                }
            }
            (Bound::Fin(a), Bound::Fin(b)) => {
                Bound::int(a.constant_part().saturating_mul(b.constant_part()))
            }
        })
    }

    /// Divide by `k > 0`, rounding in the requested direction. `None`
    /// when a symbolic coefficient does not divide exactly.
    pub fn div_round(&self, k: i64, round_up: bool) -> Option<Self> {
        match self {
            Bound::NegInf | Bound::PosInf => Some(self.clone()),
            Bound::Fin(aff) => aff.div_round(k, round_up).map(Bound::Fin),
        }
    }

    pub fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        if let Bound::Fin(aff) = self {
            aff.collect_symbols(out);
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-oo"),
            Bound::PosInf => write!(f, "+oo"),
            Bound::Fin(aff) => write!(f, "{aff}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_order_needs_matching_terms() {
        let s = Symbol::new(900);
        let a = Affine::symbol(s).add(&Affine::constant(1));
        let b = Affine::symbol(s).add(&Affine::constant(3));
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(a.compare(&Affine::constant(3)), None);
    }

    #[test]
    fn zero_coefficients_vanish() {
        let s = Symbol::new(901);
        let diff = Affine::symbol(s).sub(&Affine::symbol(s));
        assert_eq!(diff, Affine::constant(0));
        assert!(!diff.has_symbols());
    }

    #[test]
    fn scale_flips_infinities() {
        assert_eq!(Bound::NegInf.scale(-2), Bound::PosInf);
        assert_eq!(Bound::PosInf.scale(3), Bound::PosInf);
        assert_eq!(Bound::int(4).scale(-2), Bound::int(-8));
        assert_eq!(Bound::PosInf.scale(0), Bound::int(0));
    }

    #[test]
    fn div_round_is_outward() {
        assert_eq!(Bound::int(7).div_round(2, false), Some(Bound::int(3)));
        assert_eq!(Bound::int(7).div_round(2, true), Some(Bound::int(4)));
        assert_eq!(Bound::int(-7).div_round(2, false), Some(Bound::int(-4)));
        assert_eq!(Bound::int(-7).div_round(2, true), Some(Bound::int(-3)));
        let s = Symbol::new(902);
        assert_eq!(Bound::sym(s).div_round(2, false), None);
        assert_eq!(
            Bound::Fin(Affine::symbol(s).scale(4)).div_round(2, false),
            Some(Bound::Fin(Affine::symbol(s).scale(2)))
        );
    }

    #[test]
    fn symbolic_comparison_is_partial() {
        let s = Symbol::new(903);
        assert_eq!(Bound::sym(s).le(&Bound::sym(s)), Some(true));
        assert_eq!(Bound::sym(s).le(&Bound::int(0)), None);
        assert_eq!(Bound::NegInf.le(&Bound::sym(s)), Some(true));
        assert_eq!(Bound::sym(s).lt(&Bound::PosInf), Some(true));
    }
}
