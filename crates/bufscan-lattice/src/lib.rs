//! Core lattice traits shared by every abstract domain in the analysis,
//! plus the generic finite-map domain and the three-valued truth helper.

mod map;
mod tribool;

pub use map::MapDomain;
pub use tribool::{TriBool, resolve_eq};

/// Join-semilattice with a decidable-or-conservative partial order.
///
/// `is_subseteq` may return `false` for pairs whose order is genuinely
/// undecidable (e.g. symbolic bounds); callers such as fixpoint drivers
/// treat "not provably below" as "keep iterating", which is sound.
pub trait Lattice {
    fn join(&self, other: &Self) -> Self;
    fn is_subseteq(&self, other: &Self) -> bool;
}

/// Lattices with a least element.
pub trait HasBottom: Lattice {
    fn bottom() -> Self;
}

/// Lattices with a greatest element.
pub trait HasTop: Lattice {
    fn top() -> Self;
}

/// Abstract value extending [`Lattice`] with iteration-counted widening.
///
/// ## Algebraic contract
///
/// `x ⊑ widen(x, y, n)` and `y ⊑ widen(x, y, n)` for every `n`, and the
/// ascending chain `x₀, widen(x₀, x₁, 1), widen(_, x₂, 2), ...` must
/// stabilize in finitely many steps. The counter is the number of times
/// the fixpoint engine has revisited the merge point; domains use it to
/// delay the jump to unbounded bounds for a few precise iterations.
pub trait AbstractValue: Lattice {
    fn widen(&self, next: &Self, iters: usize) -> Self;
}
