use bufscan_lattice::{AbstractValue, HasBottom, HasTop, Lattice};

/// One-point lattice where bottom and top coincide. Useful as the
/// smallest possible exercise of the law-checking helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitValue;

impl Lattice for UnitValue {
    fn join(&self, _other: &Self) -> Self {
        UnitValue
    }

    fn is_subseteq(&self, _other: &Self) -> bool {
        true
    }
}

impl HasBottom for UnitValue {
    fn bottom() -> Self {
        UnitValue
    }
}

impl HasTop for UnitValue {
    fn top() -> Self {
        UnitValue
    }
}

impl AbstractValue for UnitValue {
    fn widen(&self, _next: &Self, _iters: usize) -> Self {
        UnitValue
    }
}
