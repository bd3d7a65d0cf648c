/// Three-valued outcome of a partially decidable test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriBool {
    True,
    False,
    Unknown,
}

impl TriBool {
    /// Lift a fully decided boolean.
    pub fn from_bool(b: bool) -> Self {
        if b { TriBool::True } else { TriBool::False }
    }

    /// Lift a partially decided boolean; `None` becomes [`TriBool::Unknown`].
    pub fn from_eq(eq: Option<bool>) -> Self {
        match eq {
            Some(b) => TriBool::from_bool(b),
            None => TriBool::Unknown,
        }
    }

    pub fn negate(self) -> Self {
        match self {
            TriBool::True => TriBool::False,
            TriBool::False => TriBool::True,
            TriBool::Unknown => TriBool::Unknown,
        }
    }

    pub fn is_decided(self) -> bool {
        self != TriBool::Unknown
    }
}

/// Resolve a partially decidable equality into one of three outcomes.
///
/// The equal branch is lazy: resolving equality of two abstract values
/// usually requires a further (possibly expensive) comparison that only
/// makes sense once the identities are known to coincide.
pub fn resolve_eq<T>(eq: Option<bool>, equal: impl FnOnce() -> T, not_equal: T, undecided: T) -> T {
    match eq {
        Some(true) => equal(),
        Some(false) => not_equal,
        None => undecided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_round_trips_decided_values() {
        assert_eq!(TriBool::True.negate(), TriBool::False);
        assert_eq!(TriBool::False.negate(), TriBool::True);
        assert_eq!(TriBool::Unknown.negate(), TriBool::Unknown);
    }

    #[test]
    fn resolve_eq_dispatches_on_decidability() {
        assert_eq!(resolve_eq(Some(true), || 1, 2, 3), 1);
        assert_eq!(resolve_eq(Some(false), || 1, 2, 3), 2);
        assert_eq!(resolve_eq(None, || 1, 2, 3), 3);
    }
}
