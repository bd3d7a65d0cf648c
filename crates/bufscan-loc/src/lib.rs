//! Allocation-site identity and abstract locations.
//!
//! Allocation sites are the key space of the array-block domain: opaque
//! identifiers for the program points where a memory block may have been
//! created. Abstract locations wrap them (together with plain variables)
//! so that arrays can themselves be addressed, e.g. arrays of arrays.

use std::collections::BTreeSet;
use std::fmt;

use bufscan_lattice::Lattice;
use smallvec::SmallVec;

/// Program-point identifier assigned by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Function identifier assigned by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(pub u32);

/// Variable identifier for locations not backed by an allocation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

/// Path to a formal parameter of a callee, optionally projected through
/// struct fields. Stands for "whatever the caller passes here" until a
/// call site resolves it to actual locations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamPath {
    pub callee: FuncId,
    pub index: u32,
    /// Field projection applied after the parameter itself. Most paths
    /// are the bare parameter, so the indices are stored inline.
    pub projection: SmallVec<[u32; 2]>,
}

impl ParamPath {
    pub fn new(callee: FuncId, index: u32) -> Self {
        Self {
            callee,
            index,
            projection: SmallVec::new(),
        }
    }

    /// Extend the path through field `idx`.
    pub fn field(mut self, idx: u32) -> Self {
        self.projection.push(idx);
        self
    }
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param(f{}, {})", self.callee.0, self.index)?;
        for idx in &self.projection {
            write!(f, ".{idx}")?;
        }
        Ok(())
    }
}

/// Identity of a (possible) block allocation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AllocSite {
    /// Some allocation, identity unknown. Distinct from "no allocation".
    Unknown,
    /// An allocation expression at a concrete program point.
    Node(NodeId),
    /// Placeholder for a formal parameter's not-yet-known allocation.
    Param(ParamPath),
}

impl AllocSite {
    /// The parameter path, if this site is a parameter placeholder.
    pub fn param_path(&self) -> Option<&ParamPath> {
        match self {
            AllocSite::Param(path) => Some(path),
            AllocSite::Unknown | AllocSite::Node(_) => None,
        }
    }

    /// Partially decidable identity test.
    ///
    /// Two concrete sites compare by program point. `Unknown` may alias
    /// anything, and a parameter placeholder is unresolved, so neither
    /// side being concrete leaves the question open.
    pub fn eq_decidable(&self, other: &Self) -> Option<bool> {
        match (self, other) {
            (AllocSite::Node(a), AllocSite::Node(b)) => Some(a == b),
            _ => None,
        }
    }
}

impl fmt::Display for AllocSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocSite::Unknown => write!(f, "alloc(?)"),
            AllocSite::Node(n) => write!(f, "alloc(n{})", n.0),
            AllocSite::Param(p) => write!(f, "alloc({p})"),
        }
    }
}

/// An addressable abstract location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Loc {
    Alloc(AllocSite),
    Var(VarId),
}

impl Loc {
    /// The backing allocation site, if any.
    pub fn alloc_site(&self) -> Option<&AllocSite> {
        match self {
            Loc::Alloc(site) => Some(site),
            Loc::Var(_) => None,
        }
    }
}

impl From<AllocSite> for Loc {
    fn from(site: AllocSite) -> Self {
        Loc::Alloc(site)
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loc::Alloc(site) => write!(f, "{site}"),
            Loc::Var(v) => write!(f, "var(v{})", v.0),
        }
    }
}

/// A set of abstract locations, ordered so printing is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowLoc(BTreeSet<Loc>);

impl PowLoc {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn singleton(loc: Loc) -> Self {
        let mut set = BTreeSet::new();
        set.insert(loc);
        Self(set)
    }

    pub fn insert(&mut self, loc: Loc) {
        self.0.insert(loc);
    }

    pub fn contains(&self, loc: &Loc) -> bool {
        self.0.contains(loc)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loc> {
        self.0.iter()
    }
}

impl FromIterator<Loc> for PowLoc {
    fn from_iter<I: IntoIterator<Item = Loc>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Lattice for PowLoc {
    fn join(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl fmt::Display for PowLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, loc) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{loc}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_sites_compare_by_node() {
        let a = AllocSite::Node(NodeId(1));
        let b = AllocSite::Node(NodeId(2));
        assert_eq!(a.eq_decidable(&a), Some(true));
        assert_eq!(a.eq_decidable(&b), Some(false));
    }

    #[test]
    fn unknown_and_param_sites_are_undecided() {
        let node = AllocSite::Node(NodeId(1));
        let param = AllocSite::Param(ParamPath::new(FuncId(0), 0));
        assert_eq!(AllocSite::Unknown.eq_decidable(&node), None);
        assert_eq!(AllocSite::Unknown.eq_decidable(&AllocSite::Unknown), None);
        assert_eq!(param.eq_decidable(&param), None);
    }

    #[test]
    fn pow_loc_union_and_order() {
        let a = PowLoc::singleton(Loc::Alloc(AllocSite::Node(NodeId(1))));
        let b = PowLoc::singleton(Loc::Var(VarId(7)));
        let ab = a.join(&b);
        assert_eq!(ab.len(), 2);
        assert!(a.is_subseteq(&ab));
        assert!(b.is_subseteq(&ab));
        assert!(!ab.is_subseteq(&a));
    }

    #[test]
    fn param_path_projection_display() {
        let path = ParamPath::new(FuncId(3), 1).field(0).field(2);
        assert_eq!(path.to_string(), "param(f3, 1).0.2");
    }
}
