use std::collections::BTreeSet;
use std::fmt;

use bufscan_interval::{CompOp, Interval, Symbol};
use bufscan_lattice::{
    AbstractValue, HasBottom, HasTop, Lattice, MapDomain, TriBool, resolve_eq,
};
use bufscan_loc::{AllocSite, Loc, ParamPath, PowLoc};
use log::trace;

use crate::ShapeInfo;

/// Finite map from allocation sites to array shapes: the abstract value
/// of one pointer-typed expression.
///
/// An empty map is bottom ("points at no block"). The unknown-site
/// binding `{ alloc(?) -> <top> }` serves as the conservative value for
/// pointers the analysis has lost track of. Per-site operations apply
/// pointwise; queries fold their per-site answers with join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockMap {
    entries: MapDomain<AllocSite, ShapeInfo>,
}

impl BlockMap {
    // -- Construction -------------------------------------------------------

    /// The conservative "some block, shape unknown" value.
    pub fn unknown() -> Self {
        Self {
            entries: MapDomain::singleton(AllocSite::Unknown, ShapeInfo::Top),
        }
    }

    /// A fresh native block at `site`.
    pub fn make_native(site: AllocSite, offset: Interval, size: Interval, stride: Interval) -> Self {
        Self {
            entries: MapDomain::singleton(site, ShapeInfo::native(offset, size, stride)),
        }
    }

    /// A fresh managed array at `site`.
    pub fn make_managed(site: AllocSite, length: Interval) -> Self {
        Self {
            entries: MapDomain::singleton(site, ShapeInfo::managed(length)),
        }
    }

    // -- Access -------------------------------------------------------------

    pub fn is_bottom(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, site: &AllocSite) -> Option<&ShapeInfo> {
        self.entries.get(site)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AllocSite, &ShapeInfo)> {
        self.entries.iter()
    }

    /// The sites this value may point into, as abstract locations.
    pub fn pow_loc(&self) -> PowLoc {
        self.entries
            .keys()
            .map(|site| Loc::Alloc(site.clone()))
            .collect()
    }

    // -- Pointer arithmetic -------------------------------------------------

    pub fn plus_offset(&self, delta: &Interval) -> Self {
        Self {
            entries: self.entries.map_values(|info| info.plus_offset(delta)),
        }
    }

    pub fn minus_offset(&self, delta: &Interval) -> Self {
        Self {
            entries: self.entries.map_values(|info| info.minus_offset(delta)),
        }
    }

    /// Pointer subtraction over every pairing of possible targets.
    ///
    /// Sites present on both sides contribute the offset difference of
    /// their shapes. A site present on only one side pairs a block with
    /// "not that block", for which no distance can be given, so it
    /// contributes the full range.
    pub fn diff(&self, other: &Self) -> Interval {
        let mut acc = Interval::bottom();
        for (site, lhs) in self.entries.iter() {
            acc = match other.entries.get(site) {
                Some(rhs) => acc.join(&lhs.diff(rhs)),
                None => acc.join(&Interval::top()),
            };
        }
        for site in other.entries.keys() {
            if !self.entries.contains_key(site) {
                acc = acc.join(&Interval::top());
            }
        }
        acc
    }

    // -- Queries ------------------------------------------------------------

    pub fn offsetof(&self) -> Interval {
        self.fold_query(ShapeInfo::offsetof)
    }

    pub fn sizeof(&self) -> Interval {
        self.fold_query(ShapeInfo::sizeof)
    }

    pub fn byte_size(&self) -> Interval {
        self.fold_query(ShapeInfo::byte_size)
    }

    fn fold_query(&self, f: impl Fn(&ShapeInfo) -> Interval) -> Interval {
        self.entries
            .values()
            .fold(Interval::bottom(), |acc, info| acc.join(&f(info)))
    }

    // -- Length and stride updates ------------------------------------------

    pub fn set_length(&self, new_len: &Interval) -> Self {
        Self {
            entries: self.entries.map_values(|info| info.set_length(new_len)),
        }
    }

    pub fn transform_length(&self, f: impl Fn(&Interval) -> Interval) -> Self {
        Self {
            entries: self.entries.map_values(|info| info.transform_length(&f)),
        }
    }

    pub fn set_stride(&self, new_stride: &Interval) -> Self {
        Self {
            entries: self.entries.map_values(|info| info.set_stride(new_stride)),
        }
    }

    // -- Summary instantiation ----------------------------------------------

    /// Instantiate a callee summary value in a caller context.
    ///
    /// `eval_sym` supplies the caller-side range of each summary symbol.
    /// `eval_loc_path` resolves a formal-parameter placeholder site to
    /// the locations the caller actually passed; bindings whose resolved
    /// locations are not allocation-backed are dropped, and resolved
    /// sites that collide merge by join.
    pub fn subst<F, G>(&self, eval_sym: &F, eval_loc_path: &G) -> Self
    where
        F: Fn(Symbol) -> Option<Interval>,
        G: Fn(&ParamPath) -> PowLoc,
    {
        let mut out = MapDomain::empty();
        for (site, info) in self.entries.iter() {
            let info = info.subst(eval_sym);
            match site.param_path() {
                None => out.insert_join(site.clone(), info),
                Some(path) => {
                    let actuals = eval_loc_path(path);
                    trace!("resolving {site} to {actuals}");
                    for loc in actuals.iter() {
                        if let Some(actual) = loc.alloc_site() {
                            out.insert_join(actual.clone(), info.clone());
                        }
                    }
                }
            }
        }
        Self { entries: out }
    }

    /// Symbols occurring anywhere in the map's shapes.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        for info in self.entries.values() {
            out.extend(info.symbols());
        }
        out
    }

    pub fn normalize(&self) -> Self {
        Self {
            entries: self.entries.map_values(ShapeInfo::normalize),
        }
    }

    // -- Branch-condition narrowing -----------------------------------------

    /// Narrow under `self op other`. Sound only when `other` is a single
    /// definite block, so anything else leaves `self` unchanged.
    pub fn prune_comp(&self, op: CompOp, other: &Self) -> Self {
        self.prune_against(other, |lhs, rhs| lhs.prune_comp(op, rhs))
    }

    /// Narrow under `self == other`.
    pub fn prune_eq(&self, other: &Self) -> Self {
        self.prune_against(other, ShapeInfo::prune_eq)
    }

    /// Narrow under `self != other`.
    pub fn prune_ne(&self, other: &Self) -> Self {
        self.prune_against(other, ShapeInfo::prune_ne)
    }

    fn prune_against(&self, other: &Self, f: impl Fn(&ShapeInfo, &ShapeInfo) -> ShapeInfo) -> Self {
        let Some((site, rhs)) = other.entries.as_singleton() else {
            trace!("skipping narrowing against a non-singleton block map");
            return self.clone();
        };
        match self.entries.get(site) {
            Some(lhs) => {
                let mut entries = self.entries.clone();
                entries.insert(site.clone(), f(lhs, rhs));
                Self { entries }
            }
            None => self.clone(),
        }
    }

    // -- Three-valued comparison --------------------------------------------

    /// Lift an interval comparator to block maps.
    ///
    /// Decidable only for two single-block values: identical sites defer
    /// to the shape comparison, sites that provably differ answer
    /// `on_distinct`, and everything else is left open. `on_distinct` is
    /// the comparator's verdict for pointers into different blocks:
    /// false for an equality comparator, true for a disequality one.
    pub fn lift_cmp_itv<F>(cmp: &F, on_distinct: TriBool, lhs: &Self, rhs: &Self) -> TriBool
    where
        F: Fn(&Interval, &Interval) -> TriBool,
    {
        let (Some((k1, v1)), Some((k2, v2))) =
            (lhs.entries.as_singleton(), rhs.entries.as_singleton())
        else {
            return TriBool::Unknown;
        };
        let identity = if k1 == k2 {
            Some(true)
        } else {
            k1.eq_decidable(k2)
        };
        resolve_eq(
            identity,
            || v1.lift_cmp_itv(v2, cmp),
            on_distinct,
            TriBool::Unknown,
        )
    }
}

// -- Lattice impls ----------------------------------------------------------

impl Lattice for BlockMap {
    fn join(&self, other: &Self) -> Self {
        Self {
            entries: self.entries.join(&other.entries),
        }
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        self.entries.is_subseteq(&other.entries)
    }
}

impl HasBottom for BlockMap {
    fn bottom() -> Self {
        Self::default()
    }
}

impl AbstractValue for BlockMap {
    fn widen(&self, next: &Self, iters: usize) -> Self {
        Self {
            entries: self.entries.widen(&next.entries, iters),
        }
    }
}

impl fmt::Display for BlockMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sites are sorted so the rendering is stable across runs.
        let mut pairs: Vec<_> = self.entries.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        write!(f, "{{")?;
        for (i, (site, info)) in pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{site} -> {info}")?;
        }
        write!(f, "}}")
    }
}
