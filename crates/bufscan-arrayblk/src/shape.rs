use std::collections::BTreeSet;
use std::fmt;

use bufscan_interval::{CompOp, Interval, Symbol};
use bufscan_lattice::{AbstractValue, HasTop, Lattice, TriBool};

/// Per-allocation-site array shape.
///
/// `Native` models a pointer into a C-style block: `offset` is the current
/// displacement from block start in element units, `size` the element
/// count, `stride` the bytes per element. `Managed` models a
/// reference-semantics array where pointer arithmetic is not expressible,
/// so only the element count is tracked. `Top` is the universal shape.
///
/// Stride is assumed never to be exactly zero; that is a precondition of
/// the domain, checked only at the stride-conversion entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeInfo {
    Native {
        offset: Interval,
        size: Interval,
        stride: Interval,
    },
    Managed {
        length: Interval,
    },
    Top,
}

impl ShapeInfo {
    pub fn native(offset: Interval, size: Interval, stride: Interval) -> Self {
        ShapeInfo::Native {
            offset,
            size,
            stride,
        }
    }

    pub fn managed(length: Interval) -> Self {
        ShapeInfo::Managed { length }
    }

    // -- Pointer arithmetic -------------------------------------------------

    /// Shift the offset forward by `delta` elements. Attempting this on a
    /// managed shape means a transfer function misclassified the array's
    /// representation, which is unrecoverable.
    pub fn plus_offset(&self, delta: &Interval) -> Self {
        match self {
            ShapeInfo::Native {
                offset,
                size,
                stride,
            } => ShapeInfo::Native {
                offset: offset.plus(delta),
                size: size.clone(),
                stride: stride.clone(),
            },
            ShapeInfo::Top => ShapeInfo::Top,
            ShapeInfo::Managed { .. } => panic!("pointer arithmetic on a managed array shape"),
        }
    }

    /// Shift the offset backward by `delta` elements.
    pub fn minus_offset(&self, delta: &Interval) -> Self {
        match self {
            ShapeInfo::Native {
                offset,
                size,
                stride,
            } => ShapeInfo::Native {
                offset: offset.minus(delta),
                size: size.clone(),
                stride: stride.clone(),
            },
            ShapeInfo::Top => ShapeInfo::Top,
            ShapeInfo::Managed { .. } => panic!("pointer arithmetic on a managed array shape"),
        }
    }

    /// Pointer subtraction: the element distance between two views of the
    /// same block.
    pub fn diff(&self, other: &Self) -> Interval {
        match (self, other) {
            (ShapeInfo::Top, _) | (_, ShapeInfo::Top) => Interval::top(),
            (ShapeInfo::Native { offset: o1, .. }, ShapeInfo::Native { offset: o2, .. }) => {
                o1.minus(o2)
            }
            (ShapeInfo::Managed { .. }, _) | (_, ShapeInfo::Managed { .. }) => {
                panic!("pointer subtraction involving a managed array shape")
            }
        }
    }

    // -- Queries ------------------------------------------------------------

    pub fn offsetof(&self) -> Interval {
        match self {
            ShapeInfo::Native { offset, .. } => offset.clone(),
            // A managed reference always points at the block start.
            ShapeInfo::Managed { .. } => Interval::zero(),
            ShapeInfo::Top => Interval::top(),
        }
    }

    pub fn sizeof(&self) -> Interval {
        match self {
            ShapeInfo::Native { size, .. } => size.clone(),
            ShapeInfo::Managed { length } => length.clone(),
            ShapeInfo::Top => Interval::top(),
        }
    }

    /// Total extent in bytes. Managed arrays have no byte-level sizing.
    pub fn byte_size(&self) -> Interval {
        match self {
            ShapeInfo::Native { size, stride, .. } => size.mult(stride),
            ShapeInfo::Top => Interval::top(),
            ShapeInfo::Managed { .. } => panic!("byte sizing of a managed array shape"),
        }
    }

    // -- Length and stride updates ------------------------------------------

    /// Replace the element count, leaving offset and stride alone.
    pub fn set_length(&self, new_len: &Interval) -> Self {
        match self {
            ShapeInfo::Native { offset, stride, .. } => ShapeInfo::Native {
                offset: offset.clone(),
                size: new_len.clone(),
                stride: stride.clone(),
            },
            ShapeInfo::Managed { .. } => ShapeInfo::Managed {
                length: new_len.clone(),
            },
            ShapeInfo::Top => ShapeInfo::Top,
        }
    }

    /// Rewrite the element count through `f`, e.g. for rescaling.
    pub fn transform_length(&self, f: impl Fn(&Interval) -> Interval) -> Self {
        match self {
            ShapeInfo::Native {
                offset,
                size,
                stride,
            } => ShapeInfo::Native {
                offset: offset.clone(),
                size: f(size),
                stride: stride.clone(),
            },
            ShapeInfo::Managed { length } => ShapeInfo::Managed { length: f(length) },
            ShapeInfo::Top => ShapeInfo::Top,
        }
    }

    /// Reinterpret the block at a different element width. The byte
    /// extent is unchanged, so element-unit offset and size rescale by
    /// `old / new`. Rescaling is possible only when the current stride is
    /// an exact constant; otherwise the shape is left untouched. A zero
    /// stride on either side is a caller contract violation.
    pub fn set_stride(&self, new_stride: &Interval) -> Self {
        let new_const = new_stride.is_const();
        if new_const == Some(0) {
            panic!("stride conversion to zero stride");
        }
        match self {
            ShapeInfo::Top => ShapeInfo::Top,
            ShapeInfo::Managed { .. } => panic!("stride conversion on a managed array shape"),
            ShapeInfo::Native {
                offset,
                size,
                stride,
            } => {
                let old_const = stride.is_const();
                if old_const == Some(0) {
                    panic!("stride conversion from zero stride");
                }
                match (old_const, new_const) {
                    (Some(old), Some(new)) => ShapeInfo::Native {
                        offset: offset.mult_const(old).div_const(new),
                        size: size.mult_const(old).div_const(new),
                        stride: Interval::constant(new),
                    },
                    // Not precise enough to convert soundly.
                    _ => self.clone(),
                }
            }
        }
    }

    // -- Summary instantiation ----------------------------------------------

    /// Substitute caller-context ranges for symbols. Stride is structural
    /// (it comes from the program's types, not from summarized values) and
    /// is left alone.
    pub fn subst<F>(&self, eval: &F) -> Self
    where
        F: Fn(Symbol) -> Option<Interval>,
    {
        match self {
            ShapeInfo::Native {
                offset,
                size,
                stride,
            } => ShapeInfo::Native {
                offset: offset.subst(eval),
                size: size.subst(eval),
                stride: stride.clone(),
            },
            ShapeInfo::Managed { length } => ShapeInfo::Managed {
                length: length.subst(eval),
            },
            ShapeInfo::Top => ShapeInfo::Top,
        }
    }

    /// Symbols occurring in any interval field.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        match self {
            ShapeInfo::Native {
                offset,
                size,
                stride,
            } => {
                let mut out = offset.symbols();
                out.extend(size.symbols());
                out.extend(stride.symbols());
                out
            }
            ShapeInfo::Managed { length } => length.symbols(),
            ShapeInfo::Top => BTreeSet::new(),
        }
    }

    /// Canonicalize every interval field. Idempotent.
    pub fn normalize(&self) -> Self {
        match self {
            ShapeInfo::Native {
                offset,
                size,
                stride,
            } => ShapeInfo::Native {
                offset: offset.normalize(),
                size: size.normalize(),
                stride: stride.normalize(),
            },
            ShapeInfo::Managed { length } => ShapeInfo::Managed {
                length: length.normalize(),
            },
            ShapeInfo::Top => ShapeInfo::Top,
        }
    }

    // -- Branch-condition narrowing -----------------------------------------

    /// Narrow the offset under `self op other`. Only a native comparand
    /// offers a sound narrowing basis; anything else leaves `self` as is.
    pub fn prune_comp(&self, op: CompOp, other: &Self) -> Self {
        self.prune_offset(other, |o1, o2| o1.prune_comp(op, o2))
    }

    /// Narrow the offset under `self == other`.
    pub fn prune_eq(&self, other: &Self) -> Self {
        self.prune_offset(other, Interval::prune_eq)
    }

    /// Narrow the offset under `self != other`.
    pub fn prune_ne(&self, other: &Self) -> Self {
        self.prune_offset(other, Interval::prune_ne)
    }

    fn prune_offset(&self, other: &Self, f: impl Fn(&Interval, &Interval) -> Interval) -> Self {
        match (self, other) {
            (
                ShapeInfo::Native {
                    offset,
                    size,
                    stride,
                },
                ShapeInfo::Native { offset: o2, .. },
            ) => ShapeInfo::Native {
                offset: f(offset, o2),
                size: size.clone(),
                stride: stride.clone(),
            },
            _ => self.clone(),
        }
    }

    // -- Three-valued comparison --------------------------------------------

    /// Lift an interval comparator to shapes. Decidable only when both
    /// shapes agree on every field except the one compared: equal stride
    /// and size let `cmp` decide on the offsets, and equal managed
    /// lengths reduce to comparing a point with itself.
    pub fn lift_cmp_itv<F>(&self, other: &Self, cmp: &F) -> TriBool
    where
        F: Fn(&Interval, &Interval) -> TriBool,
    {
        match (self, other) {
            (
                ShapeInfo::Native {
                    offset: o1,
                    size: s1,
                    stride: st1,
                },
                ShapeInfo::Native {
                    offset: o2,
                    size: s2,
                    stride: st2,
                },
            ) if st1 == st2 && s1 == s2 => cmp(o1, o2),
            (ShapeInfo::Managed { length: l1 }, ShapeInfo::Managed { length: l2 })
                if l1 == l2 =>
            {
                cmp(&Interval::zero(), &Interval::zero())
            }
            _ => TriBool::Unknown,
        }
    }
}

// -- Lattice impls ----------------------------------------------------------

impl Lattice for ShapeInfo {
    fn join(&self, other: &Self) -> Self {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (
                ShapeInfo::Native {
                    offset: o1,
                    size: s1,
                    stride: st1,
                },
                ShapeInfo::Native {
                    offset: o2,
                    size: s2,
                    stride: st2,
                },
            ) => ShapeInfo::Native {
                offset: o1.join(o2),
                size: s1.join(s2),
                stride: st1.join(st2),
            },
            (ShapeInfo::Managed { length: l1 }, ShapeInfo::Managed { length: l2 }) => {
                ShapeInfo::Managed {
                    length: l1.join(l2),
                }
            }
            // A cross-variant merge has no precise representation.
            _ => ShapeInfo::Top,
        }
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        match (self, other) {
            (_, ShapeInfo::Top) => true,
            (
                ShapeInfo::Native {
                    offset: o1,
                    size: s1,
                    stride: st1,
                },
                ShapeInfo::Native {
                    offset: o2,
                    size: s2,
                    stride: st2,
                },
            ) => o1.is_subseteq(o2) && s1.is_subseteq(s2) && st1.is_subseteq(st2),
            (ShapeInfo::Managed { length: l1 }, ShapeInfo::Managed { length: l2 }) => {
                l1.is_subseteq(l2)
            }
            _ => false,
        }
    }
}

impl HasTop for ShapeInfo {
    fn top() -> Self {
        ShapeInfo::Top
    }
}

impl AbstractValue for ShapeInfo {
    fn widen(&self, next: &Self, iters: usize) -> Self {
        if self == next {
            return self.clone();
        }
        match (self, next) {
            (
                ShapeInfo::Native {
                    offset: o1,
                    size: s1,
                    stride: st1,
                },
                ShapeInfo::Native {
                    offset: o2,
                    size: s2,
                    stride: st2,
                },
            ) => ShapeInfo::Native {
                offset: o1.widen(o2, iters),
                size: s1.widen(s2, iters),
                stride: st1.widen(st2, iters),
            },
            (ShapeInfo::Managed { length: l1 }, ShapeInfo::Managed { length: l2 }) => {
                ShapeInfo::Managed {
                    length: l1.widen(l2, iters),
                }
            }
            _ => ShapeInfo::Top,
        }
    }
}

impl fmt::Display for ShapeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeInfo::Native {
                offset,
                size,
                stride,
            } => write!(f, "<off:{offset}, sz:{size}, st:{stride}>"),
            ShapeInfo::Managed { length } => write!(f, "<len:{length}>"),
            ShapeInfo::Top => write!(f, "<top>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bufscan_interval::WIDENING_DELAY;
    use bufscan_lattice::HasBottom;
    use bufscan_test_utils::lattice::{
        assert_semilattice_laws, assert_top_laws, assert_widen_covers,
    };

    fn native(offset: (i64, i64), size: (i64, i64), stride: (i64, i64)) -> ShapeInfo {
        ShapeInfo::native(
            Interval::new(offset.0, offset.1),
            Interval::new(size.0, size.1),
            Interval::new(stride.0, stride.1),
        )
    }

    fn samples() -> Vec<ShapeInfo> {
        vec![
            native((0, 0), (10, 10), (4, 4)),
            native((1, 3), (10, 10), (4, 4)),
            native((0, 8), (2, 16), (1, 8)),
            ShapeInfo::managed(Interval::new(5, 5)),
            ShapeInfo::managed(Interval::new(0, 9)),
            ShapeInfo::Top,
        ]
    }

    #[test]
    fn shape_lattice_laws() {
        let elements = samples();
        assert_semilattice_laws(&elements);
        assert_top_laws(&elements);
    }

    #[test]
    fn widen_covers_operands() {
        assert_widen_covers(&samples(), &[0, WIDENING_DELAY + 1]);
    }

    #[test]
    fn cross_variant_join_is_top() {
        let n = native((0, 0), (10, 10), (4, 4));
        let m = ShapeInfo::managed(Interval::new(5, 5));
        assert_eq!(n.join(&m), ShapeInfo::Top);
        assert_eq!(m.join(&n), ShapeInfo::Top);
        assert_eq!(n.widen(&m, 0), ShapeInfo::Top);
        assert!(!n.is_subseteq(&m));
        assert!(!m.is_subseteq(&n));
    }

    #[test]
    fn plus_offset_moves_only_the_offset() {
        let a = native((0, 0), (10, 10), (4, 4));
        let b = a.plus_offset(&Interval::new(1, 3));
        assert_eq!(b, native((1, 3), (10, 10), (4, 4)));
        let c = b.minus_offset(&Interval::constant(1));
        assert_eq!(c, native((0, 2), (10, 10), (4, 4)));
        assert_eq!(ShapeInfo::Top.plus_offset(&Interval::constant(1)), ShapeInfo::Top);
    }

    #[test]
    fn byte_size_multiplies_size_by_stride() {
        let a = native((0, 0), (2, 4), (8, 8));
        assert_eq!(a.byte_size(), Interval::new(16, 32));
        assert_eq!(ShapeInfo::Top.byte_size(), Interval::top());
    }

    #[test]
    fn managed_queries() {
        let m = ShapeInfo::managed(Interval::new(5, 5));
        assert_eq!(m.offsetof(), Interval::zero());
        assert_eq!(m.sizeof(), Interval::new(5, 5));
    }

    #[test]
    fn set_stride_rescales_element_units() {
        let a = native((0, 4), (8, 8), (4, 4));
        let b = a.set_stride(&Interval::constant(2));
        assert_eq!(b, native((0, 8), (16, 16), (2, 2)));
    }

    #[test]
    fn set_stride_composes_when_exact() {
        let a = native((0, 4), (8, 8), (8, 8));
        let via = a
            .set_stride(&Interval::constant(4))
            .set_stride(&Interval::constant(2));
        let direct = a.set_stride(&Interval::constant(2));
        assert_eq!(via, direct);
    }

    #[test]
    fn set_stride_needs_an_exact_current_stride() {
        let a = native((0, 4), (8, 8), (4, 8));
        assert_eq!(a.set_stride(&Interval::constant(2)), a);
        assert_eq!(ShapeInfo::Top.set_stride(&Interval::constant(2)), ShapeInfo::Top);
    }

    #[test]
    fn diff_subtracts_offsets() {
        let a = native((5, 5), (10, 10), (4, 4));
        let b = native((2, 2), (10, 10), (4, 4));
        assert_eq!(a.diff(&b), Interval::constant(3));
        assert_eq!(a.diff(&ShapeInfo::Top), Interval::top());
        assert_eq!(ShapeInfo::Top.diff(&b), Interval::top());
    }

    #[test]
    fn prune_narrows_offset_against_native_only() {
        let a = native((0, 10), (10, 10), (4, 4));
        let b = native((5, 5), (10, 10), (4, 4));
        assert_eq!(
            a.prune_comp(CompOp::Lt, &b),
            native((0, 4), (10, 10), (4, 4))
        );
        assert_eq!(a.prune_eq(&b), native((5, 5), (10, 10), (4, 4)));
        // No sound basis against managed or top comparands.
        assert_eq!(a.prune_eq(&ShapeInfo::managed(Interval::new(5, 5))), a);
        assert_eq!(a.prune_comp(CompOp::Lt, &ShapeInfo::Top), a);
    }

    #[test]
    fn prune_never_widens() {
        for a in samples() {
            for b in samples() {
                assert!(a.prune_eq(&b).is_subseteq(&a));
                assert!(a.prune_ne(&b).is_subseteq(&a));
                assert!(a.prune_comp(CompOp::Le, &b).is_subseteq(&a));
            }
        }
    }

    #[test]
    fn subst_skips_stride() {
        let s = Symbol::fresh();
        let shape = ShapeInfo::native(
            Interval::zero(),
            Interval::of_symbol(s),
            Interval::constant(4),
        );
        assert_eq!(shape.symbols().into_iter().collect::<Vec<_>>(), vec![s]);
        let eval = |sym: Symbol| (sym == s).then(|| Interval::new(3, 7));
        let out = shape.subst(&eval);
        assert_eq!(
            out,
            ShapeInfo::native(Interval::zero(), Interval::new(3, 7), Interval::constant(4))
        );
        assert!(out.symbols().is_empty());
    }

    #[test]
    fn set_length_and_transform_length() {
        let a = native((1, 1), (10, 10), (4, 4));
        assert_eq!(
            a.set_length(&Interval::new(3, 3)),
            native((1, 1), (3, 3), (4, 4))
        );
        assert_eq!(
            a.transform_length(|len| len.mult_const(2)),
            native((1, 1), (20, 20), (4, 4))
        );
        let m = ShapeInfo::managed(Interval::new(5, 5));
        assert_eq!(
            m.set_length(&Interval::new(2, 2)),
            ShapeInfo::managed(Interval::new(2, 2))
        );
        assert_eq!(ShapeInfo::Top.set_length(&Interval::new(2, 2)), ShapeInfo::Top);
    }

    #[test]
    fn lift_cmp_decidable_only_on_matching_structure() {
        let cmp = |a: &Interval, b: &Interval| Interval::cmp_eq(a, b);
        let a = native((0, 0), (10, 10), (4, 4));
        let b = native((0, 0), (10, 10), (4, 4));
        assert_eq!(a.lift_cmp_itv(&b, &cmp), TriBool::True);
        let c = native((3, 3), (10, 10), (4, 4));
        assert_eq!(a.lift_cmp_itv(&c, &cmp), TriBool::False);
        // Differing size blocks the comparison entirely.
        let d = native((0, 0), (9, 9), (4, 4));
        assert_eq!(a.lift_cmp_itv(&d, &cmp), TriBool::Unknown);
        // Managed arrays with equal lengths compare as the same point.
        let m = ShapeInfo::managed(Interval::new(5, 5));
        assert_eq!(m.lift_cmp_itv(&m.clone(), &cmp), TriBool::True);
        assert_eq!(
            m.lift_cmp_itv(&ShapeInfo::managed(Interval::new(6, 6)), &cmp),
            TriBool::Unknown
        );
        assert_eq!(a.lift_cmp_itv(&m, &cmp), TriBool::Unknown);
        assert_eq!(a.lift_cmp_itv(&ShapeInfo::Top, &cmp), TriBool::Unknown);
    }

    #[test]
    fn normalize_is_idempotent() {
        let weird = ShapeInfo::native(
            Interval::new(2, 2).meet(&Interval::new(5, 5)),
            Interval::new(1, 1),
            Interval::new(4, 4),
        );
        let once = weird.normalize();
        assert_eq!(once.normalize(), once);
        assert_eq!(
            once,
            ShapeInfo::native(Interval::bottom(), Interval::new(1, 1), Interval::new(4, 4))
        );
    }
}
