//! Facade over the array-block analysis domains.
//!
//! The analysis proper composes these crates: the core lattice traits,
//! the symbolic interval domain, allocation-site identity, and the
//! per-site array shape map.

pub use bufscan_arrayblk as arrayblk;
pub use bufscan_interval as interval;
pub use bufscan_lattice as lattice;
pub use bufscan_loc as loc;

pub mod prelude {
    pub use bufscan_arrayblk::{BlockMap, ShapeInfo};
    pub use bufscan_interval::{CompOp, Interval, Symbol};
    pub use bufscan_lattice::{AbstractValue, HasBottom, HasTop, Lattice, TriBool};
    pub use bufscan_loc::{AllocSite, Loc, NodeId, ParamPath, PowLoc};
}
