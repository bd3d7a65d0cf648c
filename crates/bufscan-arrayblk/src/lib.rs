//! Array-block abstract domain.
//!
//! Tracks, per allocation site, the shape of an array-like memory block
//! as seen through one pointer value: element-unit offset, element
//! count, and byte stride for native blocks, or just a length for
//! managed arrays. [`BlockMap`] is the points-to-indexed product of
//! [`ShapeInfo`]s that a transfer function manipulates; buffer-overrun
//! checks read off `offsetof`/`sizeof` ranges from it.

mod block;
mod shape;

pub use block::BlockMap;
pub use shape::ShapeInfo;
