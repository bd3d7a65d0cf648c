pub mod lattice;
mod unit;

pub use unit::UnitValue;
