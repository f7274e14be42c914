//! Type-set lattices used by inference
//!
//! [`Dype`] is the plain union/intersection algebra over base types.
//! [`MypeArged`] adds one level of generic arguments and opaque class types;
//! inference bounds are values of this algebra.

mod base;
mod dype;
mod mypearged;

pub use base::BaseType;
pub use dype::Dype;
pub use mypearged::MypeArged;
