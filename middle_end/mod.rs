//! The analysis proper: the relation store, the fixpoint engine, and the
//! rules of root inference on top of them.

pub mod analysis;
pub mod fixpoint;
pub mod relation;
pub mod universe;
