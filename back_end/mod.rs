//! Output side: writing the derived relations where the code generator
//! expects them.

pub mod writer;

pub use writer::*;
