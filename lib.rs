//! Garbage-collector root inference for transpiled programs.
//!
//! The front end reads raw program-structure facts, the middle end runs the
//! stratified fixpoint analysis over them, and the back end writes the
//! derived relations for the code generator.

pub mod back_end;
pub mod commons;
pub mod config;
pub mod front_end;
pub mod middle_end;

pub use commons::{Error, Result, Valid};
pub use config::{AnalysisConfig, Pipeline};
