//! Input side: the typed fact model, fact-file parsing and loading.

pub mod facts;
pub mod loader;
pub mod parser;
pub mod schema;

pub use facts::*;
pub use loader::load_dir;

#[cfg(test)]
mod tests;
