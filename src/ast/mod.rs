//! Abstract syntax tree for the project DSL.

pub mod types;

pub use types::*;
