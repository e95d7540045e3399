//! Runtime implementation for `slrgen` parse tables.

pub mod definition;
pub mod parser;
