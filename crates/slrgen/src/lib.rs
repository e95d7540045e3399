//! SLR(1) automaton construction from context-free grammars.

pub mod automaton;
pub mod derivation;
pub mod first_follow;
pub mod grammar;
pub mod item;
pub mod syntax;
pub mod types;
pub mod util;
