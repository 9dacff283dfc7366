//! A small Scheme-flavored interpreter with substitution-based calls: a call
//! rewrites a copy of the callee's body instead of capturing an environment.

pub mod interpreter;
pub mod reader;
