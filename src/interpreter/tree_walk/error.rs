use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    UnboundIdentifier,
    ArityMismatch,
    TypeMismatch,
    ScopeUnderflow,
    UnsupportedForm,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            ErrorKind::UnboundIdentifier => "unbound identifier",
            ErrorKind::ArityMismatch => "arity mismatch",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::ScopeUnderflow => "scope underflow",
            ErrorKind::UnsupportedForm => "unsupported form",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "RuntimeError ({}): {}", self.kind, self.message) }
}

#[macro_export]
macro_rules! runtime_error {
    ($kind:expr, $($arg:tt)*) => (
        return Err(RuntimeError { kind: $kind, message: format!($($arg)*) })
    )
}
