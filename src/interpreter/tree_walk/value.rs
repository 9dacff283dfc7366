use std::fmt;
use std::ops;

use serde::{Deserialize, Serialize};

use crate::interpreter::tree_walk::ast::Node;
use crate::interpreter::tree_walk::error::{ErrorKind, RuntimeError};
use crate::runtime_error;

/// The result of evaluating a subtree. `Pair` carries the reified pair tree
/// itself, since pair results get spliced back into copied bodies.
#[derive(PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Pair(Node),
    Null,
    ProcRef(String),
    LambdaRef(String),
    Display,
    Void,
}

impl Value {
    /// Wraps one side of an already-reified pair tree; absent sides surface
    /// as `Null` so `(null? (cdr (list 1)))` holds.
    pub fn from_tree(tree: Option<&Node>) -> Result<Value, RuntimeError> {
        match tree {
            None => Ok(Value::Null),
            Some(Node::Number(n)) => Ok(Value::Number(*n)),
            Some(Node::Boolean(b)) => Ok(Value::Boolean(*b)),
            Some(Node::String(s)) => Ok(Value::String(s.clone())),
            Some(node @ Node::Pair { .. }) => Ok(Value::Pair(node.clone())),
            Some(other) => runtime_error!(ErrorKind::TypeMismatch, "cannot take a {} as a value", other.kind_name()),
        }
    }

    /// Reifies the value back into a literal/pair node for splicing into a
    /// copied body. Procedure/lambda references become identifier nodes, so
    /// the referenced declaration is never evaluated eagerly.
    pub fn to_node(&self) -> Result<Node, RuntimeError> {
        match self {
            Value::Number(n) => Ok(Node::Number(*n)),
            Value::Boolean(b) => Ok(Node::Boolean(*b)),
            Value::String(s) => Ok(Node::String(s.clone())),
            Value::Pair(node) => Ok(node.clone()),
            Value::Null => Ok(Node::empty_list()),
            Value::ProcRef(name) | Value::LambdaRef(name) => Ok(Node::Identifier(name.clone())),
            other => runtime_error!(ErrorKind::TypeMismatch, "cannot splice a {} value into a tree", other.kind_name()),
        }
    }

    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => runtime_error!(ErrorKind::TypeMismatch, "expected a number, got {}", other.kind_name()),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, RuntimeError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => runtime_error!(ErrorKind::TypeMismatch, "expected a boolean, got {}", other.kind_name()),
        }
    }

    pub fn as_string(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::String(s) => Ok(s),
            other => runtime_error!(ErrorKind::TypeMismatch, "expected a string, got {}", other.kind_name()),
        }
    }

    /// Top-level results of these kinds are echoed by the driver.
    pub fn is_printable(&self) -> bool {
        matches!(self, Value::Number(_) | Value::Boolean(_) | Value::String(_) | Value::Pair(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Pair(_) => "pair",
            Value::Null => "null",
            Value::ProcRef(_) => "procedure reference",
            Value::LambdaRef(_) => "lambda reference",
            Value::Display => "display result",
            Value::Void => "void",
        }
    }
}

impl ops::Add for &Value {
    type Output = Result<Value, RuntimeError>;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (a, b) => runtime_error!(ErrorKind::TypeMismatch, "cannot apply + to {} and {}", a.kind_name(), b.kind_name()),
        }
    }
}

impl ops::Sub for &Value {
    type Output = Result<Value, RuntimeError>;

    fn sub(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (a, b) => runtime_error!(ErrorKind::TypeMismatch, "cannot apply - to {} and {}", a.kind_name(), b.kind_name()),
        }
    }
}

impl ops::Mul for &Value {
    type Output = Result<Value, RuntimeError>;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (a, b) => runtime_error!(ErrorKind::TypeMismatch, "cannot apply * to {} and {}", a.kind_name(), b.kind_name()),
        }
    }
}

impl ops::Div for &Value {
    type Output = Result<Value, RuntimeError>;

    // IEEE division: a zero divisor yields an infinity or NaN, not an error.
    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (a, b) => runtime_error!(ErrorKind::TypeMismatch, "cannot apply / to {} and {}", a.kind_name(), b.kind_name()),
        }
    }
}

impl ops::Rem for &Value {
    type Output = Result<Value, RuntimeError>;

    fn rem(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
            (a, b) => runtime_error!(ErrorKind::TypeMismatch, "cannot apply % to {} and {}", a.kind_name(), b.kind_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "#{}", if *b { "t" } else { "f" }),
            Value::String(s) => write!(f, "{}", s),
            Value::Pair(node) => write!(f, "{}", node),
            Value::Null => write!(f, "()"),
            Value::ProcRef(name) => write!(f, "#<procedure {}>", name),
            Value::LambdaRef(name) => write!(f, "#<lambda {}>", name),
            Value::Display | Value::Void => Ok(()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Display => write!(f, "#<display>"),
            Value::Void => write!(f, "#<void>"),
            _ => write!(f, "{}", self),
        }
    }
}
