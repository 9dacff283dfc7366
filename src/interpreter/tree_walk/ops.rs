use std::convert::TryFrom;
use std::fmt;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::interpreter::tree_walk::ast::Node;
use crate::interpreter::tree_walk::error::{ErrorKind, RuntimeError};
use crate::interpreter::tree_walk::value::Value;
use crate::runtime_error;

/// Built-in operators, keyed by their surface name in [`OPCODES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    NumEq,
    NumNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    IsTrue,
    IsFalse,
    Append,
    StrLen,
    StrToNum,
    NumToStr,
    Car,
    Cdr,
    IsPair,
    IsNull,
    IsNumber,
    IsBoolean,
    IsString,
    IsEq,
    IsEqual,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Round,
    Floor,
    Ceiling,
    Truncate,
    DegToRad,
    RadToDeg,
    Rand,
    RandInt,
    RandDouble,
    Display,
}

pub static OPCODES: phf::Map<&'static str, Opcode> = phf_map! {
    "+" => Opcode::Add,
    "-" => Opcode::Sub,
    "*" => Opcode::Mul,
    "/" => Opcode::Div,
    "%" => Opcode::Mod,
    "^" => Opcode::Pow,
    "=" => Opcode::NumEq,
    "!=" => Opcode::NumNe,
    "<" => Opcode::Lt,
    "<=" => Opcode::Le,
    ">" => Opcode::Gt,
    ">=" => Opcode::Ge,
    "and" => Opcode::And,
    "or" => Opcode::Or,
    "not" => Opcode::Not,
    "true?" => Opcode::IsTrue,
    "false?" => Opcode::IsFalse,
    "append" => Opcode::Append,
    "strlen" => Opcode::StrLen,
    "str->num" => Opcode::StrToNum,
    "num->str" => Opcode::NumToStr,
    "car" => Opcode::Car,
    "cdr" => Opcode::Cdr,
    "pair?" => Opcode::IsPair,
    "null?" => Opcode::IsNull,
    "number?" => Opcode::IsNumber,
    "bool?" => Opcode::IsBoolean,
    "string?" => Opcode::IsString,
    "eq?" => Opcode::IsEq,
    "equal?" => Opcode::IsEqual,
    "sin" => Opcode::Sin,
    "cos" => Opcode::Cos,
    "tan" => Opcode::Tan,
    "asin" => Opcode::Asin,
    "acos" => Opcode::Acos,
    "atan" => Opcode::Atan,
    "sqrt" => Opcode::Sqrt,
    "round" => Opcode::Round,
    "floor" => Opcode::Floor,
    "ceiling" => Opcode::Ceiling,
    "truncate" => Opcode::Truncate,
    "deg->rad" => Opcode::DegToRad,
    "rad->deg" => Opcode::RadToDeg,
    "rand" => Opcode::Rand,
    "randint" => Opcode::RandInt,
    "randdouble" => Opcode::RandDouble,
    "display" => Opcode::Display,
};

/// How many evaluated operands an opcode consumes. `Fold` operators take two
/// or more operands and reduce pairwise, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Nullary,
    Unary,
    Binary,
    Fold,
}

impl Opcode {
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Add => "+",
            Opcode::Sub => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::Mod => "%",
            Opcode::Pow => "^",
            Opcode::NumEq => "=",
            Opcode::NumNe => "!=",
            Opcode::Lt => "<",
            Opcode::Le => "<=",
            Opcode::Gt => ">",
            Opcode::Ge => ">=",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Not => "not",
            Opcode::IsTrue => "true?",
            Opcode::IsFalse => "false?",
            Opcode::Append => "append",
            Opcode::StrLen => "strlen",
            Opcode::StrToNum => "str->num",
            Opcode::NumToStr => "num->str",
            Opcode::Car => "car",
            Opcode::Cdr => "cdr",
            Opcode::IsPair => "pair?",
            Opcode::IsNull => "null?",
            Opcode::IsNumber => "number?",
            Opcode::IsBoolean => "bool?",
            Opcode::IsString => "string?",
            Opcode::IsEq => "eq?",
            Opcode::IsEqual => "equal?",
            Opcode::Sin => "sin",
            Opcode::Cos => "cos",
            Opcode::Tan => "tan",
            Opcode::Asin => "asin",
            Opcode::Acos => "acos",
            Opcode::Atan => "atan",
            Opcode::Sqrt => "sqrt",
            Opcode::Round => "round",
            Opcode::Floor => "floor",
            Opcode::Ceiling => "ceiling",
            Opcode::Truncate => "truncate",
            Opcode::DegToRad => "deg->rad",
            Opcode::RadToDeg => "rad->deg",
            Opcode::Rand => "rand",
            Opcode::RandInt => "randint",
            Opcode::RandDouble => "randdouble",
            Opcode::Display => "display",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Opcode::Rand => Arity::Nullary,
            Opcode::Not
            | Opcode::IsTrue
            | Opcode::IsFalse
            | Opcode::StrLen
            | Opcode::StrToNum
            | Opcode::NumToStr
            | Opcode::Car
            | Opcode::Cdr
            | Opcode::IsPair
            | Opcode::IsNull
            | Opcode::IsNumber
            | Opcode::IsBoolean
            | Opcode::IsString
            | Opcode::Sin
            | Opcode::Cos
            | Opcode::Tan
            | Opcode::Asin
            | Opcode::Acos
            | Opcode::Atan
            | Opcode::Sqrt
            | Opcode::Round
            | Opcode::Floor
            | Opcode::Ceiling
            | Opcode::Truncate
            | Opcode::DegToRad
            | Opcode::RadToDeg
            | Opcode::Display => Arity::Unary,
            Opcode::RandInt | Opcode::RandDouble => Arity::Binary,
            _ => Arity::Fold,
        }
    }

    pub fn apply_nullary(&self) -> Result<Value, RuntimeError> {
        match self {
            Opcode::Rand => Ok(Value::Number(rand::random::<f64>())),
            other => runtime_error!(ErrorKind::UnsupportedForm, "{} is not a nullary operation", other),
        }
    }

    pub fn apply_unary(&self, operand: &Value) -> Result<Value, RuntimeError> {
        match self {
            Opcode::Not => Ok(Value::Boolean(!operand.as_boolean()?)),
            Opcode::IsTrue => Ok(Value::Boolean(matches!(operand, Value::Boolean(true)))),
            Opcode::IsFalse => Ok(Value::Boolean(matches!(operand, Value::Boolean(false)))),
            Opcode::StrLen => Ok(Value::Number(operand.as_string()?.chars().count() as f64)),
            Opcode::StrToNum => {
                let text = operand.as_string()?;
                match text.trim().parse::<f64>() {
                    Ok(n) => Ok(Value::Number(n)),
                    Err(_) => runtime_error!(ErrorKind::TypeMismatch, "cannot read \"{}\" as a number", text),
                }
            }
            Opcode::NumToStr => Ok(Value::String(Value::Number(operand.as_number()?).to_string())),
            Opcode::Car => match operand {
                Value::Pair(Node::Pair { car: Some(car), .. }) => Value::from_tree(Some(car.as_ref())),
                Value::Pair(_) => runtime_error!(ErrorKind::TypeMismatch, "car of an empty pair"),
                other => runtime_error!(ErrorKind::TypeMismatch, "car expects a pair, got {}", other.kind_name()),
            },
            Opcode::Cdr => match operand {
                Value::Pair(Node::Pair { car: Some(_), cdr, .. }) => Value::from_tree(cdr.as_deref()),
                Value::Pair(_) => runtime_error!(ErrorKind::TypeMismatch, "cdr of an empty pair"),
                other => runtime_error!(ErrorKind::TypeMismatch, "cdr expects a pair, got {}", other.kind_name()),
            },
            Opcode::IsPair => match operand {
                Value::Pair(node) => Ok(Value::Boolean(!node.is_empty_pair())),
                _ => Ok(Value::Boolean(false)),
            },
            Opcode::IsNull => match operand {
                Value::Null => Ok(Value::Boolean(true)),
                Value::Pair(node) => Ok(Value::Boolean(node.is_empty_pair())),
                _ => Ok(Value::Boolean(false)),
            },
            Opcode::IsNumber => Ok(Value::Boolean(matches!(operand, Value::Number(_)))),
            Opcode::IsBoolean => Ok(Value::Boolean(matches!(operand, Value::Boolean(_)))),
            Opcode::IsString => Ok(Value::Boolean(matches!(operand, Value::String(_)))),
            Opcode::Sin => Ok(Value::Number(operand.as_number()?.sin())),
            Opcode::Cos => Ok(Value::Number(operand.as_number()?.cos())),
            Opcode::Tan => Ok(Value::Number(operand.as_number()?.tan())),
            Opcode::Asin => Ok(Value::Number(operand.as_number()?.asin())),
            Opcode::Acos => Ok(Value::Number(operand.as_number()?.acos())),
            Opcode::Atan => Ok(Value::Number(operand.as_number()?.atan())),
            Opcode::Sqrt => Ok(Value::Number(operand.as_number()?.sqrt())),
            Opcode::Round => Ok(Value::Number(operand.as_number()?.round())),
            Opcode::Floor => Ok(Value::Number(operand.as_number()?.floor())),
            Opcode::Ceiling => Ok(Value::Number(operand.as_number()?.ceil())),
            Opcode::Truncate => Ok(Value::Number(operand.as_number()?.trunc())),
            Opcode::DegToRad => Ok(Value::Number(operand.as_number()?.to_radians())),
            Opcode::RadToDeg => Ok(Value::Number(operand.as_number()?.to_degrees())),
            Opcode::Display => {
                println!("{}", operand);
                Ok(Value::Display)
            }
            other => runtime_error!(ErrorKind::UnsupportedForm, "{} is not a unary operation", other),
        }
    }

    pub fn apply_binary(&self, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
        match self {
            Opcode::Add => lhs + rhs,
            Opcode::Sub => lhs - rhs,
            Opcode::Mul => lhs * rhs,
            Opcode::Div => lhs / rhs,
            Opcode::Mod => lhs % rhs,
            Opcode::Pow => Ok(Value::Number(lhs.as_number()?.powf(rhs.as_number()?))),
            Opcode::NumEq => Ok(Value::Boolean(lhs.as_number()? == rhs.as_number()?)),
            Opcode::NumNe => Ok(Value::Boolean(lhs.as_number()? != rhs.as_number()?)),
            Opcode::Lt => Ok(Value::Boolean(lhs.as_number()? < rhs.as_number()?)),
            Opcode::Le => Ok(Value::Boolean(lhs.as_number()? <= rhs.as_number()?)),
            Opcode::Gt => Ok(Value::Boolean(lhs.as_number()? > rhs.as_number()?)),
            Opcode::Ge => Ok(Value::Boolean(lhs.as_number()? >= rhs.as_number()?)),
            Opcode::And => Ok(Value::Boolean(lhs.as_boolean()? && rhs.as_boolean()?)),
            Opcode::Or => Ok(Value::Boolean(lhs.as_boolean()? || rhs.as_boolean()?)),
            Opcode::Append => Ok(Value::String(format!("{}{}", lhs.as_string()?, rhs.as_string()?))),
            Opcode::IsEq => Ok(Value::Boolean(is_eq(lhs, rhs))),
            Opcode::IsEqual => Ok(Value::Boolean(is_equal(lhs, rhs))),
            Opcode::RandInt => {
                let lo = lhs.as_number()?.floor();
                let hi = rhs.as_number()?.floor();
                if hi < lo {
                    runtime_error!(ErrorKind::TypeMismatch, "randint bounds are reversed: {} > {}", lo, hi);
                }
                Ok(Value::Number(lo + (rand::random::<f64>() * (hi - lo + 1.0)).floor()))
            }
            Opcode::RandDouble => {
                let lo = lhs.as_number()?;
                let hi = rhs.as_number()?;
                if hi < lo {
                    runtime_error!(ErrorKind::TypeMismatch, "randdouble bounds are reversed: {} > {}", lo, hi);
                }
                Ok(Value::Number(lo + rand::random::<f64>() * (hi - lo)))
            }
            other => runtime_error!(ErrorKind::UnsupportedForm, "{} is not a binary operation", other),
        }
    }
}

/// Identity comparison: same value object, or numbers with equal values.
/// Distinct evaluations of equal strings or pairs are not `eq?`.
fn is_eq(lhs: &Value, rhs: &Value) -> bool {
    if std::ptr::eq(lhs, rhs) {
        return true;
    }
    matches!((lhs, rhs), (Value::Number(a), Value::Number(b)) if a == b)
}

/// Structural comparison. Pairs compare by their rendered form; values of
/// different kinds are never `equal?`.
fn is_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Pair(a), Value::Pair(b)) => a.to_string() == b.to_string(),
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<Opcode> for String {
    fn from(op: Opcode) -> Self {
        op.name().to_string()
    }
}

impl TryFrom<String> for Opcode {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        OPCODES.get(name.as_str()).copied().ok_or_else(|| format!("unknown operator: {}", name))
    }
}
