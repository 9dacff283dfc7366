use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interpreter::tree_walk::error::{ErrorKind, RuntimeError};
use crate::interpreter::tree_walk::ops::Opcode;
use crate::runtime_error;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum PairKind {
    Pair,
    List,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum LetKind {
    Let,
    LetStar,
    LetRec,
}

impl fmt::Display for LetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LetKind::Let => write!(f, "let"),
            LetKind::LetStar => write!(f, "let*"),
            LetKind::LetRec => write!(f, "letrec"),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum SetOp {
    Var,
    Car,
    Cdr,
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SetOp::Var => write!(f, "set!"),
            SetOp::Car => write!(f, "set-car!"),
            SetOp::Cdr => write!(f, "set-cdr!"),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ReadOp {
    Number,
    Line,
}

impl fmt::Display for ReadOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadOp::Number => write!(f, "read-number"),
            ReadOp::Line => write!(f, "read-line"),
        }
    }
}

/// One node of the program tree. `Clone` is a deep copy; the substitution
/// engine relies on copies sharing nothing with their source.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Node {
    Root(Vec<Node>),
    Number(f64),
    Boolean(bool),
    String(String),
    Identifier(String),
    /// `car`/`cdr` both absent is the empty-list sentinel.
    Pair {
        kind: PairKind,
        car: Option<Box<Node>>,
        cdr: Option<Box<Node>>,
    },
    Vector(Vec<Node>),
    Operator {
        op: Opcode,
        operands: Vec<Node>,
    },
    VariableDecl {
        name: Box<Node>,
        expr: Box<Node>,
    },
    ProcedureDecl {
        name: Box<Node>,
        params: Vec<Node>,
        body: Box<Node>,
    },
    LambdaDecl {
        name: Option<Box<Node>>,
        params: Vec<Node>,
        body: Box<Node>,
    },
    LetDecl {
        kind: LetKind,
        bindings: Vec<Node>,
        body: Box<Node>,
    },
    If {
        cond: Box<Node>,
        then: Box<Node>,
        alt: Box<Node>,
    },
    Cond {
        clauses: Vec<(Node, Node)>,
        else_body: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        proc_args: Vec<Node>,
        lambda_args: Vec<Node>,
    },
    Set {
        op: SetOp,
        target: Box<Node>,
        expr: Box<Node>,
    },
    Read {
        op: ReadOp,
        target: Box<Node>,
    },
}

impl Node {
    pub fn empty_list() -> Node { Node::Pair { kind: PairKind::List, car: None, cdr: None } }

    pub fn pair(car: Node, cdr: Node) -> Node {
        Node::Pair { kind: PairKind::Pair, car: Some(Box::new(car)), cdr: Some(Box::new(cdr)) }
    }

    /// Builds the right-nested chain a `(list ...)` form denotes; the final
    /// element's cdr is left absent, and no elements yields the sentinel.
    pub fn list(elements: Vec<Node>) -> Node {
        let mut chain: Option<Box<Node>> = None;
        for element in elements.into_iter().rev() {
            chain = Some(Box::new(Node::Pair { kind: PairKind::List, car: Some(Box::new(element)), cdr: chain }));
        }
        match chain {
            Some(node) => *node,
            None => Node::empty_list(),
        }
    }

    pub fn is_empty_pair(&self) -> bool { matches!(self, Node::Pair { car: None, cdr: None, .. }) }

    /// A pair is proper when its spine ends in an absent cdr or the empty
    /// sentinel; a non-pair in cdr position makes the whole chain dotted.
    pub fn is_proper(&self) -> bool {
        match self {
            Node::Pair { cdr: None, .. } => true,
            Node::Pair { cdr: Some(rest), .. } => rest.is_proper(),
            _ => false,
        }
    }

    pub fn identifier_name(&self) -> Result<&str, RuntimeError> {
        match self {
            Node::Identifier(name) => Ok(name),
            other => runtime_error!(ErrorKind::TypeMismatch, "expected an identifier, found {}", other.kind_name()),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Root(_) => "root",
            Node::Number(_) => "number",
            Node::Boolean(_) => "boolean",
            Node::String(_) => "string",
            Node::Identifier(_) => "identifier",
            Node::Pair { kind: PairKind::Pair, .. } => "pair",
            Node::Pair { kind: PairKind::List, .. } => "list",
            Node::Vector(_) => "vector",
            Node::Operator { .. } => "operator",
            Node::VariableDecl { .. } => "variable declaration",
            Node::ProcedureDecl { .. } => "procedure declaration",
            Node::LambdaDecl { .. } => "lambda declaration",
            Node::LetDecl { .. } => "let declaration",
            Node::If { .. } => "if",
            Node::Cond { .. } => "cond",
            Node::Call { .. } => "call",
            Node::Set { .. } => "set operation",
            Node::Read { .. } => "read operation",
        }
    }

    /// Every direct child, mutably. The substitution walk rewrites matching
    /// identifiers through this, declaration name slots included (there is no
    /// hygiene, so a shadowing inner declaration is rewritten too).
    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        match self {
            Node::Root(children) | Node::Vector(children) => children.iter_mut().collect(),
            Node::Number(_) | Node::Boolean(_) | Node::String(_) | Node::Identifier(_) => Vec::new(),
            Node::Pair { car, cdr, .. } => {
                let mut children = Vec::new();
                if let Some(car) = car {
                    children.push(car.as_mut());
                }
                if let Some(cdr) = cdr {
                    children.push(cdr.as_mut());
                }
                children
            }
            Node::Operator { operands, .. } => operands.iter_mut().collect(),
            Node::VariableDecl { name, expr } => vec![name.as_mut(), expr.as_mut()],
            Node::ProcedureDecl { name, params, body } => {
                let mut children = vec![name.as_mut()];
                children.extend(params.iter_mut());
                children.push(body.as_mut());
                children
            }
            Node::LambdaDecl { name, params, body } => {
                let mut children = Vec::new();
                if let Some(name) = name {
                    children.push(name.as_mut());
                }
                children.extend(params.iter_mut());
                children.push(body.as_mut());
                children
            }
            Node::LetDecl { bindings, body, .. } => {
                let mut children: Vec<&mut Node> = bindings.iter_mut().collect();
                children.push(body.as_mut());
                children
            }
            Node::If { cond, then, alt } => vec![cond.as_mut(), then.as_mut(), alt.as_mut()],
            Node::Cond { clauses, else_body } => {
                let mut children = Vec::new();
                for (test, body) in clauses.iter_mut() {
                    children.push(test);
                    children.push(body);
                }
                children.push(else_body.as_mut());
                children
            }
            Node::Call { callee, proc_args, lambda_args } => {
                let mut children = vec![callee.as_mut()];
                children.extend(proc_args.iter_mut());
                children.extend(lambda_args.iter_mut());
                children
            }
            Node::Set { target, expr, .. } => vec![target.as_mut(), expr.as_mut()],
            Node::Read { target, .. } => vec![target.as_mut()],
        }
    }

    // Spine walk shared by both pair kinds; the caller has already checked
    // properness and printed the opening paren.
    fn fmt_proper(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut node = self;
        let mut first = true;
        loop {
            match node {
                Node::Pair { car, cdr, .. } => {
                    if let Some(car) = car {
                        if !first {
                            write!(f, " ")?;
                        }
                        write!(f, "{}", car)?;
                        first = false;
                    }
                    match cdr {
                        Some(rest) => node = rest,
                        None => return Ok(()),
                    }
                }
                other => {
                    if !first {
                        write!(f, " ")?;
                    }
                    return write!(f, "{}", other);
                }
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Root(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
            Node::Number(n) => write!(f, "{}", n),
            Node::Boolean(b) => write!(f, "#{}", if *b { "t" } else { "f" }),
            Node::String(s) => write!(f, "{}", s),
            Node::Identifier(name) => write!(f, "{}", name),
            Node::Pair { .. } if self.is_proper() => {
                write!(f, "(")?;
                self.fmt_proper(f)?;
                write!(f, ")")
            }
            Node::Pair { car, cdr, .. } => {
                write!(f, "(")?;
                match car {
                    Some(car) => write!(f, "{}", car)?,
                    None => write!(f, "()")?,
                }
                write!(f, " . ")?;
                match cdr {
                    Some(cdr) => write!(f, "{}", cdr)?,
                    None => write!(f, "()")?,
                }
                write!(f, ")")
            }
            Node::Vector(elements) => {
                write!(f, "#(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
            Node::Operator { op, operands } => {
                write!(f, "({}", op)?;
                for operand in operands {
                    write!(f, " {}", operand)?;
                }
                write!(f, ")")
            }
            Node::VariableDecl { name, expr } => write!(f, "(define {} {})", name, expr),
            Node::ProcedureDecl { name, params, body } => {
                write!(f, "(define ({}", name)?;
                for param in params {
                    write!(f, " {}", param)?;
                }
                write!(f, ") {})", body)
            }
            Node::LambdaDecl { name, params, body } => {
                if let Some(name) = name {
                    write!(f, "(define {} ", name)?;
                }
                write!(f, "(lambda (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") {})", body)?;
                if name.is_some() {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Node::LetDecl { kind, bindings, body } => {
                write!(f, "({} (", kind)?;
                for (i, binding) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match binding {
                        Node::VariableDecl { name, expr } => write!(f, "({} {})", name, expr)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, ") {})", body)
            }
            Node::If { cond, then, alt } => write!(f, "(if {} {} {})", cond, then, alt),
            Node::Cond { clauses, else_body } => {
                write!(f, "(cond")?;
                for (test, body) in clauses {
                    write!(f, " ({} {})", test, body)?;
                }
                write!(f, " (else {}))", else_body)
            }
            Node::Call { callee, proc_args, lambda_args } => {
                if !lambda_args.is_empty() {
                    write!(f, "(")?;
                }
                write!(f, "({}", callee)?;
                for arg in proc_args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")?;
                if !lambda_args.is_empty() {
                    for arg in lambda_args {
                        write!(f, " {}", arg)?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
            Node::Set { op, target, expr } => write!(f, "({} {} {})", op, target, expr),
            Node::Read { op, target } => write!(f, "(define {} ({}))", target, op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Node { Node::Number(n) }

    #[test]
    fn test_list_renders_space_separated() {
        // (list 1 2 3) => (1 2 3)
        let list = Node::list(vec![num(1.0), num(2.0), num(3.0)]);
        assert_eq!(list.to_string(), "(1 2 3)");
    }

    #[test]
    fn test_empty_list_renders_parens() {
        assert_eq!(Node::empty_list().to_string(), "()");
        assert!(Node::empty_list().is_empty_pair());
        assert!(Node::empty_list().is_proper());
    }

    #[test]
    fn test_nested_pairs_render_dotted() {
        // (cons 1 (cons 2 3)) => (1 . (2 . 3))
        let pair = Node::pair(num(1.0), Node::pair(num(2.0), num(3.0)));
        assert!(!pair.is_proper());
        assert_eq!(pair.to_string(), "(1 . (2 . 3))");
    }

    #[test]
    fn test_pair_with_proper_tail_is_proper() {
        // (cons 1 (list 2 3)) => (1 2 3)
        let pair = Node::pair(num(1.0), Node::list(vec![num(2.0), num(3.0)]));
        assert!(pair.is_proper());
        assert_eq!(pair.to_string(), "(1 2 3)");
    }

    #[test]
    fn test_pair_with_empty_tail_is_proper() {
        // (cons 1 (list)) => (1)
        let pair = Node::pair(num(1.0), Node::empty_list());
        assert!(pair.is_proper());
        assert_eq!(pair.to_string(), "(1)");
    }

    #[test]
    fn test_vector_renders_hash_parens() {
        let vector = Node::Vector(vec![num(1.0), num(2.0), num(3.0)]);
        assert_eq!(vector.to_string(), "#(1 2 3)");
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(num(3.5).to_string(), "3.5");
        assert_eq!(Node::Boolean(true).to_string(), "#t");
        assert_eq!(Node::Boolean(false).to_string(), "#f");
        assert_eq!(Node::String("hello".into()).to_string(), "hello");
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Node::list(vec![num(1.0), num(2.0)]);
        let mut copy = original.clone();
        assert_eq!(original, copy);

        if let Node::Pair { car, .. } = &mut copy {
            *car = Some(Box::new(num(42.0)));
        }
        assert_ne!(original, copy);
        assert_eq!(original.to_string(), "(1 2)");
        assert_eq!(copy.to_string(), "(42 2)");
    }

    #[test]
    fn test_children_mut_covers_every_slot() {
        let mut call = Node::Call {
            callee: Box::new(Node::Identifier("f".into())),
            proc_args: vec![num(1.0), num(2.0)],
            lambda_args: vec![num(3.0)],
        };
        assert_eq!(call.children_mut().len(), 4);

        let mut cond = Node::Cond {
            clauses: vec![(Node::Boolean(true), num(1.0))],
            else_body: Box::new(num(2.0)),
        };
        assert_eq!(cond.children_mut().len(), 3);
    }

    #[test]
    fn test_serde_round_trip() {
        let node = Node::pair(num(1.0), Node::String("two".into()));
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
