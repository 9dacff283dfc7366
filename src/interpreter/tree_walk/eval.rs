use std::io::{self, BufRead};

use tracing::{debug, trace};

use crate::interpreter::tree_walk::ast::{LetKind, Node, PairKind, ReadOp, SetOp};
use crate::interpreter::tree_walk::error::{ErrorKind, RuntimeError};
use crate::interpreter::tree_walk::ops::{Arity, Opcode};
use crate::interpreter::tree_walk::scope::{ScopeTable, SymbolKind};
use crate::interpreter::tree_walk::value::Value;
use crate::runtime_error;

/// Substitution-based evaluator. A call rewrites a copy of the callee's body,
/// replacing parameter identifiers with argument subtrees, then evaluates the
/// rewritten copy in the current scope; only `let` forms (and the program
/// itself) push scopes, so there is no closure environment to capture.
pub struct Evaluator {
    scopes: ScopeTable,
}

impl Evaluator {
    pub fn new() -> Evaluator {
        let mut scopes = ScopeTable::new();
        scopes.push_scope();
        Evaluator { scopes }
    }

    pub fn eval(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        match node {
            Node::Root(forms) => match forms.first() {
                Some(form) => self.eval(form),
                None => Ok(Value::Void),
            },
            Node::Number(n) => Ok(Value::Number(*n)),
            Node::Boolean(b) => Ok(Value::Boolean(*b)),
            Node::String(s) => Ok(Value::String(s.clone())),
            Node::Identifier(name) => self.eval_identifier(name),
            Node::Pair { kind, car, cdr } => self.eval_pair(*kind, car.as_deref(), cdr.as_deref()),
            Node::Vector(_) => {
                runtime_error!(ErrorKind::UnsupportedForm, "vectors cannot be evaluated")
            }
            Node::Operator { op, operands } => self.eval_operator(*op, operands),
            Node::VariableDecl { name, expr } => self.eval_variable_decl(name, expr),
            Node::ProcedureDecl { name, .. } => self.eval_procedure_decl(name, node),
            Node::LambdaDecl { name, .. } => self.eval_lambda_decl(name.as_deref(), node),
            Node::LetDecl { kind, bindings, body } => self.eval_let(*kind, bindings, body),
            Node::If { cond, then, alt } => self.eval_if(cond, then, alt),
            Node::Cond { clauses, else_body } => self.eval_cond(clauses, else_body),
            Node::Call { callee, proc_args, lambda_args } => {
                self.eval_call(callee, proc_args, lambda_args)
            }
            Node::Set { op, target, expr } => self.eval_set(*op, target, expr),
            Node::Read { op, target } => self.eval_read(*op, target),
        }
    }

    /// Variables re-evaluate their bound tree on every lookup; procedure and
    /// lambda bindings yield references without touching the stored body.
    fn eval_identifier(&mut self, name: &str) -> Result<Value, RuntimeError> {
        let entry = self.scopes.lookup(name)?.clone();
        trace!(name, kind = ?entry.kind, "identifier");
        match entry.kind {
            SymbolKind::Variable => self.eval(&entry.tree),
            SymbolKind::Procedure => Ok(Value::ProcRef(name.to_string())),
            SymbolKind::Lambda => Ok(Value::LambdaRef(name.to_string())),
        }
    }

    // Pairs rebuild under the same kind tag with both sides evaluated and
    // reified, so a pair value never carries live expressions.
    fn eval_pair(
        &mut self,
        kind: PairKind,
        car: Option<&Node>,
        cdr: Option<&Node>,
    ) -> Result<Value, RuntimeError> {
        let car = self.eval_pair_side(car)?;
        let cdr = self.eval_pair_side(cdr)?;
        Ok(Value::Pair(Node::Pair { kind, car, cdr }))
    }

    fn eval_pair_side(&mut self, side: Option<&Node>) -> Result<Option<Box<Node>>, RuntimeError> {
        match side {
            None => Ok(None),
            Some(node) => Ok(Some(Box::new(self.eval(node)?.to_node()?))),
        }
    }

    fn eval_operator(&mut self, op: Opcode, operands: &[Node]) -> Result<Value, RuntimeError> {
        match op.arity() {
            Arity::Nullary => match operands {
                [] => op.apply_nullary(),
                _ => runtime_error!(ErrorKind::ArityMismatch, "{} takes no operands, got {}", op, operands.len()),
            },
            Arity::Unary => match operands {
                [operand] => op.apply_unary(&self.eval(operand)?),
                _ => runtime_error!(ErrorKind::ArityMismatch, "{} takes one operand, got {}", op, operands.len()),
            },
            Arity::Binary => match operands {
                [lhs, rhs] => {
                    let lhs = self.eval(lhs)?;
                    let rhs = self.eval(rhs)?;
                    op.apply_binary(&lhs, &rhs)
                }
                _ => runtime_error!(ErrorKind::ArityMismatch, "{} takes two operands, got {}", op, operands.len()),
            },
            // Left fold; operands after a failing combination are never
            // evaluated.
            Arity::Fold => match operands {
                [] | [_] => runtime_error!(
                    ErrorKind::ArityMismatch,
                    "{} takes at least two operands, got {}",
                    op,
                    operands.len()
                ),
                [first, rest @ ..] => {
                    let mut acc = self.eval(first)?;
                    for operand in rest {
                        let value = self.eval(operand)?;
                        acc = op.apply_binary(&acc, &value)?;
                    }
                    Ok(acc)
                }
            },
        }
    }

    /// `define` binds the raw expression tree without evaluating it; the
    /// expression runs on each later lookup of the name.
    fn eval_variable_decl(&mut self, name: &Node, expr: &Node) -> Result<Value, RuntimeError> {
        let name = name.identifier_name()?;
        debug!(name, expr = %expr, "bind variable");
        self.scopes.bind(name, SymbolKind::of(expr), expr.clone())?;
        Ok(Value::Void)
    }

    fn eval_procedure_decl(&mut self, name: &Node, decl: &Node) -> Result<Value, RuntimeError> {
        let name = name.identifier_name()?;
        debug!(name, "bind procedure");
        self.scopes.bind(name, SymbolKind::Procedure, decl.clone())?;
        Ok(Value::Void)
    }

    fn eval_lambda_decl(&mut self, name: Option<&Node>, decl: &Node) -> Result<Value, RuntimeError> {
        if let Some(name) = name {
            let name = name.identifier_name()?;
            debug!(name, "bind lambda");
            self.scopes.bind(name, SymbolKind::Lambda, decl.clone())?;
        }
        Ok(Value::Void)
    }

    fn eval_let(&mut self, kind: LetKind, bindings: &[Node], body: &Node) -> Result<Value, RuntimeError> {
        debug!(kind = %kind, bindings = bindings.len(), "enter let");
        match kind {
            LetKind::Let => {
                // Binding expressions run in the enclosing scope, so siblings
                // are not visible to each other.
                let mut bound = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    let (name, expr) = Self::binding_parts(binding)?;
                    let tree = self.binding_tree(expr)?;
                    bound.push((name.to_string(), tree));
                }
                self.scopes.push_scope();
                let result = self.bind_all_then_eval(bound, body);
                self.scopes.pop_scope()?;
                result
            }
            LetKind::LetStar => {
                self.scopes.push_scope();
                let result = self.eval_let_star_body(bindings, body);
                self.scopes.pop_scope()?;
                result
            }
            LetKind::LetRec => {
                self.scopes.push_scope();
                let result = self.eval_letrec_body(bindings, body);
                self.scopes.pop_scope()?;
                result
            }
        }
    }

    fn bind_all_then_eval(&mut self, bound: Vec<(String, Node)>, body: &Node) -> Result<Value, RuntimeError> {
        for (name, tree) in bound {
            self.scopes.bind(&name, SymbolKind::of(&tree), tree)?;
        }
        self.eval(body)
    }

    // Each binding is evaluated after its predecessors are already bound.
    fn eval_let_star_body(&mut self, bindings: &[Node], body: &Node) -> Result<Value, RuntimeError> {
        for binding in bindings {
            let (name, expr) = Self::binding_parts(binding)?;
            let name = name.to_string();
            let tree = self.binding_tree(expr)?;
            self.scopes.bind(&name, SymbolKind::of(&tree), tree)?;
        }
        self.eval(body)
    }

    // Two phases: pre-bind every name to its raw expression so initializers
    // can reference each other, then evaluate and rebind in order.
    fn eval_letrec_body(&mut self, bindings: &[Node], body: &Node) -> Result<Value, RuntimeError> {
        for binding in bindings {
            let (name, expr) = Self::binding_parts(binding)?;
            let name = name.to_string();
            self.scopes.bind(&name, SymbolKind::of(expr), expr.clone())?;
        }
        for binding in bindings {
            let (name, expr) = Self::binding_parts(binding)?;
            let name = name.to_string();
            let tree = self.binding_tree(expr)?;
            self.scopes.bind(&name, SymbolKind::of(&tree), tree)?;
        }
        self.eval(body)
    }

    fn binding_parts(binding: &Node) -> Result<(&str, &Node), RuntimeError> {
        match binding {
            Node::VariableDecl { name, expr } => Ok((name.identifier_name()?, expr)),
            other => runtime_error!(
                ErrorKind::TypeMismatch,
                "a let binding must pair a name with an expression, found {}",
                other.kind_name()
            ),
        }
    }

    /// The tree a `let` binding or `set!` stores: declaration expressions are
    /// kept raw so they evaluate lazily on lookup, anything else is evaluated
    /// and reified now.
    fn binding_tree(&mut self, expr: &Node) -> Result<Node, RuntimeError> {
        match expr {
            Node::LambdaDecl { .. } | Node::ProcedureDecl { .. } | Node::LetDecl { .. } => Ok(expr.clone()),
            _ => self.eval(expr)?.to_node(),
        }
    }

    fn eval_if(&mut self, cond: &Node, then: &Node, alt: &Node) -> Result<Value, RuntimeError> {
        match self.eval(cond)? {
            Value::Boolean(true) => self.eval(then),
            Value::Boolean(false) => self.eval(alt),
            other => runtime_error!(
                ErrorKind::TypeMismatch,
                "an if condition must be a boolean, got {}",
                other.kind_name()
            ),
        }
    }

    fn eval_cond(&mut self, clauses: &[(Node, Node)], else_body: &Node) -> Result<Value, RuntimeError> {
        for (test, body) in clauses {
            match self.eval(test)? {
                Value::Boolean(true) => return self.eval(body),
                Value::Boolean(false) => continue,
                other => runtime_error!(
                    ErrorKind::TypeMismatch,
                    "a cond test must be a boolean, got {}",
                    other.kind_name()
                ),
            }
        }
        self.eval(else_body)
    }

    fn eval_call(&mut self, callee: &Node, proc_args: &[Node], lambda_args: &[Node]) -> Result<Value, RuntimeError> {
        match callee {
            Node::Identifier(name) => {
                let entry = self.scopes.lookup(name)?.clone();
                match entry.tree {
                    Node::ProcedureDecl { params, body, .. } | Node::LambdaDecl { params, body, .. } => {
                        self.apply_callable(name, &params, &body, proc_args, lambda_args)
                    }
                    _ => runtime_error!(
                        ErrorKind::TypeMismatch,
                        "{} is not bound to a procedure or lambda",
                        name
                    ),
                }
            }
            Node::LambdaDecl { name, params, body } => {
                let label = match name.as_deref() {
                    Some(node) => node.identifier_name()?,
                    None => "lambda",
                };
                self.apply_callable(label, params, body, proc_args, lambda_args)
            }
            // A nested call in callee position must produce a reference.
            Node::Call { .. } => match self.eval(callee)? {
                Value::ProcRef(name) | Value::LambdaRef(name) => {
                    self.eval_call(&Node::Identifier(name), proc_args, lambda_args)
                }
                other => runtime_error!(ErrorKind::TypeMismatch, "cannot call a {}", other.kind_name()),
            },
            other => runtime_error!(ErrorKind::TypeMismatch, "cannot call a {}", other.kind_name()),
        }
    }

    /// The substitution call engine. Arguments are evaluated and reified
    /// (lambda declarations pass through raw), then spliced into a copy of the
    /// body: one full tree walk per parameter index, replacing identifiers by
    /// name and position with no hygiene. The rewritten body evaluates in the
    /// current scope. A body that reduces to a lambda declaration is applied
    /// to the call's trailing arguments, which completes curried calls.
    fn apply_callable(
        &mut self,
        label: &str,
        params: &[Node],
        body: &Node,
        args: &[Node],
        trailing: &[Node],
    ) -> Result<Value, RuntimeError> {
        if args.len() != params.len() {
            runtime_error!(
                ErrorKind::ArityMismatch,
                "{} takes {} argument(s), got {}",
                label,
                params.len(),
                args.len()
            );
        }
        let mut reified = Vec::with_capacity(args.len());
        for arg in args {
            reified.push(self.call_argument(arg)?);
        }
        let mut body = body.clone();
        for (index, arg) in reified.iter().enumerate() {
            Self::substitute(&mut body, params, index, arg);
        }
        trace!(callee = label, body = %body, "substituted body");
        match body {
            Node::LambdaDecl { name, params, body: inner } => {
                let label = match name.as_deref() {
                    Some(node) => node.identifier_name()?.to_string(),
                    None => String::from("lambda"),
                };
                self.apply_callable(&label, &params, &inner, trailing, &[])
            }
            other => self.eval(&other),
        }
    }

    fn call_argument(&mut self, arg: &Node) -> Result<Node, RuntimeError> {
        match arg {
            Node::LambdaDecl { .. } => Ok(arg.clone()),
            _ => self.eval(arg)?.to_node(),
        }
    }

    /// One substitution pass: replace every identifier whose name occupies
    /// `index` in the parameter list with the argument subtree. Declaration
    /// name slots and nested parameter lists are walked too; reusing a
    /// parameter name inside the body is rewritten like any other occurrence.
    fn substitute(body: &mut Node, params: &[Node], index: usize, arg: &Node) {
        if let Node::Identifier(name) = body {
            if Self::param_index(params, name) == Some(index) {
                *body = arg.clone();
            }
            return;
        }
        for child in body.children_mut() {
            Self::substitute(child, params, index, arg);
        }
    }

    // First matching position wins when a name repeats in the parameter list.
    fn param_index(params: &[Node], name: &str) -> Option<usize> {
        params.iter().position(|param| matches!(param, Node::Identifier(p) if p == name))
    }

    fn eval_set(&mut self, op: SetOp, target: &Node, expr: &Node) -> Result<Value, RuntimeError> {
        let name = target.identifier_name()?;
        match op {
            SetOp::Var => {
                let tree = self.binding_tree(expr)?;
                debug!(name, tree = %tree, "set!");
                self.scopes.rebind(name, tree)?;
            }
            SetOp::Car | SetOp::Cdr => {
                let entry = self.scopes.lookup(name)?.clone();
                let mut pair = match entry.tree {
                    node @ Node::Pair { .. } => node,
                    other => runtime_error!(
                        ErrorKind::TypeMismatch,
                        "{} expects {} to hold a pair, found {}",
                        op,
                        name,
                        other.kind_name()
                    ),
                };
                // The expression subtree is stored unevaluated; it runs when
                // the pair is next evaluated.
                if let Node::Pair { car, cdr, .. } = &mut pair {
                    let side = if op == SetOp::Car { car } else { cdr };
                    *side = Some(Box::new(expr.clone()));
                }
                debug!(name, pair = %pair, "set pair side");
                self.scopes.rebind(name, pair)?;
            }
        }
        Ok(Value::Void)
    }

    /// Blocking console read.
    fn eval_read(&mut self, op: ReadOp, target: &Node) -> Result<Value, RuntimeError> {
        let name = target.identifier_name()?;
        let tree = Self::read_input(op, &mut io::stdin().lock())?;
        debug!(name, op = %op, "read input");
        self.bind_read(name, tree)
    }

    /// The target is rebound wherever it is already bound, or freshly bound
    /// in the current scope.
    fn bind_read(&mut self, name: &str, tree: Node) -> Result<Value, RuntimeError> {
        if self.scopes.is_bound(name) {
            self.scopes.rebind(name, tree)?;
        } else {
            self.scopes.bind(name, SymbolKind::Variable, tree)?;
        }
        Ok(Value::Void)
    }

    fn read_input(op: ReadOp, input: &mut impl BufRead) -> Result<Node, RuntimeError> {
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => runtime_error!(ErrorKind::TypeMismatch, "no input available for {}", op),
            Ok(_) => {}
        }
        let line = line.trim_end_matches(['\r', '\n']);
        match op {
            ReadOp::Line => Ok(Node::String(line.to_string())),
            ReadOp::Number => match line.trim().parse::<f64>() {
                Ok(n) => Ok(Node::Number(n)),
                Err(_) => runtime_error!(ErrorKind::TypeMismatch, "cannot read \"{}\" as a number", line.trim()),
            },
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}
