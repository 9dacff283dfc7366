use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::interpreter::tree_walk::ast::Node;
use crate::interpreter::tree_walk::error::{ErrorKind, RuntimeError};
use crate::runtime_error;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum SymbolKind {
    Variable,
    Procedure,
    Lambda,
}

impl SymbolKind {
    /// The kind a tree gets when bound: declarations carry their own kind,
    /// anything else is a plain variable.
    pub fn of(tree: &Node) -> SymbolKind {
        match tree {
            Node::ProcedureDecl { .. } => SymbolKind::Procedure,
            Node::LambdaDecl { .. } => SymbolKind::Lambda,
            _ => SymbolKind::Variable,
        }
    }
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub kind: SymbolKind,
    pub tree: Node,
}

/// Stack of scopes, innermost last. Pushed around `let` bodies and once for
/// the global scope; calls never push (substitution stands in for frames).
#[derive(Default)]
pub struct ScopeTable {
    scopes: Vec<HashMap<String, SymbolEntry>>,
}

impl ScopeTable {
    pub fn new() -> ScopeTable { ScopeTable { scopes: Vec::new() } }

    pub fn depth(&self) -> usize { self.scopes.len() }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
        trace!(depth = self.scopes.len(), "pushed scope");
    }

    pub fn pop_scope(&mut self) -> Result<(), RuntimeError> {
        match self.scopes.pop() {
            Some(_) => {
                trace!(depth = self.scopes.len(), "popped scope");
                Ok(())
            }
            None => runtime_error!(ErrorKind::ScopeUnderflow, "popped a scope that was never pushed"),
        }
    }

    /// Binds into the innermost scope, shadowing without touching outer
    /// scopes; an existing binding of the same name here is overwritten.
    pub fn bind(&mut self, name: &str, kind: SymbolKind, tree: Node) -> Result<(), RuntimeError> {
        match self.scopes.last_mut() {
            Some(scope) => {
                trace!(name, ?kind, "bind");
                scope.insert(name.to_string(), SymbolEntry { kind, tree });
                Ok(())
            }
            None => runtime_error!(ErrorKind::ScopeUnderflow, "cannot bind `{}` with no scope on the stack", name),
        }
    }

    /// Mutates the nearest existing binding in place; the entry's kind is
    /// recomputed from the new tree (`set!` to a lambda makes it callable).
    pub fn rebind(&mut self, name: &str, tree: Node) -> Result<(), RuntimeError> {
        let kind = SymbolKind::of(&tree);
        for scope in self.scopes.iter_mut().rev() {
            if let Some(entry) = scope.get_mut(name) {
                trace!(name, ?kind, "rebind");
                entry.kind = kind;
                entry.tree = tree;
                return Ok(());
            }
        }
        runtime_error!(ErrorKind::UnboundIdentifier, "cannot rebind `{}`: it is not bound", name)
    }

    pub fn lookup(&self, name: &str) -> Result<&SymbolEntry, RuntimeError> {
        for scope in self.scopes.iter().rev() {
            if let Some(entry) = scope.get(name) {
                return Ok(entry);
            }
        }
        runtime_error!(ErrorKind::UnboundIdentifier, "`{}` is not bound in any scope", name)
    }

    pub fn is_bound(&self, name: &str) -> bool { self.lookup(name).is_ok() }

    pub fn is_variable(&self, name: &str) -> bool { self.kind_of(name) == Some(SymbolKind::Variable) }

    pub fn is_procedure(&self, name: &str) -> bool { self.kind_of(name) == Some(SymbolKind::Procedure) }

    pub fn is_lambda(&self, name: &str) -> bool { self.kind_of(name) == Some(SymbolKind::Lambda) }

    fn kind_of(&self, name: &str) -> Option<SymbolKind> { self.lookup(name).ok().map(|entry| entry.kind) }
}
