pub mod ast;
pub mod error;
pub mod eval;
pub mod ops;
pub mod scope;
pub mod value;

#[cfg(test)]
mod tests;

use tracing::{debug, info};

use crate::interpreter::tree_walk::ast::Node;
use crate::interpreter::tree_walk::error::RuntimeError;
use crate::interpreter::tree_walk::eval::Evaluator;

pub fn new() -> Interpreter {
    Interpreter::new()
}

/// Driver around one persistent evaluator: the global scope survives across
/// `run` calls, which is what keeps a REPL session stateful.
pub struct Interpreter {
    evaluator: Evaluator,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter { evaluator: Evaluator::new() }
    }

    /// Evaluates every top-level form in order, printing each printable
    /// result on its own line as it is produced. The printed lines are also
    /// returned. The first failure stops the run; later forms are not
    /// evaluated.
    pub fn run(&mut self, root: &Node) -> Result<Vec<String>, RuntimeError> {
        let forms = match root {
            Node::Root(forms) => forms.as_slice(),
            other => std::slice::from_ref(other),
        };
        info!(forms = forms.len(), "run");
        let mut printed = Vec::new();
        for form in forms {
            let value = self.evaluator.eval(form)?;
            debug!(value = ?value, "form result");
            if value.is_printable() {
                let line = value.to_string();
                println!("{}", line);
                printed.push(line);
            }
        }
        Ok(printed)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}
