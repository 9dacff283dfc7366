pub mod tree_walk;

use crate::interpreter::tree_walk::ast::Node;
use crate::reader::lexer;
use crate::reader::parser;

macro_rules! try_or_return_error {
    ($inp:expr) => {
        match $inp {
            Ok(v) => v,
            Err(e) => return Err(e.to_string()),
        }
    };
}

pub fn new() -> Interpreter { Interpreter::new() }

/// String-boundary facade over the engine: sources in, printed lines or an
/// error message out. Holds one engine so REPL state persists.
pub struct Interpreter {
    engine: tree_walk::Interpreter,
}

pub fn parse_code(src: &str) -> Result<Node, String> {
    let tokens = try_or_return_error!(lexer::tokenize(src));
    let ast = try_or_return_error!(parser::parse(&tokens));
    Ok(ast)
}

pub fn dump_ast(src: &str) -> Result<String, String> {
    let ast = parse_code(src)?;
    Ok(try_or_return_error!(serde_json::to_string_pretty(&ast)))
}

impl Interpreter {
    fn new() -> Interpreter { Interpreter { engine: tree_walk::new() } }

    pub fn execute(&mut self, input: &str) -> Result<Vec<String>, String> {
        let ast = parse_code(input)?;
        Ok(try_or_return_error!(self.engine.run(&ast)))
    }
}

#[cfg(test)]
mod facade_tests {
    use super::*;

    #[test]
    fn test_execute_reports_reader_errors_as_strings() {
        let mut interpreter = new();
        let message = interpreter.execute("(+ 1").unwrap_err();
        assert!(message.starts_with("ParseError:"), "{}", message);
        let message = interpreter.execute("(+ 1 @)").unwrap_err();
        assert!(message.starts_with("SyntaxError:"), "{}", message);
    }

    #[test]
    fn test_execute_reports_runtime_errors_as_strings() {
        let mut interpreter = new();
        let message = interpreter.execute("(car 5)").unwrap_err();
        assert!(message.starts_with("RuntimeError (type mismatch):"), "{}", message);
    }

    #[test]
    fn test_execute_keeps_state_between_calls() {
        let mut interpreter = new();
        interpreter.execute("(define x 2)").unwrap();
        assert_eq!(interpreter.execute("(+ x x x)").unwrap(), vec!["6"]);
    }

    #[test]
    fn test_dump_ast_is_json() {
        let json = dump_ast("(+ 1 2)").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.is_object());
    }
}
