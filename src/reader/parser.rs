use std::fmt;

use phf::phf_map;

use crate::interpreter::tree_walk::ast::{LetKind, Node, ReadOp, SetOp};
use crate::interpreter::tree_walk::ops::{Opcode, OPCODES};
use crate::reader::lexer::Token;

#[derive(Debug, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ParseError: {}", self.message)
    }
}

macro_rules! parse_error {
    ($($arg:tt)*) => (
        return Err(ParseError { message: format!($($arg)*) })
    )
}

pub fn parse(tokens: &[Token]) -> Result<Node, ParseError> {
    Parser::parse(tokens)
}

/// Form heads with their own parse rule. Everything else in head position is
/// an operator (when listed in `OPCODES`) or a call.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Keyword {
    Define,
    Lambda,
    Let,
    LetStar,
    LetRec,
    If,
    Cond,
    Else,
    Cons,
    List,
    Vector,
    Set,
    SetCar,
    SetCdr,
    ReadNumber,
    ReadLine,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "define" => Keyword::Define,
    "lambda" => Keyword::Lambda,
    "let" => Keyword::Let,
    "let*" => Keyword::LetStar,
    "letrec" => Keyword::LetRec,
    "if" => Keyword::If,
    "cond" => Keyword::Cond,
    "else" => Keyword::Else,
    "cons" => Keyword::Cons,
    "list" => Keyword::List,
    "vector" => Keyword::Vector,
    "set!" => Keyword::Set,
    "set-car!" => Keyword::SetCar,
    "set-cdr!" => Keyword::SetCdr,
    "read-number" => Keyword::ReadNumber,
    "read-line" => Keyword::ReadLine,
};

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> Parser<'a> {
    fn parse(tokens: &[Token]) -> Result<Node, ParseError> {
        let mut parser = Parser { tokens, position: 0 };
        let mut forms = Vec::new();
        while parser.peek().is_some() {
            forms.push(parser.parse_form()?);
        }
        Ok(Node::Root(forms))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect_close(&mut self, context: &str) -> Result<(), ParseError> {
        match self.next() {
            Some(Token::CloseParen) => Ok(()),
            Some(other) => parse_error!("expected ) to close {}, found {:?}", context, other),
            None => parse_error!("unexpected end of input in {}", context),
        }
    }

    fn parse_form(&mut self) -> Result<Node, ParseError> {
        match self.next() {
            Some(Token::OpenParen) => self.parse_list_form(),
            Some(Token::VectorOpen) => self.parse_vector(),
            Some(Token::Number(n)) => Ok(Node::Number(n)),
            Some(Token::Boolean(b)) => Ok(Node::Boolean(b)),
            Some(Token::String(s)) => Ok(Node::String(s)),
            Some(Token::Identifier(name)) => Ok(Node::Identifier(name)),
            Some(Token::CloseParen) => parse_error!("unexpected )"),
            None => parse_error!("unexpected end of input"),
        }
    }

    // The opening paren is already consumed.
    fn parse_list_form(&mut self) -> Result<Node, ParseError> {
        match self.next() {
            Some(Token::CloseParen) => Ok(Node::empty_list()),
            Some(Token::Identifier(name)) => {
                if let Some(&keyword) = KEYWORDS.get(name.as_str()) {
                    self.parse_keyword_form(keyword)
                } else if let Some(&op) = OPCODES.get(name.as_str()) {
                    self.parse_operator(op)
                } else {
                    self.parse_call(Node::Identifier(name))
                }
            }
            // `((...) ...)`: a curried or inline-lambda call
            Some(Token::OpenParen) => {
                let inner = self.parse_list_form()?;
                self.parse_curried_call(inner)
            }
            Some(other) => parse_error!("cannot use {:?} as a form head", other),
            None => parse_error!("unexpected end of input after ("),
        }
    }

    fn parse_keyword_form(&mut self, keyword: Keyword) -> Result<Node, ParseError> {
        match keyword {
            Keyword::Define => self.parse_define(),
            Keyword::Lambda => self.parse_lambda(),
            Keyword::Let => self.parse_let(LetKind::Let),
            Keyword::LetStar => self.parse_let(LetKind::LetStar),
            Keyword::LetRec => self.parse_let(LetKind::LetRec),
            Keyword::If => self.parse_if(),
            Keyword::Cond => self.parse_cond(),
            Keyword::Else => parse_error!("else is only valid as the last cond clause"),
            Keyword::Cons => self.parse_cons(),
            Keyword::List => self.parse_list(),
            Keyword::Vector => self.parse_vector(),
            Keyword::Set => self.parse_set(SetOp::Var),
            Keyword::SetCar => self.parse_set(SetOp::Car),
            Keyword::SetCdr => self.parse_set(SetOp::Cdr),
            Keyword::ReadNumber | Keyword::ReadLine => {
                parse_error!("a read form is only valid as the expression of define or set!")
            }
        }
    }

    /// `(define x expr)`, `(define (f p...) body)`, and the read forms
    /// `(define x (read-number))` / `(define x (read-line))`.
    fn parse_define(&mut self) -> Result<Node, ParseError> {
        match self.next() {
            Some(Token::OpenParen) => {
                let name = self.parse_name("a procedure name")?;
                let params = self.parse_params()?;
                let body = self.parse_form()?;
                self.expect_close("define")?;
                Ok(Node::ProcedureDecl { name: Box::new(name), params, body: Box::new(body) })
            }
            Some(Token::Identifier(name)) => {
                let target = Node::Identifier(name);
                if let Some(op) = self.try_parse_read()? {
                    self.expect_close("define")?;
                    return Ok(Node::Read { op, target: Box::new(target) });
                }
                let expr = self.parse_form()?;
                self.expect_close("define")?;
                Ok(Node::VariableDecl { name: Box::new(target), expr: Box::new(expr) })
            }
            Some(other) => parse_error!("define expects a name or signature, found {:?}", other),
            None => parse_error!("unexpected end of input in define"),
        }
    }

    // Consumes `(read-number)` or `(read-line)` when it is next, otherwise
    // leaves the token stream untouched.
    fn try_parse_read(&mut self) -> Result<Option<ReadOp>, ParseError> {
        if self.tokens.get(self.position) != Some(&Token::OpenParen) {
            return Ok(None);
        }
        let op = match self.tokens.get(self.position + 1) {
            Some(Token::Identifier(name)) => match KEYWORDS.get(name.as_str()) {
                Some(Keyword::ReadNumber) => ReadOp::Number,
                Some(Keyword::ReadLine) => ReadOp::Line,
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        self.position += 2;
        self.expect_close(&op.to_string())?;
        Ok(Some(op))
    }

    fn parse_lambda(&mut self) -> Result<Node, ParseError> {
        match self.next() {
            Some(Token::OpenParen) => {}
            Some(other) => parse_error!("lambda expects a parameter list, found {:?}", other),
            None => parse_error!("unexpected end of input in lambda"),
        }
        let params = self.parse_params()?;
        let body = self.parse_form()?;
        self.expect_close("lambda")?;
        Ok(Node::LambdaDecl { name: None, params, body: Box::new(body) })
    }

    fn parse_params(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut params = Vec::new();
        loop {
            match self.next() {
                Some(Token::CloseParen) => return Ok(params),
                Some(Token::Identifier(name)) => params.push(Node::Identifier(name)),
                Some(other) => parse_error!("expected a parameter name, found {:?}", other),
                None => parse_error!("unexpected end of input in a parameter list"),
            }
        }
    }

    fn parse_let(&mut self, kind: LetKind) -> Result<Node, ParseError> {
        match self.next() {
            Some(Token::OpenParen) => {}
            Some(other) => parse_error!("{} expects a binding list, found {:?}", kind, other),
            None => parse_error!("unexpected end of input in {}", kind),
        }
        let mut bindings = Vec::new();
        loop {
            match self.next() {
                Some(Token::CloseParen) => break,
                Some(Token::OpenParen) => {
                    let name = self.parse_name("a binding name")?;
                    let expr = self.parse_form()?;
                    self.expect_close("a let binding")?;
                    bindings.push(Node::VariableDecl {
                        name: Box::new(name),
                        expr: Box::new(expr),
                    });
                }
                Some(other) => parse_error!("expected a let binding, found {:?}", other),
                None => parse_error!("unexpected end of input in {} bindings", kind),
            }
        }
        let body = self.parse_form()?;
        self.expect_close(&kind.to_string())?;
        Ok(Node::LetDecl { kind, bindings, body: Box::new(body) })
    }

    fn parse_if(&mut self) -> Result<Node, ParseError> {
        let cond = self.parse_form()?;
        let then = self.parse_form()?;
        let alt = self.parse_form()?;
        self.expect_close("if")?;
        Ok(Node::If { cond: Box::new(cond), then: Box::new(then), alt: Box::new(alt) })
    }

    // Clauses are `(test body)` pairs; the final clause must be `(else body)`.
    fn parse_cond(&mut self) -> Result<Node, ParseError> {
        let mut clauses = Vec::new();
        loop {
            match self.next() {
                Some(Token::OpenParen) => {
                    if self.peek_keyword() == Some(Keyword::Else) {
                        self.next();
                        let body = self.parse_form()?;
                        self.expect_close("the else clause")?;
                        self.expect_close("cond")?;
                        return Ok(Node::Cond { clauses, else_body: Box::new(body) });
                    }
                    let test = self.parse_form()?;
                    let body = self.parse_form()?;
                    self.expect_close("a cond clause")?;
                    clauses.push((test, body));
                }
                Some(Token::CloseParen) => parse_error!("cond requires a final else clause"),
                Some(other) => parse_error!("expected a cond clause, found {:?}", other),
                None => parse_error!("unexpected end of input in cond"),
            }
        }
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek() {
            Some(Token::Identifier(name)) => KEYWORDS.get(name.as_str()).copied(),
            _ => None,
        }
    }

    fn parse_cons(&mut self) -> Result<Node, ParseError> {
        let car = self.parse_form()?;
        let cdr = self.parse_form()?;
        self.expect_close("cons")?;
        Ok(Node::pair(car, cdr))
    }

    fn parse_list(&mut self) -> Result<Node, ParseError> {
        let elements = self.parse_forms_until_close("list")?;
        Ok(Node::list(elements))
    }

    fn parse_vector(&mut self) -> Result<Node, ParseError> {
        let elements = self.parse_forms_until_close("vector")?;
        Ok(Node::Vector(elements))
    }

    fn parse_set(&mut self, op: SetOp) -> Result<Node, ParseError> {
        let target = self.parse_name("a target name")?;
        if op == SetOp::Var {
            if let Some(read) = self.try_parse_read()? {
                self.expect_close("set!")?;
                return Ok(Node::Read { op: read, target: Box::new(target) });
            }
        }
        let expr = self.parse_form()?;
        self.expect_close(&op.to_string())?;
        Ok(Node::Set { op, target: Box::new(target), expr: Box::new(expr) })
    }

    fn parse_operator(&mut self, op: Opcode) -> Result<Node, ParseError> {
        let operands = self.parse_forms_until_close(&op.to_string())?;
        Ok(Node::Operator { op, operands })
    }

    fn parse_call(&mut self, callee: Node) -> Result<Node, ParseError> {
        let proc_args = self.parse_forms_until_close("a call")?;
        Ok(Node::Call { callee: Box::new(callee), proc_args, lambda_args: Vec::new() })
    }

    /// The outer layer of `((...) ...)`. A named inner call takes the outer
    /// arguments as its trailing (lambda) group; an inline lambda becomes the
    /// callee directly. Deeper nesting keeps the inner call as callee.
    fn parse_curried_call(&mut self, inner: Node) -> Result<Node, ParseError> {
        let args = self.parse_forms_until_close("a call")?;
        match inner {
            Node::LambdaDecl { .. } => Ok(Node::Call {
                callee: Box::new(inner),
                proc_args: args,
                lambda_args: Vec::new(),
            }),
            Node::Call { callee, proc_args, lambda_args } if lambda_args.is_empty() => {
                Ok(Node::Call { callee, proc_args, lambda_args: args })
            }
            other => Ok(Node::Call {
                callee: Box::new(other),
                proc_args: args,
                lambda_args: Vec::new(),
            }),
        }
    }

    fn parse_forms_until_close(&mut self, context: &str) -> Result<Vec<Node>, ParseError> {
        let mut forms = Vec::new();
        loop {
            match self.peek() {
                Some(Token::CloseParen) => {
                    self.next();
                    return Ok(forms);
                }
                Some(_) => forms.push(self.parse_form()?),
                None => parse_error!("unexpected end of input in {}", context),
            }
        }
    }

    fn parse_name(&mut self, expected: &str) -> Result<Node, ParseError> {
        match self.next() {
            Some(Token::Identifier(name)) => Ok(Node::Identifier(name)),
            Some(other) => parse_error!("expected {}, found {:?}", expected, other),
            None => parse_error!("unexpected end of input, expected {}", expected),
        }
    }
}
