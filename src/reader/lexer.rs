use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Clone, PartialEq, Debug)]
pub enum Token {
    OpenParen,
    CloseParen,
    VectorOpen,
    Identifier(String),
    Number(f64),
    Boolean(bool),
    String(String),
}

#[derive(Debug, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SyntaxError: {} (line: {}, column: {})", self.message, self.line, self.column)
    }
}

macro_rules! syntax_error {
    ($lexer:ident, $($arg:tt)*) => (
        return Err(SyntaxError { message: format!($($arg)*), line: $lexer.line, column: $lexer.column })
    )
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::tokenize(input)
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current: Option<char>,
    tokens: Vec<Token>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
        let mut lexer = Lexer {
            chars: input.chars().peekable(),
            current: None,
            tokens: Vec::new(),
            line: 1,
            column: 0,
        };
        lexer.run()?;
        Ok(lexer.tokens)
    }

    fn current(&self) -> Option<char> {
        self.current
    }

    fn advance(&mut self) {
        if self.current() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.current = self.chars.next();
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn run(&mut self) -> Result<(), SyntaxError> {
        self.advance();
        loop {
            match self.current() {
                Some(c) => match c {
                    '(' => {
                        self.tokens.push(Token::OpenParen);
                        self.advance();
                    }
                    ')' => {
                        self.tokens.push(Token::CloseParen);
                        self.advance();
                    }
                    '#' => self.parse_hash()?,
                    '"' => self.parse_string()?,
                    ';' => self.skip_comment(),
                    _ if c.is_whitespace() => self.advance(),
                    _ if c.is_ascii_digit() => self.parse_number()?,
                    // a leading minus is a sign only when a digit follows
                    '-' if matches!(self.peek(), Some(d) if d.is_ascii_digit()) => {
                        self.parse_number()?
                    }
                    _ if c.is_alphabetic() || is_symbolic(c) => self.parse_identifier()?,
                    _ => syntax_error!(self, "unexpected character: {}", c),
                },
                None => break,
            }
        }
        Ok(())
    }

    // `#t`, `#f`, and the `#(` vector opener.
    fn parse_hash(&mut self) -> Result<(), SyntaxError> {
        self.advance();
        match self.current() {
            Some('(') => {
                self.tokens.push(Token::VectorOpen);
                self.advance();
                Ok(())
            }
            Some(c @ ('t' | 'f')) => {
                self.advance();
                match self.current() {
                    Some(after) if !is_delimiter(after) => {
                        syntax_error!(self, "unexpected character after #{}: {}", c, after)
                    }
                    _ => {
                        self.tokens.push(Token::Boolean(c == 't'));
                        Ok(())
                    }
                }
            }
            Some(c) => syntax_error!(self, "unexpected character after #: {}", c),
            None => syntax_error!(self, "unexpected end of input after #"),
        }
    }

    fn parse_number(&mut self) -> Result<(), SyntaxError> {
        let mut literal = String::new();
        if self.current() == Some('-') {
            literal.push('-');
            self.advance();
        }
        let mut seen_dot = false;
        while let Some(c) = self.current() {
            match c {
                '0'..='9' => {
                    literal.push(c);
                    self.advance();
                }
                '.' if !seen_dot => {
                    seen_dot = true;
                    literal.push(c);
                    self.advance();
                }
                _ if is_delimiter(c) => break,
                _ => syntax_error!(self, "unexpected character in number literal: {}", c),
            }
        }
        match literal.parse::<f64>() {
            Ok(n) => {
                self.tokens.push(Token::Number(n));
                Ok(())
            }
            Err(_) => syntax_error!(self, "malformed number literal: {}", literal),
        }
    }

    fn parse_string(&mut self) -> Result<(), SyntaxError> {
        self.advance();
        let mut contents = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('"') => contents.push('"'),
                        Some('\\') => contents.push('\\'),
                        Some('n') => contents.push('\n'),
                        Some('t') => contents.push('\t'),
                        Some('r') => contents.push('\r'),
                        Some(c) => syntax_error!(self, "unknown escape sequence: \\{}", c),
                        None => syntax_error!(self, "unterminated string literal"),
                    }
                    self.advance();
                }
                Some(c) => {
                    contents.push(c);
                    self.advance();
                }
                None => syntax_error!(self, "unterminated string literal"),
            }
        }
        self.tokens.push(Token::String(contents));
        Ok(())
    }

    fn parse_identifier(&mut self) -> Result<(), SyntaxError> {
        let mut name = String::new();
        while let Some(c) = self.current() {
            if is_delimiter(c) {
                break;
            }
            if c.is_alphanumeric() || is_symbolic(c) {
                name.push(c);
                self.advance();
            } else {
                syntax_error!(self, "unexpected character in identifier: {}", c);
            }
        }
        self.tokens.push(Token::Identifier(name));
        Ok(())
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || c == ';' || c == '"'
}

fn is_symbolic(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '^' | '=' | '!' | '?' | '<' | '>' | '.' | '&' | '_' | '\''
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_form() {
        assert_eq!(
            tokenize("(+ 1 2)").unwrap(),
            vec![
                Token::OpenParen,
                Token::Identifier("+".to_string()),
                Token::Number(1.0),
                Token::Number(2.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokenize("42 -3.5 0.25").unwrap(),
            vec![Token::Number(42.0), Token::Number(-3.5), Token::Number(0.25)]
        );
    }

    #[test]
    fn test_bare_minus_is_an_identifier() {
        assert_eq!(
            tokenize("(- 5)").unwrap(),
            vec![
                Token::OpenParen,
                Token::Identifier("-".to_string()),
                Token::Number(5.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_booleans() {
        assert_eq!(
            tokenize("#t #f").unwrap(),
            vec![Token::Boolean(true), Token::Boolean(false)]
        );
        assert!(tokenize("#true").is_err());
        assert!(tokenize("#x").is_err());
    }

    #[test]
    fn test_vector_open() {
        assert_eq!(
            tokenize("#(1 2)").unwrap(),
            vec![
                Token::VectorOpen,
                Token::Number(1.0),
                Token::Number(2.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_punctuated_identifiers() {
        assert_eq!(
            tokenize("str->num set-car! null? deg->rad").unwrap(),
            vec![
                Token::Identifier("str->num".to_string()),
                Token::Identifier("set-car!".to_string()),
                Token::Identifier("null?".to_string()),
                Token::Identifier("deg->rad".to_string()),
            ]
        );
    }

    #[test]
    fn test_letter_led_atoms_are_identifiers() {
        // NaN and inf spellings reach the evaluator as names, not numbers
        assert_eq!(
            tokenize("NaN inf").unwrap(),
            vec![
                Token::Identifier("NaN".to_string()),
                Token::Identifier("inf".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            tokenize("\"hello world\"").unwrap(),
            vec![Token::String("hello world".to_string())]
        );
        assert_eq!(
            tokenize("\"a\\\"b\\\\c\\n\"").unwrap(),
            vec![Token::String("a\"b\\c\n".to_string())]
        );
        assert!(tokenize("\"open").is_err());
        assert!(tokenize("\"bad \\q escape\"").is_err());
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            tokenize("; heading\n(+ 1 2) ; trailing\n3").unwrap(),
            vec![
                Token::OpenParen,
                Token::Identifier("+".to_string()),
                Token::Number(1.0),
                Token::Number(2.0),
                Token::CloseParen,
                Token::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_error_carries_position() {
        let err = tokenize("(\n@)").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_malformed_number() {
        assert!(tokenize("12x").is_err());
        assert!(tokenize("1.2.3").is_err());
    }
}
