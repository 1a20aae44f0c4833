//! Lexer: tokenizes a guard condition
//!
//! Produces a stream of tokens that the parser consumes.
//! Handles keywords, identifiers, string and number literals,
//! comparison operators and punctuation.

use crate::errors::{GuardError, GuardResult};

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The raw text of the token (unescaped for string literals)
    pub text: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }
}

/// Token types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    And,
    Or,
    Not,
    In,
    True,
    False,
    Null,

    // Identifiers and literals
    Identifier,
    StringLiteral,
    IntLiteral,
    FloatLiteral,

    // Operators
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Minus,

    // Structural
    Dot,
    Comma,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,

    // End of input
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::In => write!(f, "in"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Null => write!(f, "null"),
            Self::Identifier => write!(f, "identifier"),
            Self::StringLiteral => write!(f, "string literal"),
            Self::IntLiteral => write!(f, "integer"),
            Self::FloatLiteral => write!(f, "float"),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
            Self::Minus => write!(f, "-"),
            Self::Dot => write!(f, "."),
            Self::Comma => write!(f, ","),
            Self::OpenParen => write!(f, "("),
            Self::CloseParen => write!(f, ")"),
            Self::OpenBracket => write!(f, "["),
            Self::CloseBracket => write!(f, "]"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer for guard conditions
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    /// Create a new lexer from input text
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> GuardResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.pos >= self.input.len() {
                tokens.push(Token::new(TokenKind::Eof, "", self.line, self.col));
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> GuardResult<Token> {
        let ch = self.input[self.pos];
        let line = self.line;
        let col = self.col;

        let single = |kind: TokenKind, text: &str| Token::new(kind, text, line, col);

        match ch {
            '(' => {
                self.advance();
                Ok(single(TokenKind::OpenParen, "("))
            }
            ')' => {
                self.advance();
                Ok(single(TokenKind::CloseParen, ")"))
            }
            '[' => {
                self.advance();
                Ok(single(TokenKind::OpenBracket, "["))
            }
            ']' => {
                self.advance();
                Ok(single(TokenKind::CloseBracket, "]"))
            }
            ',' => {
                self.advance();
                Ok(single(TokenKind::Comma, ","))
            }
            '.' => {
                self.advance();
                Ok(single(TokenKind::Dot, "."))
            }
            '-' => {
                self.advance();
                Ok(single(TokenKind::Minus, "-"))
            }
            '=' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(single(TokenKind::EqEq, "=="))
            }
            '!' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(single(TokenKind::NotEq, "!="))
            }
            '!' => {
                self.advance();
                Ok(single(TokenKind::Not, "!"))
            }
            '<' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(single(TokenKind::Le, "<="))
            }
            '<' => {
                self.advance();
                Ok(single(TokenKind::Lt, "<"))
            }
            '>' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(single(TokenKind::Ge, ">="))
            }
            '>' => {
                self.advance();
                Ok(single(TokenKind::Gt, ">"))
            }
            '&' if self.peek_at(1) == Some('&') => {
                self.advance();
                self.advance();
                Ok(single(TokenKind::And, "&&"))
            }
            '|' if self.peek_at(1) == Some('|') => {
                self.advance();
                self.advance();
                Ok(single(TokenKind::Or, "||"))
            }
            '"' | '\'' => self.read_string_literal(ch),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier_or_keyword(),
            _ => Err(GuardError::ParseError {
                line,
                col,
                message: format!("Unexpected character: '{}'", ch),
            }),
        }
    }

    fn read_string_literal(&mut self, quote: char) -> GuardResult<Token> {
        let line = self.line;
        let col = self.col;
        self.advance(); // skip opening quote

        let mut text = String::new();
        while self.pos < self.input.len() && self.input[self.pos] != quote {
            if self.input[self.pos] == '\\' {
                match self.peek_at(1) {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c @ ('\\' | '"' | '\'')) => text.push(c),
                    _ => {
                        return Err(GuardError::ParseError {
                            line: self.line,
                            col: self.col,
                            message: "Invalid escape sequence".into(),
                        })
                    }
                }
                self.advance();
            } else {
                text.push(self.input[self.pos]);
            }
            self.advance();
        }

        if self.pos >= self.input.len() {
            return Err(GuardError::ParseError {
                line,
                col,
                message: "Unterminated string literal".into(),
            });
        }

        self.advance(); // skip closing quote
        Ok(Token::new(TokenKind::StringLiteral, text, line, col))
    }

    fn read_number(&mut self) -> GuardResult<Token> {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();
        let mut kind = TokenKind::IntLiteral;

        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            text.push(self.input[self.pos]);
            self.advance();
        }

        if self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::FloatLiteral;
            text.push('.');
            self.advance();
            while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
                text.push(self.input[self.pos]);
                self.advance();
            }
        }

        Ok(Token::new(kind, text, line, col))
    }

    fn read_identifier_or_keyword(&mut self) -> GuardResult<Token> {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_alphanumeric() || self.input[self.pos] == '_')
        {
            text.push(self.input[self.pos]);
            self.advance();
        }

        let kind = match text.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "true" | "True" => TokenKind::True,
            "false" | "False" => TokenKind::False,
            "null" | "None" => TokenKind::Null,
            _ => TokenKind::Identifier,
        };

        Ok(Token::new(kind, text, line, col))
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_whitespace() {
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}
