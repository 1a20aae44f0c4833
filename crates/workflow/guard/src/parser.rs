//! Parser: recursive descent parser for guard conditions
//!
//! Consumes tokens from the lexer and produces an [`Expr`] tree.
//! The grammar only has literals, attribute reads on the three fixed
//! bindings, comparisons and boolean connectives. There are no calls,
//! assignments or user-defined names.

use crate::errors::{GuardError, GuardResult};
use crate::lexer::{Lexer, Token, TokenKind};
use workflow_types::Value;

/// The names a condition may read from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    /// `entity` (alias `obj`)
    Entity,
    /// `actor` (alias `user`)
    Actor,
    /// `transition`
    Transition,
}

impl Binding {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "entity" | "obj" => Some(Self::Entity),
            "actor" | "user" => Some(Self::Actor),
            "transition" => Some(Self::Transition),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Actor => "actor",
            Self::Transition => "transition",
        }
    }
}

/// Comparison operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        };
        write!(f, "{}", symbol)
    }
}

/// A parsed guard condition
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `binding.attribute`
    Attribute {
        binding: Binding,
        name: String,
    },
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Parser for guard conditions
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Parse a condition, limiting nesting to `max_depth` levels
    pub fn parse(input: &str, max_depth: usize) -> GuardResult<Expr> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        };
        let expr = parser.parse_or()?;
        parser.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    fn parse_or(&mut self) -> GuardResult<Expr> {
        self.enter()?;
        let mut left = self.parse_and()?;
        while self.check(TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.leave();
        Ok(left)
    }

    fn parse_and(&mut self) -> GuardResult<Expr> {
        let mut left = self.parse_not()?;
        while self.check(TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> GuardResult<Expr> {
        if self.check(TokenKind::Not) {
            self.advance();
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave();
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> GuardResult<Expr> {
        let left = self.parse_operand()?;

        let op = match self.peek_kind() {
            TokenKind::EqEq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Ge => CompareOp::Ge,
            TokenKind::In => CompareOp::In,
            TokenKind::Not if self.peek_kind_at(1) == TokenKind::In => {
                self.advance();
                CompareOp::NotIn
            }
            _ => return Ok(left),
        };
        self.advance();

        let right = self.parse_operand()?;
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_operand(&mut self) -> GuardResult<Expr> {
        match self.peek_kind() {
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            TokenKind::OpenBracket => self.parse_list(),
            TokenKind::Identifier => self.parse_attribute(),
            TokenKind::StringLiteral => {
                let text = self.advance().text.clone();
                Ok(Expr::Literal(Value::Str(text)))
            }
            TokenKind::IntLiteral | TokenKind::FloatLiteral => self.parse_number(false),
            TokenKind::Minus => {
                self.advance();
                self.parse_number(true)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            TokenKind::Eof => Err(GuardError::UnexpectedEof("operand".into())),
            _ => {
                let tok = self.peek();
                Err(GuardError::ParseError {
                    line: tok.line,
                    col: tok.col,
                    message: format!("Unexpected token: '{}'", tok.text),
                })
            }
        }
    }

    fn parse_list(&mut self) -> GuardResult<Expr> {
        self.expect(TokenKind::OpenBracket)?;
        self.enter()?;

        let mut items = Vec::new();
        if !self.check(TokenKind::CloseBracket) {
            items.push(self.parse_or()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                if self.check(TokenKind::CloseBracket) {
                    break; // trailing comma
                }
                items.push(self.parse_or()?);
            }
        }

        self.expect(TokenKind::CloseBracket)?;
        self.leave();
        Ok(Expr::List(items))
    }

    fn parse_attribute(&mut self) -> GuardResult<Expr> {
        let root = self.expect_identifier()?;
        let binding = Binding::from_name(&root).ok_or(GuardError::UnknownBinding(root))?;
        self.expect(TokenKind::Dot)?;
        let name = self.expect_identifier()?;

        if self.check(TokenKind::Dot) {
            let tok = self.peek();
            return Err(GuardError::ParseError {
                line: tok.line,
                col: tok.col,
                message: "Nested attribute access is not supported".into(),
            });
        }

        Ok(Expr::Attribute { binding, name })
    }

    fn parse_number(&mut self, negative: bool) -> GuardResult<Expr> {
        let tok = self.peek().clone();
        let sign = if negative { "-" } else { "" };
        let text = format!("{}{}", sign, tok.text);

        let value = match tok.kind {
            TokenKind::IntLiteral => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| GuardError::InvalidNumber(text.clone()))?,
            TokenKind::FloatLiteral => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| GuardError::InvalidNumber(text.clone()))?,
            TokenKind::Eof => return Err(GuardError::UnexpectedEof("number".into())),
            _ => {
                return Err(GuardError::UnexpectedToken {
                    expected: "number".into(),
                    found: tok.text,
                })
            }
        };
        self.advance();
        Ok(Expr::Literal(value))
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn enter(&mut self) -> GuardResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(GuardError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind.clone()
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx].kind.clone()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> GuardResult<&Token> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else if self.check(TokenKind::Eof) {
            Err(GuardError::UnexpectedEof(format!("{}", kind)))
        } else {
            let tok = self.peek();
            Err(GuardError::UnexpectedToken {
                expected: format!("{}", kind),
                found: tok.text.clone(),
            })
        }
    }

    fn expect_identifier(&mut self) -> GuardResult<String> {
        let tok = self.expect(TokenKind::Identifier)?;
        Ok(tok.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> GuardResult<Expr> {
        Parser::parse(input, 32)
    }

    fn attr(binding: Binding, name: &str) -> Box<Expr> {
        Box::new(Expr::Attribute {
            binding,
            name: name.into(),
        })
    }

    #[test]
    fn test_parse_comparison() {
        let expr = parse("entity.status == 'draft'").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Eq,
                left: attr(Binding::Entity, "status"),
                right: Box::new(Expr::Literal(Value::from("draft"))),
            }
        );
    }

    #[test]
    fn test_binding_aliases() {
        assert_eq!(parse("obj.x").unwrap(), *attr(Binding::Entity, "x"));
        assert_eq!(parse("user.is_staff").unwrap(), *attr(Binding::Actor, "is_staff"));
        assert_eq!(
            parse("transition.codename").unwrap(),
            *attr(Binding::Transition, "codename")
        );
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let expr = parse("actor.a or actor.b and actor.c").unwrap();
        match expr {
            Expr::Or(left, right) => {
                assert_eq!(left, attr(Binding::Actor, "a"));
                assert!(matches!(*right, Expr::And(_, _)));
            }
            other => panic!("Expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("(actor.a or actor.b) and actor.c").unwrap();
        assert!(matches!(expr, Expr::And(_, _)));
    }

    #[test]
    fn test_not_in_and_lists() {
        let expr = parse("entity.kind not in ['memo', 'draft',]").unwrap();
        match expr {
            Expr::Compare { op, right, .. } => {
                assert_eq!(op, CompareOp::NotIn);
                assert_eq!(
                    *right,
                    Expr::List(vec![
                        Expr::Literal(Value::from("memo")),
                        Expr::Literal(Value::from("draft")),
                    ])
                );
            }
            other => panic!("Expected Compare, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_numbers() {
        let expr = parse("entity.balance >= -10.5").unwrap();
        match expr {
            Expr::Compare { right, .. } => {
                assert_eq!(*right, Expr::Literal(Value::Float(-10.5)));
            }
            other => panic!("Expected Compare, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_binding() {
        let result = parse("request.user == 'x'");
        assert_eq!(result, Err(GuardError::UnknownBinding("request".into())));
    }

    #[test]
    fn test_bare_binding_is_rejected() {
        assert!(parse("entity").is_err());
        assert!(parse("entity.owner.name == 'a'").is_err());
    }

    #[test]
    fn test_rejects_calls_and_trailing_tokens() {
        assert!(parse("entity.delete()").is_err());
        assert!(parse("actor.a actor.b").is_err());
        assert!(parse("__import__('os')").is_err());
    }

    #[test]
    fn test_empty_condition() {
        assert!(matches!(parse(""), Err(GuardError::UnexpectedEof(_))));
    }

    #[test]
    fn test_depth_limit() {
        let nested = format!("{}true{}", "(".repeat(10), ")".repeat(10));
        assert!(Parser::parse(&nested, 32).is_ok());
        assert_eq!(Parser::parse(&nested, 4), Err(GuardError::TooDeep(4)));

        let negated = format!("{}true", "not ".repeat(10));
        assert_eq!(Parser::parse(&negated, 4), Err(GuardError::TooDeep(4)));
    }

    #[test]
    fn test_integer_overflow() {
        let result = parse("entity.n == 99999999999999999999");
        assert!(matches!(result, Err(GuardError::InvalidNumber(_))));
    }
}
