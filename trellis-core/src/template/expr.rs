//! Expression Syntax
//!
//! The abstract syntax of template expressions and the parser that builds
//! it. Directive values (`dr:for`, `dr:class`, `dr:style`, event bindings)
//! and `{{ }}` interpolations are all parsed with this grammar.
//!
//! # Grammar
//!
//! Lowest to highest precedence:
//!
//! ```text
//! expression  := arrow | conditional
//! arrow       := (ident | "(" params ")") "=>" (block | expression)
//! conditional := binary ("?" expression ":" expression)?
//! binary      := unary (binop unary)*        ; precedence climbing
//! unary       := ("!" | "-" | "+") unary | postfix
//! postfix     := primary ("." name | "[" expression "]" | "(" args ")")*
//! primary     := number | string | ident | "(" expression ")"
//!              | "[" items "]" | "{" entries "}"
//! ```

use serde_json::Value;
use thiserror::Error;

use super::lexer::{tokenize, Punct, Spanned, Token};

/// Errors raised while lexing or parsing an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character `{ch}` at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unexpected `{found}` at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_punct(punct: Punct) -> Option<Self> {
        let op = match punct {
            Punct::OrOr => BinaryOp::Or,
            Punct::AndAnd => BinaryOp::And,
            Punct::EqEq | Punct::EqEqEq => BinaryOp::Eq,
            Punct::NotEq | Punct::NotEqEq => BinaryOp::NotEq,
            Punct::Lt => BinaryOp::Lt,
            Punct::Le => BinaryOp::Le,
            Punct::Gt => BinaryOp::Gt,
            Punct::Ge => BinaryOp::Ge,
            Punct::Plus => BinaryOp::Add,
            Punct::Minus => BinaryOp::Sub,
            Punct::Star => BinaryOp::Mul,
            Punct::Slash => BinaryOp::Div,
            Punct::Percent => BinaryOp::Rem,
            _ => return None,
        };
        Some(op)
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    Block(Vec<Expr>),
}

impl Expr {
    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(source: &str) -> Result<Expr, ExprError> {
        let mut parser = Parser {
            tokens: tokenize(source)?,
            pos: 0,
        };
        let expr = parser.expression()?;
        match parser.tokens.get(parser.pos) {
            Some(extra) => Err(unexpected(extra)),
            None => Ok(expr),
        }
    }

    /// Identifiers this expression reads that are not bound by one of its
    /// own lambdas, in first-use order without duplicates.
    pub fn free_identifiers(&self) -> Vec<String> {
        let mut bound = Vec::new();
        let mut out = Vec::new();
        self.collect_free(&mut bound, &mut out);
        out
    }

    fn collect_free(&self, bound: &mut Vec<String>, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ident(name) => {
                if !bound.contains(name) && !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::Array(items) | Expr::Block(items) => {
                for item in items {
                    item.collect_free(bound, out);
                }
            }
            Expr::Object(entries) => {
                for (_, value) in entries {
                    value.collect_free(bound, out);
                }
            }
            Expr::Member { object, .. } => object.collect_free(bound, out),
            Expr::Index { object, index } => {
                object.collect_free(bound, out);
                index.collect_free(bound, out);
            }
            Expr::Call { callee, args } => {
                callee.collect_free(bound, out);
                for arg in args {
                    arg.collect_free(bound, out);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_free(bound, out),
            Expr::Binary { left, right, .. } => {
                left.collect_free(bound, out);
                right.collect_free(bound, out);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                test.collect_free(bound, out);
                consequent.collect_free(bound, out);
                alternate.collect_free(bound, out);
            }
            Expr::Lambda { params, body } => {
                let depth = bound.len();
                bound.extend(params.iter().cloned());
                body.collect_free(bound, out);
                bound.truncate(depth);
            }
        }
    }
}

fn unexpected(spanned: &Spanned) -> ExprError {
    ExprError::UnexpectedToken {
        found: spanned.token.to_string(),
        offset: spanned.offset,
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn next(&mut self) -> Result<&Spanned, ExprError> {
        let spanned = self.tokens.get(self.pos).ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(spanned)
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.peek() == Some(&Token::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct) -> Result<(), ExprError> {
        let spanned = self.next()?;
        if spanned.token == Token::Punct(punct) {
            Ok(())
        } else {
            Err(unexpected(spanned))
        }
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        if let Some(params) = self.arrow_params() {
            let body = if self.peek() == Some(&Token::Punct(Punct::LBrace)) {
                self.block()?
            } else {
                self.expression()?
            };
            return Ok(Expr::Lambda {
                params,
                body: Box::new(body),
            });
        }
        self.conditional()
    }

    /// Consume an arrow-function parameter list and its `=>` if one starts
    /// here. Leaves the position untouched otherwise.
    fn arrow_params(&mut self) -> Option<Vec<String>> {
        let arrow = Token::Punct(Punct::Arrow);
        match self.peek()? {
            Token::Ident(name) if self.peek_at(1) == Some(&arrow) => {
                let params = vec![name.clone()];
                self.pos += 2;
                Some(params)
            }
            Token::Punct(Punct::LParen) => {
                let mut params = Vec::new();
                let mut ahead = 1;
                loop {
                    match self.peek_at(ahead)? {
                        Token::Punct(Punct::RParen) => break,
                        Token::Ident(name) => params.push(name.clone()),
                        _ => return None,
                    }
                    ahead += 1;
                    match self.peek_at(ahead)? {
                        Token::Punct(Punct::Comma) => ahead += 1,
                        Token::Punct(Punct::RParen) => break,
                        _ => return None,
                    }
                }
                if self.peek_at(ahead + 1) != Some(&arrow) {
                    return None;
                }
                self.pos += ahead + 2;
                Some(params)
            }
            _ => None,
        }
    }

    fn block(&mut self) -> Result<Expr, ExprError> {
        self.expect(Punct::LBrace)?;
        let mut statements = Vec::new();
        loop {
            while self.eat(Punct::Semi) {}
            if self.eat(Punct::RBrace) {
                break;
            }
            statements.push(self.expression()?);
        }
        Ok(Expr::Block(statements))
    }

    fn conditional(&mut self) -> Result<Expr, ExprError> {
        let test = self.binary(1)?;
        if !self.eat(Punct::Question) {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(Punct::Colon)?;
        let alternate = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.binary(precedence + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::Punct(p) => BinaryOp::from_punct(*p),
            _ => None,
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Punct(Punct::Bang)) => UnaryOp::Not,
            Some(Token::Punct(Punct::Minus)) => UnaryOp::Neg,
            Some(Token::Punct(Punct::Plus)) => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(self.unary()?),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(Punct::Dot) {
                let spanned = self.next()?;
                let property = match &spanned.token {
                    Token::Ident(name) => name.clone(),
                    _ => return Err(unexpected(spanned)),
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(Punct::LBracket) {
                let index = self.expression()?;
                self.expect(Punct::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(Punct::LParen) {
                let args = self.list(Punct::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn list(&mut self, close: Punct) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expression()?);
            if !self.eat(Punct::Comma) {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let spanned = self.next()?.clone();
        match spanned.token {
            Token::Number(n) => Ok(Expr::Literal(super::value::number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Ident(name),
            }),
            Token::Punct(Punct::LParen) => {
                let inner = self.expression()?;
                self.expect(Punct::RParen)?;
                Ok(inner)
            }
            Token::Punct(Punct::LBracket) => Ok(Expr::Array(self.list(Punct::RBracket)?)),
            Token::Punct(Punct::LBrace) => self.object(),
            _ => Err(unexpected(&spanned)),
        }
    }

    fn object(&mut self) -> Result<Expr, ExprError> {
        let mut entries = Vec::new();
        loop {
            if self.eat(Punct::RBrace) {
                return Ok(Expr::Object(entries));
            }
            let spanned = self.next()?.clone();
            let key = match spanned.token {
                Token::Ident(name) => name,
                Token::Str(s) => s,
                Token::Number(n) => super::value::to_display(&super::value::number(n)),
                _ => return Err(unexpected(&spanned)),
            };
            let value = if self.eat(Punct::Colon) {
                self.expression()?
            } else {
                Expr::Ident(key.clone())
            };
            entries.push((key, value));
            if !self.eat(Punct::Comma) {
                self.expect(Punct::RBrace)?;
                return Ok(Expr::Object(entries));
            }
        }
    }
}
