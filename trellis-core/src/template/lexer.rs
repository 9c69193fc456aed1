//! Expression Lexer
//!
//! Splits directive and interpolation source into tokens. Whitespace
//! (including newlines inside multi-line attribute values) is skipped.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::expr::ExprError;

/// Punctuation and operator tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Semi,
    Question,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    AndAnd,
    OrOr,
    Arrow,
}

impl Punct {
    fn as_str(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::Comma => ",",
            Punct::Dot => ".",
            Punct::Colon => ":",
            Punct::Semi => ";",
            Punct::Question => "?",
            Punct::Bang => "!",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Gt => ">",
            Punct::Ge => ">=",
            Punct::EqEq => "==",
            Punct::NotEq => "!=",
            Punct::EqEqEq => "===",
            Punct::NotEqEq => "!==",
            Punct::AndAnd => "&&",
            Punct::OrOr => "||",
            Punct::Arrow => "=>",
        }
    }
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(Punct),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Ident(name) => f.write_str(name),
            Token::Punct(p) => f.write_str(p.as_str()),
        }
    }
}

/// A token with the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Tokenize an expression.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut lexer = Lexer {
        chars: source.char_indices().peekable(),
    };
    let mut tokens = Vec::new();
    while let Some(spanned) = lexer.next_token()? {
        tokens.push(spanned);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl Lexer<'_> {
    fn next_token(&mut self) -> Result<Option<Spanned>, ExprError> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some((offset, ch)) = self.chars.next() else {
            return Ok(None);
        };

        let token = match ch {
            c if c.is_ascii_digit() => Token::Number(self.number(c)),
            c if is_ident_start(c) => Token::Ident(self.ident(c)),
            '\'' | '"' | '`' => Token::Str(self.string(ch, offset)?),
            _ => Token::Punct(self.punct(ch, offset)?),
        };

        Ok(Some(Spanned { token, offset }))
    }

    fn number(&mut self, first: char) -> f64 {
        let mut text = String::from(first);
        while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit()) {
            text.push(c);
        }
        // Only consume the dot when a digit follows, so `1.toString` style
        // member access is not swallowed.
        let mut lookahead = self.chars.clone();
        if let (Some((_, '.')), Some((_, d))) = (lookahead.next(), lookahead.next()) {
            if d.is_ascii_digit() {
                self.chars.next();
                text.push('.');
                while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit()) {
                    text.push(c);
                }
            }
        }
        text.parse().unwrap_or(0.0)
    }

    fn ident(&mut self, first: char) -> String {
        let mut name = String::from(first);
        while let Some((_, c)) = self.chars.next_if(|(_, c)| is_ident_continue(*c)) {
            name.push(c);
        }
        name
    }

    fn string(&mut self, quote: char, start: usize) -> Result<String, ExprError> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(ExprError::UnterminatedString { offset: start }),
                Some((_, c)) if c == quote => return Ok(out),
                Some((_, '\\')) => match self.chars.next() {
                    None => return Err(ExprError::UnterminatedString { offset: start }),
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, other)) => out.push(other),
                },
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn punct(&mut self, ch: char, offset: usize) -> Result<Punct, ExprError> {
        let punct = match ch {
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            ',' => Punct::Comma,
            '.' => Punct::Dot,
            ':' => Punct::Colon,
            ';' => Punct::Semi,
            '?' => Punct::Question,
            '+' => Punct::Plus,
            '-' => Punct::Minus,
            '*' => Punct::Star,
            '/' => Punct::Slash,
            '%' => Punct::Percent,
            '<' => {
                if self.eat('=') {
                    Punct::Le
                } else {
                    Punct::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Punct::Ge
                } else {
                    Punct::Gt
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        Punct::NotEqEq
                    } else {
                        Punct::NotEq
                    }
                } else {
                    Punct::Bang
                }
            }
            '=' => {
                if self.eat('>') {
                    Punct::Arrow
                } else if self.eat('=') {
                    if self.eat('=') {
                        Punct::EqEqEq
                    } else {
                        Punct::EqEq
                    }
                } else {
                    return Err(ExprError::UnexpectedChar { ch, offset });
                }
            }
            '&' if self.eat('&') => Punct::AndAnd,
            '|' if self.eat('|') => Punct::OrOr,
            _ => return Err(ExprError::UnexpectedChar { ch, offset }),
        };
        Ok(punct)
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if(|(_, c)| *c == expected).is_some()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
