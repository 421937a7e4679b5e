//! The route-expression grammar.
//!
//! Both sides of the convention spell a path with the same small Go
//! expression language: string literals, identifiers, qualified selectors,
//! `+` concatenation, and formatted-string builder calls:
//!
//! ```text
//! "/foo/bar"
//! "/foo/" + id
//! fmt.Sprintf("/foo/%s/bar", id)
//! ```
//!
//! [`parse`] produces an [`Expr`] tree; segment extraction over the tree
//! lives in [`crate::uri`].

use logos::Logos;
use thiserror::Error;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_owned())]
    Str(String),
    #[regex(r"`[^`]*`", |lex| lex.slice().to_owned())]
    RawStr(String),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_owned())]
    Number(String),
    #[token("+")]
    Plus,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

/// A parsed route expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A string literal, quotes included.
    Lit(String),
    /// A bare identifier.
    Ident(String),
    /// A qualified selector such as `c.Fixture.ID`.
    Selector(Vec<String>),
    /// Concatenation with `+`.
    Concat(Box<Expr>, Box<Expr>),
    /// A call such as `fmt.Sprintf("/foo/%s", id)`.
    Call { path: Vec<String>, args: Vec<Expr> },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("unterminated or invalid token")]
    Lex,
    #[error("unexpected token `{0}`")]
    Unexpected(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("empty expression")]
    Empty,
}

/// Parse a route expression into its tree.
///
/// Anything outside the supported grammar is an error; callers turn it into
/// a single expression-level diagnostic rather than aborting.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let mut tokens = Vec::new();
    for tok in Token::lexer(input) {
        tokens.push(tok.map_err(|()| ExprError::Lex)?);
    }
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ExprError::Unexpected(describe(tok))),
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Str(s) | Token::RawStr(s) | Token::Ident(s) | Token::Number(s) => s.clone(),
        Token::Plus => "+".into(),
        Token::Dot => ".".into(),
        Token::Comma => ",".into(),
        Token::LParen => "(".into(),
        Token::RParen => ")".into(),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        while matches!(self.peek(), Some(Token::Plus)) {
            self.bump();
            let rhs = self.term()?;
            lhs = Expr::Concat(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        match self.bump() {
            // Numbers are basic literals just like strings; a bare `5`
            // contributes the segment `5`.
            Some(Token::Str(raw)) | Some(Token::RawStr(raw)) | Some(Token::Number(raw)) => {
                Ok(Expr::Lit(raw))
            }
            Some(Token::Ident(name)) => self.path_or_call(name),
            Some(ref tok) => Err(ExprError::Unexpected(describe(tok))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn path_or_call(&mut self, first: String) -> Result<Expr, ExprError> {
        let mut path = vec![first];
        while matches!(self.peek(), Some(Token::Dot)) {
            self.bump();
            match self.bump() {
                Some(Token::Ident(name)) => path.push(name),
                Some(ref tok) => return Err(ExprError::Unexpected(describe(tok))),
                None => return Err(ExprError::UnexpectedEnd),
            }
        }

        if matches!(self.peek(), Some(Token::LParen)) {
            self.bump();
            let mut args = Vec::new();
            if matches!(self.peek(), Some(Token::RParen)) {
                self.bump();
            } else {
                loop {
                    args.push(self.expr()?);
                    match self.bump() {
                        Some(Token::Comma) => continue,
                        Some(Token::RParen) => break,
                        Some(ref tok) => return Err(ExprError::Unexpected(describe(tok))),
                        None => return Err(ExprError::UnexpectedEnd),
                    }
                }
            }
            return Ok(Expr::Call { path, args });
        }

        if path.len() == 1 {
            let name = path.into_iter().next().unwrap_or_default();
            Ok(Expr::Ident(name))
        } else {
            Ok(Expr::Selector(path))
        }
    }
}
