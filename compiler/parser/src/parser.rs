use std::fmt::{Display, Formatter};
use std::iter::Peekable;

use thiserror::Error;

use ast::*;
use lexer::*;

#[derive(Error, Clone, Debug)]
pub struct ParseError {
    message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ParseError {
    fn new(message: String) -> Self {
        Self { message }
    }

    fn unexpected(expected: &str, found: Option<&Token>) -> Self {
        match found {
            Some(t) => Self::new(format!(
                "Expected {}, but found '{}' at {}:{}",
                expected, t.lexeme, t.line, t.col
            )),
            None => Self::new(format!("Expected {}, but found end of file", expected)),
        }
    }
}

pub struct Parser {
    tokens: Peekable<std::vec::IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
        }
    }

    /// A program is one top-level block: `ideed, <statements> overall.`
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let items = self.parse_block()?;
        self.expect_empty()?;

        Ok(Program { items })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::OpenBlock, "an opening bracket word")?;

        let mut stmts = vec![];

        while self
            .tokens
            .peek()
            .is_some_and(|t| t.kind != TokenKind::CloseBlock)
        {
            stmts.push(self.parse_stmt()?);
        }

        self.expect(TokenKind::CloseBlock, "a closing bracket word")?;

        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.tokens.peek().map(|t| t.kind) {
            Some(TokenKind::Criterion) => self.parse_if(),
            Some(TokenKind::Idea) => {
                self.tokens.next();
                let name = self.parse_ident()?;
                Ok(Stmt::VarDecl { name })
            }
            Some(TokenKind::Let) => {
                self.tokens.next();
                let name = self.parse_ident()?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign { name, value })
            }
            Some(TokenKind::Theurgy) => self.parse_func_decl(),
            Some(TokenKind::Ritual) => {
                let (func, args) = self.parse_call()?;
                Ok(Stmt::Call { func, args })
            }
            Some(TokenKind::Catharsis) => {
                self.tokens.next();
                let expr = self.parse_expr()?;
                Ok(Stmt::Return { expr })
            }
            Some(TokenKind::Write) => {
                self.tokens.next();
                let expr = self.parse_expr()?;
                Ok(Stmt::Write { expr })
            }
            Some(TokenKind::Read) => {
                self.tokens.next();
                let name = self.parse_ident()?;
                Ok(Stmt::Read { name })
            }
            Some(TokenKind::Root) => {
                self.tokens.next();
                let expr = self.parse_expr()?;
                Ok(Stmt::Sqrt { expr })
            }
            Some(TokenKind::Thanks) => {
                self.tokens.next();
                Ok(Stmt::Exit)
            }
            Some(TokenKind::While) => Err(ParseError::unexpected(
                "a statement ('While' is reserved but not part of the language)",
                self.tokens.peek(),
            )),
            _ => Err(ParseError::unexpected("a statement", self.tokens.peek())),
        }
    }

    /// `Criterion <cond> <block> [Else] <block>` — both branch blocks are
    /// mandatory, the `Else` word between them is decorative.
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Criterion, "'Criterion'")?;

        let condition = self.parse_expr()?;
        let then = self.parse_block()?;

        if self
            .tokens
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Else)
        {
            self.tokens.next();
        }

        let otherwise = self.parse_block()?;

        Ok(Stmt::If {
            condition,
            then,
            otherwise,
        })
    }

    fn parse_func_decl(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Theurgy, "'Theurgy'")?;

        let name = self.parse_ident()?;
        let args = self.parse_varlist()?;

        let mut params = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Expr::Var(param) => params.push(param),
                _ => {
                    return Err(ParseError::new(format!(
                        "Parameters of '{}' must be plain identifiers",
                        name
                    )))
                }
            }
        }

        let body = self.parse_block()?;

        Ok(Stmt::Func(FuncDecl { name, params, body }))
    }

    /// `Ritual f ideed, a , b overall.`
    fn parse_call(&mut self) -> Result<(String, Vec<Expr>), ParseError> {
        self.expect(TokenKind::Ritual, "'Ritual'")?;

        let func = self.parse_ident()?;
        let args = self.parse_varlist()?;

        Ok((func, args))
    }

    /// A bracketed comma-chain of expressions, used for both call
    /// arguments and parameter lists.
    fn parse_varlist(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::OpenBlock, "an opening bracket word")?;

        let mut exprs = vec![];

        while self
            .tokens
            .peek()
            .is_some_and(|t| t.kind != TokenKind::CloseBlock)
        {
            if !exprs.is_empty() {
                self.expect(TokenKind::Comma, "','")?;
            }
            exprs.push(self.parse_expr()?);
        }

        self.expect(TokenKind::CloseBlock, "a closing bracket word")?;

        Ok(exprs)
    }

    /// Additive and relational level; `parse_term` binds tighter.
    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;

        while let Some(op) = self.tokens.peek().and_then(|t| additive_op(t.kind)) {
            self.tokens.next();
            let right = self.parse_term()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_factor()?;

        while let Some(op) = self.tokens.peek().and_then(|t| multiplicative_op(t.kind)) {
            self.tokens.next();
            let right = self.parse_factor()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        match self.tokens.peek().map(|t| t.kind) {
            Some(TokenKind::OpenBlock) => {
                self.tokens.next();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::CloseBlock, "a closing bracket word")?;
                Ok(expr)
            }
            Some(TokenKind::Identifier) => Ok(Expr::Var(self.parse_ident()?)),
            Some(TokenKind::Ritual) => {
                let (func, args) = self.parse_call()?;
                Ok(Expr::Call { func, args })
            }
            Some(TokenKind::Number) => {
                let token = self.tokens.next().unwrap();
                match token.value {
                    TokenValue::Integer(val) => Ok(Expr::Number(val)),
                    _ => Err(ParseError::new(format!(
                        "Numeric token '{}' carries no value",
                        token.lexeme
                    ))),
                }
            }
            _ => Err(ParseError::unexpected(
                "a number, identifier, 'Ritual' or bracketed expression",
                self.tokens.peek(),
            )),
        }
    }

    fn parse_ident(&mut self) -> Result<String, ParseError> {
        match self.tokens.next() {
            Some(Token {
                kind: TokenKind::Identifier,
                lexeme,
                ..
            }) => Ok(lexeme),
            t => Err(ParseError::unexpected("an identifier", t.as_ref())),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        match self.tokens.next() {
            Some(t) if t.kind == kind => Ok(t),
            t => Err(ParseError::unexpected(what, t.as_ref())),
        }
    }

    fn expect_empty(&mut self) -> Result<(), ParseError> {
        match self.tokens.peek() {
            None => Ok(()),
            t => Err(ParseError::unexpected("end of file", t)),
        }
    }
}

fn additive_op(kind: TokenKind) -> Option<BinOp> {
    let op = match kind {
        TokenKind::With => BinOp::Add,
        TokenKind::Without => BinOp::Sub,
        TokenKind::Eq => BinOp::Equal,
        TokenKind::Neql => BinOp::NotEqual,
        TokenKind::Less => BinOp::Less,
        TokenKind::Leseq => BinOp::LessEqual,
        TokenKind::More => BinOp::Greater,
        TokenKind::Moreq => BinOp::GreaterEqual,
        _ => return None,
    };

    Some(op)
}

fn multiplicative_op(kind: TokenKind) -> Option<BinOp> {
    let op = match kind {
        TokenKind::Times => BinOp::Mul,
        TokenKind::Split => BinOp::Div,
        _ => return None,
    };

    Some(op)
}
