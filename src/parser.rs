use crate::{
    ast::{BinaryExpr, Expr, FunDecl, Stmt, UnaryExpr},
    scanner::{Span, Token, TokenKind},
};

use std::{iter::Peekable, rc::Rc};
use thiserror::Error;

pub struct Parser<I>
where
    I: Iterator<Item = Token>,
{
    tokens: Peekable<I>,
    errors: Vec<ParseError>,
    last_span: Span,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

type ParseResult<T> = Result<T, ParseError>;

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Parser {
            tokens: tokens.peekable(),
            errors: vec![],
            last_span: Span::default(),
        }
    }

    /// Parses a whole program. Errors do not stop parsing: the parser skips to
    /// the next statement boundary and keeps going, so every error in the
    /// source is returned together.
    pub fn parse(mut self) -> Result<Vec<Stmt>, Vec<ParseError>> {
        let mut statements = vec![];

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(self.errors)
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Class => self.class_decl(),
            TokenKind::Fun => Ok(Stmt::FunDecl(Rc::new(self.function("function")?))),
            TokenKind::Var => self.var_decl(),
            _ => self.statement(),
        }
    }

    fn class_decl(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let name = self.ensure_next_token(TokenKind::Identifier, "Expect class name")?;

        let superclass = if self.advance_on_match(&[TokenKind::Less]).is_some() {
            Some(self.ensure_next_token(TokenKind::Identifier, "Expect superclass name")?)
        } else {
            None
        };

        self.ensure_next_token(TokenKind::LeftBrace, "Expect '{' before class body")?;
        let mut methods = vec![];
        while !matches!(self.peek_kind(), TokenKind::RightBrace | TokenKind::Eof) {
            methods.push(Rc::new(self.function("method")?));
        }
        self.ensure_next_token(TokenKind::RightBrace, "Expect '}' after class body")?;

        Ok(Stmt::ClassDecl {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> ParseResult<FunDecl> {
        self.ensure_next_token(TokenKind::Fun, &format!("Expect 'fun' before {kind}"))?;
        let name = self.ensure_next_token(TokenKind::Identifier, &format!("Expect {kind} name"))?;
        self.ensure_next_token(TokenKind::LeftParen, &format!("Expect '(' after {kind} name"))?;

        let mut params = vec![];
        if self.advance_on_match(&[TokenKind::RightParen]).is_none() {
            loop {
                params.push(
                    self.ensure_next_token(TokenKind::Identifier, "Expect parameter name")?,
                );
                if self.advance_on_match(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
            self.ensure_next_token(TokenKind::RightParen, "Expect ')' after parameters")?;
        }

        self.ensure_next_token(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body"))?;
        let body = self.block_statement()?;

        Ok(FunDecl { name, params, body })
    }

    fn var_decl(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let name = self.ensure_next_token(TokenKind::Identifier, "Expect variable name")?;
        let init = if self.advance_on_match(&[TokenKind::Equal]).is_some() {
            Some(self.expression()?)
        } else {
            None
        };

        self.ensure_next_token(TokenKind::Semicolon, "Expect ';' after variable declaration")?;
        Ok(Stmt::VarDecl { name, init })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Print => {
                self.advance();
                let expr = self.expression()?;
                self.ensure_next_token(TokenKind::Semicolon, "Expect ';' after value")?;
                Ok(Stmt::Print(expr))
            }
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Stmt::Block(self.block_statement()?))
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Return => self.return_statement(),
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.ensure_next_token(TokenKind::Semicolon, "Expect ';' after expression")?;
        Ok(Stmt::ExprStmt(expr))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.ensure_next_token(TokenKind::LeftParen, "Expect '(' after 'if'")?;
        let pred = self.expression()?;
        self.ensure_next_token(TokenKind::RightParen, "Expect ')' after if condition")?;

        let if_branch = Box::new(self.statement()?);
        let else_branch = if self.advance_on_match(&[TokenKind::Else]).is_some() {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::IfElse {
            pred,
            if_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.ensure_next_token(TokenKind::LeftParen, "Expect '(' after 'while'")?;
        let pred = self.expression()?;
        self.ensure_next_token(TokenKind::RightParen, "Expect ')' after condition")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::WhileLoop { pred, body })
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.ensure_next_token(TokenKind::LeftParen, "Expect '(' after 'for'")?;

        let init = match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::Var => Some(Box::new(self.var_decl()?)),
            _ => Some(Box::new(self.expression_statement()?)),
        };

        let pred = if self.peek_kind() == TokenKind::Semicolon {
            None
        } else {
            Some(self.expression()?)
        };
        self.ensure_next_token(TokenKind::Semicolon, "Expect ';' after loop condition")?;

        let post = if self.peek_kind() == TokenKind::RightParen {
            None
        } else {
            Some(self.expression()?)
        };
        self.ensure_next_token(TokenKind::RightParen, "Expect ')' after for clauses")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::ForLoop {
            init,
            pred,
            post,
            body,
        })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.advance();
        let value = if self.peek_kind() == TokenKind::Semicolon {
            None
        } else {
            Some(self.expression()?)
        };
        self.ensure_next_token(TokenKind::Semicolon, "Expect ';' after return value")?;

        Ok(Stmt::Return { keyword, value })
    }

    /// Parses declarations up to and including the closing `}`. The opening
    /// brace must already be consumed.
    fn block_statement(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = vec![];

        loop {
            match self.peek_kind() {
                TokenKind::RightBrace => {
                    self.advance();
                    return Ok(statements);
                }
                TokenKind::Eof => return Err(self.error_at_peek("Expect '}' after block")),
                _ => match self.declaration() {
                    Ok(stmt) => statements.push(stmt),
                    Err(error) => {
                        self.errors.push(error);
                        self.synchronize();
                    }
                },
            }
        }
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.logic_or()?;

        if let Some(equals) = self.advance_on_match(&[TokenKind::Equal]) {
            let value = self.assignment()?;

            return Ok(match expr {
                Expr::Variable(_) => Expr::Binary(Box::new(BinaryExpr {
                    left: expr,
                    operator: equals,
                    right: value,
                })),
                Expr::Get { object, name } => Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                },
                // reported without unwinding; the left side stands in for the whole expression
                other => {
                    self.errors.push(ParseError {
                        message: "Invalid assignment target".into(),
                        span: equals.span,
                    });
                    other
                }
            });
        }

        Ok(expr)
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenKind::Or], Self::logic_and)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenKind::And], Self::equality)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenKind::BangEqual, TokenKind::EqualEqual], Self::comparison)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::LessEqual,
                TokenKind::Less,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenKind::Plus, TokenKind::Minus], Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenKind::Star, TokenKind::Slash], Self::unary)
    }

    /// One left-associative precedence level.
    fn binary(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;

        while let Some(operator) = self.advance_on_match(operators) {
            let right = operand(self)?;
            expr = Expr::Binary(Box::new(BinaryExpr {
                left: expr,
                operator,
                right,
            }))
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if let Some(operator) = self.advance_on_match(&[TokenKind::Bang, TokenKind::Minus]) {
            let right = self.unary()?;
            Ok(Expr::Unary(Box::new(UnaryExpr { operator, right })))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if let Some(paren) = self.advance_on_match(&[TokenKind::LeftParen]) {
                let arguments = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    paren,
                    arguments,
                };
            } else if self.advance_on_match(&[TokenKind::Dot]).is_some() {
                let name = self.ensure_next_token(
                    TokenKind::Identifier,
                    "Expect property name after '.'",
                )?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parses a call's argument list after the opening parenthesis.
    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut arguments = vec![];
        if self.advance_on_match(&[TokenKind::RightParen]).is_some() {
            return Ok(arguments);
        }

        loop {
            arguments.push(self.expression()?);
            if self.advance_on_match(&[TokenKind::Comma]).is_none() {
                break;
            }
        }
        self.ensure_next_token(TokenKind::RightParen, "Expect ')' after arguments")?;

        Ok(arguments)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.advance_on_match(&[
            TokenKind::False,
            TokenKind::True,
            TokenKind::Nil,
            TokenKind::Number,
            TokenKind::String,
            TokenKind::Identifier,
            TokenKind::This,
            TokenKind::Super,
            TokenKind::LeftParen,
        ]) else {
            return Err(self.error_at_peek("Expect expression"));
        };

        let expr = match token.kind {
            TokenKind::False
            | TokenKind::True
            | TokenKind::Nil
            | TokenKind::Number
            | TokenKind::String => Expr::Literal(token),
            TokenKind::Identifier => Expr::Variable(token),
            TokenKind::This => Expr::This(token),
            TokenKind::Super => self.super_expr(token)?,
            TokenKind::LeftParen => {
                let expr = self.expression()?;
                self.ensure_next_token(TokenKind::RightParen, "Expect ')' after expression")?;
                Expr::Grouping(Box::new(expr))
            }
            _ => unreachable!("primary matched an unexpected token {:?}", token.kind),
        };
        Ok(expr)
    }

    fn super_expr(&mut self, keyword: Token) -> ParseResult<Expr> {
        if self.advance_on_match(&[TokenKind::Dot]).is_some() {
            let method =
                self.ensure_next_token(TokenKind::Identifier, "Expect superclass method name")?;
            Ok(Expr::SuperGet { keyword, method })
        } else if self.advance_on_match(&[TokenKind::LeftParen]).is_some() {
            let arguments = self.arguments()?;
            Ok(Expr::SuperCall { keyword, arguments })
        } else {
            Err(self.error_at_peek("Expect '.' or '(' after 'super'"))
        }
    }

    /// Skips tokens until a likely statement boundary: just past a `;`, or
    /// right before a keyword that starts a declaration or statement.
    fn synchronize(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn ensure_next_token(&mut self, token_kind: TokenKind, message: &str) -> ParseResult<Token> {
        self.advance_on_match(&[token_kind])
            .ok_or_else(|| self.error_at_peek(message))
    }

    fn error_at_peek(&mut self, message: &str) -> ParseError {
        match self.tokens.peek() {
            Some(token) => ParseError {
                message: format!("{message} but found {}", token.kind),
                span: token.span,
            },
            None => ParseError {
                message: format!("{message} but found {}", TokenKind::Eof),
                span: self.last_span,
            },
        }
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.tokens
            .peek()
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    fn is_at_end(&mut self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    /// Consumes the next token. Never consumes `Eof`, so callers may keep
    /// asking for tokens at the end of input.
    fn advance(&mut self) -> Token {
        match self.tokens.next_if(|token| token.kind != TokenKind::Eof) {
            Some(token) => {
                self.last_span = token.span;
                token
            }
            None => Token {
                span: self.last_span,
                ..Token::synthetic(TokenKind::Eof, "")
            },
        }
    }

    fn advance_on_match(&mut self, token_types: &[TokenKind]) -> Option<Token> {
        let token = self
            .tokens
            .next_if(|token| token_types.contains(&token.kind))?;
        self.last_span = token.span;
        Some(token)
    }
}
