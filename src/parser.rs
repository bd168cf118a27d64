//! Recursive-descent parser for the JS-literal grammar
//!
//! Parses a single expression (optionally followed by `;`), the way
//! `return <input>` would be read inside a function body.

use std::sync::Arc;

use crate::ast::{BinaryOp, Expr, FunctionBody, FunctionDef, LogicalOp, Stmt, UnaryOp};
use crate::error::RevalueError;
use crate::lexer::{tokenize, Punct, Token, TokenKind};
use crate::limits::ResourceLimits;

/// Words that can never be used as a variable reference
const RESERVED: &[&str] = &[
    "function", "return", "let", "const", "var", "if", "else", "typeof", "true", "false", "null",
    "new", "this", "class", "for", "while", "do", "switch", "case", "break", "continue", "throw",
    "try", "catch", "finally", "delete", "in", "instanceof", "void", "with", "yield", "await",
];

/// Parse `source` as one expression
pub fn parse_expression(source: &str, limits: &ResourceLimits) -> Result<Expr, RevalueError> {
    limits.check_input(source)?;
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
        max_depth: limits.max_depth,
    };

    let expr = parser.expression()?;
    parser.eat(Punct::Semicolon);
    if !parser.at_eof() {
        return Err(parser.unexpected("end of input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    // ========================================================================
    // TOKEN HELPERS
    // ========================================================================

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn check(&self, punct: Punct) -> bool {
        matches!(self.peek(), TokenKind::Punct(p) if *p == punct)
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(w) if w == word)
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.check(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct, what: &str) -> Result<(), RevalueError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn current_start(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span.start
    }

    fn previous_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .map(|i| self.tokens[i].span.end)
            .unwrap_or(0)
    }

    fn unexpected(&self, expected: &str) -> RevalueError {
        let found = match self.peek() {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(s) => format!("string {:?}", s),
            TokenKind::Ident(w) => format!("'{}'", w),
            TokenKind::Punct(_) => {
                let span = &self.tokens[self.pos.min(self.tokens.len() - 1)].span;
                format!("'{}'", &self.source[span.clone()])
            }
        };
        RevalueError::Parse {
            position: self.current_start(),
            details: format!("expected {}, found {}", expected, found),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String, RevalueError> {
        match self.peek() {
            TokenKind::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Go one nesting level deeper, enforcing `max_depth`
    fn deepen(&mut self) -> Result<(), RevalueError> {
        if self.depth >= self.max_depth {
            return Err(RevalueError::LimitExceeded {
                what: "nesting depth",
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `f` one nesting level deeper
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RevalueError>,
    ) -> Result<T, RevalueError> {
        self.deepen()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Run a left-associative loop that may call [`Parser::deepen`] once per
    /// link; the depth it charged is released afterwards
    fn chained<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RevalueError>,
    ) -> Result<T, RevalueError> {
        let base = self.depth;
        let result = f(self);
        self.depth = base;
        result
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    fn expression(&mut self) -> Result<Expr, RevalueError> {
        self.nested(|p| {
            if let Some(arrow) = p.try_arrow()? {
                return Ok(arrow);
            }
            p.conditional()
        })
    }

    fn conditional(&mut self) -> Result<Expr, RevalueError> {
        let test = self.logical_or()?;
        if !self.eat(Punct::Question) {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(Punct::Colon, "':' in conditional expression")?;
        let alternate = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, RevalueError> {
        self.chained(|p| {
            let mut left = p.logical_and()?;
            loop {
                let op = if p.eat(Punct::Or) {
                    LogicalOp::Or
                } else if p.eat(Punct::Nullish) {
                    LogicalOp::Nullish
                } else {
                    return Ok(left);
                };
                p.deepen()?;
                let right = p.logical_and()?;
                left = Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
        })
    }

    fn logical_and(&mut self) -> Result<Expr, RevalueError> {
        self.chained(|p| {
            let mut left = p.equality()?;
            while p.eat(Punct::And) {
                p.deepen()?;
                let right = p.equality()?;
                left = Expr::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
            Ok(left)
        })
    }

    fn binary_level(
        &mut self,
        ops: &[(Punct, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, RevalueError>,
    ) -> Result<Expr, RevalueError> {
        self.chained(|p| {
            let mut left = next(p)?;
            'outer: loop {
                for (punct, op) in ops {
                    if p.eat(*punct) {
                        p.deepen()?;
                        let right = next(p)?;
                        left = Expr::Binary {
                            op: *op,
                            left: Box::new(left),
                            right: Box::new(right),
                        };
                        continue 'outer;
                    }
                }
                return Ok(left);
            }
        })
    }

    fn equality(&mut self) -> Result<Expr, RevalueError> {
        self.binary_level(
            &[
                (Punct::StrictEq, BinaryOp::StrictEq),
                (Punct::StrictNe, BinaryOp::StrictNe),
                (Punct::LooseEq, BinaryOp::LooseEq),
                (Punct::LooseNe, BinaryOp::LooseNe),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, RevalueError> {
        self.binary_level(
            &[
                (Punct::Lt, BinaryOp::Lt),
                (Punct::Le, BinaryOp::Le),
                (Punct::Gt, BinaryOp::Gt),
                (Punct::Ge, BinaryOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, RevalueError> {
        self.binary_level(
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, RevalueError> {
        self.binary_level(
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, RevalueError> {
        let op = if self.eat(Punct::Minus) {
            UnaryOp::Neg
        } else if self.eat(Punct::Plus) {
            UnaryOp::Plus
        } else if self.eat(Punct::Bang) {
            UnaryOp::Not
        } else if self.eat_word("typeof") {
            UnaryOp::TypeOf
        } else {
            return self.postfix();
        };
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, RevalueError> {
        self.chained(|p| {
            let mut expr = p.primary()?;
            loop {
                if p.eat(Punct::Dot) {
                    p.deepen()?;
                    let name = match p.peek() {
                        TokenKind::Ident(name) => name.clone(),
                        _ => return Err(p.unexpected("property name after '.'")),
                    };
                    p.advance();
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(Expr::Str(name)),
                    };
                } else if p.eat(Punct::LBracket) {
                    p.deepen()?;
                    let property = p.expression()?;
                    p.expect(Punct::RBracket, "']'")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(property),
                    };
                } else if p.eat(Punct::LParen) {
                    p.deepen()?;
                    let args = p.arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                } else {
                    return Ok(expr);
                }
            }
        })
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, RevalueError> {
        let mut args = Vec::new();
        while !self.eat(Punct::RParen) {
            args.push(self.expression()?);
            if !self.eat(Punct::Comma) {
                self.expect(Punct::RParen, "',' or ')' in argument list")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, RevalueError> {
        let token = self.peek().clone();
        match token {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Ident(word) => match word.as_str() {
                "true" => {
                    self.advance();
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.advance();
                    Ok(Expr::Null)
                }
                "function" => self.function_expression(),
                _ => Ok(Expr::Ident(self.identifier("expression")?)),
            },
            TokenKind::Punct(Punct::LBracket) => self.nested(Self::array),
            TokenKind::Punct(Punct::LBrace) => self.nested(Self::object),
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect(Punct::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn array(&mut self) -> Result<Expr, RevalueError> {
        self.expect(Punct::LBracket, "'['")?;
        let mut items = Vec::new();
        while !self.eat(Punct::RBracket) {
            items.push(self.expression()?);
            if !self.eat(Punct::Comma) {
                self.expect(Punct::RBracket, "',' or ']' in array literal")?;
                break;
            }
        }
        Ok(Expr::Array(items))
    }

    fn object(&mut self) -> Result<Expr, RevalueError> {
        self.expect(Punct::LBrace, "'{'")?;
        let mut entries = Vec::new();
        while !self.eat(Punct::RBrace) {
            let key_token = self.peek().clone();
            let (key, shorthand) = match key_token {
                TokenKind::Ident(name) => (name, true),
                TokenKind::Str(s) => (s, false),
                TokenKind::Number(n) => (crate::value::format_number(n), false),
                _ => return Err(self.unexpected("property key")),
            };
            self.advance();

            let value = if self.eat(Punct::Colon) {
                self.expression()?
            } else if shorthand && (self.check(Punct::Comma) || self.check(Punct::RBrace)) {
                if RESERVED.contains(&key.as_str()) {
                    return Err(self.unexpected("':' after reserved word key"));
                }
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected("':' after property key"));
            };
            entries.push((key, value));

            if !self.eat(Punct::Comma) {
                self.expect(Punct::RBrace, "',' or '}' in object literal")?;
                break;
            }
        }
        Ok(Expr::Object(entries))
    }

    // ========================================================================
    // FUNCTIONS
    // ========================================================================

    /// Arrow functions: `x => ...` or `(a, b) => ...`
    fn try_arrow(&mut self) -> Result<Option<Expr>, RevalueError> {
        let start = self.current_start();

        let single_param = matches!(
            (self.peek(), self.peek_at(1)),
            (TokenKind::Ident(_), TokenKind::Punct(Punct::Arrow))
        );

        let params = if single_param {
            vec![self.identifier("parameter name")?]
        } else if self.check(Punct::LParen) && self.paren_is_arrow_params() {
            self.advance();
            self.parameters()?
        } else {
            return Ok(None);
        };

        self.expect(Punct::Arrow, "'=>'")?;
        let body = if self.check(Punct::LBrace) {
            FunctionBody::Block(self.block()?)
        } else {
            FunctionBody::Expr(Box::new(self.expression()?))
        };

        Ok(Some(self.finish_function(None, params, body, start)))
    }

    /// Looks past the matching `)` for a `=>`
    fn paren_is_arrow_params(&self) -> bool {
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
            match token.kind {
                TokenKind::Punct(Punct::LParen) => depth += 1,
                TokenKind::Punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.peek_at(offset + 1),
                            TokenKind::Punct(Punct::Arrow)
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    /// Parameter list after `(`, consuming the closing `)`
    fn parameters(&mut self) -> Result<Vec<String>, RevalueError> {
        let mut params = Vec::new();
        while !self.eat(Punct::RParen) {
            params.push(self.identifier("parameter name")?);
            if !self.eat(Punct::Comma) {
                self.expect(Punct::RParen, "',' or ')' in parameter list")?;
                break;
            }
        }
        Ok(params)
    }

    fn function_expression(&mut self) -> Result<Expr, RevalueError> {
        let start = self.current_start();
        self.advance(); // 'function'
        let name = if matches!(self.peek(), TokenKind::Ident(_)) {
            Some(self.identifier("function name")?)
        } else {
            None
        };
        self.expect(Punct::LParen, "'(' after function")?;
        let params = self.parameters()?;
        let body = FunctionBody::Block(self.block()?);
        Ok(self.finish_function(name, params, body, start))
    }

    fn finish_function(
        &self,
        name: Option<String>,
        params: Vec<String>,
        body: FunctionBody,
        start: usize,
    ) -> Expr {
        let source = self.source[start..self.previous_end()].to_string();
        Expr::Function(Arc::new(FunctionDef {
            name,
            params,
            body,
            source,
        }))
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    fn block(&mut self) -> Result<Vec<Stmt>, RevalueError> {
        self.nested(|p| {
            p.expect(Punct::LBrace, "'{'")?;
            let mut stmts = Vec::new();
            while !p.eat(Punct::RBrace) {
                if p.at_eof() {
                    return Err(p.unexpected("'}'"));
                }
                stmts.push(p.statement()?);
            }
            Ok(stmts)
        })
    }

    fn statement(&mut self) -> Result<Stmt, RevalueError> {
        if self.eat(Punct::Semicolon) {
            return Ok(Stmt::Block(Vec::new()));
        }

        if self.check(Punct::LBrace) {
            return Ok(Stmt::Block(self.block()?));
        }

        if self.eat_word("let") || self.eat_word("const") || self.eat_word("var") {
            let name = self.identifier("variable name")?;
            let init = if self.eat(Punct::Assign) {
                Some(self.expression()?)
            } else {
                None
            };
            self.eat(Punct::Semicolon);
            return Ok(Stmt::Let { name, init });
        }

        if self.eat_word("return") {
            let value = if self.check(Punct::Semicolon) || self.check(Punct::RBrace) {
                None
            } else {
                Some(self.expression()?)
            };
            self.eat(Punct::Semicolon);
            return Ok(Stmt::Return(value));
        }

        if self.eat_word("if") {
            self.expect(Punct::LParen, "'(' after if")?;
            let test = self.expression()?;
            self.expect(Punct::RParen, "')'")?;
            let consequent = Box::new(self.nested(Self::statement)?);
            let alternate = if self.eat_word("else") {
                Some(Box::new(self.nested(Self::statement)?))
            } else {
                None
            };
            return Ok(Stmt::If {
                test,
                consequent,
                alternate,
            });
        }

        // Function declaration: bind the name in the enclosing block
        if self.check_word("function") && matches!(self.peek_at(1), TokenKind::Ident(_)) {
            let function = self.function_expression()?;
            if let Expr::Function(def) = &function {
                if let Some(name) = def.name.clone() {
                    return Ok(Stmt::Let {
                        name,
                        init: Some(function),
                    });
                }
            }
            return Ok(Stmt::Expr(function));
        }

        let expr = self.expression()?;
        self.eat(Punct::Semicolon);
        Ok(Stmt::Expr(expr))
    }
}
