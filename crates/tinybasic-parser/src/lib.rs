pub mod ast;

use ast::*;
use tinybasic_common::{LineNumber, Span};
use tinybasic_lexer::{Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Infix operator found while parsing an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Infix {
    Arith(ArithOp),
    Rel(RelOp),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete TinyBasic program: one numbered statement per line.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut program = Program::new();

        self.skip_blank_lines();

        while !self.at_end() {
            let line = self.parse_line()?;
            if program.lines.contains_key(&line.number) {
                return Err(ParseError {
                    span: line.span,
                    message: format!("duplicate line number {}", line.number),
                });
            }
            program.lines.insert(line.number, line);
            self.skip_blank_lines();
        }

        Ok(program)
    }

    fn parse_line(&mut self) -> ParseResult<Line> {
        let start = self.current_span();
        let number = self.expect_line_number()?;
        let statement = self.parse_statement()?;
        let span = start.merge(self.prev_span());

        if !self.at_newline() {
            return Err(self.error(&format!(
                "expected end of line, found {}",
                self.describe_current()
            )));
        }
        self.eat_newline();

        Ok(Line {
            number,
            statement,
            span,
        })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Let) => {
                self.advance();
                self.parse_assignment()
            }
            // Implicit LET: `A = 1`
            Some(TokenKind::Ident(_)) => self.parse_assignment(),
            Some(TokenKind::Print) => self.parse_print(),
            Some(TokenKind::If) => self.parse_if(),
            Some(TokenKind::Goto) => self.parse_goto(),
            Some(TokenKind::Gosub) => self.parse_gosub(),
            Some(TokenKind::Return) => {
                let span = self.current_span();
                self.advance();
                Ok(Statement::Return { span })
            }
            Some(TokenKind::Input) => self.parse_input(),
            Some(TokenKind::End) => {
                let span = self.current_span();
                self.advance();
                Ok(Statement::End { span })
            }
            _ => Err(self.error(&format!(
                "expected statement, found {}",
                self.describe_current()
            ))),
        }
    }

    fn parse_assignment(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        let name = self.expect_ident_name()?;
        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        Ok(Statement::Let {
            name,
            span: start.merge(expr.span()),
            expr,
        })
    }

    fn parse_print(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.advance(); // PRINT
        // PRINT with nothing after it prints a blank line
        let expr = if self.at_newline() || self.check(TokenKind::Else) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        Ok(Statement::Print {
            expr,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.advance(); // IF
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Then)?;
        let then_branch = Box::new(self.parse_branch()?);
        let else_branch = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_branch()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            span: start.merge(self.prev_span()),
        })
    }

    /// Body of THEN / ELSE: a statement, or a bare line number meaning GOTO.
    fn parse_branch(&mut self) -> ParseResult<Statement> {
        if let Some(TokenKind::Number(value)) = self.peek_kind().cloned() {
            let span = self.current_span();
            self.advance();
            return Ok(Statement::Goto {
                target: Expr::NumberLiteral { value, span },
                span,
            });
        }
        self.parse_statement()
    }

    fn parse_goto(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.advance(); // GOTO
        let target = self.parse_expr()?;
        Ok(Statement::Goto {
            span: start.merge(target.span()),
            target,
        })
    }

    fn parse_gosub(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.advance(); // GOSUB
        let target = self.parse_expr()?;
        Ok(Statement::Gosub {
            span: start.merge(target.span()),
            target,
        })
    }

    fn parse_input(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.advance(); // INPUT
        let mut names = vec![self.expect_ident_name()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect_ident_name()?);
        }
        Ok(Statement::Input {
            names,
            span: start.merge(self.prev_span()),
        })
    }

    // ── Expression parsing (Pratt / precedence climbing) ────

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(op) = self.peek_infix() else { break };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.advance(); // consume operator
            let rhs = self.parse_expr_bp(r_bp)?;
            let span = lhs.span().merge(rhs.span());
            let left = Box::new(lhs);
            let right = Box::new(rhs);
            lhs = match op {
                Infix::Arith(op) => Expr::Arithmetic {
                    op,
                    left,
                    right,
                    span,
                },
                Infix::Rel(op) => Expr::Comparison {
                    op,
                    left,
                    right,
                    span,
                },
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Minus) => {
                let start = self.current_span();
                self.advance();
                let operand = self.parse_expr_bp(prefix_bp())?;
                let span = start.merge(operand.span());
                // -x is 0 - x; negative literals are folded
                Ok(match operand {
                    Expr::NumberLiteral { value, .. } => Expr::NumberLiteral {
                        value: -value,
                        span,
                    },
                    operand => Expr::Arithmetic {
                        op: ArithOp::Sub,
                        left: Box::new(Expr::NumberLiteral {
                            value: 0.0,
                            span: start,
                        }),
                        right: Box::new(operand),
                        span,
                    },
                })
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();
        match self.peek_kind().cloned() {
            Some(TokenKind::Number(value)) => {
                self.advance();
                Ok(Expr::NumberLiteral { value, span })
            }
            Some(TokenKind::StringLiteral(value)) => {
                self.advance();
                Ok(Expr::StringLiteral { value, span })
            }
            Some(TokenKind::Ident(name)) => {
                self.advance();
                Ok(Expr::Identifier { name, span })
            }
            _ => Err(self.error(&format!(
                "expected expression, found {}",
                self.describe_current()
            ))),
        }
    }

    fn peek_infix(&self) -> Option<Infix> {
        match self.peek_kind()? {
            TokenKind::Plus => Some(Infix::Arith(ArithOp::Add)),
            TokenKind::Minus => Some(Infix::Arith(ArithOp::Sub)),
            TokenKind::Star => Some(Infix::Arith(ArithOp::Mul)),
            TokenKind::Slash => Some(Infix::Arith(ArithOp::Div)),
            TokenKind::Eq => Some(Infix::Rel(RelOp::Eq)),
            TokenKind::Neq => Some(Infix::Rel(RelOp::Ne)),
            TokenKind::Lt => Some(Infix::Rel(RelOp::Lt)),
            TokenKind::Le => Some(Infix::Rel(RelOp::Le)),
            TokenKind::Gt => Some(Infix::Rel(RelOp::Gt)),
            TokenKind::Ge => Some(Infix::Rel(RelOp::Ge)),
            _ => None,
        }
    }

    // ── Token helpers ─────────────────────────────────────

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => t.span,
            None => {
                let end = self.prev_span().end;
                Span::new(end, end)
            }
        }
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::new(0, 0)
        }
    }

    fn describe_current(&self) -> String {
        self.peek_kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "end of file".to_string())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_newline(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Newline) | None)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind().map_or(false, |k| {
            std::mem::discriminant(k) == std::mem::discriminant(&kind)
        })
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.check(kind.clone()) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected {kind}, found {}",
                self.describe_current()
            )))
        }
    }

    fn expect_ident_name(&mut self) -> ParseResult<String> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Ident(name)) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(&format!(
                "expected identifier, found {}",
                self.describe_current()
            ))),
        }
    }

    fn expect_line_number(&mut self) -> ParseResult<LineNumber> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Number(value)) => {
                if value.fract() != 0.0 || value > LineNumber::MAX as f64 {
                    return Err(self.error(&format!("invalid line number {value}")));
                }
                self.advance();
                Ok(value as LineNumber)
            }
            _ => Err(self.error(&format!(
                "expected line number, found {}",
                self.describe_current()
            ))),
        }
    }

    fn eat_newline(&mut self) {
        while matches!(self.peek_kind(), Some(TokenKind::Newline)) {
            self.advance();
        }
    }

    fn skip_blank_lines(&mut self) {
        self.eat_newline();
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            span: self.current_span(),
            message: message.to_string(),
        }
    }
}

/// Binding power for infix operators.
fn infix_binding_power(op: Infix) -> (u8, u8) {
    match op {
        Infix::Rel(_) => (1, 2),
        Infix::Arith(ArithOp::Add | ArithOp::Sub) => (3, 4),
        Infix::Arith(ArithOp::Mul | ArithOp::Div) => (5, 6),
    }
}

fn prefix_bp() -> u8 {
    7
}

/// Convenience function: parse source tokens into an AST.
pub fn parse(tokens: Vec<Token>) -> ParseResult<Program> {
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}
