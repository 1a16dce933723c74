//! Recursive-descent parser producing the expression AST.

use super::lexer::{Token, TokenKind};
use super::{ExprError, MAX_DEPTH};

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `first op1 e1 op2 e2 ...`; true when every adjacent pair holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub(crate) fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Negate(inner) => inner.collect_variables(out),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Expr::Compare { first, rest } => {
                first.collect_variables(out);
                for (_, operand) in rest {
                    operand.collect_variables(out);
                }
            }
        }
    }
}

// =============================================================================
// Parser
// =============================================================================

pub(crate) fn parse(tokens: &[Token], source_len: usize) -> Result<Expr, ExprError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        source_len,
    };

    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExprError::invalid(format!(
            "unexpected {} at offset {}",
            token.kind.describe(),
            token.offset
        ))),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    source_len: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self, offset: usize) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::invalid(format!(
                "nesting deeper than {} at offset {}",
                MAX_DEPTH, offset
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and_expr()?;
        while self.peek_kind() == Some(&TokenKind::Or) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.comparison()?;
        while self.peek_kind() == Some(&TokenKind::And) {
            self.advance();
            let right = self.comparison()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let first = self.additive()?;
        let mut rest = Vec::new();

        while let Some(op) = self.peek_kind().and_then(compare_op) {
            self.advance();
            rest.push((op, self.additive()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if let Some(token) = self.peek() {
            if token.kind == TokenKind::Minus {
                self.advance();
                self.enter(token.offset)?;
                let operand = self.unary()?;
                self.leave();
                return Ok(Expr::Negate(Box::new(operand)));
            }
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::invalid(format!(
                "unexpected end of expression at offset {}",
                self.source_len
            )));
        };

        match &token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(*n)),
            TokenKind::Ident(name) => Ok(Expr::Variable(name.clone())),
            TokenKind::LParen => {
                self.enter(token.offset)?;
                let inner = self.or_expr()?;
                self.leave();
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(ExprError::invalid(format!(
                        "expected ')' but found {} at offset {}",
                        other.kind.describe(),
                        other.offset
                    ))),
                    None => Err(ExprError::invalid(format!(
                        "unclosed '(' opened at offset {}",
                        token.offset
                    ))),
                }
            }
            other => Err(ExprError::invalid(format!(
                "unexpected {} at offset {}",
                other.describe(),
                token.offset
            ))),
        }
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Lt => Some(CompareOp::Lt),
        TokenKind::Le => Some(CompareOp::Le),
        TokenKind::Gt => Some(CompareOp::Gt),
        TokenKind::Ge => Some(CompareOp::Ge),
        TokenKind::EqEq => Some(CompareOp::Eq),
        TokenKind::NotEq => Some(CompareOp::Ne),
        _ => None,
    }
}
