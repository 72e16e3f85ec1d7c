use std::collections::BTreeMap;
use std::ops::Bound;

use tinybasic_common::{LineNumber, Span};

pub use tinybasic_common::{ArithOp, RelOp};

/// A TinyBasic program: numbered lines kept in ascending order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub lines: BTreeMap<LineNumber, Line>,
}

/// One numbered program line holding a single statement.
#[derive(Debug, Clone)]
pub struct Line {
    pub number: LineNumber,
    pub statement: Statement,
    pub span: Span,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn get(&self, number: LineNumber) -> Option<&Line> {
        self.lines.get(&number)
    }

    pub fn first_line(&self) -> Option<LineNumber> {
        self.lines.keys().next().copied()
    }

    /// The first declared line strictly after `number`.
    pub fn next_line(&self, number: LineNumber) -> Option<LineNumber> {
        self.lines
            .range((Bound::Excluded(number), Bound::Unbounded))
            .next()
            .map(|(n, _)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    /// Names written by LET or INPUT anywhere in the program, in order of
    /// first appearance.
    pub fn assigned_variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for line in self.lines.values() {
            line.statement.collect_assigned(&mut names);
        }
        names
    }
}

// ── Statements ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Statement {
    /// [LET] var = expr
    Let {
        name: String,
        expr: Expr,
        span: Span,
    },
    /// PRINT [expr]
    Print {
        expr: Option<Expr>,
        span: Span,
    },
    /// IF cond THEN stmt [ELSE stmt]
    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        span: Span,
    },
    /// GOTO expr
    Goto {
        target: Expr,
        span: Span,
    },
    /// GOSUB expr
    Gosub {
        target: Expr,
        span: Span,
    },
    Return {
        span: Span,
    },
    /// INPUT var, var, ...
    Input {
        names: Vec<String>,
        span: Span,
    },
    End {
        span: Span,
    },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Let { span, .. }
            | Statement::Print { span, .. }
            | Statement::If { span, .. }
            | Statement::Goto { span, .. }
            | Statement::Gosub { span, .. }
            | Statement::Return { span }
            | Statement::Input { span, .. }
            | Statement::End { span } => *span,
        }
    }

    /// Keyword name, used in logs and diagnostics.
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Let { .. } => "LET",
            Statement::Print { .. } => "PRINT",
            Statement::If { .. } => "IF",
            Statement::Goto { .. } => "GOTO",
            Statement::Gosub { .. } => "GOSUB",
            Statement::Return { .. } => "RETURN",
            Statement::Input { .. } => "INPUT",
            Statement::End { .. } => "END",
        }
    }

    fn collect_assigned<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Statement::Let { name, .. } => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Statement::Input { names: vars, .. } => {
                for name in vars {
                    if !names.contains(&name.as_str()) {
                        names.push(name);
                    }
                }
            }
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.collect_assigned(names);
                if let Some(else_branch) = else_branch {
                    else_branch.collect_assigned(names);
                }
            }
            _ => {}
        }
    }
}

// ── Expressions ─────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier {
        name: String,
        span: Span,
    },
    NumberLiteral {
        value: f64,
        span: Span,
    },
    StringLiteral {
        value: String,
        span: Span,
    },
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Comparison {
        op: RelOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier { span, .. }
            | Expr::NumberLiteral { span, .. }
            | Expr::StringLiteral { span, .. }
            | Expr::Arithmetic { span, .. }
            | Expr::Comparison { span, .. } => *span,
        }
    }

    /// Value of a numeric literal, e.g. a constant GOTO/GOSUB target.
    pub fn constant_number(&self) -> Option<f64> {
        match self {
            Expr::NumberLiteral { value, .. } => Some(*value),
            _ => None,
        }
    }
}
