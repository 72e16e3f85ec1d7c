use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;
use tinybasic_common::{FileId, LineNumber, Span, SymbolTable};
use tinybasic_parser::ast::*;

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct SemaError {
    pub span: Span,
    pub message: String,
}

/// Result of semantic analysis.
#[derive(Debug)]
pub struct SemaResult {
    /// Every variable the program assigns, declared and unset.
    pub symbols: SymbolTable,
    pub has_gosub: bool,
    pub errors: Vec<SemaError>,
    pub warnings: Vec<SemaError>,
}

impl SemaResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn to_diagnostics(&self, file_id: FileId) -> Vec<Diagnostic<FileId>> {
        let errors = self.errors.iter().map(|e| (Diagnostic::error(), e));
        let warnings = self.warnings.iter().map(|w| (Diagnostic::warning(), w));
        errors
            .chain(warnings)
            .map(|(diagnostic, e)| {
                diagnostic.with_message(&e.message).with_labels(vec![
                    Label::primary(file_id, e.span.to_range()).with_message(&e.message),
                ])
            })
            .collect()
    }
}

pub struct SemanticAnalyzer<'a> {
    program: &'a Program,
    symbols: SymbolTable,
    has_gosub: bool,
    returns: Vec<Span>,
    errors: Vec<SemaError>,
    warnings: Vec<SemaError>,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            symbols: SymbolTable::new(),
            has_gosub: false,
            returns: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn analyze(mut self) -> SemaResult {
        // Pass 1: declare every LET / INPUT target
        for name in self.program.assigned_variables() {
            self.symbols.declare(name);
        }

        // Pass 2: check statements
        for line in self.program.iter() {
            self.check_statement(&line.statement);
        }

        // Pass 3: a RETURN no GOSUB can reach always fails at run time
        if !self.has_gosub {
            for span in std::mem::take(&mut self.returns) {
                self.warnings.push(SemaError {
                    span,
                    message: "RETURN in a program without GOSUB".to_string(),
                });
            }
        }

        SemaResult {
            symbols: self.symbols,
            has_gosub: self.has_gosub,
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Let { expr, .. } => self.check_expr(expr),
            Statement::Print { expr, .. } => {
                if let Some(expr) = expr {
                    self.check_expr(expr);
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(condition);
                self.check_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_statement(else_branch);
                }
            }
            Statement::Goto { target, .. } => {
                self.check_expr(target);
                self.check_line_target(target);
            }
            Statement::Gosub { target, .. } => {
                self.has_gosub = true;
                self.check_expr(target);
                self.check_line_target(target);
            }
            Statement::Return { span } => self.returns.push(*span),
            Statement::Input { .. } | Statement::End { .. } => {}
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Identifier { name, span } => {
                if !self.symbols.contains(name) {
                    self.errors.push(SemaError {
                        span: *span,
                        message: format!("undefined identifier: {name} is never assigned"),
                    });
                }
            }
            Expr::NumberLiteral { .. } | Expr::StringLiteral { .. } => {}
            Expr::Arithmetic { left, right, .. } | Expr::Comparison { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }
        }
    }

    /// Validate a constant jump target. Computed targets are only known at
    /// run time and are not checked.
    fn check_line_target(&mut self, target: &Expr) {
        let Some(value) = target.constant_number() else {
            return;
        };
        let exists = (value >= 0.0 && value <= LineNumber::MAX as f64)
            && self.program.get(value.trunc() as LineNumber).is_some();
        if !exists {
            self.errors.push(SemaError {
                span: target.span(),
                message: format!("undefined line: {value}"),
            });
        }
    }
}

pub fn analyze(program: &Program) -> SemaResult {
    SemanticAnalyzer::new(program).analyze()
}
