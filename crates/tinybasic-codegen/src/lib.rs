//! Lowering of the TinyBasic AST into flat three-address code.
//!
//! Expressions lower to an operand name: a variable, a numeric immediate or
//! a fresh temporary `t<N>`. Statements append instructions to the unit and
//! synthesize `L<N>` labels for IF/ELSE. GOTO and GOSUB keep their TinyBasic
//! line targets as operands; resolving them against [`ThreeAddressCode::line_mapping`]
//! is left to whatever assembles the listing.

pub mod ir;

use std::collections::BTreeMap;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;
use tinybasic_common::{FileId, LineNumber, Span, SymbolTable, Value};
use tinybasic_parser::ast::*;
use tracing::{debug, trace};

pub use ir::{Instruction, Opcode};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LowerError {
    #[error("undefined identifier: {name}")]
    UndefinedIdentifier { name: String, span: Span },
    #[error("INPUT needs at least one variable")]
    EmptyInput { span: Span },
}

impl LowerError {
    pub fn span(&self) -> Span {
        match self {
            LowerError::UndefinedIdentifier { span, .. } | LowerError::EmptyInput { span } => *span,
        }
    }

    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(vec![Label::primary(file_id, self.span().to_range())])
    }
}

pub type LowerResult<T> = Result<T, LowerError>;

/// A lowering unit: the instruction list plus the state needed to keep
/// temporaries and labels unique. Counters are never reset, so lowering
/// more code into the same unit keeps producing fresh names.
#[derive(Debug, Clone)]
pub struct ThreeAddressCode {
    instructions: Vec<Instruction>,
    symbols: SymbolTable,
    temp_counter: usize,
    label_counter: usize,
    line_map: BTreeMap<LineNumber, usize>,
}

impl ThreeAddressCode {
    /// Start a unit over `symbols`, which must already declare every
    /// variable the lowered code reads.
    pub fn new(symbols: SymbolTable) -> Self {
        Self {
            instructions: Vec::new(),
            symbols,
            temp_counter: 0,
            label_counter: 0,
            line_map: BTreeMap::new(),
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// TinyBasic line -> index of its first instruction.
    pub fn line_mapping(&self) -> &BTreeMap<LineNumber, usize> {
        &self.line_map
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn new_temp(&mut self) -> String {
        let name = format!("t{}", self.temp_counter);
        self.temp_counter += 1;
        self.symbols.declare(&name);
        name
    }

    pub fn new_label(&mut self) -> String {
        let name = format!("L{}", self.label_counter);
        self.label_counter += 1;
        name
    }

    /// Append `instr`, returning its index.
    pub fn emit(&mut self, instr: Instruction) -> usize {
        trace!(index = self.instructions.len(), "{instr}");
        self.instructions.push(instr);
        self.instructions.len() - 1
    }

    /// Record that `line` starts at the next instruction to be emitted.
    pub fn map_line(&mut self, line: LineNumber) {
        self.line_map.insert(line, self.instructions.len());
    }

    pub fn lower_program(&mut self, program: &Program) -> LowerResult<()> {
        for line in program.iter() {
            self.map_line(line.number);
            debug!(line = line.number, index = self.instructions.len(), "lowering line");
            self.lower_statement(&line.statement)?;
        }
        Ok(())
    }

    // ── Statements ──────────────────────────────────────────

    pub fn lower_statement(&mut self, stmt: &Statement) -> LowerResult<()> {
        match stmt {
            Statement::Let { name, expr, .. } => {
                let value = self.lower_expr(expr)?;
                self.symbols.declare(name);
                self.emit(
                    Instruction::new(Opcode::Assign)
                        .operand1(&value)
                        .result(name)
                        .comment(format!("assign {value} to {name}")),
                );
            }
            Statement::Print { expr: None, .. } => {
                self.emit(Instruction::new(Opcode::Print).comment("print a blank line"));
            }
            Statement::Print {
                expr: Some(expr), ..
            } => {
                let value = self.lower_expr(expr)?;
                self.emit(
                    Instruction::new(Opcode::Print)
                        .operand1(&value)
                        .comment(format!("print {value}")),
                );
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.lower_expr(condition)?;
                // labels are numbered then, end, else; THEN is never a jump target
                let _then_label = self.new_label();
                let end_label = self.new_label();
                let else_label = else_branch.as_ref().map(|_| self.new_label());

                let (target, comment) = match &else_label {
                    Some(label) => (label.clone(), "skip to ELSE when false"),
                    None => (end_label.clone(), "skip the THEN branch when false"),
                };
                self.emit(
                    Instruction::new(Opcode::IfFalse)
                        .operand1(cond)
                        .label(target)
                        .comment(comment),
                );
                self.lower_statement(then_branch)?;

                if let (Some(else_branch), Some(else_label)) = (else_branch, else_label) {
                    self.emit(
                        Instruction::new(Opcode::Goto)
                            .label(&end_label)
                            .comment("jump over ELSE"),
                    );
                    self.emit(
                        Instruction::new(Opcode::Label)
                            .operand1(else_label)
                            .comment("ELSE branch"),
                    );
                    self.lower_statement(else_branch)?;
                }
                self.emit(
                    Instruction::new(Opcode::Label)
                        .operand1(end_label)
                        .comment("end of IF"),
                );
            }
            Statement::Goto { target, .. } => {
                let line = self.lower_expr(target)?;
                self.emit(
                    Instruction::new(Opcode::Goto)
                        .operand1(&line)
                        .comment(format!("jump to line {line}")),
                );
            }
            Statement::Gosub { target, .. } => {
                let line = self.lower_expr(target)?;
                self.emit(
                    Instruction::new(Opcode::Gosub)
                        .operand1(&line)
                        .comment(format!("call subroutine at line {line}")),
                );
            }
            Statement::Return { .. } => {
                self.emit(Instruction::new(Opcode::Return).comment("return to caller"));
            }
            Statement::Input { names, span } => {
                if names.is_empty() {
                    return Err(LowerError::EmptyInput { span: *span });
                }
                for name in names {
                    self.symbols.declare(name);
                    self.emit(
                        Instruction::new(Opcode::Input)
                            .result(name)
                            .comment(format!("read {name}")),
                    );
                }
            }
            Statement::End { .. } => {
                self.emit(Instruction::new(Opcode::End).comment("end of program"));
            }
        }
        Ok(())
    }

    // ── Expressions ─────────────────────────────────────────

    /// Lower `expr` and return the operand holding its value.
    pub fn lower_expr(&mut self, expr: &Expr) -> LowerResult<String> {
        match expr {
            Expr::Identifier { name, span } => {
                if !self.symbols.contains(name) {
                    return Err(LowerError::UndefinedIdentifier {
                        name: name.clone(),
                        span: *span,
                    });
                }
                Ok(name.clone())
            }
            Expr::NumberLiteral { value, .. } => Ok(Value::Number(*value).to_string()),
            Expr::StringLiteral { value, .. } => {
                let temp = self.new_temp();
                self.emit(
                    Instruction::new(Opcode::Assign)
                        .operand1(quote(value))
                        .result(&temp)
                        .comment(format!("string literal into {temp}")),
                );
                Ok(temp)
            }
            Expr::Arithmetic {
                op, left, right, ..
            } => {
                let lhs = self.lower_expr(left)?;
                let rhs = self.lower_expr(right)?;
                let temp = self.new_temp();
                self.emit(
                    Instruction::new(Opcode::from(*op))
                        .operand1(&lhs)
                        .operand2(&rhs)
                        .result(&temp)
                        .comment(format!("compute {lhs} {op} {rhs}")),
                );
                Ok(temp)
            }
            Expr::Comparison {
                op, left, right, ..
            } => {
                let lhs = self.lower_expr(left)?;
                let rhs = self.lower_expr(right)?;
                let temp = self.new_temp();
                self.emit(
                    Instruction::new(Opcode::from(*op))
                        .operand1(&lhs)
                        .operand2(&rhs)
                        .result(&temp)
                        .comment(format!("compare {lhs} {op} {rhs}")),
                );
                Ok(temp)
            }
        }
    }

    // ── Listing ─────────────────────────────────────────────

    /// Human-readable listing: one instruction per line, each TinyBasic line
    /// introduced by a `; line N` marker.
    pub fn listing(&self) -> String {
        let starts: BTreeMap<usize, LineNumber> =
            self.line_map.iter().map(|(line, index)| (*index, *line)).collect();
        let mut out = String::new();
        for (index, instr) in self.instructions.iter().enumerate() {
            if let Some(line) = starts.get(&index) {
                out.push_str(&format!("; line {line}\n"));
            }
            match &instr.comment {
                Some(comment) => out.push_str(&format!("{index:04}  {instr}  ; {comment}\n")),
                None => out.push_str(&format!("{index:04}  {instr}\n")),
            }
        }
        out
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Lower a whole program into a fresh unit over `symbols`.
pub fn lower(program: &Program, symbols: SymbolTable) -> LowerResult<ThreeAddressCode> {
    let mut tac = ThreeAddressCode::new(symbols);
    tac.lower_program(program)?;
    Ok(tac)
}
