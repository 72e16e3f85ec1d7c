//! Tree-walking interpreter for TinyBasic programs.
//!
//! The interpreter walks the line-indexed AST directly. Control flow is
//! driven by the [`Flow`] each statement returns: plain statements advance
//! the current frame to the next declared line, GOTO rewrites the frame's
//! line, GOSUB pushes a child frame and RETURN pops back to the caller.

pub mod context;
pub mod error;

use std::io::{BufRead, Write};

use tinybasic_common::{LineNumber, Span, SymbolTable, Value};
use tinybasic_parser::ast::*;
use tracing::{debug, info, trace, warn};

pub use context::{CallStack, Frame, FrameId};
pub use error::{RuntimeError, RuntimeErrorKind, Warning, WarningKind};

pub type ExecResult<T> = Result<T, RuntimeErrorKind>;

/// What the driver loop does after a statement has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Advance the current frame to the next declared line.
    Continue,
    /// GOTO: the current frame already points at the target.
    Jump,
    /// GOSUB: a child frame was pushed at the target.
    Call,
    /// RETURN: the parent frame was resumed and must move past its GOSUB.
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    Running,
    #[default]
    Exited,
}

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Written before every value read by INPUT.
    pub prompt: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            prompt: "? ".to_string(),
        }
    }
}

pub struct Interpreter<R, W> {
    config: InterpreterConfig,
    input: R,
    output: W,
    symbols: SymbolTable,
    stack: CallStack,
    state: RunState,
    warnings: Vec<Warning>,
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self::with_config(input, output, InterpreterConfig::default())
    }

    pub fn with_config(input: R, output: W, config: InterpreterConfig) -> Self {
        Self {
            config,
            input,
            output,
            symbols: SymbolTable::new(),
            stack: CallStack::new(0),
            state: RunState::default(),
            warnings: Vec::new(),
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Stop the run after the current statement.
    pub fn end(&mut self) {
        self.state = RunState::Exited;
    }

    /// Run `program` from its first line until END, the last line, or a
    /// failure.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let first = program.first_line().ok_or(RuntimeError {
            kind: RuntimeErrorKind::NothingToRun,
            line: None,
            span: None,
        })?;

        self.symbols.clear();
        for name in program.assigned_variables() {
            self.symbols.declare(name);
        }
        self.warnings.clear();
        self.stack = CallStack::new(i64::from(first));
        self.state = RunState::Running;
        info!(lines = program.len(), "run started");

        while self.state == RunState::Running {
            let current = self.stack.current().current_line;
            let line = LineNumber::try_from(current)
                .ok()
                .and_then(|n| program.get(n))
                .ok_or(RuntimeError {
                    kind: RuntimeErrorKind::ProgramError(current),
                    line: Some(current),
                    span: None,
                })?;

            trace!(line = current, stmt = line.statement.keyword(), "execute");
            let flow = self
                .execute(&line.statement)
                .map_err(|kind| RuntimeError {
                    kind,
                    line: Some(current),
                    span: Some(line.statement.span()),
                })?;

            if self.state == RunState::Exited {
                break;
            }

            let from = match flow {
                Flow::Jump | Flow::Call => continue,
                Flow::Continue => line.number,
                // The resumed frame still points at its GOSUB line.
                Flow::Return => match LineNumber::try_from(self.stack.current().current_line) {
                    Ok(gosub_line) => gosub_line,
                    Err(_) => break,
                },
            };
            match program.next_line(from) {
                Some(next) => self.stack.current_mut().current_line = i64::from(next),
                None => {
                    debug!(line = from, "fell off the end of the program");
                    self.end();
                }
            }
        }

        self.output.flush().map_err(|e| RuntimeError {
            kind: e.into(),
            line: None,
            span: None,
        })?;
        info!(warnings = self.warnings.len(), "run finished");
        Ok(())
    }

    /// Execute one statement against the current frame.
    pub fn execute(&mut self, stmt: &Statement) -> ExecResult<Flow> {
        match stmt {
            Statement::Let { name, expr, .. } => {
                let value = self.evaluate(expr)?;
                self.symbols.set(name, value);
                Ok(Flow::Continue)
            }
            Statement::Print { expr, span } => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::String(String::new()),
                };
                if !value.is_set() {
                    self.warn(WarningKind::UnsetValue, *span, "PRINT of an unset value");
                }
                writeln!(self.output, "{value}")?;
                Ok(Flow::Continue)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                span,
            } => {
                let value = self.evaluate(condition)?;
                if !value.is_set() {
                    self.warn(WarningKind::UnsetValue, *span, "IF condition is unset");
                } else if value.as_bool().is_none() {
                    let message = format!("IF condition is a {}, not a boolean", value.type_name());
                    self.warn(WarningKind::UnsetValue, *span, message);
                }
                if value.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Continue)
                }
            }
            Statement::Goto { target, .. } => {
                let line = self.line_target(target)?;
                if line < 0 {
                    return Err(RuntimeErrorKind::LineNotFound(line));
                }
                debug!(from = self.stack.current().current_line, to = line, "GOTO");
                self.stack.current_mut().current_line = line;
                Ok(Flow::Jump)
            }
            Statement::Gosub { target, span } => {
                let line = self.line_target(target)?;
                if line < 0 {
                    self.warn(
                        WarningKind::NegativeLine,
                        *span,
                        format!("GOSUB to negative line {line}"),
                    );
                }
                let frame = self.stack.call(line);
                debug!(to = line, depth = self.stack.depth(), frame = frame.index(), "GOSUB");
                Ok(Flow::Call)
            }
            Statement::Return { .. } => {
                let parent = self.stack.ret().ok_or(RuntimeErrorKind::ReturnOutsideSub)?;
                debug!(
                    resume = self.stack.current().current_line,
                    frame = parent.index(),
                    "RETURN"
                );
                Ok(Flow::Return)
            }
            Statement::Input { names, .. } => {
                for name in names {
                    let value = self.read_value()?;
                    self.symbols.set(name, value);
                }
                Ok(Flow::Continue)
            }
            Statement::End { .. } => {
                debug!(line = self.stack.current().current_line, "END");
                self.end();
                Ok(Flow::Continue)
            }
        }
    }

    pub fn evaluate(&self, expr: &Expr) -> ExecResult<Value> {
        match expr {
            Expr::Identifier { name, .. } => self
                .symbols
                .get(name)
                .map(|slot| slot.value.clone())
                .ok_or_else(|| RuntimeErrorKind::UndefinedIdentifier(name.clone())),
            Expr::NumberLiteral { value, .. } => Ok(Value::Number(*value)),
            Expr::StringLiteral { value, .. } => Ok(Value::String(value.clone())),
            Expr::Arithmetic {
                op, left, right, ..
            } => {
                let lhs = self.evaluate(left)?;
                let rhs = self.evaluate(right)?;
                Ok(lhs.arithmetic(*op, &rhs)?)
            }
            Expr::Comparison {
                op, left, right, ..
            } => {
                let lhs = self.evaluate(left)?;
                let rhs = self.evaluate(right)?;
                Ok(lhs.compare(*op, &rhs)?)
            }
        }
    }

    /// Evaluate a GOTO/GOSUB target, truncating any fractional part.
    fn line_target(&self, target: &Expr) -> ExecResult<i64> {
        let value = self.evaluate(target)?;
        value.as_number().map(|n| n.trunc() as i64).ok_or_else(|| {
            RuntimeErrorKind::ExpectingNumber(format!(
                "line number must be a number, found {}",
                value.type_name()
            ))
        })
    }

    fn read_value(&mut self) -> ExecResult<Value> {
        write!(self.output, "{}", self.config.prompt)?;
        self.output.flush()?;
        let mut buf = String::new();
        match self.input.read_line(&mut buf) {
            Ok(0) => Err(RuntimeErrorKind::InputError("unexpected end of input".to_string())),
            Ok(_) => Ok(Value::from_input(&buf)),
            Err(e) => Err(RuntimeErrorKind::InputError(e.to_string())),
        }
    }

    fn warn(&mut self, kind: WarningKind, span: Span, message: impl Into<String>) {
        let line = self.stack.current().current_line;
        let message = message.into();
        warn!(line, "{message}");
        self.warnings.push(Warning {
            kind,
            line,
            span,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinybasic_lexer::tokenize;
    use tinybasic_parser::parse;

    struct Outcome {
        result: Result<(), RuntimeError>,
        output: String,
        warnings: Vec<Warning>,
        symbols: SymbolTable,
    }

    fn parse_str(source: &str) -> Program {
        let tokens = tokenize(source).expect("lex error");
        parse(tokens).expect("parse error")
    }

    fn run_with_input(source: &str, input: &str) -> Outcome {
        let program = parse_str(source);
        let mut interp = Interpreter::new(input.as_bytes(), Vec::new());
        let result = interp.run(&program);
        let warnings = interp.warnings().to_vec();
        let symbols = interp.symbols().clone();
        Outcome {
            result,
            output: String::from_utf8(interp.into_output()).unwrap(),
            warnings,
            symbols,
        }
    }

    fn run_str(source: &str) -> Outcome {
        run_with_input(source, "")
    }

    fn error_kind(outcome: &Outcome) -> RuntimeErrorKind {
        outcome.result.clone().unwrap_err().kind
    }

    #[test]
    fn test_straight_line_order() {
        let out = run_str("10 PRINT 1\n20 PRINT 2\n30 PRINT 3\n");
        assert!(out.result.is_ok());
        assert_eq!(out.output, "1\n2\n3\n");
    }

    #[test]
    fn test_lines_run_in_numeric_order() {
        let out = run_str("30 PRINT 3\n10 PRINT 1\n20 PRINT 2\n");
        assert_eq!(out.output, "1\n2\n3\n");
    }

    #[test]
    fn test_print_arithmetic() {
        let out = run_str("10 PRINT 3 + 4\n20 PRINT 10 / 4\n30 PRINT 2 * (1 - 4)\n");
        assert_eq!(out.output, "7\n2.5\n-6\n");
    }

    #[test]
    fn test_division_by_zero() {
        let out = run_str("10 PRINT 1 / 0\n");
        assert_eq!(error_kind(&out), RuntimeErrorKind::DivisionByZero);
        assert_eq!(out.result.unwrap_err().line, Some(10));
        assert_eq!(out.output, "");
    }

    #[test]
    fn test_print_blank_line() {
        let out = run_str("10 PRINT\n20 PRINT \"A\"\n");
        assert_eq!(out.output, "\nA\n");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_let_and_string() {
        let out = run_str("10 LET A = \"HELLO\"\n20 B = 2\n30 PRINT A\n40 PRINT B * B\n");
        assert_eq!(out.output, "HELLO\n4\n");
    }

    #[test]
    fn test_gosub_resumes_after_call() {
        let out = run_str("10 GOSUB 100\n20 PRINT \"X\"\n100 RETURN\n");
        // line 20 falls through into line 100 with no caller left
        assert_eq!(out.output, "X\n");
        let err = out.result.unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::ReturnOutsideSub);
        assert_eq!(err.line, Some(100));
    }

    #[test]
    fn test_gosub_with_end() {
        let out = run_str(
            "10 GOSUB 100\n20 PRINT \"BACK\"\n30 END\n100 PRINT \"SUB\"\n110 RETURN\n",
        );
        assert!(out.result.is_ok());
        assert_eq!(out.output, "SUB\nBACK\n");
    }

    #[test]
    fn test_nested_gosub() {
        let out = run_str(
            "10 GOSUB 100\n20 PRINT \"MAIN\"\n30 END\n\
             100 PRINT \"OUTER\"\n110 GOSUB 200\n120 PRINT \"OUTER DONE\"\n130 RETURN\n\
             200 PRINT \"INNER\"\n210 RETURN\n",
        );
        assert!(out.result.is_ok());
        assert_eq!(out.output, "OUTER\nINNER\nOUTER DONE\nMAIN\n");
    }

    #[test]
    fn test_bare_return() {
        let out = run_str("10 RETURN\n");
        let err = out.result.unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::ReturnOutsideSub);
        assert_eq!(err.line, Some(10));
    }

    #[test]
    fn test_end_inside_gosub_stops_run() {
        let out = run_str("10 GOSUB 100\n20 PRINT \"NO\"\n100 END\n");
        assert!(out.result.is_ok());
        assert_eq!(out.output, "");
    }

    #[test]
    fn test_if_false_falls_through() {
        let out = run_str("10 IF 0 = 1 THEN PRINT \"A\"\n20 PRINT \"B\"\n");
        assert!(out.result.is_ok());
        assert_eq!(out.output, "B\n");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_if_else() {
        let out = run_str(
            "10 LET A = 5\n20 IF A > 3 THEN PRINT \"BIG\" ELSE PRINT \"SMALL\"\n\
             30 IF A < 3 THEN PRINT \"BIG\" ELSE PRINT \"SMALL\"\n",
        );
        assert_eq!(out.output, "BIG\nSMALL\n");
    }

    #[test]
    fn test_goto_skips_lines() {
        let out = run_str("10 GOTO 30\n20 PRINT 1\n30 PRINT 2\n");
        assert_eq!(out.output, "2\n");
    }

    #[test]
    fn test_if_then_line_loop() {
        let out = run_str(
            "10 LET I = 1\n20 PRINT I\n30 LET I = I + 1\n40 IF I <= 3 THEN 20\n50 END\n",
        );
        assert!(out.result.is_ok());
        assert_eq!(out.output, "1\n2\n3\n");
    }

    #[test]
    fn test_computed_goto() {
        let out = run_str("10 LET T = 15 * 2\n20 GOTO T\n25 PRINT \"SKIPPED\"\n30 PRINT \"OK\"\n");
        assert_eq!(out.output, "OK\n");
    }

    #[test]
    fn test_goto_negative_line() {
        let out = run_str("10 GOTO 0 - 1\n");
        assert_eq!(error_kind(&out), RuntimeErrorKind::LineNotFound(-1));
    }

    #[test]
    fn test_goto_missing_line() {
        let out = run_str("10 GOTO 99\n");
        let err = out.result.unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::ProgramError(99));
        assert_eq!(err.line, Some(99));
    }

    #[test]
    fn test_goto_string_target() {
        let out = run_str("10 GOTO \"TEN\"\n");
        assert!(matches!(error_kind(&out), RuntimeErrorKind::ExpectingNumber(_)));
    }

    #[test]
    fn test_gosub_negative_line_warns() {
        let out = run_str("10 GOSUB 0 - 5\n");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::NegativeLine);
        assert_eq!(error_kind(&out), RuntimeErrorKind::ProgramError(-5));
    }

    #[test]
    fn test_empty_program() {
        let program = Program::new();
        let mut interp = Interpreter::new("".as_bytes(), Vec::new());
        let err = interp.run(&program).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::NothingToRun);
        assert_eq!(err.line, None);
    }

    #[test]
    fn test_print_unset_warns() {
        let out = run_str("10 PRINT A\n20 LET A = 1\n");
        assert!(out.result.is_ok());
        assert_eq!(out.output, "\n");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::UnsetValue);
        assert_eq!(out.warnings[0].line, 10);
    }

    #[test]
    fn test_undefined_identifier() {
        let out = run_str("10 PRINT Q\n");
        assert_eq!(
            error_kind(&out),
            RuntimeErrorKind::UndefinedIdentifier("Q".to_string())
        );
    }

    #[test]
    fn test_if_unset_condition_takes_false_branch() {
        let out = run_str("10 IF A = 1 THEN PRINT \"T\" ELSE PRINT \"F\"\n20 LET A = 1\n");
        assert!(out.result.is_ok());
        assert_eq!(out.output, "F\n");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::UnsetValue);
    }

    #[test]
    fn test_if_number_condition_uses_truthiness() {
        let out = run_str("10 IF 5 THEN PRINT \"T\"\n20 IF 0 THEN PRINT \"Z\"\n");
        assert_eq!(out.output, "T\n");
        assert_eq!(out.warnings.len(), 2);
    }

    #[test]
    fn test_string_comparison() {
        let out = run_str(
            "10 IF \"A\" < \"B\" THEN PRINT \"LT\"\n20 IF \"A\" = 1 THEN PRINT \"EQ\" ELSE PRINT \"NE\"\n",
        );
        assert_eq!(out.output, "LT\nNE\n");
    }

    #[test]
    fn test_mixed_ordering_fails() {
        let out = run_str("10 IF \"A\" < 1 THEN PRINT \"X\"\n");
        assert!(matches!(error_kind(&out), RuntimeErrorKind::ExpectingNumber(_)));
    }

    #[test]
    fn test_arithmetic_on_string_fails() {
        let out = run_str("10 PRINT \"A\" + 1\n");
        assert!(matches!(error_kind(&out), RuntimeErrorKind::ExpectingNumber(_)));
    }

    #[test]
    fn test_input_numbers() {
        let out = run_with_input("10 INPUT A, B\n20 PRINT A + B\n30 PRINT B\n", "3\n4\n");
        assert!(out.result.is_ok());
        assert_eq!(out.output, "? ? 7\n4\n");
    }

    #[test]
    fn test_input_text() {
        let out = run_with_input("10 INPUT N\n20 PRINT N\n", "Alice\n");
        assert_eq!(out.output, "? Alice\n");
        assert_eq!(out.symbols.get("N").map(|s| &s.value), Some(&Value::from("Alice")));
    }

    #[test]
    fn test_input_end_of_stream_keeps_earlier_values() {
        let out = run_with_input("10 INPUT A, B\n20 PRINT A\n", "1\n");
        assert!(matches!(error_kind(&out), RuntimeErrorKind::InputError(_)));
        assert_eq!(out.symbols.get("A").map(|s| &s.value), Some(&Value::Number(1.0)));
        assert_eq!(out.symbols.get("B").map(|s| &s.value), Some(&Value::Unset));
    }

    #[test]
    fn test_custom_prompt() {
        let program = parse_str("10 INPUT X\n20 PRINT X\n");
        let config = InterpreterConfig {
            prompt: "X? ".to_string(),
        };
        let mut interp = Interpreter::with_config("9\n".as_bytes(), Vec::new(), config);
        interp.run(&program).unwrap();
        assert_eq!(String::from_utf8(interp.into_output()).unwrap(), "X? 9\n");
    }

    #[test]
    fn test_run_resets_state() {
        let program = parse_str("10 PRINT A\n20 LET A = 1\n30 PRINT A\n");
        let mut interp = Interpreter::new("".as_bytes(), Vec::new());
        interp.run(&program).unwrap();
        interp.run(&program).unwrap();
        assert_eq!(interp.warnings().len(), 1);
        assert_eq!(interp.state(), RunState::Exited);
        assert_eq!(String::from_utf8(interp.into_output()).unwrap(), "\n1\n\n1\n");
    }

    #[test]
    fn test_symbols_shared_across_frames() {
        let out = run_str(
            "10 LET X = 1\n20 GOSUB 100\n30 PRINT X\n40 END\n100 LET X = X + 41\n110 RETURN\n",
        );
        assert_eq!(out.output, "42\n");
    }

    #[test]
    fn test_error_carries_span() {
        let source = "10 PRINT 1\n20 PRINT 1 / 0\n";
        let out = run_str(source);
        let span = out.result.unwrap_err().span.unwrap();
        assert_eq!(&source[span.to_range()], "PRINT 1 / 0");
    }
}
