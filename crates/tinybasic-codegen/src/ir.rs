//! Three-address instruction records.

use std::fmt;

use tinybasic_common::{ArithOp, RelOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Print,
    IfTrue,
    IfFalse,
    Goto,
    Gosub,
    Return,
    End,
    Input,
    Assign,
    Label,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Print => "PRINT",
            Opcode::IfTrue => "IFTRUE",
            Opcode::IfFalse => "IFFALSE",
            Opcode::Goto => "GOTO",
            Opcode::Gosub => "GOSUB",
            Opcode::Return => "RETURN",
            Opcode::End => "END",
            Opcode::Input => "INPUT",
            Opcode::Assign => "ASSIGN",
            Opcode::Label => "LABEL",
            Opcode::Addition => "ADDITION",
            Opcode::Subtraction => "SUBTRACTION",
            Opcode::Multiplication => "MULTIPLICATION",
            Opcode::Division => "DIVISION",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
        }
    }
}

impl From<ArithOp> for Opcode {
    fn from(op: ArithOp) -> Self {
        match op {
            ArithOp::Add => Opcode::Addition,
            ArithOp::Sub => Opcode::Subtraction,
            ArithOp::Mul => Opcode::Multiplication,
            ArithOp::Div => Opcode::Division,
        }
    }
}

impl From<RelOp> for Opcode {
    fn from(op: RelOp) -> Self {
        match op {
            RelOp::Eq => Opcode::Eq,
            RelOp::Ne => Opcode::Ne,
            RelOp::Lt => Opcode::Lt,
            RelOp::Le => Opcode::Le,
            RelOp::Gt => Opcode::Gt,
            RelOp::Ge => Opcode::Ge,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One instruction: `opcode operand1, operand2 -> result @label`.
///
/// Every field but the opcode is optional. `label` is the branch target of
/// an IFFALSE/IFTRUE or of a GOTO synthesized by lowering; a LABEL
/// instruction carries the name it defines in `operand1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand1: Option<String>,
    pub operand2: Option<String>,
    pub result: Option<String>,
    pub label: Option<String>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operand1: None,
            operand2: None,
            result: None,
            label: None,
            comment: None,
        }
    }

    pub fn operand1(mut self, operand: impl Into<String>) -> Self {
        self.operand1 = Some(operand.into());
        self
    }

    pub fn operand2(mut self, operand: impl Into<String>) -> Self {
        self.operand2 = Some(operand.into());
        self
    }

    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode == Opcode::Label {
            return write!(f, "{}:", self.operand1.as_deref().unwrap_or_default());
        }
        write!(f, "{}", self.opcode)?;
        match (&self.operand1, &self.operand2) {
            (Some(a), Some(b)) => write!(f, " {a}, {b}")?,
            (Some(a), None) | (None, Some(a)) => write!(f, " {a}")?,
            (None, None) => {}
        }
        if let Some(result) = &self.result {
            write!(f, " -> {result}")?;
        }
        if let Some(label) = &self.label {
            write!(f, " @{label}")?;
        }
        Ok(())
    }
}
