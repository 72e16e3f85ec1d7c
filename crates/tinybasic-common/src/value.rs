//! Runtime values shared by the interpreter, the symbol table and the
//! three-address code generator.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// A TinyBasic value. Variables start out `Unset` until first assigned.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    #[default]
    Unset,
}

/// Arithmetic operators: `+ - * /`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Relational operators: `= <> < <= > >=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("operator `{op}` expects numbers, found {left} and {right}")]
    ExpectingNumber {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "=",
            RelOp::Ne => "<>",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Value {
    pub fn is_set(&self) -> bool {
        !matches!(self, Value::Unset)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Unset => "unset value",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Truth value used by IF when the condition is not a boolean.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Unset => false,
        }
    }

    /// Parse one line typed at an INPUT prompt: numeric if it parses as a
    /// number, otherwise the raw text.
    pub fn from_input(line: &str) -> Value {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.trim().parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::String(line.to_string()),
        }
    }

    pub fn arithmetic(&self, op: ArithOp, rhs: &Value) -> Result<Value, ValueError> {
        let (Value::Number(l), Value::Number(r)) = (self, rhs) else {
            return Err(ValueError::ExpectingNumber {
                op: op.symbol(),
                left: self.type_name(),
                right: rhs.type_name(),
            });
        };
        let result = match op {
            ArithOp::Add => l + r,
            ArithOp::Sub => l - r,
            ArithOp::Mul => l * r,
            ArithOp::Div => {
                if *r == 0.0 {
                    return Err(ValueError::DivisionByZero);
                }
                l / r
            }
        };
        Ok(Value::Number(result))
    }

    /// Compare two values. An unset operand makes the whole comparison unset;
    /// values of different kinds are never equal and cannot be ordered.
    pub fn compare(&self, op: RelOp, rhs: &Value) -> Result<Value, ValueError> {
        if !self.is_set() || !rhs.is_set() {
            return Ok(Value::Unset);
        }
        let result = match op {
            RelOp::Eq => self == rhs,
            RelOp::Ne => self != rhs,
            RelOp::Lt | RelOp::Le | RelOp::Gt | RelOp::Ge => {
                let ordering = match (self, rhs) {
                    (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
                    (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
                    _ => {
                        return Err(ValueError::ExpectingNumber {
                            op: op.symbol(),
                            left: self.type_name(),
                            right: rhs.type_name(),
                        })
                    }
                };
                match ordering {
                    // NaN compares false to everything
                    None => false,
                    Some(ord) => match op {
                        RelOp::Lt => ord == Ordering::Less,
                        RelOp::Le => ord != Ordering::Greater,
                        RelOp::Gt => ord == Ordering::Greater,
                        _ => ord != Ordering::Less,
                    },
                }
            }
        };
        Ok(Value::Boolean(result))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => f.write_str(s),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
            Value::Unset => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_display() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Boolean(true).to_string(), "TRUE");
        assert_eq!(Value::Unset.to_string(), "");
    }

    #[test]
    fn test_arithmetic() {
        let three = Value::Number(3.0);
        let four = Value::Number(4.0);
        assert_eq!(three.arithmetic(ArithOp::Add, &four), Ok(Value::Number(7.0)));
        assert_eq!(three.arithmetic(ArithOp::Sub, &four), Ok(Value::Number(-1.0)));
        assert_eq!(three.arithmetic(ArithOp::Mul, &four), Ok(Value::Number(12.0)));
        assert_eq!(three.arithmetic(ArithOp::Div, &four), Ok(Value::Number(0.75)));
    }

    #[test]
    fn test_division_by_zero() {
        let result = Value::Number(1.0).arithmetic(ArithOp::Div, &Value::Number(0.0));
        assert_eq!(result, Err(ValueError::DivisionByZero));
    }

    #[test]
    fn test_arithmetic_expects_numbers() {
        let result = Value::from("a").arithmetic(ArithOp::Add, &Value::Number(1.0));
        assert!(matches!(result, Err(ValueError::ExpectingNumber { op: "+", .. })));
        let result = Value::Unset.arithmetic(ArithOp::Mul, &Value::Number(1.0));
        assert!(matches!(result, Err(ValueError::ExpectingNumber { .. })));
    }

    #[test]
    fn test_compare_numbers_and_strings() {
        let one = Value::Number(1.0);
        let two = Value::Number(2.0);
        assert_eq!(one.compare(RelOp::Lt, &two), Ok(Value::Boolean(true)));
        assert_eq!(one.compare(RelOp::Ge, &two), Ok(Value::Boolean(false)));
        assert_eq!(one.compare(RelOp::Le, &one), Ok(Value::Boolean(true)));
        let a = Value::from("ABC");
        let b = Value::from("ABD");
        assert_eq!(a.compare(RelOp::Lt, &b), Ok(Value::Boolean(true)));
        assert_eq!(a.compare(RelOp::Eq, &a), Ok(Value::Boolean(true)));
    }

    #[test]
    fn test_compare_mixed_types() {
        let n = Value::Number(1.0);
        let s = Value::from("1");
        assert_eq!(n.compare(RelOp::Eq, &s), Ok(Value::Boolean(false)));
        assert_eq!(n.compare(RelOp::Ne, &s), Ok(Value::Boolean(true)));
        assert!(n.compare(RelOp::Gt, &s).is_err());
    }

    #[test]
    fn test_compare_unset_is_unset() {
        let result = Value::Unset.compare(RelOp::Eq, &Value::Number(0.0));
        assert_eq!(result, Ok(Value::Unset));
    }

    #[test]
    fn test_from_input() {
        assert_eq!(Value::from_input("42\n"), Value::Number(42.0));
        assert_eq!(Value::from_input(" 1.5 \r\n"), Value::Number(1.5));
        assert_eq!(Value::from_input("hello\n"), Value::from("hello"));
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Number(2.0).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Unset.is_truthy());
    }
}
