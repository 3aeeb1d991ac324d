use std::ops;
use std::{fmt, rc::Rc};

use crate::{intern, ObjFun, RuntimeError, StrId};

/// This represents a Lox type and its data at runtime.
#[derive(Debug, Clone)]
pub enum Value {
    /// A nothing value in Lox
    Nil,
    /// A boolean value in Lox
    Bool(bool),
    /// A number value in Lox
    Number(f64),
    /// An interned string
    String(StrId),
    /// A function object
    Fun(Rc<ObjFun>),
    /// A native function reference
    NativeFun(NativeFun),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => {
                if n.trunc().eq(n) {
                    write!(f, "{n:.0?}")
                } else {
                    write!(f, "{n:?}")
                }
            }
            Self::String(s) => write!(f, "{}", intern::str(*s)),
            Self::Fun(fun) => write!(f, "{fun}"),
            Self::NativeFun(fun) => write!(f, "{fun}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(v1), Self::Bool(v2)) => v1 == v2,
            (Self::Number(v1), Self::Number(v2)) => v1 == v2,
            (Self::String(s1), Self::String(s2)) => s1 == s2,
            (Self::Fun(f1), Self::Fun(f2)) => Rc::ptr_eq(f1, f2),
            (Self::NativeFun(f1), Self::NativeFun(f2)) => f1.name == f2.name,
            _ => false,
        }
    }
}

impl Value {
    /// Return true if the value is `nil` or `false`. Everything else,
    /// including zero and the empty string, is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Check if the current value is less than the given value
    pub fn lt(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        match (self, rhs) {
            (Value::Number(n1), Value::Number(n2)) => Ok(Value::Bool(n1 < n2)),
            _ => Err(RuntimeError::InvalidOperand(
                "Operand must be a number".to_string(),
            )),
        }
    }

    /// Check if the current value is greater than the given value
    pub fn gt(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        match (self, rhs) {
            (Value::Number(n1), Value::Number(n2)) => Ok(Value::Bool(n1 > n2)),
            _ => Err(RuntimeError::InvalidOperand(
                "Operand must be a number".to_string(),
            )),
        }
    }
}

impl ops::Add for &Value {
    type Output = Result<Value, RuntimeError>;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(n1), Value::Number(n2)) => Ok(Value::Number(n1 + n2)),
            (Value::String(s1), Value::String(s2)) => {
                let res = intern::str(*s1) + intern::str(*s2).as_str();
                Ok(Value::String(intern::id(res)))
            }
            _ => Err(RuntimeError::InvalidOperand(
                "Operands must be numbers or strings".to_string(),
            )),
        }
    }
}

impl ops::Sub for &Value {
    type Output = Result<Value, RuntimeError>;

    fn sub(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(n1), Value::Number(n2)) => Ok(Value::Number(n1 - n2)),
            _ => Err(RuntimeError::InvalidOperand(
                "Operand must be a number".to_string(),
            )),
        }
    }
}

impl ops::Mul for &Value {
    type Output = Result<Value, RuntimeError>;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(n1), Value::Number(n2)) => Ok(Value::Number(n1 * n2)),
            _ => Err(RuntimeError::InvalidOperand(
                "Operand must be a number".to_string(),
            )),
        }
    }
}

impl ops::Div for &Value {
    type Output = Result<Value, RuntimeError>;

    // Division by zero is not an error; it produces whatever IEEE 754
    // prescribes for the operands (an infinity or NaN).
    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(n1), Value::Number(n2)) => Ok(Value::Number(n1 / n2)),
            _ => Err(RuntimeError::InvalidOperand(
                "Operand must be a number".to_string(),
            )),
        }
    }
}

impl ops::Not for &Value {
    type Output = Value;

    fn not(self) -> Self::Output {
        Value::Bool(self.is_falsey())
    }
}

impl ops::Neg for &Value {
    type Output = Result<Value, RuntimeError>;

    fn neg(self) -> Self::Output {
        match self {
            Value::Number(n) => Ok(Value::Number(-n)),
            _ => Err(RuntimeError::InvalidOperand(
                "Operand must be a number".to_string(),
            )),
        }
    }
}

/// A native function
#[derive(Clone)]
pub struct NativeFun {
    /// Function's name
    pub name: StrId,
    /// Native function reference, called with the argument window of the
    /// value stack
    pub call: fn(&[Value]) -> Value,
}

impl fmt::Display for NativeFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

impl fmt::Debug for NativeFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_nil_and_false_are_falsey() {
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Number(0.0).is_falsey());
        assert!(!Value::String(intern::id("")).is_falsey());
    }

    #[test]
    fn values_of_different_kinds_are_not_equal() {
        let values = [
            Value::Nil,
            Value::Bool(true),
            Value::Number(0.0),
            Value::String(intern::id("")),
        ];
        for (i, v1) in values.iter().enumerate() {
            for (j, v2) in values.iter().enumerate() {
                assert_eq!(i == j, v1 == v2);
            }
        }
    }

    #[test]
    fn string_equality_is_structural() {
        let s1 = Value::String(intern::id("foo"));
        let s2 = Value::String(intern::id("foo"));
        let s3 = Value::String(intern::id("bar"));
        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
    }

    #[test]
    fn adding_strings_concatenates_them() {
        let lhs = Value::String(intern::id("foo"));
        let rhs = Value::String(intern::id("bar"));
        let res = (&lhs + &rhs).unwrap();
        assert_eq!(res, Value::String(intern::id("foobar")));
    }

    #[test]
    fn adding_mismatched_kinds_is_an_error() {
        let lhs = Value::Number(1.0);
        let rhs = Value::String(intern::id("1"));
        let err = (&lhs + &rhs).unwrap_err();
        assert_eq!(err.to_string(), "Operands must be numbers or strings.");
    }

    #[test]
    fn division_by_zero_follows_ieee_754() {
        let one = Value::Number(1.0);
        let zero = Value::Number(0.0);
        assert!(matches!(&one / &zero, Ok(Value::Number(n)) if n.is_infinite()));
        assert!(matches!(&zero / &zero, Ok(Value::Number(n)) if n.is_nan()));
    }

    #[test]
    fn numbers_display_in_shortest_form() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
    }

    #[test]
    fn special_values_display_like_their_literals() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::String(intern::id("hi")).to_string(), "hi");
    }
}
