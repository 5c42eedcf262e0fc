use std::fmt;

/// A value produced by evaluating a fragment expression.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Unit,
}

impl RuntimeValue {
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    pub fn is_falsy(&self) -> bool {
        match self {
            RuntimeValue::Boolean(b) => !b,
            RuntimeValue::Unit => true,
            RuntimeValue::Number(n) => *n == 0.0,
            RuntimeValue::String(s) => s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Number(_) => "Number",
            RuntimeValue::Boolean(_) => "Boolean",
            RuntimeValue::String(_) => "String",
            RuntimeValue::Unit => "Unit",
        }
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::String(s.to_string())
    }
}

impl From<f64> for RuntimeValue {
    fn from(n: f64) -> Self {
        RuntimeValue::Number(n)
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Number(n) => {
                if n.is_finite() && *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            RuntimeValue::Boolean(b) => write!(f, "{}", b),
            RuntimeValue::String(s) => write!(f, "{}", s),
            RuntimeValue::Unit => write!(f, "()"),
        }
    }
}
