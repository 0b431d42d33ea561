// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values.
//!
//! A value is a closed tagged union: boolean, null, double-precision number,
//! or a reference to a heap object (currently only strings). Constructors tag
//! a payload; accessors assert the tag. Equality across tags is always false,
//! `Null == Null` always holds, numbers and booleans compare by value, and
//! object references compare by identity. Interning guarantees one instance
//! per distinct string content, so identity equality coincides with content
//! equality for strings.

use std::fmt;
use std::rc::Rc;

use crate::object::ObjString;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Null,
    Number(f64),
    Str(Rc<ObjString>),
}

impl Value {
    /// Check whether this value is a boolean.
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Check whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check whether this value is a number.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Check whether this value is a string object.
    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Extract the boolean payload.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a boolean. Callers check the tag first.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            other => panic!("expected bool, got {}", other.type_name()),
        }
    }

    /// Extract the number payload.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a number. Callers check the tag first.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            other => panic!("expected number, got {}", other.type_name()),
        }
    }

    /// Extract the string payload.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a string. Callers check the tag first.
    pub fn as_str(&self) -> &Rc<ObjString> {
        match self {
            Value::Str(s) => s,
            other => panic!("expected string, got {}", other.type_name()),
        }
    }

    /// The name of this value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }
    }

    /// Null and false are falsey; every other value is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(false))
    }

    /// Render this value for display.
    ///
    /// With `escape` set, control characters in strings are re-encoded to
    /// their two-character escape form (REPL/debug display); without it the
    /// raw bytes are emitted (`print` statement output).
    pub fn display(&self, escape: bool) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => {
                if escape {
                    s.escaped()
                } else {
                    s.as_str().to_string()
                }
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            // Interned strings compare by identity.
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display(true))
    }
}

/// Numbers with no fractional part print without a decimal point.
fn format_number(n: f64) -> String {
    if n == n.trunc() && n.is_finite() {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// Tests
// ============================================================================
