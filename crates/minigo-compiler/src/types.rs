use std::fmt;

use crate::ast::{BinOp, OpClass, UnOp};

/// A type as written in a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Bool,
    Named(String),
}

impl TypeName {
    /// Only `int` and `bool` can be declared.
    pub fn resolve(&self) -> Option<Type> {
        match self {
            TypeName::Int => Some(Type::Int),
            TypeName::Bool => Some(Type::Bool),
            TypeName::Named(_) => None,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Int => write!(f, "int"),
            TypeName::Bool => write!(f, "bool"),
            TypeName::Named(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
    Str,
    /// Result of `print`/`println`.
    Void,
    /// Could not be resolved; an error was already reported where it originated.
    Unknown,
}

impl Type {
    /// `Unknown` is compatible with every type so one mistake yields one diagnostic.
    pub fn accepts(self, other: Type) -> bool {
        self == other || self == Type::Unknown || other == Type::Unknown
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Type::Int => "int",
            Type::Bool => "bool",
            Type::Str => "string",
            Type::Void => "void",
            Type::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl BinOp {
    /// Fixed by the operator alone, whatever the operands turn out to be.
    pub fn result_type(self) -> Type {
        match self.class() {
            OpClass::Arithmetic => Type::Int,
            OpClass::Relational | OpClass::Equality | OpClass::Logical => Type::Bool,
        }
    }

    pub fn check_operands(self, left: Type, right: Type) -> Result<Type, String> {
        let op = self.symbol();
        let both = |want: Type| want.accepts(left) && want.accepts(right);
        match self.class() {
            OpClass::Arithmetic if !both(Type::Int) => {
                Err(format!("operator '{op}' expects int operands, found {left} and {right}"))
            }
            OpClass::Relational if !both(Type::Int) => {
                Err(format!("comparison '{op}' expects int operands, found {left} and {right}"))
            }
            OpClass::Equality if !left.accepts(right) || left == Type::Void || right == Type::Void => {
                Err(format!("cannot compare {left} with {right} using '{op}'"))
            }
            OpClass::Logical if !both(Type::Bool) => {
                Err(format!("logical operator '{op}' expects bool operands, found {left} and {right}"))
            }
            _ => Ok(self.result_type()),
        }
    }
}

impl UnOp {
    pub fn result_type(self) -> Type {
        match self {
            UnOp::Neg => Type::Int,
            UnOp::Not => Type::Bool,
        }
    }

    pub fn check_operand(self, operand: Type) -> Result<Type, String> {
        let want = self.result_type();
        if want.accepts(operand) {
            Ok(want)
        } else {
            let article = if want == Type::Int { "an" } else { "a" };
            Err(format!("operator '{}' expects {article} {want} operand, found {operand}", self.symbol()))
        }
    }
}
