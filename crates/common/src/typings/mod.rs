use std::fmt::{Display, Formatter, Result};


/// Every machine-level value is one 8-byte word; struct values are always
/// heap pointers.
pub const WORD_SIZE: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
    /// Pointer to a heap-allocated struct, by struct name.
    Struct(String),
    Void,
    Unknown,
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let type_name = match self {
            Type::Int => "int".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Struct(name) => format!("*{}", name),
            Type::Void => "void".to_string(),
            Type::Unknown => "unknown".to_string(),
        };

        write!(f, "{}", type_name)
    }
}

impl Type {
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            Type::Struct(name) => Some(name),
            _ => None,
        }
    }
}
