//! Base types shared by both lattices

use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete, non-parameterized type of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Int,
    Float,
    String,
    Bool,
    List,
    Map,
    Set,
}

impl BaseType {
    pub const ALL: [BaseType; 7] = [
        BaseType::Int,
        BaseType::Float,
        BaseType::String,
        BaseType::Bool,
        BaseType::List,
        BaseType::Map,
        BaseType::Set,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseType::Int => "int",
            BaseType::Float => "float",
            BaseType::String => "string",
            BaseType::Bool => "bool",
            BaseType::List => "list",
            BaseType::Map => "map",
            BaseType::Set => "set",
        }
    }

    pub fn from_name(name: &str) -> Option<BaseType> {
        BaseType::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Containers accept exactly one generic argument
    pub fn is_container(self) -> bool {
        matches!(self, BaseType::List | BaseType::Map | BaseType::Set)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, BaseType::Int | BaseType::Float)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for base in BaseType::ALL {
            assert_eq!(BaseType::from_name(base.name()), Some(base));
        }
        assert_eq!(BaseType::from_name("Point"), None);
    }

    #[test]
    fn test_containers() {
        assert!(BaseType::List.is_container());
        assert!(BaseType::Map.is_container());
        assert!(!BaseType::String.is_container());
    }
}
