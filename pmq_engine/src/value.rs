use std::fmt;

use pmq_common::{CellId, IdString, SigBit, SigSpec};
use serde::Serialize;

/// Declared type of a pattern state variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarType {
    Sig,
    Bit,
    Bool,
    Int,
    Cell,
    Ident,
}

impl VarType {
    /// The value a freshly declared variable holds.
    #[must_use]
    pub const fn default_value(self) -> Value {
        match self {
            Self::Sig => Value::Sig(SigSpec::new()),
            Self::Bit => Value::Bit(SigBit::UNDEF),
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Cell => Value::Cell(None),
            Self::Ident => Value::Ident(None),
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sig => "SigSpec",
            Self::Bit => "SigBit",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Cell => "Cell",
            Self::Ident => "IdString",
        };
        write!(f, "{name}")
    }
}

/// A typed pattern state value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Sig(SigSpec),
    Bit(SigBit),
    Bool(bool),
    Int(usize),
    Cell(Option<CellId>),
    Ident(Option<IdString>),
}

impl Value {
    #[must_use]
    pub const fn ty(&self) -> VarType {
        match self {
            Self::Sig(_) => VarType::Sig,
            Self::Bit(_) => VarType::Bit,
            Self::Bool(_) => VarType::Bool,
            Self::Int(_) => VarType::Int,
            Self::Cell(_) => VarType::Cell,
            Self::Ident(_) => VarType::Ident,
        }
    }
}

impl From<SigSpec> for Value {
    fn from(value: SigSpec) -> Self {
        Self::Sig(value)
    }
}

impl From<SigBit> for Value {
    fn from(value: SigBit) -> Self {
        Self::Bit(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Int(value)
    }
}

impl From<Option<CellId>> for Value {
    fn from(value: Option<CellId>) -> Self {
        Self::Cell(value)
    }
}

impl From<CellId> for Value {
    fn from(value: CellId) -> Self {
        Self::Cell(Some(value))
    }
}

impl From<IdString> for Value {
    fn from(value: IdString) -> Self {
        Self::Ident(Some(value))
    }
}

impl From<Option<IdString>> for Value {
    fn from(value: Option<IdString>) -> Self {
        Self::Ident(value)
    }
}
