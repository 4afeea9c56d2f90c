use thiserror::Error;

use crate::value::VarType;

/// Inconsistencies in a pattern definition, caught before any search runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("`{scope}` declares `{name}` more than once")]
    DuplicateVariable {
        scope: &'static str,
        name: &'static str,
    },

    #[error("subpattern `{0}` is defined more than once")]
    DuplicateSubpattern(&'static str),

    #[error("`{scope}` uses `{name}`, which it does not declare")]
    UndeclaredVariable {
        scope: &'static str,
        name: &'static str,
    },

    #[error("`{scope}` uses `{name}` as {expected}, but it is declared as {found}")]
    TypeMismatch {
        scope: &'static str,
        name: &'static str,
        expected: VarType,
        found: VarType,
    },

    #[error("`{scope}` calls unknown subpattern `{name}`")]
    UnknownSubpattern {
        scope: &'static str,
        name: &'static str,
    },

    #[error("`{scope}` calls `{subpattern}` with {found} arguments, it takes {expected}")]
    ArityMismatch {
        scope: &'static str,
        subpattern: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("match on `{role}` in `{scope}` selects a port by unknown choice `{choice}`")]
    UnknownChoice {
        scope: &'static str,
        role: &'static str,
        choice: &'static str,
    },

    #[error("match on `{role}` in `{scope}` indexes at unknown slice `{slice}`")]
    UnknownSlice {
        scope: &'static str,
        role: &'static str,
        slice: &'static str,
    },

    #[error("match on `{role}` in `{scope}` has no cell kinds to select from")]
    NoKinds {
        scope: &'static str,
        role: &'static str,
    },
}
