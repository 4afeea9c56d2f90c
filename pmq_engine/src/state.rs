//! Pattern state: the typed variables threaded through one root search.

use indexmap::IndexMap;
use pmq_common::{CellId, IdString, SigBit, SigSpec};

use crate::value::{Value, VarType};

/// The variables visible in one scope (the pattern body or one subpattern
/// activation).
///
/// Every variable must be declared before it is read or written; touching an
/// undeclared name, or writing a value of the wrong type, is a bug in the
/// pattern definition and panics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    scope: &'static str,
    vars: IndexMap<&'static str, Value>,
}

impl State {
    /// A scope holding every declaration at its default value.
    pub(crate) fn new<'a>(
        scope: &'static str,
        decls: impl IntoIterator<Item = &'a (&'static str, VarType)>,
    ) -> Self {
        let vars = decls
            .into_iter()
            .map(|&(name, ty)| (name, ty.default_value()))
            .collect();
        Self { scope, vars }
    }

    /// Name of the pattern or subpattern this scope belongs to.
    #[must_use]
    pub const fn scope(&self) -> &'static str {
        self.scope
    }

    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// # Panics
    ///
    /// Panics if `name` is not declared in this scope.
    #[must_use]
    pub fn get(&self, name: &str) -> &Value {
        match self.vars.get(name) {
            Some(v) => v,
            None => self.undeclared(name),
        }
    }

    /// Overwrite a declared variable.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not declared or `value` has a different type.
    #[contracts::debug_ensures(self.get(name).ty() == old(self.get(name).ty()))]
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let scope = self.scope;
        let Some(slot) = self.vars.get_mut(name) else {
            self.undeclared(name)
        };
        assert!(
            slot.ty() == value.ty(),
            "pattern state `{name}` in `{scope}` is {}, cannot store a {}",
            slot.ty(),
            value.ty()
        );
        *slot = value;
    }

    /// Reset a variable to its type's default.
    pub fn clear(&mut self, name: &str) {
        let ty = self.get(name).ty();
        self.set(name, ty.default_value());
    }

    #[must_use]
    pub fn sig(&self, name: &str) -> &SigSpec {
        match self.get(name) {
            Value::Sig(s) => s,
            other => self.mistyped(name, VarType::Sig, other),
        }
    }

    #[must_use]
    pub fn bit(&self, name: &str) -> SigBit {
        match self.get(name) {
            Value::Bit(b) => *b,
            other => self.mistyped(name, VarType::Bit, other),
        }
    }

    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        match self.get(name) {
            Value::Bool(b) => *b,
            other => self.mistyped(name, VarType::Bool, other),
        }
    }

    #[must_use]
    pub fn int(&self, name: &str) -> usize {
        match self.get(name) {
            Value::Int(i) => *i,
            other => self.mistyped(name, VarType::Int, other),
        }
    }

    #[must_use]
    pub fn cell(&self, name: &str) -> Option<CellId> {
        match self.get(name) {
            Value::Cell(c) => *c,
            other => self.mistyped(name, VarType::Cell, other),
        }
    }

    #[must_use]
    pub fn ident(&self, name: &str) -> Option<&IdString> {
        match self.get(name) {
            Value::Ident(i) => i.as_ref(),
            other => self.mistyped(name, VarType::Ident, other),
        }
    }

    /// Whether any cell-typed variable of this scope currently holds `cell`.
    #[must_use]
    pub fn holds_cell(&self, cell: CellId) -> bool {
        self.vars
            .values()
            .any(|v| matches!(v, Value::Cell(Some(c)) if *c == cell))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.vars.iter().map(|(k, v)| (*k, v))
    }

    pub(crate) fn into_vars(self) -> IndexMap<&'static str, Value> {
        self.vars
    }

    fn undeclared(&self, name: &str) -> ! {
        panic!("pattern state `{name}` is not declared in `{}`", self.scope)
    }

    fn mistyped(&self, name: &str, expected: VarType, found: &Value) -> ! {
        panic!(
            "pattern state `{name}` in `{}` is {}, read as {expected}",
            self.scope,
            found.ty()
        )
    }
}
