//! Binding records: what a pattern found at one root.

use std::fmt::Write as _;

use indexmap::IndexMap;
use pmq_common::{CellId, IdString, Netlist, SigBit, SigSpec};
use serde::Serialize;

use crate::value::Value;

/// The final top-level state of an accepted search.
///
/// Holds every top-level variable in declaration order; cell roles that
/// were not found are present and unbound.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BindingRecord {
    pattern: &'static str,
    root: CellId,
    bindings: IndexMap<&'static str, Value>,
}

impl BindingRecord {
    pub(crate) const fn new(
        pattern: &'static str,
        root: CellId,
        bindings: IndexMap<&'static str, Value>,
    ) -> Self {
        Self {
            pattern,
            root,
            bindings,
        }
    }

    #[must_use]
    pub const fn pattern(&self) -> &'static str {
        self.pattern
    }

    /// The anchor cell this record was found from.
    #[must_use]
    pub const fn root(&self) -> CellId {
        self.root
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.bindings.iter().map(|(k, v)| (*k, v))
    }

    /// The cell bound to role `name`; `None` when the role is unbound or is
    /// not a cell variable.
    #[must_use]
    pub fn cell(&self, name: &str) -> Option<CellId> {
        match self.get(name)? {
            Value::Cell(c) => *c,
            _ => None,
        }
    }

    #[must_use]
    pub fn sig(&self, name: &str) -> Option<&SigSpec> {
        match self.get(name)? {
            Value::Sig(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn bit(&self, name: &str) -> Option<SigBit> {
        match self.get(name)? {
            Value::Bit(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn int(&self, name: &str) -> Option<usize> {
        match self.get(name)? {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn ident(&self, name: &str) -> Option<&IdString> {
        match self.get(name)? {
            Value::Ident(i) => i.as_ref(),
            _ => None,
        }
    }

    /// Every bound cell role, in declaration order.
    pub fn cells(&self) -> impl Iterator<Item = (&'static str, CellId)> + '_ {
        self.bindings.iter().filter_map(|(k, v)| match v {
            Value::Cell(Some(c)) => Some((*k, *c)),
            _ => None,
        })
    }

    /// Human-readable dump using the netlist's names.
    #[must_use]
    pub fn render(&self, netlist: &Netlist) -> String {
        let mut out = format!(
            "{} @ {}\n",
            self.pattern,
            netlist.cell(self.root).name()
        );
        for (name, value) in &self.bindings {
            let text = match value {
                Value::Cell(Some(c)) => {
                    let cell = netlist.cell(*c);
                    format!("{} ({})", cell.name(), cell.kind())
                }
                Value::Cell(None) | Value::Ident(None) => "-".to_owned(),
                Value::Sig(s) => netlist.describe(s),
                Value::Bit(b) => netlist.describe(&SigSpec::from(*b)),
                Value::Bool(b) => b.to_string(),
                Value::Int(i) => i.to_string(),
                Value::Ident(Some(id)) => id.to_string(),
            };
            let _ = writeln!(out, "  {name} = {text}");
        }
        out
    }
}
