//! Match steps: bind one role variable to a cell chosen from the netlist.
//!
//! A step narrows its candidates in declaration order. Plain predicates
//! (`select`, `filter`) accept or drop a cell; `choice` and `slice` clauses
//! fan one cell out into several candidates, one per port name or bit
//! offset, which later clauses can refer to; `index` clauses require a port
//! (or part of it) to equal a signal computed from the current state and are
//! also used to look candidates up through the [`NetlistIndex`].
//!
//! [`NetlistIndex`]: crate::index::NetlistIndex

use std::fmt;

use pmq_common::{CellId, CellKind, IdString, ParamValue, SigSpec};

use crate::ctx::Ctx;
use crate::pattern::code::Guard;
use crate::state::State;
use crate::value::Value;

pub(crate) type Pred = Box<dyn Fn(&MatchView<'_>) -> bool + Send + Sync>;
pub(crate) type ValueFn = Box<dyn Fn(&MatchView<'_>) -> Value + Send + Sync>;
pub(crate) type BoundFn = Box<dyn Fn(&MatchView<'_>) -> usize + Send + Sync>;
pub(crate) type SigFn = Box<dyn Fn(&Ctx<'_>, &State) -> SigSpec + Send + Sync>;

/// How a match step treats the absence of a candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// No candidate prunes the branch.
    #[default]
    Required,
    /// Bind to nothing only when there is no candidate at all.
    Optional,
    /// Try every candidate, then additionally try binding to nothing.
    Semioptional,
}

/// Which port an index clause constrains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortSel {
    /// A port known when the pattern is written.
    Fixed(IdString),
    /// The port named by a choice clause of the same step.
    Choice(&'static str),
}

/// Which part of the port an index clause compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum At {
    /// The whole port.
    Whole,
    /// Bit 0 only.
    Lsb,
    /// The single bit at the offset chosen by a slice clause.
    Slice(&'static str),
}

/// A port fixed by name.
#[must_use]
pub fn port(name: &str) -> PortSel {
    PortSel::Fixed(IdString::new(name))
}

/// The port picked by choice clause `choice`.
#[must_use]
pub const fn chosen(choice: &'static str) -> PortSel {
    PortSel::Choice(choice)
}

pub(crate) struct IndexClause {
    pub port: PortSel,
    pub at: At,
    pub key: SigFn,
}

pub(crate) enum Clause {
    Select(Pred),
    Filter(Pred),
    Choice {
        name: &'static str,
        values: Vec<IdString>,
    },
    Slice {
        name: &'static str,
        bound: BoundFn,
    },
    Define {
        name: &'static str,
        value: ValueFn,
    },
    Index(IndexClause),
}

/// Binds `role` to a cell of one of `kinds` satisfying every clause.
pub struct MatchStep {
    pub(crate) role: &'static str,
    pub(crate) guards: Vec<Guard>,
    pub(crate) kinds: Vec<CellKind>,
    pub(crate) clauses: Vec<Clause>,
    pub(crate) sets: Vec<(&'static str, ValueFn)>,
    pub(crate) mode: MatchMode,
}

impl MatchStep {
    #[must_use]
    pub fn new(role: &'static str) -> Self {
        Self {
            role,
            guards: Vec::new(),
            kinds: Vec::new(),
            clauses: Vec::new(),
            sets: Vec::new(),
            mode: MatchMode::Required,
        }
    }

    /// Only run the step when `guard` holds; otherwise the role is left
    /// unbound and the search moves on.
    #[must_use]
    pub fn when(
        mut self,
        guard: impl Fn(&Ctx<'_>, &State) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: CellKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Predicate on the cell alone, checked before any fan-out.
    #[must_use]
    pub fn select(mut self, pred: impl Fn(&MatchView<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.clauses.push(Clause::Select(Box::new(pred)));
        self
    }

    /// Predicate that may read the choices and slices declared before it.
    #[must_use]
    pub fn filter(mut self, pred: impl Fn(&MatchView<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.clauses.push(Clause::Filter(Box::new(pred)));
        self
    }

    /// Try each of `values` (port names) in order as local `name`.
    #[must_use]
    pub fn choice(mut self, name: &'static str, values: &[&str]) -> Self {
        self.clauses.push(Clause::Choice {
            name,
            values: values.iter().map(|v| IdString::new(v)).collect(),
        });
        self
    }

    /// Try each offset `0..bound` in order as local `name`.
    #[must_use]
    pub fn slice(
        mut self,
        name: &'static str,
        bound: impl Fn(&MatchView<'_>) -> usize + Send + Sync + 'static,
    ) -> Self {
        self.clauses.push(Clause::Slice {
            name,
            bound: Box::new(bound),
        });
        self
    }

    /// Compute a local value later clauses and `set`s can read.
    #[must_use]
    pub fn define(
        mut self,
        name: &'static str,
        value: impl Fn(&MatchView<'_>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.clauses.push(Clause::Define {
            name,
            value: Box::new(value),
        });
        self
    }

    /// Require the whole of `port` to equal `key`.
    #[must_use]
    pub fn index(
        self,
        port: PortSel,
        key: impl Fn(&Ctx<'_>, &State) -> SigSpec + Send + Sync + 'static,
    ) -> Self {
        self.index_bit(port, At::Whole, key)
    }

    /// Require one bit of `port` to equal the single-bit `key`.
    #[must_use]
    pub fn index_bit(
        mut self,
        port: PortSel,
        at: At,
        key: impl Fn(&Ctx<'_>, &State) -> SigSpec + Send + Sync + 'static,
    ) -> Self {
        self.clauses.push(Clause::Index(IndexClause {
            port,
            at,
            key: Box::new(key),
        }));
        self
    }

    /// After binding, store a value derived from the chosen candidate.
    #[must_use]
    pub fn set(
        mut self,
        var: &'static str,
        value: impl Fn(&MatchView<'_>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.sets.push((var, Box::new(value)));
        self
    }

    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.mode = MatchMode::Optional;
        self
    }

    #[must_use]
    pub const fn semioptional(mut self) -> Self {
        self.mode = MatchMode::Semioptional;
        self
    }

    #[must_use]
    pub const fn role(&self) -> &'static str {
        self.role
    }

    #[must_use]
    pub const fn mode(&self) -> MatchMode {
        self.mode
    }

    pub(crate) fn enabled(&self, ctx: &Ctx<'_>, st: &State) -> bool {
        self.guards.iter().all(|g| g(ctx, st))
    }

    pub(crate) fn choices(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.clauses.iter().filter_map(|c| match c {
            Clause::Choice { name, .. } => Some(*name),
            _ => None,
        })
    }

    pub(crate) fn slices(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.clauses.iter().filter_map(|c| match c {
            Clause::Slice { name, .. } => Some(*name),
            _ => None,
        })
    }
}

impl fmt::Debug for MatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchStep")
            .field("role", &self.role)
            .field("kinds", &self.kinds)
            .field("clauses", &self.clauses.len())
            .field("mode", &self.mode)
            .finish()
    }
}

/// A candidate cell as seen from inside a match step.
#[derive(Clone, Copy)]
pub struct MatchView<'a> {
    ctx: &'a Ctx<'a>,
    st: &'a State,
    cell: CellId,
    locals: &'a [(&'static str, Value)],
}

impl<'a> MatchView<'a> {
    pub(crate) const fn new(
        ctx: &'a Ctx<'a>,
        st: &'a State,
        cell: CellId,
        locals: &'a [(&'static str, Value)],
    ) -> Self {
        Self {
            ctx,
            st,
            cell,
            locals,
        }
    }

    #[must_use]
    pub const fn cell(&self) -> CellId {
        self.cell
    }

    #[must_use]
    pub const fn ctx(&self) -> &'a Ctx<'a> {
        self.ctx
    }

    #[must_use]
    pub const fn st(&self) -> &'a State {
        self.st
    }

    /// The candidate's signal on `name`; empty when unconnected.
    #[must_use]
    pub fn port(&self, name: &str) -> &'a SigSpec {
        self.ctx.port(self.cell, name)
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&'a ParamValue> {
        self.ctx.param(self.cell, name)
    }

    #[must_use]
    pub fn param_bool(&self, name: &str) -> bool {
        self.ctx.param_bool(self.cell, name)
    }

    #[must_use]
    pub fn users(&self, sig: &SigSpec) -> usize {
        self.ctx.users(sig)
    }

    /// A choice, slice or defined local of this step.
    ///
    /// # Panics
    ///
    /// Panics if no clause declared before the caller defines `name`.
    #[must_use]
    pub fn local(&self, name: &str) -> &'a Value {
        self.locals
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .unwrap_or_else(|| panic!("match local `{name}` is not defined at this point"))
    }

    /// Port name picked by choice `name`.
    #[must_use]
    pub fn ident(&self, name: &str) -> &'a IdString {
        match self.local(name) {
            Value::Ident(Some(id)) => id,
            other => panic!("match local `{name}` is {other:?}, not a choice"),
        }
    }

    /// The candidate's signal on the port picked by choice `name`.
    #[must_use]
    pub fn chosen(&self, name: &str) -> &'a SigSpec {
        self.port(self.ident(name))
    }

    /// Offset picked by slice `name`.
    #[must_use]
    pub fn offset(&self, name: &str) -> usize {
        match self.local(name) {
            Value::Int(i) => *i,
            other => panic!("match local `{name}` is {other:?}, not a slice"),
        }
    }

    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        match self.local(name) {
            Value::Bool(b) => *b,
            other => panic!("match local `{name}` is {other:?}, not a flag"),
        }
    }

    #[must_use]
    pub fn sig(&self, name: &str) -> &'a SigSpec {
        match self.local(name) {
            Value::Sig(s) => s,
            other => panic!("match local `{name}` is {other:?}, not a signal"),
        }
    }
}
