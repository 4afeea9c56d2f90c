//! Pattern definitions.
//!
//! A [`Pattern`] is an ordered list of [`Step`]s run against one anchor cell
//! at a time, plus a set of declared state variables and named
//! [`Subpattern`]s. Patterns are assembled with a [`PatternBuilder`], which
//! checks every variable reference and subpattern call before any search
//! runs.

mod code;
mod match_step;

use indexmap::IndexMap;
use itertools::Itertools;
use pmq_common::CellKind;

use crate::ctx::Ctx;
use crate::error::PatternError;
use crate::state::State;
use crate::value::VarType;

pub use self::code::{CallStep, CodeStep, Flow};
pub(crate) use self::match_step::{Clause, IndexClause};
pub use self::match_step::{At, MatchMode, MatchStep, MatchView, PortSel, chosen, port};

/// One step of a pattern or subpattern body.
#[derive(Debug)]
pub enum Step {
    Match(MatchStep),
    Code(CodeStep),
    Call(CallStep),
}

impl From<MatchStep> for Step {
    fn from(step: MatchStep) -> Self {
        Self::Match(step)
    }
}

impl From<CodeStep> for Step {
    fn from(step: CodeStep) -> Self {
        Self::Code(step)
    }
}

impl From<CallStep> for Step {
    fn from(step: CallStep) -> Self {
        Self::Call(step)
    }
}

type Decls = Vec<(&'static str, VarType)>;

/// A reusable block of steps with its own variable scope.
///
/// Parameters are bound from the caller's arguments, outputs are copied back
/// into same-named caller variables, and locals are private. All three start
/// at their defaults on every call.
#[derive(Debug)]
pub struct Subpattern {
    name: &'static str,
    params: Decls,
    outputs: Decls,
    locals: Decls,
    body: Vec<Step>,
}

impl Subpattern {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
            outputs: Vec::new(),
            locals: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, name: &'static str, ty: VarType) -> Self {
        self.params.push((name, ty));
        self
    }

    #[must_use]
    pub fn output(mut self, name: &'static str, ty: VarType) -> Self {
        self.outputs.push((name, ty));
        self
    }

    #[must_use]
    pub fn local(mut self, name: &'static str, ty: VarType) -> Self {
        self.locals.push((name, ty));
        self
    }

    #[must_use]
    pub fn step(mut self, step: impl Into<Step>) -> Self {
        self.body.push(step.into());
        self
    }

    /// Shorthand for a [`CodeStep`].
    #[must_use]
    pub fn code(
        self,
        label: &'static str,
        body: impl Fn(&Ctx<'_>, &mut State) -> Flow + Send + Sync + 'static,
    ) -> Self {
        self.step(CodeStep::new(label, body))
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn params(&self) -> &[(&'static str, VarType)] {
        &self.params
    }

    pub(crate) fn outputs(&self) -> &[(&'static str, VarType)] {
        &self.outputs
    }

    pub(crate) fn body(&self) -> &[Step] {
        &self.body
    }

    /// A fresh activation scope.
    pub(crate) fn scope(&self) -> State {
        State::new(
            self.name,
            self.params
                .iter()
                .chain(&self.outputs)
                .chain(&self.locals),
        )
    }
}

/// A validated pattern, ready to run.
#[derive(Debug)]
pub struct Pattern {
    name: &'static str,
    anchor: CellKind,
    root: &'static str,
    vars: Decls,
    body: Vec<Step>,
    subpatterns: Vec<Subpattern>,
}

impl Pattern {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Kind of cell every search starts from.
    #[must_use]
    pub const fn anchor(&self) -> CellKind {
        self.anchor
    }

    /// Variable the anchor cell is bound to.
    #[must_use]
    pub const fn root(&self) -> &'static str {
        self.root
    }

    #[must_use]
    pub fn body(&self) -> &[Step] {
        &self.body
    }

    pub(crate) fn subpattern(&self, target: usize) -> &Subpattern {
        &self.subpatterns[target]
    }

    /// A fresh top-level scope.
    pub(crate) fn scope(&self) -> State {
        State::new(self.name, &self.vars)
    }
}

/// Incrementally assembles a [`Pattern`].
#[derive(Debug)]
pub struct PatternBuilder {
    name: &'static str,
    anchor: CellKind,
    root: &'static str,
    vars: Decls,
    body: Vec<Step>,
    subpatterns: Vec<Subpattern>,
}

impl PatternBuilder {
    /// Start a pattern whose searches begin at each cell of kind `anchor`,
    /// bound to the cell variable `root`.
    #[must_use]
    pub fn new(name: &'static str, anchor: CellKind, root: &'static str) -> Self {
        Self {
            name,
            anchor,
            root,
            vars: vec![(root, VarType::Cell)],
            body: Vec::new(),
            subpatterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(mut self, name: &'static str, ty: VarType) -> Self {
        self.vars.push((name, ty));
        self
    }

    /// Declare several variables of one type.
    #[must_use]
    pub fn states(mut self, names: &[&'static str], ty: VarType) -> Self {
        self.vars.extend(names.iter().map(|n| (*n, ty)));
        self
    }

    #[must_use]
    pub fn step(mut self, step: impl Into<Step>) -> Self {
        self.body.push(step.into());
        self
    }

    /// Shorthand for a [`CodeStep`].
    #[must_use]
    pub fn code(
        self,
        label: &'static str,
        body: impl Fn(&Ctx<'_>, &mut State) -> Flow + Send + Sync + 'static,
    ) -> Self {
        self.step(CodeStep::new(label, body))
    }

    #[must_use]
    pub fn subpattern(mut self, sub: Subpattern) -> Self {
        self.subpatterns.push(sub);
        self
    }

    /// Check every reference and freeze the pattern.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found: duplicate declarations,
    /// references to undeclared variables or unknown subpatterns, calls with
    /// the wrong number or types of arguments, and index clauses naming a
    /// choice or slice their step does not declare.
    pub fn build(mut self) -> Result<Pattern, PatternError> {
        if let Some(name) = self.subpatterns.iter().map(|s| s.name).duplicates().next() {
            return Err(PatternError::DuplicateSubpattern(name));
        }

        let scope = declarations(self.name, &self.vars)?;
        let sigs: Vec<Signature> = self
            .subpatterns
            .iter()
            .map(|s| Signature {
                name: s.name,
                params: s.params.iter().map(|(_, ty)| *ty).collect(),
                outputs: s.outputs.clone(),
            })
            .collect();

        resolve_body(self.name, &scope, &mut self.body, &sigs)?;
        for sub in &mut self.subpatterns {
            let decls: Decls = sub
                .params
                .iter()
                .chain(&sub.outputs)
                .chain(&sub.locals)
                .copied()
                .collect();
            let scope = declarations(sub.name, &decls)?;
            resolve_body(sub.name, &scope, &mut sub.body, &sigs)?;
        }

        Ok(Pattern {
            name: self.name,
            anchor: self.anchor,
            root: self.root,
            vars: self.vars,
            body: self.body,
            subpatterns: self.subpatterns,
        })
    }
}

struct Signature {
    name: &'static str,
    params: Vec<VarType>,
    outputs: Decls,
}

fn declarations(
    scope: &'static str,
    decls: &[(&'static str, VarType)],
) -> Result<IndexMap<&'static str, VarType>, PatternError> {
    let mut map = IndexMap::new();
    for &(name, ty) in decls {
        if map.insert(name, ty).is_some() {
            return Err(PatternError::DuplicateVariable { scope, name });
        }
    }
    Ok(map)
}

fn expect_type(
    scope: &'static str,
    vars: &IndexMap<&'static str, VarType>,
    name: &'static str,
    expected: VarType,
) -> Result<(), PatternError> {
    match vars.get(name) {
        None => Err(PatternError::UndeclaredVariable { scope, name }),
        Some(&found) if found != expected => Err(PatternError::TypeMismatch {
            scope,
            name,
            expected,
            found,
        }),
        Some(_) => Ok(()),
    }
}

fn resolve_body(
    scope: &'static str,
    vars: &IndexMap<&'static str, VarType>,
    body: &mut [Step],
    sigs: &[Signature],
) -> Result<(), PatternError> {
    for step in body {
        match step {
            Step::Code(_) => {}
            Step::Match(m) => check_match(scope, vars, m)?,
            Step::Call(call) => {
                let name = call.subpattern();
                let Some(target) = sigs.iter().position(|s| s.name == name) else {
                    return Err(PatternError::UnknownSubpattern { scope, name });
                };
                let sig = &sigs[target];
                if sig.params.len() != call.args().len() {
                    return Err(PatternError::ArityMismatch {
                        scope,
                        subpattern: name,
                        expected: sig.params.len(),
                        found: call.args().len(),
                    });
                }
                for (&arg, &ty) in call.args().iter().zip(&sig.params) {
                    expect_type(scope, vars, arg, ty)?;
                }
                for &(out, ty) in &sig.outputs {
                    expect_type(scope, vars, out, ty)?;
                }
                call.target = target;
            }
        }
    }
    Ok(())
}

fn check_match(
    scope: &'static str,
    vars: &IndexMap<&'static str, VarType>,
    m: &MatchStep,
) -> Result<(), PatternError> {
    let role = m.role();
    expect_type(scope, vars, role, VarType::Cell)?;
    if m.kinds.is_empty() {
        return Err(PatternError::NoKinds { scope, role });
    }
    for &(var, _) in &m.sets {
        if !vars.contains_key(var) {
            return Err(PatternError::UndeclaredVariable { scope, name: var });
        }
    }
    for clause in &m.clauses {
        let Clause::Index(ix) = clause else {
            continue;
        };
        if let PortSel::Choice(choice) = ix.port {
            if !m.choices().any(|c| c == choice) {
                return Err(PatternError::UnknownChoice {
                    scope,
                    role,
                    choice,
                });
            }
        }
        if let At::Slice(slice) = ix.at {
            if !m.slices().any(|s| s == slice) {
                return Err(PatternError::UnknownSlice { scope, role, slice });
            }
        }
    }
    Ok(())
}
