use std::fmt;

use crate::ctx::Ctx;
use crate::state::State;

/// What a code step tells the search to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the following step.
    Next,
    /// Abandon this branch; backtrack to the most recent open alternative.
    Reject,
    /// Stop searching this root and emit the current state.
    Accept,
}

pub(crate) type CodeFn = Box<dyn Fn(&Ctx<'_>, &mut State) -> Flow + Send + Sync>;
pub(crate) type Guard = Box<dyn Fn(&Ctx<'_>, &State) -> bool + Send + Sync>;

/// Imperative checks and state updates between match steps.
pub struct CodeStep {
    label: &'static str,
    body: CodeFn,
}

impl CodeStep {
    #[must_use]
    pub fn new(
        label: &'static str,
        body: impl Fn(&Ctx<'_>, &mut State) -> Flow + Send + Sync + 'static,
    ) -> Self {
        Self {
            label,
            body: Box::new(body),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn run(&self, ctx: &Ctx<'_>, st: &mut State) -> Flow {
        (self.body)(ctx, st)
    }
}

impl fmt::Debug for CodeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeStep").field("label", &self.label).finish()
    }
}

/// Invocation of a named subpattern.
///
/// Arguments are caller variables bound positionally to the subpattern's
/// parameters. On return the (possibly updated) parameters are written back
/// into the arguments, and every subpattern output is copied into the
/// caller variable of the same name.
pub struct CallStep {
    subpattern: &'static str,
    args: Vec<&'static str>,
    guard: Option<Guard>,
    /// Position of the callee in the pattern, resolved when the pattern is
    /// built.
    pub(crate) target: usize,
}

impl CallStep {
    #[must_use]
    pub fn new(subpattern: &'static str, args: &[&'static str]) -> Self {
        Self {
            subpattern,
            args: args.to_vec(),
            guard: None,
            target: usize::MAX,
        }
    }

    /// Only call when `guard` holds. A skipped call leaves the subpattern's
    /// outputs at their defaults in the caller.
    #[must_use]
    pub fn when(
        mut self,
        guard: impl Fn(&Ctx<'_>, &State) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    #[must_use]
    pub const fn subpattern(&self) -> &'static str {
        self.subpattern
    }

    #[must_use]
    pub fn args(&self) -> &[&'static str] {
        &self.args
    }

    pub(crate) fn enabled(&self, ctx: &Ctx<'_>, st: &State) -> bool {
        self.guard.as_ref().is_none_or(|g| g(ctx, st))
    }
}

impl fmt::Debug for CallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallStep")
            .field("subpattern", &self.subpattern)
            .field("args", &self.args)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}
