//! Depth-first execution of a pattern body from one root.
//!
//! The search is a recursion over match steps: each candidate gets its own
//! copy of the state and of the call stack, so backtracking is just
//! returning. Code and call steps run inline between match steps.

use std::ops::ControlFlow;

use pmq_common::CellId;
use tracing::trace;

use crate::ctx::Ctx;
use crate::pattern::{CallStep, Flow, MatchMode, MatchStep, MatchView, Pattern, Step, Subpattern};
use crate::search::candidates;
use crate::search::stats::SearchStats;
use crate::state::State;

/// A body being executed, and where it returns to.
#[derive(Clone)]
struct Frame<'p> {
    body: &'p [Step],
    pc: usize,
    call: Option<Suspended<'p>>,
}

/// A caller waiting for a subpattern to finish.
#[derive(Clone)]
struct Suspended<'p> {
    site: &'p CallStep,
    sub: &'p Subpattern,
    caller: State,
}

impl Suspended<'_> {
    /// Hand the callee's results back to the caller.
    fn resume(self, callee: &State) -> State {
        let mut caller = self.caller;
        for (&arg, &(param, _)) in self.site.args().iter().zip(self.sub.params()) {
            caller.set(arg, callee.get(param).clone());
        }
        for &(out, _) in self.sub.outputs() {
            caller.set(out, callee.get(out).clone());
        }
        caller
    }
}

fn advance(frames: &mut [Frame<'_>]) {
    if let Some(top) = frames.last_mut() {
        top.pc += 1;
    }
}

pub(crate) struct Search<'p, 'n> {
    ctx: Ctx<'n>,
    pattern: &'p Pattern,
    pub(crate) stats: SearchStats,
}

impl<'p, 'n> Search<'p, 'n> {
    pub(crate) const fn new(ctx: Ctx<'n>, pattern: &'p Pattern) -> Self {
        Self {
            ctx,
            pattern,
            stats: SearchStats {
                roots: 1,
                accepted: 0,
                candidates: 0,
                branches: 0,
                rejected: 0,
                dead_ends: 0,
            },
        }
    }

    /// Run the pattern with its root bound to `root`; the accepted top-level
    /// state, if any.
    pub(crate) fn run(&mut self, root: CellId) -> Option<State> {
        let mut st = self.pattern.scope();
        st.set(self.pattern.root(), root);
        let frames = vec![Frame {
            body: self.pattern.body(),
            pc: 0,
            call: None,
        }];
        match self.exec(frames, st) {
            ControlFlow::Break(st) => {
                self.stats.accepted += 1;
                Some(st)
            }
            ControlFlow::Continue(()) => None,
        }
    }

    fn exec(&mut self, mut frames: Vec<Frame<'p>>, mut st: State) -> ControlFlow<State> {
        loop {
            let Some((body, pc)) = frames.last().map(|f| (f.body, f.pc)) else {
                return ControlFlow::Continue(());
            };

            let Some(step) = body.get(pc) else {
                match frames.pop().and_then(|f| f.call) {
                    Some(call) => {
                        trace!(subpattern = call.sub.name(), "return");
                        st = call.resume(&st);
                        advance(&mut frames);
                        continue;
                    }
                    None => {
                        trace!("end of pattern without accept");
                        self.stats.dead_ends += 1;
                        return ControlFlow::Continue(());
                    }
                }
            };

            match step {
                Step::Code(code) => match code.run(&self.ctx, &mut st) {
                    Flow::Next => advance(&mut frames),
                    Flow::Reject => {
                        trace!(step = code.label(), "reject");
                        self.stats.rejected += 1;
                        return ControlFlow::Continue(());
                    }
                    Flow::Accept => {
                        trace!(step = code.label(), "accept");
                        return ControlFlow::Break(unwind(frames, st));
                    }
                },
                Step::Call(call) => {
                    let sub = self.pattern.subpattern(call.target);
                    for &(out, _) in sub.outputs() {
                        st.clear(out);
                    }
                    if !call.enabled(&self.ctx, &st) {
                        trace!(subpattern = sub.name(), "call skipped");
                        advance(&mut frames);
                        continue;
                    }
                    trace!(subpattern = sub.name(), "call");
                    let mut callee = sub.scope();
                    for (&arg, &(param, _)) in call.args().iter().zip(sub.params()) {
                        callee.set(param, st.get(arg).clone());
                    }
                    frames.push(Frame {
                        body: sub.body(),
                        pc: 0,
                        call: Some(Suspended {
                            site: call,
                            sub,
                            caller: st,
                        }),
                    });
                    st = callee;
                }
                Step::Match(m) => return self.branch(m, frames, st),
            }
        }
    }

    /// Try every alternative of a match step in order.
    fn branch(
        &mut self,
        step: &'p MatchStep,
        mut frames: Vec<Frame<'p>>,
        mut st: State,
    ) -> ControlFlow<State> {
        if !step.enabled(&self.ctx, &st) {
            trace!(role = step.role(), "match skipped");
            st.clear(step.role());
            advance(&mut frames);
            return self.exec(frames, st);
        }

        let found = candidates::collect(step, &self.ctx, &st, |cell| {
            st.holds_cell(cell)
                || frames
                    .iter()
                    .filter_map(|f| f.call.as_ref())
                    .any(|c| c.caller.holds_cell(cell))
        });
        self.stats.candidates += found.len();
        trace!(role = step.role(), candidates = found.len(), "match");

        for cand in &found {
            let view = MatchView::new(&self.ctx, &st, cand.cell, &cand.locals);
            let updates: Vec<_> = step
                .sets
                .iter()
                .map(|(var, value)| (*var, value(&view)))
                .collect();

            let mut next = st.clone();
            next.set(step.role(), cand.cell);
            for (var, value) in updates {
                next.set(var, value);
            }
            let mut next_frames = frames.clone();
            advance(&mut next_frames);
            self.stats.branches += 1;
            self.exec(next_frames, next)?;
        }

        let unbound = match step.mode() {
            MatchMode::Required => false,
            MatchMode::Optional => found.is_empty(),
            MatchMode::Semioptional => true,
        };
        if unbound {
            st.clear(step.role());
            advance(&mut frames);
            self.stats.branches += 1;
            return self.exec(frames, st);
        }
        if found.is_empty() {
            self.stats.rejected += 1;
        }
        ControlFlow::Continue(())
    }
}

/// Fold any open subpattern activations back into the top-level scope.
fn unwind(mut frames: Vec<Frame<'_>>, mut st: State) -> State {
    while let Some(frame) = frames.pop() {
        if let Some(call) = frame.call {
            st = call.resume(&st);
        }
    }
    st
}
