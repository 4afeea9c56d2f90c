//! Candidate enumeration for a single match step.

use std::collections::BTreeSet;

use pmq_common::{CellId, IdString, PortIdx, SigSpec};

use crate::ctx::Ctx;
use crate::pattern::{At, Clause, IndexClause, MatchStep, MatchView, PortSel};
use crate::state::State;
use crate::value::Value;

/// A cell that satisfies every clause, with the choices, slices and defined
/// values that made it do so.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub cell: CellId,
    pub locals: Vec<(&'static str, Value)>,
}

/// Every candidate of `step`, ordered by cell id and then by the declaration
/// order of each choice and slice.
///
/// Cells for which `claimed` holds are skipped, as are cells of kinds the
/// step does not select.
pub(crate) fn collect(
    step: &MatchStep,
    ctx: &Ctx<'_>,
    st: &State,
    claimed: impl Fn(CellId) -> bool,
) -> Vec<Candidate> {
    let keys: Vec<Option<SigSpec>> = step
        .clauses
        .iter()
        .map(|c| match c {
            Clause::Index(ix) => Some((ix.key)(ctx, st)),
            _ => None,
        })
        .collect();

    // An index against nothing matches nothing.
    if keys.iter().flatten().any(SigSpec::is_empty) {
        return Vec::new();
    }

    let walker = Walker {
        step,
        ctx,
        st,
        keys: &keys,
    };
    let mut out = Vec::new();
    for cell in seed(step, ctx, &keys) {
        if !step.kinds.contains(&ctx.cell(cell).kind()) || claimed(cell) {
            continue;
        }
        let mut locals = Vec::new();
        walker.walk(cell, 0, &mut locals, &mut out);
    }
    out
}

/// Initial pool: the cells touching the key of the first index clause, or
/// every cell of the selected kinds when the step has no index clause.
fn seed(step: &MatchStep, ctx: &Ctx<'_>, keys: &[Option<SigSpec>]) -> BTreeSet<CellId> {
    let first = step
        .clauses
        .iter()
        .zip(keys)
        .find_map(|(c, k)| match (c, k) {
            (Clause::Index(ix), Some(key)) => Some((ix, key)),
            _ => None,
        });

    let Some((ix, key)) = first else {
        return step
            .kinds
            .iter()
            .flat_map(|k| ctx.index().cells_of_kind(*k).iter().copied())
            .collect();
    };

    let ports = allowed_ports(step, ix);
    let allowed = |cell: CellId, port: PortIdx| {
        let name = ctx.cell(cell).port_name(port);
        ports.iter().any(|p| p == name)
    };
    if matches!(ix.at, At::Whole) {
        return ctx
            .index()
            .ports_matching(ctx.netlist(), key)
            .into_iter()
            .filter(|&(cell, port)| allowed(cell, port))
            .map(|(cell, _)| cell)
            .collect();
    }
    let Some(bit) = key.first() else {
        return BTreeSet::new();
    };
    ctx.index()
        .lookup(bit)
        .iter()
        .filter(|r| matches!(ix.at, At::Slice(_)) || r.offset == 0)
        .filter(|r| allowed(r.cell, r.port))
        .map(|r| r.cell)
        .collect()
}

fn allowed_ports(step: &MatchStep, ix: &IndexClause) -> Vec<IdString> {
    match &ix.port {
        PortSel::Fixed(p) => vec![p.clone()],
        PortSel::Choice(choice) => step
            .clauses
            .iter()
            .find_map(|c| match c {
                Clause::Choice { name, values } if name == choice => Some(values.clone()),
                _ => None,
            })
            .unwrap_or_default(),
    }
}

struct Walker<'w, 'n> {
    step: &'w MatchStep,
    ctx: &'w Ctx<'n>,
    st: &'w State,
    keys: &'w [Option<SigSpec>],
}

impl Walker<'_, '_> {
    fn walk(
        &self,
        cell: CellId,
        at: usize,
        locals: &mut Vec<(&'static str, Value)>,
        out: &mut Vec<Candidate>,
    ) {
        let Some(clause) = self.step.clauses.get(at) else {
            out.push(Candidate {
                cell,
                locals: locals.clone(),
            });
            return;
        };
        let view = MatchView::new(self.ctx, self.st, cell, locals.as_slice());
        match clause {
            Clause::Select(pred) | Clause::Filter(pred) => {
                if pred(&view) {
                    self.walk(cell, at + 1, locals, out);
                }
            }
            Clause::Choice { name, values } => {
                for value in values {
                    locals.push((*name, Value::Ident(Some(value.clone()))));
                    self.walk(cell, at + 1, locals, out);
                    locals.pop();
                }
            }
            Clause::Slice { name, bound } => {
                let bound = bound(&view);
                for offset in 0..bound {
                    locals.push((*name, Value::Int(offset)));
                    self.walk(cell, at + 1, locals, out);
                    locals.pop();
                }
            }
            Clause::Define { name, value } => {
                let value = value(&view);
                locals.push((*name, value));
                self.walk(cell, at + 1, locals, out);
                locals.pop();
            }
            Clause::Index(ix) => {
                let key = self.keys[at].as_ref();
                if key.is_some_and(|k| index_holds(ix, &view, k)) {
                    self.walk(cell, at + 1, locals, out);
                }
            }
        }
    }
}

fn index_holds(ix: &IndexClause, view: &MatchView<'_>, key: &SigSpec) -> bool {
    let sig = match &ix.port {
        PortSel::Fixed(p) => view.port(p),
        PortSel::Choice(choice) => view.chosen(choice),
    };
    match ix.at {
        At::Whole => sig == key,
        At::Lsb => sig.first().is_some() && sig.first() == key.first(),
        At::Slice(slice) => {
            let bit = sig.get(view.offset(slice));
            bit.is_some() && bit == key.first()
        }
    }
}

#[cfg(test)]
mod tests {
    use pmq_common::{Cell, CellKind, Netlist, NetlistBuilder};

    use super::*;
    use crate::index::NetlistIndex;
    use crate::pattern::{chosen, port};
    use crate::value::VarType;

    lazy_static::lazy_static! {
        // Two muxes reading `x`: m0 on A, m1 on B.
        static ref MUXES: Netlist = {
            let mut b = NetlistBuilder::new("muxes");
            let x = b.input("x", 2);
            let y = b.input("y", 2);
            let s = b.input("s", 1);
            let o0 = b.output("o0", 2);
            let o1 = b.output("o1", 2);
            b.add_cell(Cell::mux("m0", x.clone(), y.clone(), s.clone(), o0));
            b.add_cell(Cell::mux("m1", y, x, s, o1));
            b.build().unwrap()
        };
    }

    fn state_with_x() -> State {
        let mut st = State::new("t", &[("x", VarType::Sig)]);
        let x = MUXES.cell(CellId::new(0)).port("A").unwrap().clone();
        st.set("x", x);
        st
    }

    #[test]
    fn choice_fans_out_in_declaration_order() {
        let idx = NetlistIndex::build(&MUXES);
        let ctx = Ctx::new(&MUXES, &idx);
        let step = MatchStep::new("m")
            .kind(CellKind::Mux)
            .choice("ab", &["A", "B"])
            .index(chosen("ab"), |_, st| st.sig("x").clone());
        let found = collect(&step, &ctx, &state_with_x(), |_| false);
        let got: Vec<(CellId, Value)> = found
            .iter()
            .map(|c| (c.cell, c.locals[0].1.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                (CellId::new(0), Value::from(IdString::new("A"))),
                (CellId::new(1), Value::from(IdString::new("B"))),
            ]
        );
    }

    #[test]
    fn claimed_cells_are_skipped() {
        let idx = NetlistIndex::build(&MUXES);
        let ctx = Ctx::new(&MUXES, &idx);
        let step = MatchStep::new("m")
            .kind(CellKind::Mux)
            .choice("ab", &["A", "B"])
            .index(chosen("ab"), |_, st| st.sig("x").clone());
        let found = collect(&step, &ctx, &state_with_x(), |c| c == CellId::new(0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cell, CellId::new(1));
    }

    #[test]
    fn slice_matches_single_bit_at_offset() {
        let idx = NetlistIndex::build(&MUXES);
        let ctx = Ctx::new(&MUXES, &idx);
        let step = MatchStep::new("m")
            .kind(CellKind::Mux)
            .slice("off", |v| v.port("A").len())
            .index_bit(port("A"), At::Slice("off"), |_, st| {
                st.sig("x").extract(1, 1)
            });
        let found = collect(&step, &ctx, &state_with_x(), |_| false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cell, CellId::new(0));
        assert_eq!(found[0].locals, vec![("off", Value::Int(1))]);
    }

    #[test]
    fn empty_key_matches_nothing() {
        let idx = NetlistIndex::build(&MUXES);
        let ctx = Ctx::new(&MUXES, &idx);
        let step = MatchStep::new("m")
            .kind(CellKind::Mux)
            .index(port("A"), |_, _| SigSpec::new());
        assert!(collect(&step, &ctx, &state_with_x(), |_| false).is_empty());
    }

    #[test]
    fn without_index_every_cell_of_kind_is_tried() {
        let idx = NetlistIndex::build(&MUXES);
        let ctx = Ctx::new(&MUXES, &idx);
        let step = MatchStep::new("m").kind(CellKind::Mux);
        let found = collect(&step, &ctx, &state_with_x(), |_| false);
        assert_eq!(
            found.iter().map(|c| c.cell).collect::<Vec<_>>(),
            vec![CellId::new(0), CellId::new(1)]
        );
    }
}
