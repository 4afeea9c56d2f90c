//! Gated-register subpatterns shared by every register stage of the DSP
//! pattern.
//!
//! A gated register is a rising-edge flop optionally fed through a reset
//! multiplexer (one data input tied to zero) and a clock-enable multiplexer
//! (hold input fed back from the flop's own output). [`in_dffe`] walks
//! upstream from a signal a register drives; [`out_dffe`] walks downstream
//! from a signal a register samples. Both publish the same `dff*` outputs so
//! the caller can commit them with [`RegVars::commit`](super::RegVars).

use pmq_common::{CellKind, SigBit, SigSpec, Trit};
use pmq_engine::{At, Ctx, Flow, MatchStep, MatchView, State, Subpattern, VarType, chosen, port};

pub(crate) const IN_DFFE: &str = "in_dffe";
pub(crate) const OUT_DFFE: &str = "out_dffe";

/// The other data input of a two-input cell.
pub(crate) fn other(name: &str) -> &'static str {
    if name == "A" { "B" } else { "A" }
}

/// `part` sits inside `sig` starting at `offset`.
pub(crate) fn covers(sig: &SigSpec, offset: usize, part: &SigSpec) -> bool {
    sig.len() >= offset + part.len() && sig.extract(offset, part.len()) == *part
}

pub(crate) fn first_bit(sig: &SigSpec) -> SigSpec {
    sig.first().map(SigSpec::from).unwrap_or_default()
}

/// Bits a register may drive: wired, not "keep", powering up as zero or x.
fn absorbable(cx: &Ctx<'_>, sig: &SigSpec) -> bool {
    !sig.is_empty()
        && sig.is_fully_wired()
        && !cx.has_keep(sig)
        && cx.init_of(sig).bits().iter().all(|&t| t != Trit::One)
}

fn on_clock(m: &MatchView<'_>, clock: SigBit) -> bool {
    clock == SigBit::UNDEF || m.port("CLK").first() == Some(clock)
}

fn cursor_set(_: &Ctx<'_>, st: &State) -> bool {
    !st.sig("cursor").is_empty()
}

fn cursor_key(_: &Ctx<'_>, st: &State) -> SigSpec {
    st.sig("cursor").clone()
}

fn cursor_lsb(_: &Ctx<'_>, st: &State) -> SigSpec {
    first_bit(st.sig("cursor"))
}

fn plumbing(sub: Subpattern) -> Subpattern {
    sub.output("dff", VarType::Cell)
        .output("dff_clock", VarType::Bit)
        .output("dff_cemux", VarType::Cell)
        .output("dff_cepol", VarType::Bool)
        .output("dff_rstmux", VarType::Cell)
        .output("dff_rstpol", VarType::Bool)
        .local("ff", VarType::Cell)
        .local("offset", VarType::Int)
        .local("cursor", VarType::Sig)
        .local("cemux", VarType::Cell)
        .local("cepol", VarType::Bool)
        .local("rstmux", VarType::Cell)
        .local("rstpol", VarType::Bool)
}

/// Register driving `arg_q`, looked for upstream.
///
/// Args: `arg_q` (Sig), `clock` (Bit, undefined for any clock). Outputs:
/// `dff`, `dff_clock`, the mux roles and polarities, and `dff_d`, the signal
/// feeding the chain at the same width as `arg_q`.
///
/// The register may be wider than `arg_q`; its muxes are matched against the
/// whole D and Q ports and `dff_d` keeps only the bits behind `arg_q`.
pub(crate) fn in_dffe() -> Subpattern {
    plumbing(Subpattern::new(IN_DFFE))
        .param("arg_q", VarType::Sig)
        .param("clock", VarType::Bit)
        .output("dff_d", VarType::Sig)
        .local("q", VarType::Sig)
        .step(
            MatchStep::new("ff")
                .when(|cx, st| absorbable(cx, st.sig("arg_q")))
                .kind(CellKind::Dff)
                .select(|m| m.param_bool("CLK_POLARITY"))
                .slice("off", |m| m.port("D").len())
                .index_bit(port("Q"), At::Slice("off"), |_, st| first_bit(st.sig("arg_q")))
                .filter(|m| covers(m.port("Q"), m.offset("off"), m.st().sig("arg_q")))
                .filter(|m| on_clock(m, m.st().bit("clock")))
                .optional(),
        )
        .code("ff_data", |cx, st| {
            let Some(ff) = st.cell("ff") else {
                return Flow::Next;
            };
            let (d, q) = (cx.port(ff, "D"), cx.port(ff, "Q"));
            let mut dff_d = st.sig("arg_q").clone();
            dff_d.replace(q, d);
            let clock = cx.port(ff, "CLK").first().unwrap_or(SigBit::UNDEF);
            // Muxes may only be absorbed when the flop is their sole reader.
            let cursor = if cx.users(&dff_d) == 1 {
                d.clone()
            } else {
                SigSpec::new()
            };
            st.set("dff", ff);
            st.set("dff_clock", clock);
            st.set("dff_d", dff_d);
            st.set("q", q.clone());
            st.set("cursor", cursor);
            Flow::Next
        })
        .step(
            MatchStep::new("rstmux")
                .when(cursor_set)
                .kind(CellKind::Mux)
                .index(port("Y"), cursor_key)
                .choice("ba", &["B", "A"])
                .filter(|m| m.chosen("ba").is_fully_zero())
                .set("rstpol", |m| (m.ident("ba") == "B").into())
                .semioptional(),
        )
        .code("rst_data", |cx, st| {
            let Some(rst) = st.cell("rstmux") else {
                return Flow::Next;
            };
            let pol = st.flag("rstpol");
            let data = cx.port(rst, if pol { "A" } else { "B" });
            let mut dff_d = st.sig("dff_d").clone();
            dff_d.replace(cx.port(rst, "Y"), data);
            let feedback = cx.users(st.sig("q")) >= 2 && cx.users(data) == 1;
            st.set("cursor", if feedback { data.clone() } else { SigSpec::new() });
            st.set("dff_rstmux", rst);
            st.set("dff_rstpol", pol);
            st.set("dff_d", dff_d);
            Flow::Next
        })
        .step(
            MatchStep::new("cemux")
                .when(cursor_set)
                .kind(CellKind::Mux)
                .index(port("Y"), cursor_key)
                .choice("hold", &["A", "B"])
                .index(chosen("hold"), |_, st| st.sig("q").clone())
                .set("cepol", |m| (m.ident("hold") == "A").into())
                .semioptional(),
        )
        .code("ce_data", |cx, st| {
            if let Some(ce) = st.cell("cemux") {
                let pol = st.flag("cepol");
                let data = cx.port(ce, if pol { "B" } else { "A" });
                let mut dff_d = st.sig("dff_d").clone();
                dff_d.replace(cx.port(ce, "Y"), data);
                st.set("dff_cemux", ce);
                st.set("dff_cepol", pol);
                st.set("dff_d", dff_d);
            }
            Flow::Next
        })
}

/// Register sampling `arg_d`, looked for downstream.
///
/// Args: `arg_d` (Sig), `clock` (Bit). Outputs: `dff`, `dff_clock`, the mux
/// roles and polarities, and `dff_q`, the register output at the width of
/// `arg_d`. A mux chain that does not end in a register rejects.
pub(crate) fn out_dffe() -> Subpattern {
    plumbing(Subpattern::new(OUT_DFFE))
        .param("arg_d", VarType::Sig)
        .param("clock", VarType::Bit)
        .output("dff_q", VarType::Sig)
        .local("hold", VarType::Sig)
        .code("start", |cx, st| {
            let d = st.sig("arg_d");
            if !d.is_empty() && d.is_fully_wired() && !cx.has_keep(d) {
                let d = d.clone();
                st.set("cursor", d);
            }
            Flow::Next
        })
        .step(
            MatchStep::new("cemux")
                .when(cursor_set)
                .kind(CellKind::Mux)
                .select(|m| m.users(m.port("Y")) == 1)
                .choice("data", &["B", "A"])
                // The hold net is read by the mux and something downstream.
                .filter(|m| m.users(m.port(other(m.ident("data")))) >= 2)
                .slice("off", |m| m.port("Y").len())
                .index_bit(chosen("data"), At::Slice("off"), cursor_lsb)
                .filter(|m| covers(m.chosen("data"), m.offset("off"), m.st().sig("cursor")))
                .set("offset", |m| m.offset("off").into())
                .set("cepol", |m| (m.ident("data") == "B").into())
                .semioptional(),
        )
        .code("ce_commit", |cx, st| {
            let Some(ce) = st.cell("cemux") else {
                return Flow::Next;
            };
            let pol = st.flag("cepol");
            let (off, len) = (st.int("offset"), st.sig("cursor").len());
            let hold = cx.port(ce, if pol { "A" } else { "B" }).extract(off, len);
            let y = cx.port(ce, "Y").extract(off, len);
            st.set("hold", hold);
            st.set("cursor", y);
            st.set("dff_cemux", ce);
            st.set("dff_cepol", pol);
            Flow::Next
        })
        .step(
            MatchStep::new("rstmux")
                .when(cursor_set)
                .kind(CellKind::Mux)
                .select(|m| m.users(m.port("Y")) == 1)
                .choice("data", &["A", "B"])
                .filter(|m| m.port(other(m.ident("data"))).is_fully_zero())
                .slice("off", |m| m.port("Y").len())
                .index_bit(chosen("data"), At::Slice("off"), cursor_lsb)
                .filter(|m| {
                    m.st().cell("cemux").is_none() || m.st().int("offset") == m.offset("off")
                })
                .filter(|m| covers(m.chosen("data"), m.offset("off"), m.st().sig("cursor")))
                .set("offset", |m| m.offset("off").into())
                .set("rstpol", |m| (m.ident("data") == "A").into())
                .semioptional(),
        )
        .code("rst_commit", |cx, st| {
            let Some(rst) = st.cell("rstmux") else {
                return Flow::Next;
            };
            let (off, len) = (st.int("offset"), st.sig("cursor").len());
            let y = cx.port(rst, "Y").extract(off, len);
            let pol = st.flag("rstpol");
            st.set("cursor", y);
            st.set("dff_rstmux", rst);
            st.set("dff_rstpol", pol);
            Flow::Next
        })
        .step(
            MatchStep::new("ff")
                .when(cursor_set)
                .kind(CellKind::Dff)
                .select(|m| m.param_bool("CLK_POLARITY"))
                .slice("off", |m| m.port("D").len())
                .index_bit(port("D"), At::Slice("off"), cursor_lsb)
                .filter(|m| {
                    let st = m.st();
                    (st.cell("cemux").is_none() && st.cell("rstmux").is_none())
                        || st.int("offset") == m.offset("off")
                })
                .filter(|m| covers(m.port("D"), m.offset("off"), m.st().sig("cursor")))
                .filter(|m| {
                    m.st().cell("cemux").is_none()
                        || covers(m.port("Q"), m.offset("off"), m.st().sig("hold"))
                })
                .filter(|m| on_clock(m, m.st().bit("clock")))
                .filter(|m| {
                    let q = m.port("Q").extract(m.offset("off"), m.st().sig("cursor").len());
                    absorbable(m.ctx(), &q)
                })
                .set("offset", |m| m.offset("off").into())
                .optional(),
        )
        .code("ff_commit", |cx, st| {
            let Some(ff) = st.cell("ff") else {
                if st.cell("cemux").is_some() || st.cell("rstmux").is_some() {
                    return Flow::Reject;
                }
                return Flow::Next;
            };
            let q = cx
                .port(ff, "Q")
                .extract(st.int("offset"), st.sig("cursor").len());
            let clock = cx.port(ff, "CLK").first().unwrap_or(SigBit::UNDEF);
            st.set("dff", ff);
            st.set("dff_clock", clock);
            st.set("dff_q", q);
            Flow::Next
        })
}
