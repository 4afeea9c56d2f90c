//! The stages of the DSP packing pattern, appended in search order.

use pmq_common::{CellId, CellKind, SigBit, SigSpec};
use pmq_engine::{At, CallStep, Ctx, Flow, MatchStep, PatternBuilder, State, chosen, port};
use tracing::trace;

use super::registers::{IN_DFFE, OUT_DFFE, first_bit, other};
use super::{A1, A2, AD, B1, B2, D, DspLimits, M, P, RegVars};

type StepGuard = Box<dyn Fn(&Ctx<'_>, &State) -> bool + Send + Sync>;

/// `port` of the anchor with redundant sign extension dropped.
fn operand(cx: &Ctx<'_>, dsp: CellId, port: &str) -> SigSpec {
    cx.port(dsp, port).trim_sign_extension()
}

fn dsp_clock(cx: &Ctx<'_>, dsp: CellId) -> SigBit {
    cx.port(dsp, "CLK")
        .first()
        .filter(|b| b.is_wire())
        .unwrap_or(SigBit::UNDEF)
}

/// The anchor's register parameter `param` is clear.
fn unregistered(param: &'static str) -> StepGuard {
    Box::new(move |cx: &Ctx<'_>, st: &State| {
        st.cell("dsp")
            .is_some_and(|dsp| cx.param_int(dsp, param) == 0)
    })
}

/// Stage 1: trimmed operands, the used part of the product and the clock.
pub(super) fn anchor(p: PatternBuilder) -> PatternBuilder {
    p.code("operands", |cx, st| {
        let Some(dsp) = st.cell("dsp") else {
            return Flow::Reject;
        };
        let product = cx.port(dsp, "P");
        let sig_m = if cx.param_str(dsp, "USE_MULT") == "MULTIPLY" {
            let used = product
                .bits()
                .iter()
                .rposition(|&b| cx.users(&SigSpec::from(b)) > 0)
                .map_or(0, |msb| msb + 1);
            product.extract(0, used)
        } else {
            product.clone()
        };
        if sig_m.is_empty() {
            trace!(dsp = %cx.cell(dsp).name(), "product has no readers");
            return Flow::Reject;
        }
        st.set("sig_a", operand(cx, dsp, "A"));
        st.set("sig_b", operand(cx, dsp, "B"));
        st.set("sig_c", cx.port(dsp, "C").clone());
        st.set("sig_d", cx.port(dsp, "D").clone());
        st.set("sig_m", sig_m);
        st.set("clock", dsp_clock(cx, dsp));
        Flow::Next
    })
}

/// Call the upstream register subpattern on `sig` and commit a hit as `reg`.
fn seek_input(
    p: PatternBuilder,
    labels: [&'static str; 2],
    reg: RegVars,
    sig: &'static str,
    enabled: StepGuard,
) -> PatternBuilder {
    p.code(labels[0], move |_, st| {
        let arg = st.sig(sig).clone();
        st.set("arg_q", arg);
        Flow::Next
    })
    .step(CallStep::new(IN_DFFE, &["arg_q", "clock"]).when(enabled))
    .code(labels[1], move |_, st| {
        if st.cell("dff").is_some() {
            reg.commit(st);
            let d = st.sig("dff_d").clone();
            st.set(sig, d);
        }
        Flow::Next
    })
}

/// Second register stage behind `first`, kept only when gated the same way.
fn seek_second(
    p: PatternBuilder,
    labels: [&'static str; 2],
    first: RegVars,
    second: RegVars,
    sig: &'static str,
) -> PatternBuilder {
    p.code(labels[0], move |_, st| {
        let arg = st.sig(sig).clone();
        st.set("arg_q", arg);
        Flow::Next
    })
    .step(
        CallStep::new(IN_DFFE, &["arg_q", "clock"]).when(move |_, st| st.cell(first.ff).is_some()),
    )
    .code(labels[1], move |cx, st| {
        if st.cell("dff").is_none() || !first.gated_like_dff(cx, st) {
            return Flow::Next;
        }
        second.commit(st);
        let d = st.sig("dff_d").clone();
        st.set(sig, d);
        Flow::Next
    })
}

/// Stages 2 to 4: AD register, pre-adder, A2 and A1 registers.
pub(super) fn a_operand(p: PatternBuilder, limits: DspLimits) -> PatternBuilder {
    let p = seek_input(p, ["ad_seek", "ad_commit"], AD, "sig_a", unregistered("ADREG"));
    let p = p
        .step(
            MatchStep::new("pre_add")
                .when(|cx, st| {
                    let d = st.sig("sig_d");
                    st.cell("dsp").is_some_and(|dsp| {
                        (d.is_empty() || d.is_fully_zero())
                            && cx.param_str(dsp, "USE_DPORT") == "FALSE"
                            && cx.port(dsp, "INMODE").is_fully_zero()
                    })
                })
                .kind(CellKind::Add)
                .select(move |m| m.port("Y").len() <= limits.pre_add)
                .select(|m| m.users(m.port("Y")) == 1)
                .choice("ab", &["A", "B"])
                .filter(move |m| m.chosen("ab").len() <= limits.a)
                .filter(move |m| m.port(other(m.ident("ab"))).len() <= limits.d)
                .index(port("Y"), |_, st| st.sig("sig_a").clone())
                .set("pre_add_ab", |m| m.ident("ab").clone().into())
                .optional(),
        )
        .code("pre_add_operands", |cx, st| {
            let (Some(add), Some(ab)) = (st.cell("pre_add"), st.ident("pre_add_ab")) else {
                return Flow::Next;
            };
            let (a, d) = (cx.port(add, ab).clone(), cx.port(add, other(ab)).clone());
            st.set("sig_a", a);
            st.set("sig_d", d);
            Flow::Next
        });
    let a2_enabled = unregistered("AREG");
    let p = seek_input(
        p,
        ["a2_seek", "a2_commit"],
        A2,
        "sig_a",
        Box::new(move |cx: &Ctx<'_>, st: &State| {
            st.cell("pre_add").is_some() && a2_enabled(cx, st)
        }),
    )
    .code("a2_from_ad", |cx, st| {
        // Without a pre-adder the register in front of A is A2, not AD.
        if st.cell("pre_add").is_some() || st.cell(AD.ff).is_none() {
            return Flow::Next;
        }
        let Some(dsp) = st.cell("dsp") else {
            return Flow::Reject;
        };
        if cx.param_int(dsp, "AREG") == 0 {
            AD.move_to(A2, st);
        } else {
            AD.clear(st);
            st.set("sig_a", operand(cx, dsp, "A"));
            st.set("clock", dsp_clock(cx, dsp));
        }
        Flow::Next
    });
    seek_second(p, ["a1_seek", "a1_commit"], A2, A1, "sig_a")
}

/// Stage 5: B2 and B1 registers.
pub(super) fn b_operand(p: PatternBuilder) -> PatternBuilder {
    let p = seek_input(p, ["b2_seek", "b2_commit"], B2, "sig_b", unregistered("BREG"));
    seek_second(p, ["b1_seek", "b1_commit"], B2, B1, "sig_b")
}

/// Stage 6: D register.
pub(super) fn d_operand(p: PatternBuilder) -> PatternBuilder {
    seek_input(p, ["d_seek", "d_commit"], D, "sig_d", unregistered("DREG"))
}

/// Call the downstream register subpattern on `sig` and commit a hit as
/// `reg`.
fn seek_output(
    p: PatternBuilder,
    labels: [&'static str; 2],
    reg: RegVars,
    sig: &'static str,
    enabled: StepGuard,
) -> PatternBuilder {
    p.code(labels[0], move |_, st| {
        let arg = st.sig(sig).clone();
        st.set("arg_d", arg);
        Flow::Next
    })
    .step(CallStep::new(OUT_DFFE, &["arg_d", "clock"]).when(enabled))
    .code(labels[1], move |_, st| {
        if st.cell("dff").is_some() {
            reg.commit(st);
            let q = st.sig("dff_q").clone();
            st.set(sig, q);
        }
        Flow::Next
    })
}

/// Stages 7 and 8: M register and post-adder.
pub(super) fn product(p: PatternBuilder, limits: DspLimits) -> PatternBuilder {
    let mreg = unregistered("MREG");
    seek_output(
        p,
        ["m_seek", "m_commit"],
        M,
        "sig_m",
        Box::new(move |cx: &Ctx<'_>, st: &State| {
            st.cell("dsp")
                .is_some_and(|dsp| cx.param_str(dsp, "USE_MULT") == "MULTIPLY")
                && mreg(cx, st)
                && cx.users(st.sig("sig_m")) == 1
        }),
    )
    .code("product", |_, st| {
        let m = st.sig("sig_m").clone();
        st.set("sig_p", m);
        Flow::Next
    })
    .step(
        MatchStep::new("post_add")
            .when(|cx, st| {
                // OPMODE[6:4] selects the Z multiplexer input.
                st.cell("dsp").is_some_and(|dsp| {
                    cx.port(dsp, "OPMODE")
                        .iter()
                        .skip(4)
                        .take(3)
                        .all(|b| b == SigBit::ZERO)
                })
            })
            .kind(CellKind::Add)
            .select(move |m| m.port("Y").len() <= limits.post_add)
            .choice("ab", &["A", "B"])
            .filter(|m| {
                let feedback = usize::from(m.st().cell(M.cemux).is_some());
                m.users(m.chosen("ab")) == 1 + feedback
            })
            .index_bit(chosen("ab"), At::Lsb, |_, st| first_bit(st.sig("sig_p")))
            .filter(|m| {
                let param = if m.ident("ab") == "A" { "A_SIGNED" } else { "B_SIGNED" };
                let signed = m.param_bool(param);
                m.chosen("ab").extends(m.st().sig("sig_p"), signed)
            })
            .set("post_add_ab", |m| m.ident("ab").clone().into())
            .optional(),
    )
    .code("post_add_operands", |cx, st| {
        let (Some(add), Some(ab)) = (st.cell("post_add"), st.ident("post_add_ab")) else {
            return Flow::Next;
        };
        let (c, y) = (cx.port(add, other(ab)).clone(), cx.port(add, "Y").clone());
        st.set("sig_c", c);
        st.set("sig_p", y);
        Flow::Next
    })
}

/// Stages 9 to 11: P register, accumulator mux and overflow comparator.
pub(super) fn accumulator(p: PatternBuilder, limits: DspLimits) -> PatternBuilder {
    let preg = unregistered("PREG");
    seek_output(
        p,
        ["p_seek", "p_commit"],
        P,
        "sig_p",
        Box::new(move |cx: &Ctx<'_>, st: &State| {
            // An M clock-enable mux without a post-adder also reads the product.
            let feedback = st.cell(M.cemux).is_some() && st.cell("post_add").is_none();
            preg(cx, st) && cx.users(st.sig("sig_p")) == 1 + usize::from(feedback)
        }),
    )
    .step(
        MatchStep::new("post_add_mux")
            .when(|_, st| st.cell("post_add").is_some() && st.cell(P.ff).is_some())
            .kind(CellKind::Mux)
            .select(|m| m.users(m.port("Y")) == 1)
            .choice("ab", &["A", "B"])
            .index(chosen("ab"), |_, st| st.sig("sig_p").clone())
            .index(port("Y"), |_, st| st.sig("sig_c").clone())
            .set("post_add_mux_ab", |m| m.ident("ab").clone().into())
            .optional(),
    )
    .code("addend", |cx, st| {
        let (Some(mux), Some(ab)) = (st.cell("post_add_mux"), st.ident("post_add_mux_ab")) else {
            return Flow::Next;
        };
        let c = cx.port(mux, other(ab)).clone();
        st.set("sig_c", c);
        Flow::Next
    })
    .step(
        MatchStep::new("overflow")
            .when(|cx, st| {
                st.cell(P.ff).is_some()
                    && st.cell("dsp").is_some_and(|dsp| {
                        cx.param_str(dsp, "USE_PATTERN_DETECT") == "NO_PATDET"
                    })
            })
            .kind(CellKind::Ge)
            .select(move |m| m.port("A").len() <= limits.compare)
            .select(|m| m.port("B").as_const().is_some_and(|b| b.count_ones() == 1))
            .index(port("A"), |_, st| st.sig("sig_p").clone())
            .optional(),
    )
    .code("accept", |_, _| Flow::Accept)
}
