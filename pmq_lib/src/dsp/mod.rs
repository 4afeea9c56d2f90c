//! Packing of multiply-accumulate idioms into a DSP48E1-style macro.
//!
//! The pattern anchors on every [`CellKind::Dsp`] cell holding a bare
//! multiplier and looks outward for the logic the macro could absorb:
//!
//! 1. the anchor itself: trimmed operands, used product slice, clock;
//! 2. an AD register in front of A;
//! 3. a pre-adder feeding that register (or A directly);
//! 4. the A2 and A1 registers on the A operand;
//! 5. the B2 and B1 registers on B;
//! 6. a D register on the pre-adder's second operand;
//! 7. an M register on the product;
//! 8. a post-adder summing the product with C;
//! 9. the P register;
//! 10. an accumulator mux selecting P or an external addend for C;
//! 11. an overflow comparator against a power of two on P.
//!
//! Registers are gated: each may carry a reset mux and a clock-enable mux,
//! found by the subpatterns in [`registers`]. Every stage is optional; the
//! accepted state is read back through [`DspMatch`].

mod binding;
mod registers;
mod stages;

use pmq_common::{CellKind, Netlist};
use pmq_engine::{Config, Ctx, Matcher, Pattern, PatternBuilder, PatternError, State, VarType};
use tracing::debug;

pub use self::binding::{DspMatch, Register};

/// Name of the pattern built by [`dsp_pack_pattern`].
pub const DSP_PACK: &str = "dsp_pack";

/// Port widths of the target DSP macro.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DspLimits {
    /// A operand, also the widest pre-adder input.
    pub a: usize,
    pub b: usize,
    /// D operand, the pre-adder's other input.
    pub d: usize,
    pub pre_add: usize,
    pub post_add: usize,
    /// Widest comparator input on P.
    pub compare: usize,
}

impl DspLimits {
    /// Xilinx DSP48E1.
    #[must_use]
    pub const fn dsp48e1() -> Self {
        Self {
            a: 30,
            b: 18,
            d: 25,
            pre_add: 25,
            post_add: 48,
            compare: 48,
        }
    }
}

impl Default for DspLimits {
    fn default() -> Self {
        Self::dsp48e1()
    }
}

/// State variables describing one gated register.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RegVars {
    pub ff: &'static str,
    pub cemux: &'static str,
    pub cepol: &'static str,
    pub rstmux: &'static str,
    pub rstpol: &'static str,
}

pub(crate) const AD: RegVars = RegVars {
    ff: "ff_ad",
    cemux: "ff_ad_cemux",
    cepol: "ff_ad_cepol",
    rstmux: "ff_ad_rstmux",
    rstpol: "ff_ad_rstpol",
};
pub(crate) const A2: RegVars = RegVars {
    ff: "ff_a2",
    cemux: "ff_a2_cemux",
    cepol: "ff_a2_cepol",
    rstmux: "ff_a2_rstmux",
    rstpol: "ff_a2_rstpol",
};
pub(crate) const A1: RegVars = RegVars {
    ff: "ff_a1",
    cemux: "ff_a1_cemux",
    cepol: "ff_a1_cepol",
    rstmux: "ff_a1_rstmux",
    rstpol: "ff_a1_rstpol",
};
pub(crate) const B2: RegVars = RegVars {
    ff: "ff_b2",
    cemux: "ff_b2_cemux",
    cepol: "ff_b2_cepol",
    rstmux: "ff_b2_rstmux",
    rstpol: "ff_b2_rstpol",
};
pub(crate) const B1: RegVars = RegVars {
    ff: "ff_b1",
    cemux: "ff_b1_cemux",
    cepol: "ff_b1_cepol",
    rstmux: "ff_b1_rstmux",
    rstpol: "ff_b1_rstpol",
};
pub(crate) const D: RegVars = RegVars {
    ff: "ff_d",
    cemux: "ff_d_cemux",
    cepol: "ff_d_cepol",
    rstmux: "ff_d_rstmux",
    rstpol: "ff_d_rstpol",
};
pub(crate) const M: RegVars = RegVars {
    ff: "ff_m",
    cemux: "ff_m_cemux",
    cepol: "ff_m_cepol",
    rstmux: "ff_m_rstmux",
    rstpol: "ff_m_rstpol",
};
pub(crate) const P: RegVars = RegVars {
    ff: "ff_p",
    cemux: "ff_p_cemux",
    cepol: "ff_p_cepol",
    rstmux: "ff_p_rstmux",
    rstpol: "ff_p_rstpol",
};

const REGISTERS: [RegVars; 8] = [AD, A2, A1, B2, B1, D, M, P];

impl RegVars {
    fn declare(self, p: PatternBuilder) -> PatternBuilder {
        p.states(&[self.ff, self.cemux, self.rstmux], VarType::Cell)
            .states(&[self.cepol, self.rstpol], VarType::Bool)
    }

    /// Take over what the last register subpattern call found.
    pub(crate) fn commit(self, st: &mut State) {
        let (ff, cemux, rstmux) = (st.cell("dff"), st.cell("dff_cemux"), st.cell("dff_rstmux"));
        let (cepol, rstpol) = (st.flag("dff_cepol"), st.flag("dff_rstpol"));
        let clock = st.bit("dff_clock");
        st.set(self.ff, ff);
        st.set(self.cemux, cemux);
        st.set(self.cepol, cepol);
        st.set(self.rstmux, rstmux);
        st.set(self.rstpol, rstpol);
        st.set("clock", clock);
    }

    pub(crate) fn clear(self, st: &mut State) {
        for name in [self.ff, self.cemux, self.cepol, self.rstmux, self.rstpol] {
            st.clear(name);
        }
    }

    pub(crate) fn move_to(self, to: Self, st: &mut State) {
        for (from, into) in [
            (self.ff, to.ff),
            (self.cemux, to.cemux),
            (self.cepol, to.cepol),
            (self.rstmux, to.rstmux),
            (self.rstpol, to.rstpol),
        ] {
            let value = st.get(from).clone();
            st.set(into, value);
        }
        self.clear(st);
    }

    /// The register just found has the same reset and clock-enable gating
    /// as this one: the same muxes present, on the same select nets, with
    /// the same polarity.
    pub(crate) fn gated_like_dff(self, cx: &Ctx<'_>, st: &State) -> bool {
        let same = |mine: &str, mine_pol: &str, theirs: &str, theirs_pol: &str| {
            match (st.cell(mine), st.cell(theirs)) {
                (None, None) => true,
                (Some(a), Some(b)) => {
                    st.flag(mine_pol) == st.flag(theirs_pol) && cx.port(a, "S") == cx.port(b, "S")
                }
                _ => false,
            }
        };
        same(self.rstmux, self.rstpol, "dff_rstmux", "dff_rstpol")
            && same(self.cemux, self.cepol, "dff_cemux", "dff_cepol")
    }
}

fn declare(limits: &DspLimits) -> PatternBuilder {
    let p = PatternBuilder::new(DSP_PACK, CellKind::Dsp, "dsp")
        .states(
            &["sig_a", "sig_b", "sig_c", "sig_d", "sig_m", "sig_p"],
            VarType::Sig,
        )
        .state("clock", VarType::Bit)
        .states(&["pre_add", "post_add", "post_add_mux", "overflow"], VarType::Cell)
        .states(&["pre_add_ab", "post_add_ab", "post_add_mux_ab"], VarType::Ident)
        // Register subpattern arguments and results.
        .states(&["arg_q", "arg_d", "dff_d", "dff_q"], VarType::Sig)
        .state("dff_clock", VarType::Bit)
        .states(&["dff", "dff_cemux", "dff_rstmux"], VarType::Cell)
        .states(&["dff_cepol", "dff_rstpol"], VarType::Bool);
    debug!(?limits, "declaring dsp packing pattern");
    REGISTERS.iter().fold(p, |p, reg| reg.declare(p))
}

/// The eleven-stage DSP packing pattern for a macro with `limits`.
///
/// # Errors
///
/// Only on an inconsistent definition, which would be a bug in this crate.
pub fn dsp_pack_pattern(limits: &DspLimits) -> Result<Pattern, PatternError> {
    let limits = *limits;
    let p = declare(&limits);
    let p = stages::anchor(p);
    let p = stages::a_operand(p, limits);
    let p = stages::b_operand(p);
    let p = stages::d_operand(p);
    let p = stages::product(p, limits);
    let p = stages::accumulator(p, limits);
    p.subpattern(registers::in_dffe())
        .subpattern(registers::out_dffe())
        .build()
}

/// Run the DSP packing pattern over `netlist`.
///
/// Matches are returned in ascending DSP cell order. Two matches may claim
/// the same cell; deciding between them is up to the caller.
///
/// # Errors
///
/// See [`dsp_pack_pattern`].
pub fn find_dsp_packs(
    netlist: &Netlist,
    limits: &DspLimits,
    config: Config,
) -> Result<Vec<DspMatch>, PatternError> {
    let pattern = dsp_pack_pattern(limits)?;
    let report = Matcher::with_config(netlist, config).run(&pattern);
    debug!(
        dsps = report.stats.roots,
        packed = report.records.len(),
        "dsp packing finished"
    );
    Ok(report
        .records
        .iter()
        .filter_map(DspMatch::from_record)
        .collect())
}
