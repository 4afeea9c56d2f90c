use std::iter;

use pmq_common::{CellId, IdString, SigBit, SigSpec};
use pmq_engine::BindingRecord;
use serde::Serialize;

use super::{A1, A2, AD, B1, B2, D, DSP_PACK, DspLimits, M, P, RegVars};

/// A gated register absorbed into the macro.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Register {
    pub ff: CellId,
    pub cemux: Option<CellId>,
    /// Clock enable is active high.
    pub cepol: bool,
    pub rstmux: Option<CellId>,
    /// Reset is active high.
    pub rstpol: bool,
}

impl Register {
    fn from_record(record: &BindingRecord, vars: RegVars) -> Option<Self> {
        Some(Self {
            ff: record.cell(vars.ff)?,
            cemux: record.cell(vars.cemux),
            cepol: record.flag(vars.cepol).unwrap_or(false),
            rstmux: record.cell(vars.rstmux),
            rstpol: record.flag(vars.rstpol).unwrap_or(false),
        })
    }

    pub fn cells(&self) -> impl Iterator<Item = CellId> {
        iter::once(self.ff).chain(self.rstmux).chain(self.cemux)
    }
}

/// Everything one DSP packing match found, ready for rewriting.
///
/// The `sig_*` vectors are the macro's new port connections: each operand is
/// the signal in front of the outermost absorbed register or adder, `sig_p`
/// the signal behind the last absorbed stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DspMatch {
    pub dsp: CellId,
    pub clock: SigBit,
    pub ad: Option<Register>,
    pub a2: Option<Register>,
    pub a1: Option<Register>,
    pub b2: Option<Register>,
    pub b1: Option<Register>,
    pub d: Option<Register>,
    pub m: Option<Register>,
    pub p: Option<Register>,
    pub pre_add: Option<CellId>,
    /// Pre-adder input that became the A operand.
    pub pre_add_ab: Option<IdString>,
    pub post_add: Option<CellId>,
    /// Post-adder input carrying the product.
    pub post_add_ab: Option<IdString>,
    pub post_add_mux: Option<CellId>,
    /// Accumulator mux input fed back from P.
    pub post_add_mux_ab: Option<IdString>,
    pub overflow: Option<CellId>,
    pub sig_a: SigSpec,
    pub sig_b: SigSpec,
    pub sig_c: SigSpec,
    pub sig_d: SigSpec,
    pub sig_m: SigSpec,
    pub sig_p: SigSpec,
}

impl DspMatch {
    /// Read a record produced by the DSP packing pattern; `None` for records
    /// of any other pattern.
    #[must_use]
    pub fn from_record(record: &BindingRecord) -> Option<Self> {
        if record.pattern() != DSP_PACK {
            return None;
        }
        let reg = |vars: RegVars| Register::from_record(record, vars);
        let sig = |name: &str| record.sig(name).cloned().unwrap_or_default();
        let ident = |name: &str| record.ident(name).cloned();
        Some(Self {
            dsp: record.cell("dsp")?,
            clock: record.bit("clock").unwrap_or(SigBit::UNDEF),
            ad: reg(AD),
            a2: reg(A2),
            a1: reg(A1),
            b2: reg(B2),
            b1: reg(B1),
            d: reg(D),
            m: reg(M),
            p: reg(P),
            pre_add: record.cell("pre_add"),
            pre_add_ab: ident("pre_add_ab"),
            post_add: record.cell("post_add"),
            post_add_ab: ident("post_add_ab"),
            post_add_mux: record.cell("post_add_mux"),
            post_add_mux_ab: ident("post_add_mux_ab"),
            overflow: record.cell("overflow"),
            sig_a: sig("sig_a"),
            sig_b: sig("sig_b"),
            sig_c: sig("sig_c"),
            sig_d: sig("sig_d"),
            sig_m: sig("sig_m"),
            sig_p: sig("sig_p"),
        })
    }

    /// The registers in stage order, paired with their role names.
    pub fn registers(&self) -> impl Iterator<Item = (&'static str, &Register)> {
        [
            ("ad", &self.ad),
            ("a2", &self.a2),
            ("a1", &self.a1),
            ("b2", &self.b2),
            ("b1", &self.b1),
            ("d", &self.d),
            ("m", &self.m),
            ("p", &self.p),
        ]
        .into_iter()
        .filter_map(|(name, reg)| reg.as_ref().map(|r| (name, r)))
    }

    /// Every cell the rewrite replaces, starting with the macro itself.
    #[must_use]
    pub fn cells(&self) -> Vec<CellId> {
        let mut cells = vec![self.dsp];
        cells.extend(self.registers().flat_map(|(_, r)| r.cells()));
        cells.extend(
            [self.pre_add, self.post_add, self.post_add_mux, self.overflow]
                .into_iter()
                .flatten(),
        );
        cells
    }

    /// The new operand connections fit the macro's ports.
    #[must_use]
    pub fn fits(&self, limits: &DspLimits) -> bool {
        self.sig_a.len() <= limits.a && self.sig_b.len() <= limits.b && self.sig_d.len() <= limits.d
    }
}
