#![allow(dead_code)]

use std::sync::Once;

use pmq_common::{Cell, CellId, Const, Netlist, NetlistBuilder, SigSpec};

static INIT: Once = Once::new();

pub fn setup_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// How the post-adder widens the 16-bit product to 20 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ext {
    Zero,
    Sign,
}

/// Select net of the A1 stage's reset mux.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum A1Reset {
    /// Same reset as A2.
    Shared,
    /// A reset of its own.
    Own,
}

/// Clocking of the B2 register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clocking {
    /// Rising edge of the DSP's clock.
    Shared,
    /// Rising edge of an unrelated clock.
    Other,
    /// Falling edge of the DSP's clock.
    Falling,
}

/// Knobs for [`Fixture::build`]. The default is one clean instance of the
/// whole idiom.
#[derive(Clone, Copy, Debug)]
pub struct Fixture {
    pub pre_adder: bool,
    pub a1: Option<A1Reset>,
    /// Extra reader on the A2 register's D input.
    pub a_tap: bool,
    /// Bits of the A2 register chain above the eight the DSP reads.
    pub a_extra: usize,
    pub b_clock: Clocking,
    pub keep_b: bool,
    /// Extra reader on the raw product.
    pub product_tap: bool,
    /// Bits below the product inside the M register.
    pub m_offset: usize,
    pub post_ext: Ext,
    pub post_signed: bool,
    pub p_init: bool,
    /// Integer parameter override on the DSP.
    pub dsp_int: Option<(&'static str, i64)>,
    /// String parameter override on the DSP.
    pub dsp_str: Option<(&'static str, &'static str)>,
    pub inmode: u64,
    pub opmode: u64,
    /// Drive the DSP's D port from a sign-extended module input.
    pub d_port: bool,
    /// Threshold of the overflow comparator.
    pub ovf_const: u64,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            pre_adder: true,
            a1: None,
            a_tap: false,
            a_extra: 0,
            b_clock: Clocking::Shared,
            keep_b: false,
            product_tap: false,
            m_offset: 0,
            post_ext: Ext::Zero,
            post_signed: false,
            p_init: false,
            dsp_int: None,
            dsp_str: None,
            inmode: 0,
            opmode: 0b000_0101,
            d_port: false,
            ovf_const: 1 << 19,
        }
    }
}

fn zeros(width: usize) -> SigSpec {
    SigSpec::from_const(&Const::from_uint(0, width))
}

impl Fixture {
    /// ```text
    /// a_in -> [a1] -> cemux -> rstmux -> ff_a2 -> pre_add -> ff_ad -> A
    /// d_in -> ff_d ----------------------------/
    /// b_in -> cemux -> rstmux -> ff_b2 -> B
    /// P -> ff_m -> post_add -> ff_p -> p_q, acc_mux.B, overflow.A
    /// c_in -> acc_mux.A, acc_mux.Y -> post_add.B
    /// ```
    pub fn build(&self) -> Netlist {
        let mut b = NetlistBuilder::new("mac");
        let clk = b.input("clk", 1);
        let a_width = 8 + self.a_extra;
        let a_in = b.input("a_in", a_width);
        let b_in = b.input("b_in", 8);
        let d_in = b.input("d_in", 8);
        let c_in = b.input("c_in", 20);
        let ce_a = b.input("ce_a", 1);
        let rst_a = b.input("rst_a", 1);
        let ce_b = b.input("ce_b", 1);
        let rst_b = b.input("rst_b", 1);
        let acc_sel = b.input("acc_sel", 1);

        let a_src = match self.a1 {
            None => a_in,
            Some(reset) => {
                let rst = match reset {
                    A1Reset::Shared => rst_a.clone(),
                    A1Reset::Own => b.input("rst_a1", 1),
                };
                let a1_q = b.wire("a1_q", 8);
                let a1_ce = b.wire("a1_ce", 8);
                let a1_rst = b.wire("a1_rst", 8);
                b.add_cell(Cell::mux("a1_cemux", a1_q.clone(), a_in, ce_a.clone(), a1_ce.clone()));
                b.add_cell(Cell::mux("a1_rstmux", a1_ce, zeros(8), rst, a1_rst.clone()));
                b.add_cell(Cell::dff("ff_a1", clk.clone(), a1_rst, a1_q.clone()));
                a1_q
            }
        };

        let a_q = b.wire("a_q", a_width);
        let a_ce = b.wire("a_ce", a_width);
        let a_rst = b.wire("a_rst", a_width);
        b.add_cell(Cell::mux("a_cemux", a_q.clone(), a_src, ce_a, a_ce.clone()));
        b.add_cell(Cell::mux("a_rstmux", a_ce, zeros(a_width), rst_a, a_rst.clone()));
        b.add_cell(Cell::dff("ff_a2", clk.clone(), a_rst.clone(), a_q.clone()));
        if self.a_tap {
            b.set_output(&a_rst);
        }
        let a_q = a_q.extract(0, 8);

        let dsp_a = if self.pre_adder {
            let d_q = b.wire("d_q", 8);
            let pa = b.wire("pa", 8);
            let ad_q = b.wire("ad_q", 8);
            b.add_cell(Cell::dff("ff_d", clk.clone(), d_in, d_q.clone()));
            b.add_cell(Cell::add("pre_add", a_q, d_q, pa.clone()));
            b.add_cell(Cell::dff("ff_ad", clk.clone(), pa, ad_q.clone()));
            ad_q
        } else {
            a_q
        };

        // B gates the other way round: hold on B, zero on A.
        let b_q = b.wire("b_q", 8);
        let b_ce = b.wire("b_ce", 8);
        let b_rst = b.wire("b_rst", 8);
        b.add_cell(Cell::mux("b_cemux", b_in, b_q.clone(), ce_b, b_ce.clone()));
        b.add_cell(Cell::mux("b_rstmux", zeros(8), b_ce, rst_b, b_rst.clone()));
        let ff_b2 = match self.b_clock {
            Clocking::Shared => Cell::dff("ff_b2", clk.clone(), b_rst, b_q.clone()),
            Clocking::Other => Cell::dff("ff_b2", b.input("clk2", 1), b_rst, b_q.clone()),
            Clocking::Falling => Cell::dff("ff_b2", clk.clone(), b_rst, b_q.clone())
                .with_param("CLK_POLARITY", false),
        };
        b.add_cell(ff_b2);
        if self.keep_b {
            b.set_keep(&b_q);
        }

        let p = b.wire("p", 16);
        let mut dsp = Cell::dsp("dsp", dsp_a, b_q, p.clone())
            .with_input("CLK", clk.clone())
            .with_input("INMODE", SigSpec::from_const(&Const::from_uint(self.inmode, 5)))
            .with_input("OPMODE", SigSpec::from_const(&Const::from_uint(self.opmode, 7)));
        if let Some((name, value)) = self.dsp_int {
            dsp = dsp.with_param(name, value);
        }
        if let Some((name, value)) = self.dsp_str {
            dsp = dsp.with_param(name, value);
        }
        if self.d_port {
            let d = b.input("d_ext", 8);
            let sign = SigSpec::repeat(d.last().unwrap(), 4);
            dsp = dsp.with_input("D", d.concat(&sign));
        }
        b.add_cell(dsp);
        if self.product_tap {
            b.set_output(&p);
        }

        let m_d = if self.m_offset == 0 {
            p
        } else {
            b.input("m_pad", self.m_offset).concat(&p)
        };
        let m_q = b.wire("m_q", 16 + self.m_offset);
        b.add_cell(Cell::dff("ff_m", clk.clone(), m_d, m_q.clone()));
        let product = m_q.extract(self.m_offset, 16);

        let ext = match self.post_ext {
            Ext::Zero => zeros(4),
            Ext::Sign => SigSpec::repeat(product.last().unwrap(), 4),
        };
        let acc = b.wire("acc", 20);
        let s = b.wire("s", 20);
        b.add_cell(
            Cell::add("post_add", product.concat(&ext), acc.clone(), s.clone())
                .with_param("A_SIGNED", self.post_signed),
        );

        let p_q = b.output("p_q", 20);
        b.add_cell(Cell::dff("ff_p", clk, s, p_q.clone()));
        if self.p_init {
            let net = p_q.first().and_then(|bit| bit.net_id()).unwrap();
            b.set_init(net, Const::from_uint(1, 20));
        }

        b.add_cell(Cell::mux("acc_mux", c_in, p_q.clone(), acc_sel, acc));
        let ovf = b.output("ovf", 1);
        b.add_cell(Cell::ge(
            "overflow",
            p_q,
            SigSpec::from_const(&Const::from_uint(self.ovf_const, 20)),
            ovf,
        ));
        b.build().unwrap()
    }
}

/// Cell `name` of `netlist`, which must exist.
pub fn id(netlist: &Netlist, name: &str) -> CellId {
    netlist
        .find_cell(name)
        .unwrap_or_else(|| panic!("no cell named {name}"))
}

/// Port `name` of `cell`, empty when unconnected.
pub fn port(netlist: &Netlist, cell: CellId, name: &str) -> SigSpec {
    netlist.cell(cell).port(name).cloned().unwrap_or_default()
}

/// Net `name` of `netlist` as a full-width signal.
pub fn net(netlist: &Netlist, name: &str) -> SigSpec {
    let (id, net) = netlist
        .nets()
        .find(|(_, n)| n.name == name)
        .unwrap_or_else(|| panic!("no net named {name}"));
    SigSpec::from_net(id, net.width)
}
