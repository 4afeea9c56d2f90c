//! End-to-end checks of the DSP packing pattern on synthetic netlists.

mod common;

use common::{A1Reset, Clocking, Ext, Fixture, id, net, port, setup_test_logging};
use pmq_common::{Cell, CellId, IdString, Netlist, NetlistBuilder, ParamValue, SigBit};
use pmq_engine::{Config, Matcher};
use pmq_lib::{DspLimits, DspMatch, Register, dsp_pack_pattern, find_dsp_packs};
use rstest::rstest;

lazy_static::lazy_static! {
    static ref FULL: Netlist = Fixture::default().build();
}

fn pack(netlist: &Netlist) -> DspMatch {
    setup_test_logging();
    let matches = find_dsp_packs(netlist, &DspLimits::default(), Config::default()).unwrap();
    assert_eq!(matches.len(), 1);
    matches.into_iter().next().unwrap()
}

#[test]
fn full_idiom_is_packed() {
    let netlist = &*FULL;
    let found = pack(netlist);

    assert_eq!(found.dsp, id(&netlist, "dsp"));
    assert_eq!(found.pre_add, Some(id(&netlist, "pre_add")));
    assert_eq!(found.post_add, Some(id(&netlist, "post_add")));
    assert_eq!(found.post_add_mux, Some(id(&netlist, "acc_mux")));
    assert_eq!(found.overflow, Some(id(&netlist, "overflow")));
    assert_eq!(found.ad.map(|r| r.ff), Some(id(&netlist, "ff_ad")));
    assert_eq!(found.d.map(|r| r.ff), Some(id(&netlist, "ff_d")));
    assert_eq!(found.m.map(|r| r.ff), Some(id(&netlist, "ff_m")));
    assert_eq!(found.p.map(|r| r.ff), Some(id(&netlist, "ff_p")));
    assert!(found.a1.is_none());
    assert!(found.b1.is_none());

    assert_eq!(found.sig_a, net(&netlist, "a_in"));
    assert_eq!(found.sig_b, net(&netlist, "b_in"));
    assert_eq!(found.sig_c, net(&netlist, "c_in"));
    assert_eq!(found.sig_d, net(&netlist, "d_in"));
    assert_eq!(found.sig_p, net(&netlist, "p_q"));
    assert_eq!(found.clock, net(&netlist, "clk").bits()[0]);
    assert_eq!(found.pre_add_ab.as_ref().map(IdString::as_str), Some("A"));
    assert_eq!(found.post_add_ab.as_ref().map(IdString::as_str), Some("A"));
    assert_eq!(found.post_add_mux_ab.as_ref().map(IdString::as_str), Some("B"));
    assert!(found.fits(&DspLimits::default()));

    // Every cell of the netlist takes part, each exactly once.
    let mut cells = found.cells();
    cells.sort();
    let all: Vec<_> = netlist.cells().map(|(c, _)| c).collect();
    assert_eq!(cells, all);
}

#[test]
fn each_operand_gets_its_own_gating() {
    let netlist = &*FULL;
    let found = pack(netlist);

    let a2 = found.a2.unwrap();
    assert_eq!(a2.ff, id(&netlist, "ff_a2"));
    assert_eq!(a2.cemux, Some(id(&netlist, "a_cemux")));
    assert_eq!(a2.rstmux, Some(id(&netlist, "a_rstmux")));
    assert!(a2.cepol);
    assert!(a2.rstpol);

    let b2 = found.b2.unwrap();
    assert_eq!(b2.ff, id(&netlist, "ff_b2"));
    assert_eq!(b2.cemux, Some(id(&netlist, "b_cemux")));
    assert_eq!(b2.rstmux, Some(id(&netlist, "b_rstmux")));
    assert!(!b2.cepol);
    assert!(!b2.rstpol);

    let ad = found.ad.unwrap();
    assert_eq!((ad.cemux, ad.rstmux), (None, None));
}

#[test]
fn without_pre_adder_the_front_register_is_a2() {
    let netlist = Fixture {
        pre_adder: false,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert!(found.pre_add.is_none());
    assert!(found.ad.is_none());
    assert!(found.d.is_none());
    let a2 = found.a2.unwrap();
    assert_eq!(a2.ff, id(&netlist, "ff_a2"));
    assert_eq!(a2.cemux, Some(id(&netlist, "a_cemux")));
    assert_eq!(found.sig_a, net(&netlist, "a_in"));
    assert!(found.sig_d.is_empty());
    // The output side is unaffected.
    assert!(found.post_add_mux.is_some());
}

#[rstest]
#[case::shared_reset(A1Reset::Shared, true)]
#[case::own_reset(A1Reset::Own, false)]
fn a1_needs_the_same_gating_as_a2(#[case] reset: A1Reset, #[case] kept: bool) {
    let netlist = Fixture {
        a1: Some(reset),
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert!(found.a2.is_some());
    assert_eq!(found.a1.is_some(), kept);
    if kept {
        let a1 = found.a1.unwrap();
        assert_eq!(a1.ff, id(&netlist, "ff_a1"));
        assert_eq!(a1.rstmux, Some(id(&netlist, "a1_rstmux")));
        assert_eq!(found.sig_a, net(&netlist, "a_in"));
    } else {
        assert_eq!(found.sig_a, net(&netlist, "a1_q"));
    }
}

#[test]
fn shared_register_input_keeps_muxes_out() {
    let netlist = Fixture {
        a_tap: true,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    let a2 = found.a2.unwrap();
    assert_eq!(a2.ff, id(&netlist, "ff_a2"));
    assert_eq!((a2.cemux, a2.rstmux), (None, None));
    assert_eq!(found.sig_a, net(&netlist, "a_rst"));
}

#[test]
fn shared_product_is_not_registered() {
    let netlist = Fixture {
        product_tap: true,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert!(found.m.is_none());
    assert!(found.post_add.is_none());
    assert!(found.p.is_none());
    assert_eq!(found.sig_p, net(&netlist, "p"));
    // Inputs are still absorbed.
    assert!(found.b2.is_some());
}

#[test]
fn product_found_inside_wider_register() {
    let netlist = Fixture {
        m_offset: 4,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert_eq!(found.m.map(|r| r.ff), Some(id(&netlist, "ff_m")));
    assert_eq!(found.sig_m, net(&netlist, "m_q").extract(4, 16));
    assert!(found.post_add.is_some());
    assert!(found.p.is_some());
}

#[rstest]
#[case::zero_unsigned(Ext::Zero, false, true)]
#[case::sign_signed(Ext::Sign, true, true)]
#[case::sign_unsigned(Ext::Sign, false, false)]
#[case::zero_signed(Ext::Zero, true, false)]
fn post_adder_extension_follows_signedness(
    #[case] ext: Ext,
    #[case] signed: bool,
    #[case] matched: bool,
) {
    let netlist = Fixture {
        post_ext: ext,
        post_signed: signed,
        m_offset: 2,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert_eq!(found.post_add.is_some(), matched);
    // No post-adder means nothing for the accumulator stages to hang off.
    assert_eq!(found.post_add_mux.is_some(), matched);
    assert!(found.m.is_some());
}

#[rstest]
#[case::keep_on_b(Fixture { keep_b: true, ..Fixture::default() })]
#[case::init_on_p(Fixture { p_init: true, ..Fixture::default() })]
fn untouchable_registers_stay_out(#[case] fixture: Fixture) {
    let netlist = fixture.build();
    let found = pack(&netlist);

    if fixture.keep_b {
        assert!(found.b2.is_none());
        assert_eq!(found.sig_b, net(&netlist, "b_q"));
        assert!(found.p.is_some());
    } else {
        assert!(found.p.is_none());
        assert!(found.overflow.is_none());
        assert!(found.post_add_mux.is_none());
        assert!(found.b2.is_some());
    }
}

fn roles(found: &DspMatch) -> Vec<&'static str> {
    found.registers().map(|(name, _)| name).collect()
}

/// Re-derive the wiring a gated register claims to have.
fn check_register(netlist: &Netlist, reg: &Register, clock: SigBit) {
    let ff = reg.ff;
    assert_eq!(port(netlist, ff, "CLK").first(), Some(clock));
    assert!(
        netlist
            .cell(ff)
            .param("CLK_POLARITY")
            .is_some_and(ParamValue::as_bool)
    );
    let mut into_ff = port(netlist, ff, "D");
    if let Some(rst) = reg.rstmux {
        assert_eq!(port(netlist, rst, "Y"), into_ff);
        let (zero, data) = if reg.rstpol { ("B", "A") } else { ("A", "B") };
        assert!(port(netlist, rst, zero).is_fully_zero());
        into_ff = port(netlist, rst, data);
    }
    if let Some(ce) = reg.cemux {
        assert_eq!(port(netlist, ce, "Y"), into_ff);
        let hold = if reg.cepol { "A" } else { "B" };
        assert_eq!(port(netlist, ce, hold), port(netlist, ff, "Q"));
    }
}

#[test]
fn every_binding_agrees_with_the_netlist() {
    let netlist = &*FULL;
    let found = pack(netlist);
    let p = |cell: CellId, name: &str| port(netlist, cell, name);

    for (_, reg) in found.registers() {
        check_register(netlist, reg, found.clock);
    }
    let (ad, a2, d) = (found.ad.unwrap(), found.a2.unwrap(), found.d.unwrap());
    let (b2, m, preg) = (found.b2.unwrap(), found.m.unwrap(), found.p.unwrap());

    assert_eq!(p(found.dsp, "A"), p(ad.ff, "Q"));
    assert_eq!(p(found.dsp, "B"), p(b2.ff, "Q"));
    let pre_add = found.pre_add.unwrap();
    let pre_ab = found.pre_add_ab.as_ref().unwrap().as_str();
    let pre_other = if pre_ab == "A" { "B" } else { "A" };
    assert_eq!(p(pre_add, "Y"), p(ad.ff, "D"));
    assert_eq!(p(pre_add, pre_ab), p(a2.ff, "Q"));
    assert_eq!(p(pre_add, pre_other), p(d.ff, "Q"));

    assert_eq!(p(found.dsp, "P"), p(m.ff, "D"));
    let post_add = found.post_add.unwrap();
    let post_ab = found.post_add_ab.as_ref().unwrap().as_str();
    let post_other = if post_ab == "A" { "B" } else { "A" };
    assert_eq!(p(post_add, post_ab).extract(0, 16), p(m.ff, "Q"));
    assert_eq!(p(post_add, "Y"), p(preg.ff, "D"));

    let mux = found.post_add_mux.unwrap();
    let mux_ab = found.post_add_mux_ab.as_ref().unwrap().as_str();
    let mux_other = if mux_ab == "A" { "B" } else { "A" };
    assert_eq!(p(mux, mux_ab), p(preg.ff, "Q"));
    assert_eq!(p(mux, "Y"), p(post_add, post_other));
    assert_eq!(p(mux, mux_other), found.sig_c);
    assert_eq!(p(found.overflow.unwrap(), "A"), p(preg.ff, "Q"));
    assert_eq!(found.sig_p, p(preg.ff, "Q"));
}

#[test]
fn wide_register_keeps_its_gating() {
    let netlist = Fixture {
        a_extra: 4,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    let a2 = found.a2.unwrap();
    assert_eq!(a2.ff, id(&netlist, "ff_a2"));
    assert_eq!(a2.cemux, Some(id(&netlist, "a_cemux")));
    assert_eq!(a2.rstmux, Some(id(&netlist, "a_rstmux")));
    assert!(a2.cepol);
    assert!(a2.rstpol);
    // Only the bits the pre-adder reads move to the new A input.
    assert_eq!(found.sig_a, net(&netlist, "a_in").extract(0, 8));
    assert!(found.fits(&DspLimits::default()));
}

#[rstest]
#[case::other_clock(Clocking::Other)]
#[case::falling_edge(Clocking::Falling)]
fn foreign_clocking_keeps_register_out(#[case] clocking: Clocking) {
    let netlist = Fixture {
        b_clock: clocking,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert!(found.b2.is_none());
    assert_eq!(found.sig_b, net(&netlist, "b_q"));
    assert_eq!(roles(&found), ["ad", "a2", "d", "m", "p"]);
    assert_eq!(found.clock, net(&netlist, "clk").bits()[0]);
}

#[rstest]
#[case::none(None, &["ad", "a2", "b2", "d", "m", "p"])]
#[case::areg(Some(("AREG", 1)), &["ad", "b2", "d", "m", "p"])]
#[case::breg(Some(("BREG", 1)), &["ad", "a2", "d", "m", "p"])]
#[case::adreg(Some(("ADREG", 1)), &["b2", "m", "p"])]
#[case::dreg(Some(("DREG", 1)), &["ad", "a2", "b2", "m", "p"])]
#[case::mreg(Some(("MREG", 1)), &["ad", "a2", "b2", "d", "p"])]
#[case::preg(Some(("PREG", 1)), &["ad", "a2", "b2", "d", "m"])]
fn enabled_macro_registers_are_not_duplicated(
    #[case] param: Option<(&'static str, i64)>,
    #[case] expected: &[&str],
) {
    let netlist = Fixture {
        dsp_int: param,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert_eq!(roles(&found), expected);
}

#[test]
fn product_register_moves_to_output_when_mreg_is_set() {
    let netlist = Fixture {
        dsp_int: Some(("MREG", 1)),
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    // The raw product no longer lines up with the post-adder input.
    assert!(found.post_add.is_none());
    assert_eq!(found.p.map(|r| r.ff), Some(id(&netlist, "ff_m")));
    assert_eq!(found.sig_p, net(&netlist, "m_q"));
}

#[test]
fn registered_input_drops_front_register() {
    let netlist = Fixture {
        pre_adder: false,
        dsp_int: Some(("AREG", 1)),
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert!(found.ad.is_none());
    assert!(found.a2.is_none());
    assert_eq!(roles(&found), ["b2", "m", "p"]);
    assert_eq!(found.sig_a, net(&netlist, "a_q"));
    assert_eq!(found.clock, net(&netlist, "clk").bits()[0]);
}

#[rstest]
#[case::d_port_enabled(Fixture { dsp_str: Some(("USE_DPORT", "TRUE")), ..Fixture::default() })]
#[case::inmode_set(Fixture { inmode: 1, ..Fixture::default() })]
#[case::d_port_driven(Fixture { d_port: true, ..Fixture::default() })]
fn busy_d_port_leaves_pre_adder_alone(#[case] fixture: Fixture) {
    let netlist = fixture.build();
    let found = pack(&netlist);

    assert!(found.pre_add.is_none());
    assert!(found.ad.is_none());
    assert!(found.d.is_none());
    // The register in front of A is then the A2 stage.
    assert_eq!(found.a2.map(|r| r.ff), Some(id(&netlist, "ff_ad")));
    assert_eq!(found.sig_a, net(&netlist, "pa"));
    if fixture.d_port {
        // The D operand keeps its sign extension.
        assert_eq!(found.sig_d, port(&netlist, found.dsp, "D"));
        assert_eq!(found.sig_d.len(), 12);
        assert_eq!(found.sig_d.extract(0, 8), net(&netlist, "d_ext"));
    }
}

#[test]
fn z_mux_in_use_leaves_post_adder_alone() {
    let netlist = Fixture {
        opmode: 0b001_0101,
        ..Fixture::default()
    }
    .build();
    let found = pack(&netlist);

    assert!(found.m.is_some());
    assert!(found.post_add.is_none());
    assert!(found.p.is_none());
    assert!(found.post_add_mux.is_none());
    assert!(found.overflow.is_none());
    assert_eq!(found.sig_p, net(&netlist, "m_q"));
}

#[rstest]
#[case::pattern_detector_in_use(Fixture {
    dsp_str: Some(("USE_PATTERN_DETECT", "PATDET")),
    ..Fixture::default()
})]
#[case::threshold_not_power_of_two(Fixture { ovf_const: 3, ..Fixture::default() })]
fn comparator_needs_idle_detector_and_power_of_two(#[case] fixture: Fixture) {
    let netlist = fixture.build();
    let found = pack(&netlist);

    assert!(found.overflow.is_none());
    assert!(found.p.is_some());
    assert!(found.post_add_mux.is_some());
}

#[test]
fn product_without_readers_is_skipped() {
    setup_test_logging();
    let mut b = NetlistBuilder::new("idle");
    let x = b.input("x", 8);
    let y = b.input("y", 8);
    let p = b.wire("p", 16);
    b.add_cell(Cell::dsp("dsp", x, y, p));
    let netlist = b.build().unwrap();

    let pattern = dsp_pack_pattern(&DspLimits::default()).unwrap();
    let report = Matcher::new(&netlist).run(&pattern);
    assert!(report.records.is_empty());
    assert_eq!(report.stats.roots, 1);
    assert_eq!(report.stats.rejected, 1);
}

#[test]
fn runs_are_reproducible() {
    let netlist = Fixture {
        a1: Some(A1Reset::Shared),
        ..Fixture::default()
    }
    .build();
    let pattern = dsp_pack_pattern(&DspLimits::default()).unwrap();

    let first = Matcher::new(&netlist).run(&pattern);
    let second = Matcher::with_config(&netlist, Config::parallel()).run(&pattern);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let record = &first.records[0];
    let typed = DspMatch::from_record(record).unwrap();
    assert_eq!(
        serde_json::to_value(&typed).unwrap()["dsp"],
        serde_json::json!(id(&netlist, "dsp").index())
    );
    assert!(record.render(&netlist).starts_with("dsp_pack @ \\dsp"));
}
