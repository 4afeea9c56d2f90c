//! Whole-netlist runs over generated adder chains.

use std::sync::Once;

use pmq_common::{Cell, CellId, CellKind, Netlist, NetlistBuilder};
use pmq_engine::{Config, Flow, MatchStep, Matcher, Pattern, PatternBuilder, VarType, port};
use rstest::rstest;

static INIT: Once = Once::new();

fn setup_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// `len` adders, each adding `k` to the previous one's sum.
fn chain(len: usize) -> Netlist {
    let mut b = NetlistBuilder::new("chain");
    let k = b.input("k", 8);
    let mut prev = b.input("x", 8);
    for i in 0..len {
        let sum = if i + 1 == len {
            b.output("y", 8)
        } else {
            b.wire(&format!("s{i}"), 8)
        };
        b.add_cell(Cell::add(&format!("add{i}"), prev, k.clone(), sum.clone()));
        prev = sum;
    }
    b.build().unwrap()
}

fn successor() -> Pattern {
    PatternBuilder::new("successor", CellKind::Add, "add")
        .state("sum", VarType::Sig)
        .state("next", VarType::Cell)
        .code("sum", |cx, st| {
            let Some(add) = st.cell("add") else {
                return Flow::Reject;
            };
            st.set("sum", cx.port(add, "Y").clone());
            Flow::Next
        })
        .step(
            MatchStep::new("next")
                .kind(CellKind::Add)
                .select(|m| m.users(m.port("Y")) <= 1)
                .index(port("A"), |_, st| st.sig("sum").clone()),
        )
        .code("accept", |_, _| Flow::Accept)
        .build()
        .unwrap()
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(17)]
fn every_link_but_the_last_matches(#[case] len: usize) {
    setup_test_logging();
    let netlist = chain(len);
    let report = Matcher::new(&netlist).run(&successor());

    assert_eq!(report.stats.roots, len);
    assert_eq!(report.records.len(), len - 1);
    for (i, record) in report.records.iter().enumerate() {
        assert_eq!(record.root(), CellId::new(i));
        assert_eq!(record.cell("next"), Some(CellId::new(i + 1)));
    }
}

#[test]
fn parallel_config_keeps_root_order() {
    setup_test_logging();
    let netlist = chain(64);
    let pattern = successor();

    let sequential = Matcher::with_config(&netlist, Config::sequential()).run(&pattern);
    let parallel = Matcher::with_config(&netlist, Config::parallel()).run(&pattern);
    assert_eq!(sequential, parallel);
    assert_eq!(parallel.stats.accepted, 63);
}
