mod candidates;
mod exec;
mod stats;

use std::borrow::Cow;

use pmq_common::{CellId, Netlist};
use serde::Serialize;
use tracing::{debug, debug_span, info, info_span};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::binding::BindingRecord;
use crate::config::Config;
use crate::ctx::Ctx;
use crate::index::NetlistIndex;
use crate::pattern::Pattern;

use self::exec::Search;
pub use self::stats::SearchStats;

/// Everything one pattern run produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    /// One record per accepted root, in ascending root order.
    pub records: Vec<BindingRecord>,
    pub stats: SearchStats,
}

/// Runs patterns against one netlist.
#[derive(Debug)]
pub struct Matcher<'n> {
    netlist: &'n Netlist,
    index: Cow<'n, NetlistIndex>,
    config: Config,
}

impl<'n> Matcher<'n> {
    /// Index `netlist` and search it sequentially.
    #[must_use]
    pub fn new(netlist: &'n Netlist) -> Self {
        Self::with_config(netlist, Config::default())
    }

    #[must_use]
    pub fn with_config(netlist: &'n Netlist, config: Config) -> Self {
        Self {
            netlist,
            index: Cow::Owned(NetlistIndex::build(netlist)),
            config,
        }
    }

    /// Reuse an index already built for `netlist`.
    #[must_use]
    pub const fn with_index(netlist: &'n Netlist, index: &'n NetlistIndex, config: Config) -> Self {
        Self {
            netlist,
            index: Cow::Borrowed(index),
            config,
        }
    }

    #[must_use]
    pub fn index(&self) -> &NetlistIndex {
        &self.index
    }

    #[must_use]
    pub fn ctx(&self) -> Ctx<'_> {
        Ctx::new(self.netlist, &self.index)
    }

    /// Search from every cell of the pattern's anchor kind.
    ///
    /// Each root is searched independently and yields at most one record;
    /// the same cell may therefore appear in records of different roots.
    #[must_use]
    pub fn run(&self, pattern: &Pattern) -> MatchReport {
        let roots = self.index.cells_of_kind(pattern.anchor());
        let _span = info_span!("run", pattern = pattern.name(), roots = roots.len()).entered();

        #[cfg(feature = "parallel")]
        let results: Vec<(Option<BindingRecord>, SearchStats)> = if self.config.parallel {
            roots
                .par_iter()
                .map(|&root| self.run_root(pattern, root))
                .collect()
        } else {
            roots
                .iter()
                .map(|&root| self.run_root(pattern, root))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let results: Vec<(Option<BindingRecord>, SearchStats)> = roots
            .iter()
            .map(|&root| self.run_root(pattern, root))
            .collect();

        let mut report = MatchReport::default();
        for (record, stats) in results {
            report.stats += stats;
            report.records.extend(record);
        }
        info!(
            records = report.records.len(),
            branches = report.stats.branches,
            "pattern finished"
        );
        report
    }

    /// Search from a single root cell.
    #[must_use]
    pub fn run_root(
        &self,
        pattern: &Pattern,
        root: CellId,
    ) -> (Option<BindingRecord>, SearchStats) {
        let _span = debug_span!("root", root = %self.netlist.cell(root).name()).entered();
        let mut search = Search::new(self.ctx(), pattern);
        let state = search.run(root);
        debug!(
            accepted = state.is_some(),
            branches = search.stats.branches,
            "root searched"
        );
        let record = state.map(|st| BindingRecord::new(pattern.name(), root, st.into_vars()));
        (record, search.stats)
    }
}
