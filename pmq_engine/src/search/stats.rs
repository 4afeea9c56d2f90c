use std::ops::AddAssign;

use serde::Serialize;

/// Counters gathered while searching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Anchor cells a search was started from.
    pub roots: usize,
    /// Roots that produced a record.
    pub accepted: usize,
    /// Candidates enumerated across all match steps.
    pub candidates: usize,
    /// Branches explored (one per candidate tried, plus unbound alternatives).
    pub branches: usize,
    /// Branches cut by a code step or a required match with no candidate.
    pub rejected: usize,
    /// Branches that ran off the end of the pattern without accepting.
    pub dead_ends: usize,
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.roots += rhs.roots;
        self.accepted += rhs.accepted;
        self.candidates += rhs.candidates;
        self.branches += rhs.branches;
        self.rejected += rhs.rejected;
        self.dead_ends += rhs.dead_ends;
    }
}
