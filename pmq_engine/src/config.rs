//! Configuration for running patterns over a netlist.
//!
//! Roots are independent searches, so the only knob is whether they are
//! explored one after another or spread across a thread pool. Either way the
//! records come back in ascending root order.
//!
//! ```ignore
//! use pmq_engine::{Config, Matcher};
//! let matcher = Matcher::with_config(&netlist, Config::parallel());
//! ```

/// Global search configuration.
///
/// - parallel:
///     - false => roots are searched in order on the calling thread.
///     - true  => roots are searched on the rayon pool. Requires the
///       `parallel` feature; without it the flag is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Search roots concurrently.
    pub parallel: bool,
}

impl Config {
    #[must_use]
    pub const fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Convenience: one root after another on the calling thread.
    #[must_use]
    pub const fn sequential() -> Self {
        Self::new(false)
    }

    /// Convenience: roots spread over the rayon pool.
    #[must_use]
    pub const fn parallel() -> Self {
        Self::new(true)
    }
}
