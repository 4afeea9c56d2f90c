//! Backtracking rule engine for finding multi-cell idioms in a netlist.
//!
//! A [`Pattern`] anchors on every cell of one kind and walks outward through
//! a fixed sequence of steps. Match steps bind a role to a neighbouring cell,
//! using the [`NetlistIndex`] to jump to the cells connected to a known
//! signal; code steps check conditions and update typed state; call steps
//! run reusable [`Subpattern`]s in their own scope. Each root yields at most
//! one [`BindingRecord`]: the state at the first accept reached in
//! depth-first order.
//!
//! ```ignore
//! use pmq_engine::{Matcher, PatternBuilder};
//! let report = Matcher::new(&netlist).run(&pattern);
//! for record in &report.records {
//!     println!("{}", record.render(&netlist));
//! }
//! ```

mod binding;
mod config;
mod ctx;
mod error;
mod index;
mod pattern;
mod search;
mod state;
mod value;

pub use crate::binding::BindingRecord;
pub use crate::config::Config;
pub use crate::ctx::Ctx;
pub use crate::error::PatternError;
pub use crate::index::{NetlistIndex, PortRef};
pub use crate::pattern::{
    At, CallStep, CodeStep, Flow, MatchMode, MatchStep, MatchView, Pattern, PatternBuilder,
    PortSel, Step, Subpattern, chosen, port,
};
pub use crate::search::{MatchReport, Matcher, SearchStats};
pub use crate::state::State;
pub use crate::value::{Value, VarType};
