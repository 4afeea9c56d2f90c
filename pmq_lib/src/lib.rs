//! Pattern library with ready-made idioms for the pmq matcher.

pub mod dsp;

pub use dsp::{DspLimits, DspMatch, Register, dsp_pack_pattern, find_dsp_packs};
