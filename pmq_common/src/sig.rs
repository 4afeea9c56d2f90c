//! Signal bits and signal vectors.
//!
//! A [`SigBit`] names one bit of a net (or a constant); a [`SigSpec`] is an
//! LSB-first sequence of such bits. Both are plain values: they refer into
//! the netlist's net arena by index and never own netlist data, so pattern
//! state can copy them freely while backtracking.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::logic::{Const, Trit};

/// Index of a net in the netlist's net arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NetId(u32);

impl NetId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One bit of wiring: a bit of a named net, or a constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SigBit {
    Const(Trit),
    Net { net: NetId, offset: u32 },
}

impl SigBit {
    /// The undefined bit; used as "no bit" in pattern state.
    pub const UNDEF: Self = Self::Const(Trit::Undef);
    pub const ZERO: Self = Self::Const(Trit::Zero);
    pub const ONE: Self = Self::Const(Trit::One);

    #[must_use]
    pub const fn net(net: NetId, offset: usize) -> Self {
        Self::Net {
            net,
            offset: offset as u32,
        }
    }

    /// Whether this bit is driven by a net rather than a constant.
    #[must_use]
    pub const fn is_wire(self) -> bool {
        matches!(self, Self::Net { .. })
    }

    #[must_use]
    pub const fn as_const(self) -> Option<Trit> {
        match self {
            Self::Const(t) => Some(t),
            Self::Net { .. } => None,
        }
    }

    #[must_use]
    pub const fn net_id(self) -> Option<NetId> {
        match self {
            Self::Net { net, .. } => Some(net),
            Self::Const(_) => None,
        }
    }
}

impl From<Trit> for SigBit {
    fn from(value: Trit) -> Self {
        Self::Const(value)
    }
}

impl fmt::Display for SigBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(t) => write!(f, "1'b{t}"),
            Self::Net { net, offset } => write!(f, "{net}[{offset}]"),
        }
    }
}

/// An ordered, LSB-first vector of signal bits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SigSpec {
    bits: Vec<SigBit>,
}

impl SigSpec {
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// All bits of a net of the given width.
    #[must_use]
    pub fn from_net(net: NetId, width: usize) -> Self {
        (0..width).map(|offset| SigBit::net(net, offset)).collect()
    }

    /// `len` copies of `bit`.
    #[must_use]
    pub fn repeat(bit: SigBit, len: usize) -> Self {
        Self {
            bits: vec![bit; len],
        }
    }

    #[must_use]
    pub fn from_const(value: &Const) -> Self {
        value.bits().iter().map(|&t| SigBit::Const(t)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[must_use]
    pub fn bits(&self) -> &[SigBit] {
        &self.bits
    }

    pub fn iter(&self) -> impl Iterator<Item = SigBit> + '_ {
        self.bits.iter().copied()
    }

    #[must_use]
    pub fn get(&self, offset: usize) -> Option<SigBit> {
        self.bits.get(offset).copied()
    }

    #[must_use]
    pub fn first(&self) -> Option<SigBit> {
        self.bits.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<SigBit> {
        self.bits.last().copied()
    }

    /// `len` bits starting at `offset`.
    #[must_use]
    #[contracts::debug_requires(offset + len <= self.len(), "extract range exceeds vector")]
    pub fn extract(&self, offset: usize, len: usize) -> Self {
        Self {
            bits: self.bits[offset..offset + len].to_vec(),
        }
    }

    /// All bits from `offset` to the end.
    #[must_use]
    #[contracts::debug_requires(offset <= self.len(), "extract offset exceeds vector")]
    pub fn extract_end(&self, offset: usize) -> Self {
        Self {
            bits: self.bits[offset..].to_vec(),
        }
    }

    /// Append `other` above the current MSB.
    pub fn append(&mut self, other: &Self) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// `self` in the low bits, `other` above it.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.append(other);
        out
    }

    pub fn push(&mut self, bit: SigBit) {
        self.bits.push(bit);
    }

    /// Every bit is constant zero. The empty vector is fully zero.
    #[must_use]
    pub fn is_fully_zero(&self) -> bool {
        self.bits.iter().all(|&b| b == SigBit::ZERO)
    }

    #[must_use]
    pub fn is_fully_const(&self) -> bool {
        self.bits.iter().all(|b| !b.is_wire())
    }

    #[must_use]
    pub fn is_fully_wired(&self) -> bool {
        self.bits.iter().all(|b| b.is_wire())
    }

    /// The constant value, if every bit is constant.
    #[must_use]
    pub fn as_const(&self) -> Option<Const> {
        self.bits.iter().map(|b| b.as_const()).collect()
    }

    /// Substitute every bit that occurs in `pattern` with the bit at the same
    /// position in `with`.
    #[contracts::debug_requires(pattern.len() == with.len())]
    pub fn replace(&mut self, pattern: &Self, with: &Self) {
        let map: HashMap<SigBit, SigBit> = pattern.iter().zip(with.iter()).collect();
        for bit in &mut self.bits {
            if let Some(&to) = map.get(bit) {
                *bit = to;
            }
        }
    }

    /// Drop redundant copies of the most significant bit.
    ///
    /// A run of identical bits at the top collapses; a constant run is
    /// removed entirely (zero/one extension), a wired run keeps one copy as
    /// the sign bit.
    #[must_use]
    pub fn trim_sign_extension(&self) -> Self {
        if self.bits.is_empty() {
            return Self::new();
        }
        let mut i = self.bits.len() - 1;
        while i > 0 && self.bits[i] == self.bits[i - 1] {
            i -= 1;
        }
        if self.bits[i].is_wire() {
            i += 1;
        }
        self.extract(0, i)
    }

    /// `self` begins with `base` and the remaining bits extend it: copies of
    /// `base`'s MSB when `signed`, constant zeros otherwise.
    #[must_use]
    pub fn extends(&self, base: &Self, signed: bool) -> bool {
        let Some(msb) = base.last() else {
            return false;
        };
        if self.len() < base.len() || self.bits[..base.len()] != base.bits[..] {
            return false;
        }
        let fill = if signed { msb } else { SigBit::ZERO };
        self.bits[base.len()..].iter().all(|&b| b == fill)
    }
}

impl FromIterator<SigBit> for SigSpec {
    fn from_iter<I: IntoIterator<Item = SigBit>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl From<SigBit> for SigSpec {
    fn from(bit: SigBit) -> Self {
        Self { bits: vec![bit] }
    }
}

impl From<Vec<SigBit>> for SigSpec {
    fn from(bits: Vec<SigBit>) -> Self {
        Self { bits }
    }
}

impl<'a> IntoIterator for &'a SigSpec {
    type Item = SigBit;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, SigBit>>;

    fn into_iter(self) -> Self::IntoIter {
        self.bits.iter().copied()
    }
}

impl fmt::Display for SigSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, bit) in self.bits.iter().rev().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{bit}")?;
        }
        write!(f, "}}")
    }
}
