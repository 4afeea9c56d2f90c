//! Three-valued logic constants used for constant signal bits, parameters and
//! initial register values.

use std::fmt;

use serde::Serialize;

/// A single logic value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Trit {
    /// Logic low.
    Zero,
    /// Logic high.
    One,
    /// Undefined / don't care.
    Undef,
}

impl Trit {
    /// Whether this is a defined (0 or 1) value.
    #[must_use]
    pub const fn is_def(self) -> bool {
        !matches!(self, Self::Undef)
    }
}

impl From<bool> for Trit {
    fn from(value: bool) -> Self {
        if value { Self::One } else { Self::Zero }
    }
}

impl fmt::Display for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::Zero => '0',
            Self::One => '1',
            Self::Undef => 'x',
        };
        write!(f, "{c}")
    }
}

/// An ordered, LSB-first vector of [`Trit`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Const {
    bits: Vec<Trit>,
}

impl Const {
    /// Create a constant from LSB-first trits.
    #[must_use]
    pub const fn new(bits: Vec<Trit>) -> Self {
        Self { bits }
    }

    /// Encode the low `width` bits of `value`.
    #[must_use]
    pub fn from_uint(value: u64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| Trit::from(i < 64 && (value >> i) & 1 == 1))
            .collect();
        Self { bits }
    }

    /// A constant of `width` copies of `trit`.
    #[must_use]
    pub fn repeat(trit: Trit, width: usize) -> Self {
        Self {
            bits: vec![trit; width],
        }
    }

    /// Parse an MSB-first string of `0`, `1` and `x` characters.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let bits = text
            .chars()
            .rev()
            .map(|c| match c {
                '0' => Some(Trit::Zero),
                '1' => Some(Trit::One),
                'x' | 'X' => Some(Trit::Undef),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { bits })
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
    pub fn bits(&self) -> &[Trit] {
        &self.bits
    }

    #[must_use]
    pub fn get(&self, offset: usize) -> Option<Trit> {
        self.bits.get(offset).copied()
    }

    /// All bits are [`Trit::Zero`]. An empty constant is fully zero.
    #[must_use]
    pub fn is_fully_zero(&self) -> bool {
        self.bits.iter().all(|&b| b == Trit::Zero)
    }

    /// No bit is [`Trit::Undef`].
    #[must_use]
    pub fn is_fully_def(&self) -> bool {
        self.bits.iter().all(|b| b.is_def())
    }

    /// Number of bits set to one.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b == Trit::One).count()
    }

    /// Truthiness in the Verilog sense: any bit set to one.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        self.count_ones() > 0
    }

    /// Unsigned integer value, if fully defined and no wider than 64 bits.
    #[must_use]
    pub fn as_uint(&self) -> Option<u64> {
        if !self.is_fully_def() || self.bits.len() > 64 {
            return None;
        }
        Some(
            self.bits
                .iter()
                .enumerate()
                .filter(|(_, b)| **b == Trit::One)
                .fold(0u64, |acc, (i, _)| acc | (1 << i)),
        )
    }
}

impl FromIterator<Trit> for Const {
    fn from_iter<I: IntoIterator<Item = Trit>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'b", self.bits.len())?;
        for bit in self.bits.iter().rev() {
            write!(f, "{bit}")?;
        }
        Ok(())
    }
}
