//! Typed netlist cells.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::id_string::IdString;
use crate::logic::Const;
use crate::sig::SigSpec;

/// Index of a cell in the netlist's cell arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellId(u32);

impl CellId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Categorizes netlist primitives into the types patterns select on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CellKind {
    /// Positive- or negative-edge D flip-flop (`CLK`, `D`, `Q`).
    Dff,
    /// Two-way selector, `Y = S ? B : A`.
    Mux,
    /// Two-operand adder.
    Add,
    /// Two-operand subtractor.
    Sub,
    /// Multiplier.
    Mul,
    /// Magnitude comparator, `Y = A >= B`.
    Ge,
    /// Hard DSP macro (multiplier with pre/post adders and pipeline registers).
    Dsp,
    /// Anything the pattern catalogue does not model.
    Other,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dff => "$dff",
            Self::Mux => "$mux",
            Self::Add => "$add",
            Self::Sub => "$sub",
            Self::Mul => "$mul",
            Self::Ge => "$ge",
            Self::Dsp => "DSP48E1",
            Self::Other => "<other>",
        };
        write!(f, "{name}")
    }
}

/// Direction of a cell port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PortDir {
    Input,
    Output,
}

/// One port connection of a cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub dir: PortDir,
    pub sig: SigSpec,
}

/// Index of a port within one cell's port list.
pub type PortIdx = u16;

/// A cell parameter value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ParamValue {
    Int(i64),
    Str(String),
    Bits(Const),
}

impl ParamValue {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bits(c) => c.as_uint().and_then(|v| i64::try_from(v).ok()),
            Self::Str(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Int(v) => *v != 0,
            Self::Bits(c) => c.as_bool(),
            Self::Str(s) => !s.is_empty() && s != "FALSE" && s != "0",
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<Const> for ParamValue {
    fn from(value: Const) -> Self {
        Self::Bits(value)
    }
}

/// A typed node with named ports and parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cell {
    name: IdString,
    kind: CellKind,
    ports: IndexMap<IdString, Connection>,
    params: IndexMap<IdString, ParamValue>,
}

impl Cell {
    #[must_use]
    pub fn new(kind: CellKind, name: &str) -> Self {
        Self {
            name: IdString::new(name),
            kind,
            ports: IndexMap::new(),
            params: IndexMap::new(),
        }
    }

    /// Register: `Q <= D` on the rising edge of `clk`.
    #[must_use]
    pub fn dff(name: &str, clk: SigSpec, d: SigSpec, q: SigSpec) -> Self {
        Self::new(CellKind::Dff, name)
            .with_param("CLK_POLARITY", true)
            .with_input("CLK", clk)
            .with_input("D", d)
            .with_output("Q", q)
    }

    /// Selector: `Y = S ? B : A`.
    #[must_use]
    pub fn mux(name: &str, a: SigSpec, b: SigSpec, s: SigSpec, y: SigSpec) -> Self {
        Self::new(CellKind::Mux, name)
            .with_input("A", a)
            .with_input("B", b)
            .with_input("S", s)
            .with_output("Y", y)
    }

    /// Two-operand arithmetic or comparison cell with `A`, `B` and `Y` ports.
    #[must_use]
    pub fn binary(kind: CellKind, name: &str, a: SigSpec, b: SigSpec, y: SigSpec) -> Self {
        Self::new(kind, name)
            .with_param("A_SIGNED", false)
            .with_param("B_SIGNED", false)
            .with_input("A", a)
            .with_input("B", b)
            .with_output("Y", y)
    }

    #[must_use]
    pub fn add(name: &str, a: SigSpec, b: SigSpec, y: SigSpec) -> Self {
        Self::binary(CellKind::Add, name, a, b, y)
    }

    #[must_use]
    pub fn ge(name: &str, a: SigSpec, b: SigSpec, y: SigSpec) -> Self {
        Self::binary(CellKind::Ge, name, a, b, y)
    }

    /// An unregistered DSP macro computing `P = A * B`.
    ///
    /// All pipeline registers are disabled and the pre-adder, Z-mux and
    /// pattern detector are unused, which is the state a multiplier is in
    /// right after being mapped onto the macro.
    #[must_use]
    pub fn dsp(name: &str, a: SigSpec, b: SigSpec, p: SigSpec) -> Self {
        let mut cell = Self::new(CellKind::Dsp, name)
            .with_param("USE_MULT", "MULTIPLY")
            .with_param("USE_DPORT", "FALSE")
            .with_param("USE_PATTERN_DETECT", "NO_PATDET");
        for reg in ["AREG", "BREG", "ADREG", "DREG", "MREG", "PREG"] {
            cell = cell.with_param(reg, 0_i64);
        }
        cell.with_input("A", a)
            .with_input("B", b)
            .with_input("INMODE", SigSpec::from_const(&Const::from_uint(0, 5)))
            .with_input("OPMODE", SigSpec::from_const(&Const::from_uint(0b000_0101, 7)))
            .with_output("P", p)
    }

    #[must_use]
    pub fn with_input(mut self, port: &str, sig: SigSpec) -> Self {
        self.ports.insert(
            IdString::new(port),
            Connection {
                dir: PortDir::Input,
                sig,
            },
        );
        self
    }

    #[must_use]
    pub fn with_output(mut self, port: &str, sig: SigSpec) -> Self {
        self.ports.insert(
            IdString::new(port),
            Connection {
                dir: PortDir::Output,
                sig,
            },
        );
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(IdString::new(name), value.into());
        self
    }

    #[must_use]
    pub const fn name(&self) -> &IdString {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> CellKind {
        self.kind
    }

    /// The signal on `port`, if the cell has that port.
    #[must_use]
    pub fn port(&self, port: &str) -> Option<&SigSpec> {
        self.ports.get(port).map(|c| &c.sig)
    }

    #[must_use]
    pub fn port_dir(&self, port: &str) -> Option<PortDir> {
        self.ports.get(port).map(|c| c.dir)
    }

    #[must_use]
    pub fn has_port(&self, port: &str) -> bool {
        self.ports.contains_key(port)
    }

    /// Ports in declaration order, with their position.
    pub fn ports(&self) -> impl Iterator<Item = (PortIdx, &IdString, &Connection)> {
        self.ports
            .iter()
            .enumerate()
            .map(|(i, (name, conn))| (i as PortIdx, name, conn))
    }

    /// Name of the port at position `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not a port position of this cell.
    #[must_use]
    pub fn port_name(&self, idx: PortIdx) -> &IdString {
        let (name, _) = self
            .ports
            .get_index(usize::from(idx))
            .expect("port index belongs to this cell");
        name
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn params(&self) -> impl Iterator<Item = (&IdString, &ParamValue)> {
        self.params.iter()
    }
}
