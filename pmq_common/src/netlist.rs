//! The read-only netlist graph.
//!
//! A [`Netlist`] is an arena of named nets and an arena of typed cells. Cells
//! refer to nets through [`SigSpec`]s; the netlist additionally records, for
//! every wired bit, which cell drives it and which (cell, port) pairs read
//! it, so fan-out ("users") queries are answered without scanning cells.
//!
//! Netlists are assembled with a [`NetlistBuilder`] and are immutable once
//! built.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::cell::{Cell, CellId, CellKind, PortDir, PortIdx};
use crate::error::NetlistError;
use crate::id_string::IdString;
use crate::logic::{Const, Trit};
use crate::sig::{NetId, SigBit, SigSpec};

/// A named multi-bit net.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Net {
    pub name: IdString,
    pub width: usize,
    /// "Do not touch": patterns must not absorb logic around this net.
    pub keep: bool,
    /// Power-on value, if the net is the output of a register with one.
    pub init: Option<Const>,
    /// Set when the net is a module input or output port.
    pub port: Option<PortDir>,
}

impl Net {
    /// Initial value of bit `offset`, or [`Trit::Undef`] when none is given.
    #[must_use]
    pub fn init_bit(&self, offset: usize) -> Trit {
        self.init
            .as_ref()
            .and_then(|c| c.get(offset))
            .unwrap_or(Trit::Undef)
    }
}

/// Something that reads a signal bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reader {
    /// An input port of a cell.
    Cell { cell: CellId, port: PortIdx },
    /// The module boundary, through an output port net.
    Output(NetId),
}

/// Where a wired bit is driven from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Driver {
    pub cell: CellId,
    pub port: PortIdx,
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct Netlist {
    name: IdString,
    nets: Vec<Net>,
    cells: Vec<Cell>,
    drivers: HashMap<SigBit, Driver>,
    readers: HashMap<SigBit, Vec<Reader>>,
}

impl Netlist {
    #[must_use]
    pub fn builder(name: &str) -> NetlistBuilder {
        NetlistBuilder::new(name)
    }

    #[must_use]
    pub const fn name(&self) -> &IdString {
        &self.name
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this netlist.
    #[must_use]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this netlist.
    #[must_use]
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    pub fn cells(&self) -> impl ExactSizeIterator<Item = (CellId, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (CellId::new(i), c))
    }

    pub fn nets(&self) -> impl ExactSizeIterator<Item = (NetId, &Net)> {
        self.nets.iter().enumerate().map(|(i, n)| (NetId::new(i), n))
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Find a cell by name.
    #[must_use]
    pub fn find_cell(&self, name: &str) -> Option<CellId> {
        let name = IdString::new(name);
        self.cells
            .iter()
            .position(|c| *c.name() == name)
            .map(CellId::new)
    }

    /// The cell output driving `bit`; `None` for constants and undriven or
    /// module-input bits.
    #[must_use]
    pub fn driver(&self, bit: SigBit) -> Option<Driver> {
        self.drivers.get(&bit).copied()
    }

    /// Everything reading `bit`. Constants have no tracked readers.
    #[must_use]
    pub fn readers(&self, bit: SigBit) -> &[Reader] {
        self.readers.get(&bit).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct readers of the wired bits of `sig`.
    ///
    /// Each (cell, input port) pair counts once however many bits of `sig` it
    /// reads, and so does each module output net. Registers and selectors
    /// may only be absorbed into a macro when the signal between them has
    /// exactly the readers the pattern accounts for.
    #[must_use]
    pub fn users(&self, sig: &SigSpec) -> usize {
        let readers: HashSet<Reader> = sig
            .iter()
            .filter(|b| b.is_wire())
            .flat_map(|b| self.readers(b).iter().copied())
            .collect();
        readers.len()
    }

    /// Render `sig` MSB-first as `name[hi:lo]` chunks.
    #[must_use]
    pub fn describe(&self, sig: &SigSpec) -> String {
        let mut chunks: Vec<String> = Vec::new();
        let bits = sig.bits();
        let mut i = 0;
        while i < bits.len() {
            match bits[i] {
                SigBit::Const(t) => {
                    chunks.push(format!("1'b{t}"));
                    i += 1;
                }
                SigBit::Net { net, offset } => {
                    let mut j = i + 1;
                    while j < bits.len()
                        && bits[j] == SigBit::net(net, offset as usize + (j - i))
                    {
                        j += 1;
                    }
                    let n = self.net(net);
                    let hi = offset as usize + (j - i) - 1;
                    chunks.push(if j - i == n.width {
                        n.name.to_string()
                    } else if j - i == 1 {
                        format!("{}[{offset}]", n.name)
                    } else {
                        format!("{}[{hi}:{offset}]", n.name)
                    });
                    i = j;
                }
            }
        }
        match chunks.len() {
            0 => "{}".to_owned(),
            1 => chunks.remove(0),
            _ => {
                chunks.reverse();
                format!("{{{}}}", chunks.join(", "))
            }
        }
    }
}

/// Incrementally assembles a [`Netlist`].
#[derive(Clone, Debug, Default)]
pub struct NetlistBuilder {
    name: String,
    nets: Vec<Net>,
    cells: Vec<Cell>,
}

impl NetlistBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Declare an internal net.
    pub fn add_net(&mut self, name: &str, width: usize) -> NetId {
        let id = NetId::new(self.nets.len());
        self.nets.push(Net {
            name: IdString::new(name),
            width,
            keep: false,
            init: None,
            port: None,
        });
        id
    }

    /// Declare an internal net and return all of its bits.
    pub fn wire(&mut self, name: &str, width: usize) -> SigSpec {
        let id = self.add_net(name, width);
        SigSpec::from_net(id, width)
    }

    /// Declare a module input port net.
    pub fn input(&mut self, name: &str, width: usize) -> SigSpec {
        let id = self.add_net(name, width);
        self.nets[id.index()].port = Some(PortDir::Input);
        SigSpec::from_net(id, width)
    }

    /// Declare a module output port net.
    pub fn output(&mut self, name: &str, width: usize) -> SigSpec {
        let id = self.add_net(name, width);
        self.nets[id.index()].port = Some(PortDir::Output);
        SigSpec::from_net(id, width)
    }

    /// Mark every net touched by `sig` as "do not touch".
    pub fn set_keep(&mut self, sig: &SigSpec) {
        for net in sig.iter().filter_map(SigBit::net_id) {
            if let Some(n) = self.nets.get_mut(net.index()) {
                n.keep = true;
            }
        }
    }

    /// Mark every net touched by `sig` as a module output.
    pub fn set_output(&mut self, sig: &SigSpec) {
        for net in sig.iter().filter_map(SigBit::net_id) {
            if let Some(n) = self.nets.get_mut(net.index()) {
                n.port = Some(PortDir::Output);
            }
        }
    }

    pub fn set_init(&mut self, net: NetId, init: Const) {
        if let Some(n) = self.nets.get_mut(net.index()) {
            n.init = Some(init);
        }
    }

    pub fn add_cell(&mut self, cell: Cell) -> CellId {
        let id = CellId::new(self.cells.len());
        self.cells.push(cell);
        id
    }

    /// Validate the connectivity and freeze the netlist.
    ///
    /// # Errors
    ///
    /// Returns a [`NetlistError`] for dangling bits, bits with more than one
    /// driver, cells driving constants, malformed register or selector port
    /// widths and init values of the wrong width.
    pub fn build(self) -> Result<Netlist, NetlistError> {
        for (i, net) in self.nets.iter().enumerate() {
            if let Some(init) = &net.init {
                if init.len() != net.width {
                    return Err(NetlistError::InitWidth {
                        net: NetId::new(i),
                        width: net.width,
                        found: init.len(),
                    });
                }
            }
        }

        let mut drivers: HashMap<SigBit, Driver> = HashMap::new();
        let mut readers: HashMap<SigBit, Vec<Reader>> = HashMap::new();

        for (ci, cell) in self.cells.iter().enumerate() {
            let id = CellId::new(ci);
            check_widths(id, cell)?;
            for (pi, name, conn) in cell.ports() {
                for (offset, bit) in conn.sig.iter().enumerate() {
                    let SigBit::Net { net, offset: bit_off } = bit else {
                        if conn.dir == PortDir::Output {
                            return Err(NetlistError::ConstantDriver {
                                cell: id,
                                port: name.to_string(),
                            });
                        }
                        continue;
                    };
                    let Some(n) = self.nets.get(net.index()) else {
                        return Err(NetlistError::UnknownNet {
                            cell: id,
                            port: name.to_string(),
                            net,
                        });
                    };
                    if bit_off as usize >= n.width {
                        return Err(NetlistError::BitOutOfRange {
                            cell: id,
                            port: name.to_string(),
                            net,
                            offset: bit_off as usize,
                            width: n.width,
                        });
                    }
                    match conn.dir {
                        PortDir::Output => {
                            let driver = Driver {
                                cell: id,
                                port: pi,
                                offset,
                            };
                            if let Some(first) = drivers.insert(bit, driver) {
                                return Err(NetlistError::MultipleDrivers {
                                    net,
                                    offset: bit_off as usize,
                                    first: first.cell,
                                    second: id,
                                });
                            }
                        }
                        PortDir::Input => {
                            let list = readers.entry(bit).or_default();
                            let reader = Reader::Cell { cell: id, port: pi };
                            if !list.contains(&reader) {
                                list.push(reader);
                            }
                        }
                    }
                }
            }
        }

        for (ni, net) in self.nets.iter().enumerate() {
            if net.port == Some(PortDir::Output) {
                let id = NetId::new(ni);
                for offset in 0..net.width {
                    readers
                        .entry(SigBit::net(id, offset))
                        .or_default()
                        .push(Reader::Output(id));
                }
            }
        }

        Ok(Netlist {
            name: IdString::new(&self.name),
            nets: self.nets,
            cells: self.cells,
            drivers,
            readers,
        })
    }
}

fn check_widths(id: CellId, cell: &Cell) -> Result<(), NetlistError> {
    let require = |port: &str| {
        cell.port(port).ok_or_else(|| NetlistError::MissingPort {
            cell: id,
            kind: cell.kind(),
            port: port.to_owned(),
        })
    };
    let same = |port: &str, sig: &SigSpec, expected: usize| {
        if sig.len() == expected {
            Ok(())
        } else {
            Err(NetlistError::WidthMismatch {
                cell: id,
                kind: cell.kind(),
                port: port.to_owned(),
                expected,
                found: sig.len(),
            })
        }
    };
    match cell.kind() {
        CellKind::Dff => {
            let q = require("Q")?;
            same("D", require("D")?, q.len())?;
            same("CLK", require("CLK")?, 1)
        }
        CellKind::Mux => {
            let y = require("Y")?;
            same("A", require("A")?, y.len())?;
            same("B", require("B")?, y.len())?;
            same("S", require("S")?, 1)
        }
        CellKind::Add | CellKind::Sub | CellKind::Mul | CellKind::Ge => {
            require("A")?;
            require("B")?;
            require("Y").map(|_| ())
        }
        CellKind::Dsp | CellKind::Other => Ok(()),
    }
}
