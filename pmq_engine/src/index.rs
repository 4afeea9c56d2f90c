use std::collections::HashMap;

use itertools::Itertools;
use pmq_common::{CellId, CellKind, Netlist, PortIdx, SigBit, SigSpec};

/// One bit position of one cell port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub cell: CellId,
    pub port: PortIdx,
    /// Position of the bit within the port.
    pub offset: usize,
}

/// Lookup tables that let a match step jump straight to the cells connected
/// to a known signal instead of scanning every cell of a kind.
///
/// Built once per netlist and shared by every root search. Only wired bits
/// are indexed; a key whose bits are constant finds nothing.
#[derive(Clone, Debug, Default)]
pub struct NetlistIndex {
    by_bit: HashMap<SigBit, Vec<PortRef>>,
    by_kind: HashMap<CellKind, Vec<CellId>>,
}

impl NetlistIndex {
    #[must_use]
    pub fn build(netlist: &Netlist) -> Self {
        let mut by_bit: HashMap<SigBit, Vec<PortRef>> = HashMap::new();
        let mut by_kind: HashMap<CellKind, Vec<CellId>> = HashMap::new();

        for (cell_id, cell) in netlist.cells() {
            by_kind.entry(cell.kind()).or_default().push(cell_id);
            for (port, _, conn) in cell.ports() {
                for (offset, bit) in conn.sig.iter().enumerate() {
                    if bit.is_wire() {
                        by_bit.entry(bit).or_default().push(PortRef {
                            cell: cell_id,
                            port,
                            offset,
                        });
                    }
                }
            }
        }

        // Cells are visited in id order, so every list is already sorted.
        Self { by_bit, by_kind }
    }

    /// Every port position connected to `bit`, in ascending cell order.
    #[must_use]
    pub fn lookup(&self, bit: SigBit) -> &[PortRef] {
        self.by_bit.get(&bit).map_or(&[], Vec::as_slice)
    }

    /// Cells of kind `kind` in ascending id order.
    #[must_use]
    pub fn cells_of_kind(&self, kind: CellKind) -> &[CellId] {
        self.by_kind.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// The (cell, port) pairs whose whole port value is exactly `sig`, in
    /// ascending order.
    #[must_use]
    pub fn ports_matching(&self, netlist: &Netlist, sig: &SigSpec) -> Vec<(CellId, PortIdx)> {
        let Some(first) = sig.first() else {
            return Vec::new();
        };
        self.lookup(first)
            .iter()
            .filter(|r| r.offset == 0)
            .filter(|r| {
                let cell = netlist.cell(r.cell);
                cell.port(cell.port_name(r.port)) == Some(sig)
            })
            .map(|r| (r.cell, r.port))
            .dedup()
            .collect()
    }
}
