use pmq_common::{Cell, CellId, Const, Net, NetId, Netlist, ParamValue, SigBit, SigSpec};

use crate::index::NetlistIndex;

static EMPTY: SigSpec = SigSpec::new();

/// Read-only view of the netlist handed to every pattern callback.
#[derive(Clone, Copy, Debug)]
pub struct Ctx<'n> {
    netlist: &'n Netlist,
    index: &'n NetlistIndex,
}

impl<'n> Ctx<'n> {
    #[must_use]
    pub const fn new(netlist: &'n Netlist, index: &'n NetlistIndex) -> Self {
        Self { netlist, index }
    }

    #[must_use]
    pub const fn netlist(&self) -> &'n Netlist {
        self.netlist
    }

    #[must_use]
    pub const fn index(&self) -> &'n NetlistIndex {
        self.index
    }

    #[must_use]
    pub fn cell(&self, id: CellId) -> &'n Cell {
        self.netlist.cell(id)
    }

    #[must_use]
    pub fn net(&self, id: NetId) -> &'n Net {
        self.netlist.net(id)
    }

    /// The signal on `port` of `cell`; the empty signal when the port is not
    /// connected.
    #[must_use]
    pub fn port(&self, cell: CellId, port: &str) -> &'n SigSpec {
        self.netlist.cell(cell).port(port).unwrap_or(&EMPTY)
    }

    #[must_use]
    pub fn param(&self, cell: CellId, name: &str) -> Option<&'n ParamValue> {
        self.netlist.cell(cell).param(name)
    }

    /// Integer parameter, `0` when absent or not an integer.
    #[must_use]
    pub fn param_int(&self, cell: CellId, name: &str) -> i64 {
        self.param(cell, name)
            .and_then(ParamValue::as_int)
            .unwrap_or(0)
    }

    /// String parameter, `""` when absent.
    #[must_use]
    pub fn param_str(&self, cell: CellId, name: &str) -> &'n str {
        self.param(cell, name)
            .and_then(ParamValue::as_str)
            .unwrap_or("")
    }

    /// Boolean parameter, `false` when absent.
    #[must_use]
    pub fn param_bool(&self, cell: CellId, name: &str) -> bool {
        self.param(cell, name).is_some_and(ParamValue::as_bool)
    }

    /// See [`Netlist::users`].
    #[must_use]
    pub fn users(&self, sig: &SigSpec) -> usize {
        self.netlist.users(sig)
    }

    /// Whether any bit of `sig` lies on a net marked keep.
    #[must_use]
    pub fn has_keep(&self, sig: &SigSpec) -> bool {
        sig.iter()
            .filter_map(|b| b.net_id())
            .any(|n| self.netlist.net(n).keep)
    }

    /// Power-on value of every bit of `sig`; constants report themselves.
    #[must_use]
    pub fn init_of(&self, sig: &SigSpec) -> Const {
        sig.iter()
            .map(|b| match b {
                SigBit::Const(t) => t,
                SigBit::Net { net, offset } => {
                    self.netlist.net(net).init_bit(offset as usize)
                }
            })
            .collect()
    }
}
