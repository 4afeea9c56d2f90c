use thiserror::Error;

use crate::cell::{CellId, CellKind};
use crate::sig::NetId;

/// Structural problems found while freezing a netlist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetlistError {
    #[error("cell {cell} port {port}: net {net} does not exist")]
    UnknownNet {
        cell: CellId,
        port: String,
        net: NetId,
    },

    #[error("cell {cell} port {port}: bit {offset} is outside net {net} of width {width}")]
    BitOutOfRange {
        cell: CellId,
        port: String,
        net: NetId,
        offset: usize,
        width: usize,
    },

    #[error("bit {offset} of net {net} is driven by both {first} and {second}")]
    MultipleDrivers {
        net: NetId,
        offset: usize,
        first: CellId,
        second: CellId,
    },

    #[error("cell {cell} drives a constant from output port {port}")]
    ConstantDriver { cell: CellId, port: String },

    #[error("{kind} cell {cell}: port {port} is {found} bits wide, expected {expected}")]
    WidthMismatch {
        cell: CellId,
        kind: CellKind,
        port: String,
        expected: usize,
        found: usize,
    },

    #[error("{kind} cell {cell} is missing port {port}")]
    MissingPort {
        cell: CellId,
        kind: CellKind,
        port: String,
    },

    #[error("init value of net {net} is {found} bits wide, net is {width}")]
    InitWidth {
        net: NetId,
        width: usize,
        found: usize,
    },
}
