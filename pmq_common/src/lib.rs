//! Netlist graph shared across the pmq workspace.
//!
//! This crate provides the read-only view of a design that pattern matching
//! runs against: an arena of named nets, an arena of typed cells with named
//! ports and parameters, LSB-first signal vectors referring into the net
//! arena, and per-bit driver/reader tables for fan-out queries.

mod cell;
mod error;
mod id_string;
mod logic;
mod netlist;
mod sig;

pub use crate::cell::{Cell, CellId, CellKind, Connection, ParamValue, PortDir, PortIdx};
pub use crate::error::NetlistError;
pub use crate::id_string::IdString;
pub use crate::logic::{Const, Trit};
pub use crate::netlist::{Driver, Net, Netlist, NetlistBuilder, Reader};
pub use crate::sig::{NetId, SigBit, SigSpec};
