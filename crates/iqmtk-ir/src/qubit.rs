//! Qubit and classical bit types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Register holding qubits of a freshly built circuit.
pub const DEFAULT_QUBIT_REGISTER: &str = "q";

/// Register holding classical bits of a freshly built circuit.
pub const DEFAULT_CLBIT_REGISTER: &str = "c";

/// Register naming physical device nodes after placement.
pub const NODE_REGISTER: &str = "node";

/// Unique identifier for a qubit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// Unique identifier for a classical bit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

/// A quantum bit and the register slot it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Qubit {
    /// The unique identifier.
    pub id: QubitId,
    /// Name of the register this qubit belongs to.
    pub register: String,
    /// Index within the register.
    pub index: u32,
}

impl Qubit {
    /// Create a qubit in the given register slot.
    pub fn new(id: QubitId, register: impl Into<String>, index: u32) -> Self {
        Self {
            id,
            register: register.into(),
            index,
        }
    }

    /// Create a qubit in the default `q` register, indexed by its id.
    pub fn default_register(id: QubitId) -> Self {
        Self::new(id, DEFAULT_QUBIT_REGISTER, id.0)
    }

    /// Create a qubit naming physical device node `node`.
    pub fn node(id: QubitId, node: u32) -> Self {
        Self::new(id, NODE_REGISTER, node)
    }

    /// The physical node index, if this qubit lives in the `node` register.
    pub fn node_index(&self) -> Option<u32> {
        (self.register == NODE_REGISTER).then_some(self.index)
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}

/// A classical bit and the register slot it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clbit {
    /// The unique identifier.
    pub id: ClbitId,
    /// Name of the register this bit belongs to.
    pub register: String,
    /// Index within the register.
    pub index: u32,
}

impl Clbit {
    /// Create a classical bit in the given register slot.
    pub fn new(id: ClbitId, register: impl Into<String>, index: u32) -> Self {
        Self {
            id,
            register: register.into(),
            index,
        }
    }

    /// Create a classical bit in the default `c` register, indexed by its id.
    pub fn default_register(id: ClbitId) -> Self {
        Self::new(id, DEFAULT_CLBIT_REGISTER, id.0)
    }
}

/// The display form `reg[i]` doubles as the measurement key sent to devices.
impl fmt::Display for Clbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}
