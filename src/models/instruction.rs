//! Decoded instruction as exposed by the host

use serde::{Serialize, Deserialize};

/// A decoded instruction at a fixed address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Address of the first byte of the encoding
    pub address: u64,
    /// Mnemonic, lowercase
    pub mnemonic: String,
    /// Formatted operands, in order
    pub operands: Vec<String>,
}

impl Instruction {
    /// Create a new instruction
    pub fn new(address: u64, mnemonic: impl Into<String>, operands: Vec<String>) -> Self {
        Self {
            address,
            mnemonic: mnemonic.into(),
            operands,
        }
    }

    /// Canonical text, e.g. `ldr x1, [x1, #0x18]`
    pub fn render(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands.join(", "))
        }
    }

    /// Formatted text of the operand at `index` (0-based)
    pub fn operand(&self, index: usize) -> Option<&str> {
        self.operands.get(index).map(String::as_str)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:x}: {}", self.address, self.render())
    }
}
