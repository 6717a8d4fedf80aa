//! Host capabilities over a loaded binary image
//!
//! The analyzer never talks to a concrete file format. It is handed something
//! that can read bytes, fetch decoded instructions and enumerate/rename
//! symbols, and every function takes that capability as a parameter.

pub mod memory;
pub mod macho;

pub use self::memory::{MemoryImage, Section, Segment};
pub use self::macho::load_macho;

use crate::models::instruction::Instruction;

/// Byte-addressable read access
pub trait MemoryReader {
    /// Read one byte, `None` if `address` is unmapped
    fn read_byte(&self, address: u64) -> Option<u8>;

    /// Read a little-endian `u64`, `None` if any of its bytes is unmapped
    fn read_u64_le(&self, address: u64) -> Option<u64> {
        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.read_byte(address.checked_add(i as u64)?)?;
        }
        Some(u64::from_le_bytes(bytes))
    }
}

/// Instruction decoding at an address
pub trait InstructionFetcher {
    /// Decode the instruction starting at `address`, `None` if unmapped or undecodable
    fn fetch_instruction(&self, address: u64) -> Option<Instruction>;
}

/// Enumeration and mutation of the symbol table
pub trait SymbolTable {
    /// Named addresses inside `segment`, ascending; `None` if there is no such segment
    fn named_addresses(&self, segment: &str) -> Option<Vec<u64>>;

    /// Name at `address`
    fn name_at(&self, address: u64) -> Option<String>;

    /// Set (or replace) the name at `address`
    fn set_name_at(&mut self, address: u64, name: &str);
}

/// Everything the driver needs from the host
pub trait Document: MemoryReader + InstructionFetcher + SymbolTable {}

impl<T: MemoryReader + InstructionFetcher + SymbolTable> Document for T {}
