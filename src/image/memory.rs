//! In-memory image: mapped segments plus a symbol table

use std::collections::BTreeMap;
use crate::analyzer::disassembler;
use crate::image::{InstructionFetcher, MemoryReader, SymbolTable};
use crate::models::instruction::Instruction;

/// Named range inside a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name, e.g. `__objc_stubs`
    pub name: String,
    /// Start address
    pub address: u64,
    /// Size in bytes
    pub size: u64,
}

/// Mapped segment
#[derive(Debug, Clone)]
pub struct Segment {
    /// Segment name, e.g. `__TEXT`
    pub name: String,
    /// Start address
    pub address: u64,
    /// Virtual size; bytes past `data` up to this size read as zero
    pub size: u64,
    /// Backing bytes
    pub data: Vec<u8>,
    /// Sections in this segment
    pub sections: Vec<Section>,
}

impl Segment {
    /// Create a segment whose virtual size equals its data
    pub fn new(name: impl Into<String>, address: u64, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            address,
            size: data.len() as u64,
            data,
            sections: Vec::new(),
        }
    }

    /// Extend the virtual size (zero-fill), never shrinking below the data
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size.max(self.data.len() as u64);
        self
    }

    /// Add a section
    pub fn with_section(mut self, name: impl Into<String>, address: u64, size: u64) -> Self {
        self.sections.push(Section { name: name.into(), address, size });
        self
    }

    /// Does this segment map `address`?
    pub fn contains(&self, address: u64) -> bool {
        address >= self.address && address - self.address < self.size
    }

    fn read_byte(&self, address: u64) -> Option<u8> {
        if !self.contains(address) {
            return None;
        }
        let offset = usize::try_from(address - self.address).ok()?;
        Some(self.data.get(offset).copied().unwrap_or(0))
    }
}

/// Binary image held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    segments: Vec<Segment>,
    names: BTreeMap<u64, String>,
}

impl MemoryImage {
    /// Create an empty image
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a segment
    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// All mapped segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First segment named `name`
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    /// Mutable access to the first segment named `name`
    pub fn segment_mut(&mut self, name: &str) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.name == name)
    }

    /// First section named `name`, across all segments
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.segments
            .iter()
            .flat_map(|s| s.sections.iter())
            .find(|s| s.name == name)
    }

    /// Number of names in the symbol table
    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    fn segment_containing(&self, address: u64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.contains(address))
    }
}

impl MemoryReader for MemoryImage {
    fn read_byte(&self, address: u64) -> Option<u8> {
        self.segment_containing(address)?.read_byte(address)
    }
}

impl InstructionFetcher for MemoryImage {
    fn fetch_instruction(&self, address: u64) -> Option<Instruction> {
        let segment = self.segment_containing(address)?;
        disassembler::decode_at(&segment.data, segment.address, address)
    }
}

impl SymbolTable for MemoryImage {
    fn named_addresses(&self, segment: &str) -> Option<Vec<u64>> {
        let ranges: Vec<&Segment> = self.segments.iter().filter(|s| s.name == segment).collect();
        if ranges.is_empty() {
            return None;
        }

        Some(
            self.names
                .keys()
                .copied()
                .filter(|&address| ranges.iter().any(|s| s.contains(address)))
                .collect(),
        )
    }

    fn name_at(&self, address: u64) -> Option<String> {
        self.names.get(&address).cloned()
    }

    fn set_name_at(&mut self, address: u64, name: &str) {
        self.names.insert(address, name.to_string());
    }
}
