//! Selector resolution for matched stubs
//!
//! The first two instructions of a stub load the selector:
//!
//! ```text
//! adrp x1, #<page>             ; page of the selector reference
//! ldr  x1, [x1, #<offset>]     ; x1 = *(page + offset)
//! ```
//!
//! The cell at `page + offset` holds a pointer to the selector's C string.

use log::debug;
use crate::analyzer::operand::{parse_byte_offset, parse_page_base};
use crate::analyzer::string_reader::read_string_bounded;
use crate::constants::stub::INSTRUCTION_STRIDE;
use crate::constants::MAX_STRING_LENGTH;
use crate::errors::{OperandField, StubError, StubResult};
use crate::image::{InstructionFetcher, MemoryReader};
use crate::models::instruction::Instruction;

/// Page base carried by the `adrp`
pub fn page_base(adrp: &Instruction) -> StubResult<u64> {
    let text = adrp.operand(1).unwrap_or_default();
    parse_page_base(text).ok_or_else(|| StubError::ParseFailure {
        field: OperandField::PageBase,
        text: text.to_string(),
    })
}

/// Byte offset carried by the `ldr` memory operand
pub fn byte_offset(ldr: &Instruction) -> StubResult<i64> {
    let text = ldr.operand(1).unwrap_or_default();
    parse_byte_offset(text).ok_or_else(|| StubError::ParseFailure {
        field: OperandField::ByteOffset,
        text: text.to_string(),
    })
}

/// Address of the selector reference cell, `page + offset`
pub fn selector_cell_address(adrp: &Instruction, ldr: &Instruction) -> StubResult<u64> {
    let page = page_base(adrp)?;
    let offset = byte_offset(ldr)?;
    page.checked_add_signed(offset)
        .ok_or(StubError::CellOverflow { page, offset })
}

/// Resolve the selector name of the stub at `address`
///
/// The caller is expected to have checked the stub shape already.
pub fn resolve_selector<M, F>(memory: &M, fetch: &F, address: u64) -> StubResult<String>
where
    M: MemoryReader + ?Sized,
    F: InstructionFetcher + ?Sized,
{
    resolve_selector_bounded(memory, fetch, address, MAX_STRING_LENGTH)
}

/// `resolve_selector` with an explicit cap on the selector length
pub fn resolve_selector_bounded<M, F>(
    memory: &M,
    fetch: &F,
    address: u64,
    max_string_length: usize,
) -> StubResult<String>
where
    M: MemoryReader + ?Sized,
    F: InstructionFetcher + ?Sized,
{
    let adrp = fetch
        .fetch_instruction(address)
        .ok_or(StubError::FetchFailure { address })?;
    let ldr_address = address
        .checked_add(INSTRUCTION_STRIDE)
        .ok_or(StubError::FetchFailure { address })?;
    let ldr = fetch
        .fetch_instruction(ldr_address)
        .ok_or(StubError::FetchFailure { address: ldr_address })?;

    let cell = selector_cell_address(&adrp, &ldr)?;
    let pointer = memory
        .read_u64_le(cell)
        .ok_or(StubError::UnreadablePointer { cell })?;
    if pointer == 0 {
        return Err(StubError::NullPointer { cell });
    }

    debug!("Stub 0x{:x}: selref 0x{:x} -> 0x{:x}", address, cell, pointer);
    let selector = read_string_bounded(memory, pointer, max_string_length)?;
    if selector.is_empty() {
        return Err(StubError::EmptySelector { address: pointer });
    }
    Ok(selector)
}
