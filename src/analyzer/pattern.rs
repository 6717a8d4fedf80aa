//! Stub shape recognition
//!
//! A stub is accepted on shape alone: five consecutive instructions whose
//! rendered text starts with `adrp`, `ldr`, `adrp`, `ldr`, `br`. Nothing about
//! the registers or targets is checked here; a window that straddles two
//! functions but has the right mnemonics still matches.

use crate::constants::stub::{INSTRUCTION_STRIDE, STUB_LENGTH, STUB_MNEMONICS};
use crate::image::InstructionFetcher;
use crate::models::instruction::Instruction;

/// Fetch the `STUB_LENGTH` instructions starting at `address`
pub fn fetch_window<F: InstructionFetcher + ?Sized>(fetch: &F, address: u64) -> Option<Vec<Instruction>> {
    (0..STUB_LENGTH as u64)
        .map(|i| {
            let at = address.checked_add(i * INSTRUCTION_STRIDE)?;
            fetch.fetch_instruction(at)
        })
        .collect()
}

/// Does this window have the stub shape?
pub fn matches_stub_shape(window: &[Instruction]) -> bool {
    window.len() == STUB_LENGTH
        && window
            .iter()
            .zip(STUB_MNEMONICS.iter())
            .all(|(insn, expected)| insn.render().starts_with(expected))
}

/// Is the function at `address` an `objc_msgSend` stub?
pub fn is_stub<F: InstructionFetcher + ?Sized>(fetch: &F, address: u64) -> bool {
    match fetch_window(fetch, address) {
        Some(window) => matches_stub_shape(&window),
        None => false,
    }
}
