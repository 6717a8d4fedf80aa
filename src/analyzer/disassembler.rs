//! Capstone-backed AArch64 instruction fetch
//!
//! Capstone formats operands the way the resolver expects them: `#0x...` for
//! the resolved page of an `adrp` and `[xN, #0x..]` for an `ldr` memory
//! operand. The one exception is a zero displacement, which capstone prints as
//! a bare `[xN]`; that is expanded to `[xN, #0x0]` here. Displacements
//! below 10 come out in decimal (`#8`), which reads the same as hex.

use capstone::prelude::*;
use log::warn;
use crate::constants::stub::INSTRUCTION_STRIDE;
use crate::models::instruction::Instruction;

fn build_engine() -> CsResult<Capstone> {
    Capstone::new()
        .arm64()
        .mode(arch::arm64::ArchMode::Arm)
        .build()
}

thread_local! {
    // Capstone handles are not shareable across threads; each analysis worker gets its own.
    static ENGINE: Option<Capstone> = match build_engine() {
        Ok(cs) => Some(cs),
        Err(e) => {
            warn!("capstone init failed: {}", e);
            None
        }
    };
}

/// Split capstone's operand string on top-level commas, keeping `[...]` whole
pub fn split_operands(op_str: &str) -> Vec<String> {
    let mut operands = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in op_str.char_indices() {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                operands.push(op_str[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = op_str[start..].trim();
    if !last.is_empty() {
        operands.push(last.to_string());
    }

    operands.into_iter().map(expand_bare_memory_operand).collect()
}

/// `[x1]` -> `[x1, #0x0]`; anything else is returned as is
fn expand_bare_memory_operand(operand: String) -> String {
    let (body, writeback) = match operand.strip_suffix('!') {
        Some(body) => (body, "!"),
        None => (operand.as_str(), ""),
    };
    match body.strip_prefix('[').and_then(|b| b.strip_suffix(']')) {
        Some(base) if !base.contains(',') => format!("[{}, #0x0]{}", base.trim(), writeback),
        _ => operand,
    }
}

/// Decode the single instruction encoded by `bytes`, located at `address`
pub fn decode(bytes: &[u8], address: u64) -> Option<Instruction> {
    ENGINE.with(|engine| {
        let cs = engine.as_ref()?;
        let insns = cs.disasm_count(bytes, address, 1).ok()?;
        let insn = insns.as_ref().first()?;

        let mnemonic = insn.mnemonic()?.to_string();
        let operands = split_operands(insn.op_str().unwrap_or(""));
        Some(Instruction::new(insn.address(), mnemonic, operands))
    })
}

/// Decode the instruction whose encoding starts at `address` within `code`,
/// where `code` is mapped at `base_addr`
pub fn decode_at(code: &[u8], base_addr: u64, address: u64) -> Option<Instruction> {
    if address % INSTRUCTION_STRIDE != 0 || address < base_addr {
        return None;
    }
    let offset = usize::try_from(address - base_addr).ok()?;
    let bytes = code.get(offset..offset.checked_add(INSTRUCTION_STRIDE as usize)?)?;
    decode(bytes, address)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: u32) -> [u8; 4] {
        w.to_le_bytes()
    }

    #[test]
    fn test_split_operands() {
        assert_eq!(split_operands("x1, [x1, #0x18]"), vec!["x1", "[x1, #0x18]"]);
        assert_eq!(split_operands("x16"), vec!["x16"]);
        assert_eq!(split_operands(""), Vec::<String>::new());
        assert_eq!(split_operands("x0, [sp, #0x10]!"), vec!["x0", "[sp, #0x10]!"]);
    }

    #[test]
    fn test_bare_memory_operand_gets_zero_offset() {
        assert_eq!(split_operands("x1, [x1]"), vec!["x1", "[x1, #0x0]"]);
        assert_eq!(split_operands("x0, [sp]!"), vec!["x0", "[sp, #0x0]!"]);
        assert_eq!(split_operands("x0, [x1], #0x8"), vec!["x0", "[x1, #0x0]", "#0x8"]);
    }

    #[test]
    fn test_decode_adrp_resolves_page() {
        // adrp x16, +1 page from 0x100000808
        let insn = decode(&word(0xB000_0010), 0x1_0000_0808).unwrap();
        assert_eq!(insn.mnemonic, "adrp");
        assert_eq!(insn.operand(0), Some("x16"));
        assert_eq!(insn.operand(1), Some("#0x100001000"));
    }

    #[test]
    fn test_decode_ldr_unsigned_offset() {
        let insn = decode(&word(0xF940_0C21), 0).unwrap();
        assert_eq!(insn.render(), "ldr x1, [x1, #0x18]");
        let insn = decode(&word(0xF940_8210), 0).unwrap();
        assert_eq!(insn.operand(1), Some("[x16, #0x100]"));
        // zero displacement
        let insn = decode(&word(0xF940_0021), 0).unwrap();
        assert_eq!(insn.operand(1), Some("[x1, #0x0]"));
    }

    #[test]
    fn test_decode_branches() {
        assert_eq!(decode(&word(0xD61F_0200), 0).unwrap().render(), "br x16");
        assert_eq!(decode(&word(0xD65F_03C0), 0).unwrap().mnemonic, "ret");
        assert_eq!(decode(&word(0xD420_0020), 0).unwrap().mnemonic, "brk");
        assert_eq!(decode(&word(0xD503_201F), 0).unwrap().render(), "nop");
    }

    #[test]
    fn test_decode_at_bounds() {
        let code = [0x1F, 0x20, 0x03, 0xD5, 0x1F, 0x20];
        assert_eq!(decode_at(&code, 0x1000, 0x1000).unwrap().mnemonic, "nop");
        // truncated word
        assert!(decode_at(&code, 0x1000, 0x1004).is_none());
        // misaligned
        assert!(decode_at(&code, 0x1000, 0x1002).is_none());
        // below the buffer
        assert!(decode_at(&code, 0x1000, 0xffc).is_none());
    }
}
