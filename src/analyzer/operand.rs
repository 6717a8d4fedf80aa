//! Operand text parsing
//!
//! The decoder hands us operands already formatted, e.g. `#0x100000` for the
//! page of an `adrp` and `[x1, #0x18]` for the memory operand of an `ldr`.
//! These helpers pull the numbers back out of that text.

/// Drop the one-character immediate marker (normally `#`)
pub fn strip_immediate_marker(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    chars.next()?;
    Some(chars.as_str())
}

/// Parse hexadecimal digits, with or without a `0x` prefix
pub fn parse_hex(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Parse a hex value that may carry a leading `+` or `-`
pub fn parse_signed_hex(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('-') {
        let magnitude = parse_hex(rest)?;
        if magnitude == 1u64 << 63 {
            return Some(i64::MIN);
        }
        i64::try_from(magnitude).ok().map(|m| -m)
    } else {
        let rest = text.strip_prefix('+').unwrap_or(text);
        i64::try_from(parse_hex(rest)?).ok()
    }
}

/// Page base from the second operand of an `adrp`, e.g. `#0x100000`
pub fn parse_page_base(operand: &str) -> Option<u64> {
    parse_hex(strip_immediate_marker(operand.trim())?)
}

/// Split `[base, offset]` into its base register and offset text
pub fn split_memory_operand(operand: &str) -> Option<(&str, &str)> {
    let open = operand.find('[')?;
    let inner = &operand[open + 1..];
    let close = inner.find(']')?;
    let (base, offset) = inner[..close].split_once(',')?;
    Some((base.trim(), offset.trim()))
}

/// Byte offset from an `ldr` memory operand, e.g. `[x8, #0x18]`
pub fn parse_byte_offset(operand: &str) -> Option<i64> {
    let (_, offset) = split_memory_operand(operand)?;
    parse_signed_hex(strip_immediate_marker(offset)?)
}
