//! Null-terminated string reading

use log::debug;
use crate::constants::MAX_STRING_LENGTH;
use crate::errors::{StubError, StubResult};
use crate::image::MemoryReader;

/// Read a NUL-terminated UTF-8 string starting at `address`
pub fn read_string<M: MemoryReader + ?Sized>(memory: &M, address: u64) -> StubResult<String> {
    read_string_bounded(memory, address, MAX_STRING_LENGTH)
}

/// Read a NUL-terminated UTF-8 string of at most `limit` bytes
///
/// The terminator is not part of the result.
pub fn read_string_bounded<M: MemoryReader + ?Sized>(
    memory: &M,
    address: u64,
    limit: usize,
) -> StubResult<String> {
    let mut result = Vec::new();
    let mut current = address;

    loop {
        let byte = memory
            .read_byte(current)
            .ok_or(StubError::ReadFault { address: current })?;
        if byte == 0 {
            break;
        }
        if result.len() == limit {
            return Err(StubError::LengthExceeded { start: address, limit });
        }
        result.push(byte);
        current = current
            .checked_add(1)
            .ok_or(StubError::ReadFault { address: current })?;
    }

    debug!("Read {}-byte string at 0x{:x}", result.len(), address);
    String::from_utf8(result).map_err(|_| StubError::InvalidEncoding { address })
}
