//! Constants used throughout the fixer

/// Objective-C stub shape
pub mod stub {
    /// Width of one instruction in bytes
    pub const INSTRUCTION_STRIDE: u64 = 4;

    /// Mnemonic prefixes of a `objc_msgSend` stub, in order
    pub const STUB_MNEMONICS: [&str; 5] = ["adrp", "ldr", "adrp", "ldr", "br"];

    /// Number of instructions in a stub window
    pub const STUB_LENGTH: usize = STUB_MNEMONICS.len();

    /// Size of one slot in `__objc_stubs` (5 instructions + 3 `brk` of padding)
    pub const OBJC_STUB_SLOT_SIZE: u64 = 32;
}

/// Symbol table conventions
pub mod naming {
    /// Prefix the host gives to functions it could not name
    pub const AUTO_NAME_PREFIX: &str = "sub_";

    /// Segment scanned for candidates
    pub const CODE_SEGMENT: &str = "__TEXT";

    /// Section holding the linker-synthesized stubs
    pub const OBJC_STUBS_SECTION: &str = "__objc_stubs";
}

/// Upper bound on the length of a selector string
pub const MAX_STRING_LENGTH: usize = 4096;
