//! Hand-built Mach-O fixtures

#![allow(dead_code)]

pub const CPU_TYPE_ARM64: u32 = 0x0100_000c;
pub const CPU_TYPE_X86_64: u32 = 0x0100_0007;

pub const TEXT_BASE: u64 = 0x1_0000_0000;
pub const STUBS: u64 = TEXT_BASE + 0x800;
pub const DATA_BASE: u64 = TEXT_BASE + 0x1000;
pub const STRINGS: u64 = DATA_BASE + 0x800;

fn name16(name: &str) -> [u8; 16] {
    let mut raw = [0u8; 16];
    raw[..name.len()].copy_from_slice(name.as_bytes());
    raw
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// adrp x1 / ldr x1, [x1, #selref_off] / adrp x16 / ldr x16, [x16, #0x100] / br x16 / 3 x brk
fn stub_words(selref_off: u32) -> [u32; 8] {
    [
        0xB000_0001,
        0xF940_0021 | ((selref_off / 8) << 10),
        0xB000_0010,
        0xF940_8210,
        0xD61F_0200,
        0xD420_0020,
        0xD420_0020,
        0xD420_0020,
    ]
}

struct SegmentSpec {
    name: &'static str,
    vmaddr: u64,
    fileoff: u64,
    size: u64,
    sections: Vec<(&'static str, u64, u64, u32)>, // (name, addr, size, file offset)
}

fn load_commands(segments: &[SegmentSpec]) -> Vec<u8> {
    let mut cmds = Vec::new();
    for seg in segments {
        let cmdsize = 72 + 80 * seg.sections.len() as u32;
        cmds.extend_from_slice(&0x19u32.to_le_bytes()); // LC_SEGMENT_64
        cmds.extend_from_slice(&cmdsize.to_le_bytes());
        cmds.extend_from_slice(&name16(seg.name));
        cmds.extend_from_slice(&seg.vmaddr.to_le_bytes());
        cmds.extend_from_slice(&seg.size.to_le_bytes()); // vmsize
        cmds.extend_from_slice(&seg.fileoff.to_le_bytes());
        cmds.extend_from_slice(&seg.size.to_le_bytes()); // filesize
        cmds.extend_from_slice(&5i32.to_le_bytes()); // maxprot
        cmds.extend_from_slice(&5i32.to_le_bytes()); // initprot
        cmds.extend_from_slice(&(seg.sections.len() as u32).to_le_bytes());
        cmds.extend_from_slice(&0u32.to_le_bytes()); // flags
        for (name, addr, size, offset) in &seg.sections {
            cmds.extend_from_slice(&name16(name));
            cmds.extend_from_slice(&name16(seg.name));
            cmds.extend_from_slice(&addr.to_le_bytes());
            cmds.extend_from_slice(&size.to_le_bytes());
            cmds.extend_from_slice(&offset.to_le_bytes());
            cmds.extend_from_slice(&2u32.to_le_bytes()); // align
            cmds.extend_from_slice(&0u32.to_le_bytes()); // reloff
            cmds.extend_from_slice(&0u32.to_le_bytes()); // nreloc
            cmds.extend_from_slice(&0x8000_0400u32.to_le_bytes()); // pure instructions
            cmds.extend_from_slice(&[0u8; 12]); // reserved1..3
        }
    }
    cmds
}

/// Thin Mach-O with two stubs (`init`, `count`) in `__objc_stubs`
pub fn thin_macho(cputype: u32) -> Vec<u8> {
    let segments = vec![
        SegmentSpec {
            name: "__TEXT",
            vmaddr: TEXT_BASE,
            fileoff: 0,
            size: 0x1000,
            sections: vec![("__objc_stubs", STUBS, 0x40, 0x800)],
        },
        SegmentSpec {
            name: "__DATA",
            vmaddr: DATA_BASE,
            fileoff: 0x1000,
            size: 0x1000,
            sections: Vec::new(),
        },
    ];
    let cmds = load_commands(&segments);

    let mut file = vec![0u8; 0x2000];
    put_u32(&mut file, 0, 0xfeed_facf); // MH_MAGIC_64
    put_u32(&mut file, 4, cputype);
    put_u32(&mut file, 8, 0); // cpusubtype
    put_u32(&mut file, 12, 2); // MH_EXECUTE
    put_u32(&mut file, 16, segments.len() as u32);
    put_u32(&mut file, 20, cmds.len() as u32);
    put_u32(&mut file, 24, 0); // flags
    put_u32(&mut file, 28, 0); // reserved
    file[32..32 + cmds.len()].copy_from_slice(&cmds);

    for (slot, off) in [0u32, 8].iter().enumerate() {
        for (i, word) in stub_words(*off).iter().enumerate() {
            put_u32(&mut file, 0x800 + slot * 32 + i * 4, *word);
        }
    }

    put_u64(&mut file, 0x1000, STRINGS);
    put_u64(&mut file, 0x1008, STRINGS + 0x10);
    file[0x1800..0x1805].copy_from_slice(b"init\0");
    file[0x1810..0x1816].copy_from_slice(b"count\0");

    file
}

/// Fat binary wrapping the given slices at 0x4000-aligned offsets
pub fn fat_macho(slices: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut file = Vec::new();
    file.extend_from_slice(&0xcafe_babeu32.to_be_bytes());
    file.extend_from_slice(&(slices.len() as u32).to_be_bytes());

    let mut offset = 0x4000u32;
    let mut placed = Vec::new();
    for (cputype, bytes) in slices {
        file.extend_from_slice(&cputype.to_be_bytes());
        file.extend_from_slice(&0u32.to_be_bytes()); // cpusubtype
        file.extend_from_slice(&offset.to_be_bytes());
        file.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        file.extend_from_slice(&14u32.to_be_bytes()); // align 2^14
        placed.push((offset as usize, bytes));
        offset += (bytes.len() as u32).next_multiple_of(0x4000);
    }

    for (at, bytes) in placed {
        file.resize(at, 0);
        file.extend_from_slice(bytes);
    }
    file
}
