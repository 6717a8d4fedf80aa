//! Mach-O loading for arm64 binaries

use goblin::mach::{cputype::CPU_TYPE_ARM64, Mach, MachO};
use log::{debug, info, warn};
use crate::constants::naming::{AUTO_NAME_PREFIX, OBJC_STUBS_SECTION};
use crate::constants::stub::OBJC_STUB_SLOT_SIZE;
use crate::errors::{ErrorContext, ErrorExt, FixerError, FixerResult};
use crate::image::{MemoryImage, Segment, SymbolTable};

/// Decode a fixed-size, NUL-padded Mach-O name
fn fixed_name(raw: &[u8; 16]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Pick the arm64 slice out of a thin or fat binary
fn arm64_slice<'a>(bytes: &'a [u8], context: &ErrorContext) -> FixerResult<&'a [u8]> {
    match Mach::parse(bytes).with_context(context.clone())? {
        Mach::Binary(_) => Ok(bytes),
        Mach::Fat(multi) => {
            for arch in multi.iter_arches() {
                let arch = arch.with_context(context.clone())?;
                if arch.cputype != CPU_TYPE_ARM64 {
                    debug!("Skipping fat slice with cputype 0x{:x}", arch.cputype);
                    continue;
                }
                let start = arch.offset as usize;
                let end = start.saturating_add(arch.size as usize);
                return bytes.get(start..end).ok_or_else(|| {
                    FixerError::Image(format!("{}: arm64 slice out of bounds", context))
                });
            }
            Err(FixerError::UnsupportedImage("fat binary has no arm64 slice".to_string()))
        }
    }
}

/// Map every 64-bit segment of `macho` into a `MemoryImage`
fn map_segments(macho: &MachO<'_>, slice: &[u8], image: &mut MemoryImage) -> FixerResult<()> {
    for segment in macho.segments.iter() {
        let name = fixed_name(&segment.segname);

        let start = segment.fileoff as usize;
        let end = start.saturating_add(segment.filesize as usize).min(slice.len());
        let data = if start < end { slice[start..end].to_vec() } else { Vec::new() };
        if data.len() as u64 != segment.filesize {
            warn!("Segment {} truncated: {} of {} bytes present", name, data.len(), segment.filesize);
        }

        let mut mapped = Segment::new(name.clone(), segment.vmaddr, data).with_size(segment.vmsize);
        let sections = segment
            .sections()
            .with_simple_context("macho_loader", "read sections")?;
        for (section, _) in sections {
            mapped = mapped.with_section(fixed_name(&section.sectname), section.addr, section.size);
        }

        debug!(
            "Mapped segment {} at 0x{:x} (vmsize 0x{:x}, {} sections)",
            name,
            segment.vmaddr,
            segment.vmsize,
            mapped.sections.len()
        );
        image.add_segment(mapped);
    }

    Ok(())
}

/// Copy defined, non-debug symbols into the symbol table
fn import_symbols(macho: &MachO<'_>, image: &mut MemoryImage) {
    let mut imported = 0usize;
    for symbol in macho.symbols() {
        match symbol {
            Ok((name, nlist)) => {
                if nlist.is_stab() || nlist.is_undefined() || name.is_empty() {
                    continue;
                }
                image.set_name_at(nlist.n_value, name);
                imported += 1;
            }
            Err(e) => {
                warn!("Skipping unreadable symbol: {}", e);
            }
        }
    }
    debug!("Imported {} symbols", imported);
}

/// Give every unnamed `__objc_stubs` slot an auto-generated name
///
/// Only the part of the section inside its segment's `[vmaddr, vmaddr + vmsize)`
/// is walked.
fn name_stub_slots(image: &mut MemoryImage) -> usize {
    let Some((section, inside, segment_end)) = image.segments().iter().find_map(|segment| {
        let section = segment.sections.iter().find(|s| s.name == OBJC_STUBS_SECTION)?;
        Some((
            section.clone(),
            segment.contains(section.address),
            segment.address.saturating_add(segment.size),
        ))
    }) else {
        debug!("No {} section", OBJC_STUBS_SECTION);
        return 0;
    };

    if !inside {
        warn!("{} at 0x{:x} lies outside its segment", OBJC_STUBS_SECTION, section.address);
        return 0;
    }
    let end = section.address.saturating_add(section.size).min(segment_end);
    if end - section.address < section.size {
        warn!(
            "{} size 0x{:x} runs past its segment, clamped to 0x{:x}",
            OBJC_STUBS_SECTION,
            section.size,
            end - section.address
        );
    }

    let mut named = 0;
    let mut address = section.address;
    while address < end {
        if image.name_at(address).is_none() {
            image.set_name_at(address, &format!("{}{:x}", AUTO_NAME_PREFIX, address));
            named += 1;
        }
        match address.checked_add(OBJC_STUB_SLOT_SIZE) {
            Some(next) => address = next,
            None => break,
        }
    }
    named
}

/// Load an arm64 Mach-O (thin or fat) into a `MemoryImage`
pub fn load_macho(bytes: &[u8], image_name: Option<&str>) -> FixerResult<MemoryImage> {
    let context = ErrorContext {
        image: image_name.map(str::to_string),
        component: "macho_loader".to_string(),
        operation: "parse header".to_string(),
        details: Some(format!("{} bytes", bytes.len())),
    };

    let slice = arm64_slice(bytes, &context)?;
    let macho = MachO::parse(slice, 0).with_context(context.clone())?;

    if macho.header.cputype != CPU_TYPE_ARM64 {
        return Err(FixerError::UnsupportedImage(format!(
            "cputype 0x{:x} is not arm64",
            macho.header.cputype
        )));
    }

    let mut image = MemoryImage::new();
    map_segments(&macho, slice, &mut image)?;
    import_symbols(&macho, &mut image);
    let auto_named = name_stub_slots(&mut image);

    info!(
        "Loaded {} segments, {} names ({} auto-named stub slots)",
        image.segments().len(),
        image.name_count(),
        auto_named
    );

    Ok(image)
}
