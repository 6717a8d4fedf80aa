//! Tests for the analyzer module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::{FixerError, StubError};
    use crate::image::{InstructionFetcher, MemoryImage, MemoryReader, Segment, SymbolTable};
    use crate::models::instruction::Instruction;

    const TEXT_BASE: u64 = 0x1_0000_0000;
    const STUBS: u64 = TEXT_BASE + 0x800;
    const DATA_BASE: u64 = TEXT_BASE + 0x1000;
    const STRINGS: u64 = DATA_BASE + 0x800;

    fn put_u32(buf: &mut [u8], offset: usize, word: u32) {
        buf[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
    }

    fn put_u64(buf: &mut [u8], offset: usize, value: u64) {
        buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// adrp x1 / ldr x1, [x1, #selref_off] / adrp x16 / ldr x16, [x16, #0x100] / br x16
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

    /// Four stub slots: `init`, a null selref, plain code, `count`
    fn sample_image() -> MemoryImage {
        let mut text = vec![0u8; 0x1000];
        for (slot, words) in [
            stub_words(0x0),
            stub_words(0x8),
            [0xD503_201F, 0xD65F_03C0, 0, 0, 0, 0, 0, 0],
            stub_words(0x10),
        ]
        .iter()
        .enumerate()
        {
            for (i, word) in words.iter().enumerate() {
                put_u32(&mut text, 0x800 + slot * 32 + i * 4, *word);
            }
        }

        let mut data = vec![0u8; 0x1000];
        put_u64(&mut data, 0x0, STRINGS);
        put_u64(&mut data, 0x8, 0);
        put_u64(&mut data, 0x10, STRINGS + 0x10);
        data[0x800..0x805].copy_from_slice(b"init\0");
        data[0x810..0x816].copy_from_slice(b"count\0");

        let mut image = MemoryImage::new();
        image.add_segment(
            Segment::new("__TEXT", TEXT_BASE, text).with_section("__objc_stubs", STUBS, 0x80),
        );
        image.add_segment(Segment::new("__DATA", DATA_BASE, data));

        image.set_name_at(TEXT_BASE, "_main");
        for slot in 0..4u64 {
            let address = STUBS + slot * 32;
            image.set_name_at(address, &format!("sub_{:x}", address));
        }
        image.set_name_at(DATA_BASE, "sub_in_data");
        image
    }

    /// Image whose instruction fetch panics at one address
    struct PanickyImage {
        inner: MemoryImage,
        poison: u64,
    }

    impl MemoryReader for PanickyImage {
        fn read_byte(&self, address: u64) -> Option<u8> {
            self.inner.read_byte(address)
        }
    }

    impl InstructionFetcher for PanickyImage {
        fn fetch_instruction(&self, address: u64) -> Option<Instruction> {
            if address == self.poison {
                panic!("decoder blew up at 0x{:x}", address);
            }
            self.inner.fetch_instruction(address)
        }
    }

    impl SymbolTable for PanickyImage {
        fn named_addresses(&self, segment: &str) -> Option<Vec<u64>> {
            self.inner.named_addresses(segment)
        }

        fn name_at(&self, address: u64) -> Option<String> {
            self.inner.name_at(address)
        }

        fn set_name_at(&mut self, address: u64, name: &str) {
            self.inner.set_name_at(address, name)
        }
    }

    #[test]
    fn test_is_stub_on_decoded_image() {
        let image = sample_image();
        assert!(is_stub(&image, STUBS));
        assert!(is_stub(&image, STUBS + 0x20));
        assert!(!is_stub(&image, STUBS + 0x40));
        // window starting mid-stub
        assert!(!is_stub(&image, STUBS + 4));
    }

    #[test]
    fn test_resolve_selector_on_decoded_image() {
        let image = sample_image();
        assert_eq!(resolve_selector(&image, &image, STUBS), Ok("init".to_string()));
        assert_eq!(resolve_selector(&image, &image, STUBS + 0x60), Ok("count".to_string()));
        assert_eq!(
            resolve_selector(&image, &image, STUBS + 0x20),
            Err(StubError::NullPointer { cell: DATA_BASE + 0x8 })
        );
    }

    #[test]
    fn test_collect_candidates_filters_by_prefix_and_segment() {
        let image = sample_image();
        let candidates = collect_candidates(&image, &RenameOptions::default()).unwrap();
        let addresses: Vec<u64> = candidates.iter().map(|c| c.address).collect();
        assert_eq!(addresses, vec![STUBS, STUBS + 0x20, STUBS + 0x40, STUBS + 0x60]);
        assert_eq!(candidates[0].name, format!("sub_{:x}", STUBS));
    }

    #[test]
    fn test_rename_stubs() {
        let mut image = sample_image();
        let report = rename_stubs(&mut image, &RenameOptions::default()).unwrap();

        assert_eq!(report.candidates_examined, 4);
        assert_eq!(report.stubs_matched, 3);
        assert_eq!(report.renamed_count(), 2);
        assert_eq!(report.renamed[0].new_name, "init()");
        assert_eq!(report.renamed[1].new_name, "count()");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].address, STUBS + 0x20);

        assert_eq!(image.name_at(STUBS).as_deref(), Some("init()"));
        assert_eq!(image.name_at(STUBS + 0x60).as_deref(), Some("count()"));
        // failures and non-stubs keep their names
        assert_eq!(image.name_at(STUBS + 0x20), Some(format!("sub_{:x}", STUBS + 0x20)));
        assert_eq!(image.name_at(STUBS + 0x40), Some(format!("sub_{:x}", STUBS + 0x40)));
        assert_eq!(image.name_at(TEXT_BASE).as_deref(), Some("_main"));
    }

    #[test]
    fn test_second_pass_finds_nothing() {
        let mut image = sample_image();
        rename_stubs(&mut image, &RenameOptions::default()).unwrap();
        let report = rename_stubs(&mut image, &RenameOptions::default()).unwrap();
        assert_eq!(report.renamed_count(), 0);
        assert_eq!(report.candidates_examined, 2);
    }

    #[test]
    fn test_missing_segment_is_fatal() {
        let mut image = sample_image();
        let options = RenameOptions {
            segment: "__NOPE".to_string(),
            ..RenameOptions::default()
        };
        let err = rename_stubs(&mut image, &options).unwrap_err();
        assert!(matches!(err, FixerError::SegmentNotFound(ref s) if s == "__NOPE"));
    }

    #[test]
    fn test_panicking_candidate_is_isolated() {
        let mut image = PanickyImage {
            inner: sample_image(),
            poison: STUBS + 0x60,
        };
        let report = rename_stubs(&mut image, &RenameOptions::default()).unwrap();

        assert_eq!(report.candidates_examined, 4);
        assert_eq!(report.renamed_count(), 1);
        assert_eq!(report.renamed[0].address, STUBS);
        assert_eq!(report.failures.len(), 2);
        let panicked = report.failures.iter().find(|f| f.address == STUBS + 0x60).unwrap();
        assert!(panicked.reason.contains("decoder blew up"));
    }

    #[test]
    fn test_analyze_candidate_outcomes() {
        let image = sample_image();
        assert_eq!(
            analyze_candidate(&image, STUBS, 4096),
            CandidateOutcome::Resolved("init".to_string())
        );
        assert_eq!(analyze_candidate(&image, STUBS + 0x40, 4096), CandidateOutcome::NotStub);
        assert_eq!(
            analyze_candidate(&image, STUBS + 0x60, 3),
            CandidateOutcome::Failed(StubError::LengthExceeded { start: STRINGS + 0x10, limit: 3 })
        );
    }

    #[test]
    fn test_empty_selector_keeps_name() {
        let mut image = sample_image();
        // point the `count` selref at a lone terminator
        let data = &mut image.segment_mut("__DATA").unwrap().data;
        data[0x820] = 0;
        put_u64(data, 0x10, STRINGS + 0x20);

        let report = rename_stubs(&mut image, &RenameOptions::default()).unwrap();
        assert_eq!(report.renamed_count(), 1);
        assert_eq!(report.stubs_matched, 3);
        let failure = report.failures.iter().find(|f| f.address == STUBS + 0x60).unwrap();
        assert!(failure.reason.contains("empty"));
        assert_eq!(image.name_at(STUBS + 0x60), Some(format!("sub_{:x}", STUBS + 0x60)));
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let mut sequential = sample_image();
        let expected = rename_stubs(&mut sequential, &RenameOptions::default()).unwrap();

        for jobs in [1, 2, 3, 8] {
            let analyzer = Analyzer::new(RenameOptions { jobs, ..RenameOptions::default() });
            let (image, report) = analyzer.rename_concurrently(sample_image()).await.unwrap();
            assert_eq!(report, expected, "jobs = {}", jobs);
            assert_eq!(image.name_at(STUBS).as_deref(), Some("init()"));
        }
    }

    #[tokio::test]
    async fn test_concurrent_isolates_panics() {
        let image = PanickyImage {
            inner: sample_image(),
            poison: STUBS,
        };
        let analyzer = Analyzer::new(RenameOptions { jobs: 2, ..RenameOptions::default() });
        let (image, report) = analyzer.rename_concurrently(image).await.unwrap();

        assert_eq!(report.renamed_count(), 1);
        assert_eq!(report.renamed[0].new_name, "count()");
        assert_eq!(image.name_at(STUBS), Some(format!("sub_{:x}", STUBS)));
    }
}
