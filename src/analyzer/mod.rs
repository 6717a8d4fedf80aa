//! Core analysis engine for `objc_msgSend` stubs

pub mod disassembler;
pub mod driver;
pub mod operand;
pub mod pattern;
pub mod resolver;
pub mod string_reader;
#[cfg(test)]
mod tests;

use std::sync::Arc;
use log::info;

use crate::errors::FixerResult;
use crate::image::{Document, InstructionFetcher, MemoryReader};
use crate::models::report::RenameReport;

pub use self::driver::{
    analyze_candidate, analyze_concurrently, apply_outcomes, collect_candidates, rename_stubs,
    Candidate, CandidateOutcome, RenameOptions,
};
pub use self::pattern::is_stub;
pub use self::resolver::resolve_selector;
pub use self::string_reader::read_string;

/// Main analyzer that coordinates a renaming pass
pub struct Analyzer {
    options: RenameOptions,
}

impl Analyzer {
    /// Create a new analyzer
    pub fn new(options: RenameOptions) -> Self {
        Self { options }
    }

    /// Options this analyzer runs with
    pub fn options(&self) -> &RenameOptions {
        &self.options
    }

    /// Rename every stub in `doc`, sequentially
    pub fn rename<D: Document + ?Sized>(&self, doc: &mut D) -> FixerResult<RenameReport> {
        rename_stubs(doc, &self.options)
    }

    /// Rename every stub in `doc`, analyzing candidates on worker tasks
    ///
    /// Renames are applied once all workers are done, so the image is
    /// handed back together with the report.
    pub async fn rename_concurrently<D>(&self, doc: D) -> FixerResult<(D, RenameReport)>
    where
        D: Document + Send + Sync + 'static,
    {
        let candidates = collect_candidates(&doc, &self.options)?;
        info!("Analyzing {} candidates in {}", candidates.len(), self.options.segment);

        let shared = Arc::new(doc);
        let outcomes = analyze_concurrently(Arc::clone(&shared), candidates, &self.options).await?;
        let mut doc = unwrap_shared(shared)?;

        let report = apply_outcomes(&mut doc, &self.options.segment, outcomes);
        Ok((doc, report))
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(RenameOptions::default())
    }
}

/// Take the image back once every worker has dropped its handle
fn unwrap_shared<D: MemoryReader + InstructionFetcher>(shared: Arc<D>) -> FixerResult<D> {
    Arc::try_unwrap(shared).map_err(|_| {
        crate::errors::FixerError::Analysis("image still shared after analysis".to_string())
    })
}
