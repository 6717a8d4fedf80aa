//! Candidate scanning and renaming
//!
//! A pass has three phases: collect the auto-named addresses of the code
//! segment, analyze each one independently (read-only), then apply the
//! resulting names. Analysis of one candidate can never stop the others:
//! errors become diagnostics and a panic inside a host capability is caught
//! at the candidate boundary.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use log::{debug, info, warn};
use crate::analyzer::pattern::is_stub;
use crate::analyzer::resolver::resolve_selector_bounded;
use crate::constants::naming::{AUTO_NAME_PREFIX, CODE_SEGMENT};
use crate::constants::MAX_STRING_LENGTH;
use crate::errors::{FixerError, FixerResult, StubError};
use crate::image::{Document, InstructionFetcher, MemoryReader};
use crate::models::report::{RenameReport, RenamedStub, StubFailure};

/// Options for a renaming pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOptions {
    /// Segment whose named addresses are scanned
    pub segment: String,
    /// Only names starting with this prefix are candidates
    pub auto_name_prefix: String,
    /// Worker count for concurrent analysis
    pub jobs: usize,
    /// Cap on selector length
    pub max_string_length: usize,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            segment: CODE_SEGMENT.to_string(),
            auto_name_prefix: AUTO_NAME_PREFIX.to_string(),
            jobs: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            max_string_length: MAX_STRING_LENGTH,
        }
    }
}

/// An auto-named address to look at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Address of the function
    pub address: u64,
    /// Its current name
    pub name: String,
}

/// What analysis concluded about one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// Not the stub shape; left alone silently
    NotStub,
    /// Stub with a resolved selector
    Resolved(String),
    /// Stub whose selector could not be resolved
    Failed(StubError),
    /// Analysis panicked
    Panicked(String),
}

/// Collect the auto-named addresses of the scanned segment
pub fn collect_candidates<D: Document + ?Sized>(
    doc: &D,
    options: &RenameOptions,
) -> FixerResult<Vec<Candidate>> {
    let addresses = doc
        .named_addresses(&options.segment)
        .ok_or_else(|| FixerError::SegmentNotFound(options.segment.clone()))?;

    let candidates: Vec<Candidate> = addresses
        .into_iter()
        .filter_map(|address| {
            let name = doc.name_at(address)?;
            name.starts_with(&options.auto_name_prefix)
                .then_some(Candidate { address, name })
        })
        .collect();

    debug!("{} candidates in {}", candidates.len(), options.segment);
    Ok(candidates)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Analyze one candidate without touching the symbol table
pub fn analyze_candidate<D>(doc: &D, address: u64, max_string_length: usize) -> CandidateOutcome
where
    D: MemoryReader + InstructionFetcher + ?Sized,
{
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        if !is_stub(doc, address) {
            return CandidateOutcome::NotStub;
        }
        match resolve_selector_bounded(doc, doc, address, max_string_length) {
            Ok(selector) => CandidateOutcome::Resolved(selector),
            Err(e) => CandidateOutcome::Failed(e),
        }
    }));

    result.unwrap_or_else(|payload| CandidateOutcome::Panicked(panic_message(payload)))
}

/// Apply analysis outcomes to the symbol table and build the report
pub fn apply_outcomes<D: Document + ?Sized>(
    doc: &mut D,
    segment: &str,
    outcomes: Vec<(Candidate, CandidateOutcome)>,
) -> RenameReport {
    let mut report = RenameReport::new(segment);
    report.candidates_examined = outcomes.len();

    for (candidate, outcome) in outcomes {
        match outcome {
            CandidateOutcome::NotStub => {
                debug!("0x{:X} ({}) is not a stub", candidate.address, candidate.name);
            }
            CandidateOutcome::Resolved(selector) => {
                report.stubs_matched += 1;
                let new_name = format!("{}()", selector);
                info!(
                    "Renaming stub at 0x{:X} ({}) to {}",
                    candidate.address, candidate.name, new_name
                );
                doc.set_name_at(candidate.address, &new_name);
                report.renamed.push(RenamedStub {
                    address: candidate.address,
                    old_name: candidate.name,
                    new_name,
                });
            }
            CandidateOutcome::Failed(e) => {
                report.stubs_matched += 1;
                warn!(
                    "Failed to extract selector from stub at 0x{:X} ({}): {}",
                    candidate.address, candidate.name, e
                );
                report.failures.push(StubFailure {
                    address: candidate.address,
                    name: candidate.name,
                    reason: e.to_string(),
                });
            }
            CandidateOutcome::Panicked(message) => {
                warn!(
                    "Failed to analyze function 0x{:X} ({}): {}",
                    candidate.address, candidate.name, message
                );
                report.failures.push(StubFailure {
                    address: candidate.address,
                    name: candidate.name,
                    reason: format!("analysis panicked: {}", message),
                });
            }
        }
    }

    info!("Renamed {} stubs", report.renamed_count());
    report
}

/// Find and rename every stub in `doc`, one candidate at a time
pub fn rename_stubs<D: Document + ?Sized>(doc: &mut D, options: &RenameOptions) -> FixerResult<RenameReport> {
    let candidates = collect_candidates(&*doc, options)?;

    let outcomes = candidates
        .into_iter()
        .map(|candidate| {
            let outcome = analyze_candidate(&*doc, candidate.address, options.max_string_length);
            (candidate, outcome)
        })
        .collect();

    Ok(apply_outcomes(doc, &options.segment, outcomes))
}

/// Analyze candidates on blocking worker tasks, preserving candidate order
pub async fn analyze_concurrently<D>(
    doc: Arc<D>,
    candidates: Vec<Candidate>,
    options: &RenameOptions,
) -> FixerResult<Vec<(Candidate, CandidateOutcome)>>
where
    D: MemoryReader + InstructionFetcher + Send + Sync + 'static,
{
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let jobs = options.jobs.max(1);
    let chunk_size = candidates.len().div_ceil(jobs);
    let max_string_length = options.max_string_length;

    let mut handles = Vec::new();
    for chunk in candidates.chunks(chunk_size) {
        let chunk = chunk.to_vec();
        let doc = Arc::clone(&doc);
        handles.push(tokio::task::spawn_blocking(move || {
            chunk
                .into_iter()
                .map(|candidate| {
                    let outcome = analyze_candidate(doc.as_ref(), candidate.address, max_string_length);
                    (candidate, outcome)
                })
                .collect::<Vec<_>>()
        }));
    }
    debug!("Analyzing {} candidates on {} workers", candidates.len(), handles.len());

    let mut outcomes = Vec::with_capacity(candidates.len());
    for handle in handles {
        let chunk = handle
            .await
            .map_err(|e| FixerError::Analysis(format!("worker failed: {}", e)))?;
        outcomes.extend(chunk);
    }

    Ok(outcomes)
}
