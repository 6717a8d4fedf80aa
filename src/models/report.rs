//! Results of a stub renaming pass

use serde::{Serialize, Deserialize};

/// A stub that was given a selector-derived name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedStub {
    /// Stub address
    pub address: u64,
    /// Name before the pass
    pub old_name: String,
    /// Name applied, `<selector>()`
    pub new_name: String,
}

/// A candidate that matched the stub shape but could not be resolved,
/// or whose analysis failed outright
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubFailure {
    /// Candidate address
    pub address: u64,
    /// Candidate name
    pub name: String,
    /// Human-readable reason
    pub reason: String,
}

/// Summary of a renaming pass over one image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameReport {
    /// Path of the analyzed image, if it came from a file
    pub image: Option<String>,
    /// SHA-256 of the image bytes, hex
    pub digest: Option<String>,
    /// Segment that was scanned
    pub segment: String,
    /// Number of auto-named candidates looked at
    pub candidates_examined: usize,
    /// Number of candidates with the stub shape
    pub stubs_matched: usize,
    /// Applied renames, in address order
    pub renamed: Vec<RenamedStub>,
    /// Diagnostics for candidates left untouched
    pub failures: Vec<StubFailure>,
}

impl RenameReport {
    /// Create an empty report for a segment
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            ..Self::default()
        }
    }

    /// Number of stubs that were renamed
    pub fn renamed_count(&self) -> usize {
        self.renamed.len()
    }

    /// Attach the image path and digest
    pub fn set_image(&mut self, image: String, digest: String) {
        self.image = Some(image);
        self.digest = Some(digest);
    }
}
