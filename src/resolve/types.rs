//! Resolution result types

use std::collections::BTreeMap;

use indexmap::IndexSet;

use crate::usage::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStatus {
    /// At least one indexed version accepts every call
    Matched,
    /// Indexed, but no version accepts every call; pinned to the newest anyway
    Fallback,
    /// Nothing indexed and extraction was not attempted
    NeedsExtraction,
    /// Extraction was attempted and captured nothing
    Failed,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Fallback => "fallback",
            Self::NeedsExtraction => "needs_extraction",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confidence {
    Verified,
    Unverified,
}

/// Resolution outcome for one library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityResult {
    pub library: String,
    pub status: ResolutionStatus,
    pub chosen_version: Option<String>,
    /// Versions accepting every call, newest first
    pub compatible_versions: IndexSet<String>,
    pub confidence: Confidence,
    pub warnings: Vec<String>,
    /// Usage events the result was computed from
    pub event_count: usize,
}

impl CompatibilityResult {
    pub fn needs_extraction(library: &str, event_count: usize) -> Self {
        Self::unresolved(library, ResolutionStatus::NeedsExtraction, event_count)
    }

    pub fn failed(library: &str, event_count: usize, warning: String) -> Self {
        let mut result = Self::unresolved(library, ResolutionStatus::Failed, event_count);
        result.warnings.push(warning);
        result
    }

    fn unresolved(library: &str, status: ResolutionStatus, event_count: usize) -> Self {
        Self {
            library: library.to_string(),
            status,
            chosen_version: None,
            compatible_versions: IndexSet::new(),
            confidence: Confidence::Unverified,
            warnings: Vec::new(),
            event_count,
        }
    }
}

/// Results for every library referenced by the analyzed code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// One entry per library, sorted by name
    pub results: BTreeMap<String, CompatibilityResult>,
    /// Units that were skipped because they could not be read or parsed
    pub failures: Vec<ParseError>,
}

impl ResolutionReport {
    pub fn get(&self, library: &str) -> Option<&CompatibilityResult> {
        self.results.get(library)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of results with the given status
    pub fn count(&self, status: ResolutionStatus) -> usize {
        self.results
            .values()
            .filter(|result| result.status == status)
            .count()
    }
}
