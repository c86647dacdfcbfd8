//! Common types for usage extraction

use std::collections::{BTreeMap, BTreeSet};

use crate::usage::traits::ParseError;

/// Display name used for code that does not come from a file
pub const TEXT_UNIT_NAME: &str = "<string>";

/// One piece of Python source to analyze
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// File path, or `<string>` for raw code text
    pub name: String,
    pub content: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Wrap raw code text that has no backing file
    pub fn from_text(content: impl Into<String>) -> Self {
        Self::new(TEXT_UNIT_NAME, content)
    }
}

/// Location of a call site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Site {
    pub unit: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in bytes)
    pub column: usize,
}

/// One observed call to a library symbol with its literal argument shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    /// Distribution name of the owning library (e.g. "scikit-learn")
    pub library: String,
    /// Symbol path relative to the library's top-level module (e.g. "linalg.norm")
    pub symbol: String,
    /// Keyword argument names written literally at the call site
    pub keyword_args: BTreeSet<String>,
    pub positional_count: usize,
    /// The call forwards `**mapping`, so its keywords are not fully known
    pub has_dynamic_spread: bool,
    /// The call forwards `*iterable`, so its positional count is a lower bound
    pub has_positional_spread: bool,
    pub site: Site,
}

/// Usage found in a single source unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitUsage {
    /// Libraries imported by the unit, called or not
    pub imported: BTreeSet<String>,
    /// Resolved call sites in source order
    pub events: Vec<UsageEvent>,
}

/// Usage of every analyzed unit, grouped by library
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageReport {
    /// Events per library; a library that is only imported maps to no events
    pub events: BTreeMap<String, Vec<UsageEvent>>,
    /// Units skipped because they could not be read or parsed
    pub failures: Vec<ParseError>,
    /// Number of units that were analyzed successfully
    pub units_analyzed: usize,
}

impl UsageReport {
    pub fn merge_unit(&mut self, usage: UnitUsage) {
        self.units_analyzed += 1;

        for library in usage.imported {
            self.events.entry(library).or_default();
        }

        for event in usage.events {
            self.events
                .entry(event.library.clone())
                .or_default()
                .push(event);
        }
    }

    /// Libraries referenced by the analyzed code, sorted by name
    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub fn events_for(&self, library: &str) -> &[UsageEvent] {
        self.events.get(library).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
