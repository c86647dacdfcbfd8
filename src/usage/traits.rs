//! UsageExtractor trait definition

use tracing::warn;

use crate::usage::types::{SourceUnit, UnitUsage, UsageReport};

/// Trait for extracting library usage from source units
pub trait UsageExtractor: Send + Sync {
    /// Check if this extractor can handle the given file name
    fn can_extract(&self, file_name: &str) -> bool;

    /// Extract imports and call sites from a single unit
    fn extract_unit(&self, unit: &SourceUnit) -> Result<UnitUsage, ParseError>;

    /// Extract every unit, skipping the ones that fail to parse.
    ///
    /// A failing unit is recorded in `UsageReport::failures` and contributes
    /// nothing else to the report.
    fn extract(&self, units: &[SourceUnit]) -> UsageReport {
        let mut report = UsageReport::default();

        for unit in units {
            match self.extract_unit(unit) {
                Ok(usage) => report.merge_unit(usage),
                Err(e) => {
                    warn!("Skipping {}: {}", unit.name, e);
                    report.failures.push(e);
                }
            }
        }

        report
    }
}

/// Error type for parsing operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The unit contains a syntax error
    #[error("{unit}: invalid syntax at line {line}, column {column}")]
    InvalidSyntax {
        unit: String,
        line: usize,
        column: usize,
    },

    /// The unit could not be read from disk
    #[error("{unit}: failed to read source: {message}")]
    Unreadable { unit: String, message: String },

    /// Tree-sitter related error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}
