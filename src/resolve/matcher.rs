//! Version matching: which indexed versions accept every observed call

use indexmap::IndexSet;
use thiserror::Error;

use crate::catalog::{LibraryCatalog, SymbolMap};
use crate::resolve::types::{CompatibilityResult, Confidence, ResolutionStatus};
use crate::usage::UsageEvent;

/// Why a version rejects a call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Mismatch {
    #[error("{symbol} does not exist")]
    UnknownSymbol { symbol: String },

    #[error("{symbol} has no parameter named '{keyword}'")]
    UnknownKeyword { symbol: String, keyword: String },

    #[error("{symbol} takes at most {capacity} positional arguments but {given} were given")]
    TooManyPositional {
        symbol: String,
        given: usize,
        capacity: usize,
    },
}

/// Check one call against the symbols of one version
///
/// A call that forwards `**mapping` is not checked for keywords, and one that
/// forwards `*iterable` is not checked for positional count.
pub fn check_event(event: &UsageEvent, symbols: &SymbolMap) -> Result<(), Mismatch> {
    let Some(signature) = symbols.get(&event.symbol) else {
        return Err(Mismatch::UnknownSymbol {
            symbol: event.symbol.clone(),
        });
    };

    if !event.has_dynamic_spread && !signature.accepts_var_keyword {
        if let Some(keyword) = event
            .keyword_args
            .iter()
            .find(|keyword| !signature.declares(keyword))
        {
            return Err(Mismatch::UnknownKeyword {
                symbol: event.symbol.clone(),
                keyword: keyword.clone(),
            });
        }
    }

    if !event.has_positional_spread && !signature.accepts_var_positional {
        let capacity = signature.positional_capacity();
        if event.positional_count > capacity {
            return Err(Mismatch::TooManyPositional {
                symbol: event.symbol.clone(),
                given: event.positional_count,
                capacity,
            });
        }
    }

    Ok(())
}

/// Whether a version accepts every event
pub fn is_compatible(events: &[UsageEvent], symbols: &SymbolMap) -> bool {
    events
        .iter()
        .all(|event| check_event(event, symbols).is_ok())
}

/// Every rejected event of a version, in event order
pub fn mismatches<'e>(
    events: &'e [UsageEvent],
    symbols: &SymbolMap,
) -> Vec<(&'e UsageEvent, Mismatch)> {
    events
        .iter()
        .filter_map(|event| check_event(event, symbols).err().map(|m| (event, m)))
        .collect()
}

/// Resolve one library from its usage events and its catalog entry
///
/// `catalog` versions must be ordered newest first, as the store returns them.
pub fn match_library(
    library: &str,
    events: &[UsageEvent],
    catalog: Option<&LibraryCatalog>,
) -> CompatibilityResult {
    let Some(catalog) = catalog else {
        return CompatibilityResult::needs_extraction(library, events.len());
    };
    let Some(newest) = catalog.newest() else {
        return CompatibilityResult::needs_extraction(library, events.len());
    };

    let compatible_versions: IndexSet<String> = catalog
        .versions
        .iter()
        .filter(|entry| is_compatible(events, &entry.symbols))
        .map(|entry| entry.version.clone())
        .collect();

    if let Some(chosen) = compatible_versions.first().cloned() {
        return CompatibilityResult {
            library: library.to_string(),
            status: ResolutionStatus::Matched,
            chosen_version: Some(chosen),
            compatible_versions,
            confidence: Confidence::Verified,
            warnings: Vec::new(),
            event_count: events.len(),
        };
    }

    let warnings = mismatches(events, &newest.symbols)
        .into_iter()
        .map(|(event, mismatch)| {
            format!(
                "{}:{}:{}: {} ({}=={})",
                event.site.unit, event.site.line, event.site.column, mismatch, library, newest.version
            )
        })
        .collect();

    CompatibilityResult {
        library: library.to_string(),
        status: ResolutionStatus::Fallback,
        chosen_version: Some(newest.version.clone()),
        compatible_versions,
        confidence: Confidence::Unverified,
        warnings,
        event_count: events.len(),
    }
}
