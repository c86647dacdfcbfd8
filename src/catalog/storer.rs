//! Storage trait used by the builder and the orchestrator

#[cfg(test)]
use mockall::automock;

use crate::catalog::error::StoreError;
use crate::catalog::types::{LibraryCatalog, SymbolMap};

/// Trait for storing and retrieving per-version signatures
#[cfg_attr(test, automock)]
pub trait SignatureStorer: Send + Sync + 'static {
    /// Get the symbol map recorded for one version, None if it was never indexed
    fn get(&self, library: &str, version: &str) -> Result<Option<SymbolMap>, StoreError>;

    /// Record the symbols of one version, replacing any prior entry wholesale
    fn put(&self, library: &str, version: &str, symbols: &SymbolMap) -> Result<(), StoreError>;

    /// Indexed versions of a library, newest first
    fn versions(&self, library: &str) -> Result<Vec<String>, StoreError>;

    /// Delete a library and all of its versions, returning whether it existed
    fn remove(&self, library: &str) -> Result<bool, StoreError>;

    /// Every indexed version with its symbols, newest first; None when nothing is indexed
    fn catalog(&self, library: &str) -> Result<Option<LibraryCatalog>, StoreError>;

    /// Try to take the extraction lock for a library
    ///
    /// Returns false while another extraction holds it, unless that lock has
    /// been held longer than the lock timeout.
    fn try_start_extraction(&self, library: &str) -> Result<bool, StoreError>;

    /// Release the extraction lock for a library
    fn finish_extraction(&self, library: &str) -> Result<(), StoreError>;
}
