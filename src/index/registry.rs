//! Package index trait for listing and fetching published versions

#[cfg(test)]
use mockall::automock;

use crate::index::error::IndexError;
use crate::index::types::Installable;

/// Trait for reaching a package index
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PackageIndex: Send + Sync {
    /// Fetches every published version of a library
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Version strings in no particular order
    /// * `Err(IndexError)` - If the fetch fails
    async fn list_versions(&self, library: &str) -> Result<Vec<String>, IndexError>;

    /// Resolves the installable artifact for one published version
    async fn fetch_installable(
        &self,
        library: &str,
        version: &str,
    ) -> Result<Installable, IndexError>;
}
