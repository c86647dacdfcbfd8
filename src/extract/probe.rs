//! Signature probe trait

#[cfg(test)]
use mockall::automock;

use crate::catalog::SymbolMap;
use crate::extract::error::ProbeError;
use crate::index::Installable;

/// Capability that introspects one installed library version
///
/// Each call must be isolated from every other call: nothing loaded for one
/// version may leak into the symbols captured for another.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait SignatureProbe: Send + Sync {
    /// Capture the public signatures of `installable`
    async fn probe(&self, installable: &Installable) -> Result<SymbolMap, ProbeError>;
}
