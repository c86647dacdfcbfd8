//! Resolution orchestrator: usage → per-library compatibility results

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::catalog::{LibraryCatalog, SignatureStorer};
use crate::config::PROBE_STAGGER_DELAY_MS;
use crate::extract::{ExtractError, SignatureBuilder};
use crate::resolve::matcher::match_library;
use crate::resolve::types::{CompatibilityResult, ResolutionReport};
use crate::usage::{SourceUnit, UsageExtractor, UsageReport, discover_sources};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid input: {0}")]
    InvalidInputRoot(String),
}

/// Catalog lookup for one library before matching
enum Lookup {
    Indexed(LibraryCatalog),
    Missing,
    Failed(String),
}

pub struct Resolver<S: SignatureStorer> {
    store: Arc<S>,
    extractor: Arc<dyn UsageExtractor>,
    builder: Option<Arc<SignatureBuilder<S>>>,
}

impl<S: SignatureStorer> Resolver<S> {
    pub fn new(store: Arc<S>, extractor: Arc<dyn UsageExtractor>) -> Self {
        Self {
            store,
            extractor,
            builder: None,
        }
    }

    /// Enable on-demand extraction of libraries missing from the catalog
    pub fn with_builder(mut self, builder: Arc<SignatureBuilder<S>>) -> Self {
        self.builder = Some(builder);
        self
    }

    /// Analyze every Python file under `root` (a file or a directory) and resolve it
    pub async fn resolve_path(
        &self,
        root: &Path,
        auto_extract: bool,
    ) -> Result<ResolutionReport, ResolveError> {
        let sources = discover_sources(root, self.extractor.as_ref()).map_err(|e| {
            ResolveError::InvalidInputRoot(format!("cannot read {}: {}", root.display(), e))
        })?;

        if sources.units.is_empty() {
            return Err(ResolveError::InvalidInputRoot(format!(
                "no readable Python sources under {}",
                root.display()
            )));
        }

        let mut usage = self.extractor.extract(&sources.units);
        usage.failures.extend(sources.failures);
        self.resolve_usage(usage, auto_extract).await
    }

    /// Analyze raw code text and resolve it
    pub async fn resolve_text(
        &self,
        code: &str,
        auto_extract: bool,
    ) -> Result<ResolutionReport, ResolveError> {
        self.resolve_sources(&[SourceUnit::from_text(code)], auto_extract)
            .await
    }

    /// Analyze source units and resolve every library they use
    ///
    /// Fails only when there is no usable input: no units at all, or every
    /// unit failed to parse.
    pub async fn resolve_sources(
        &self,
        units: &[SourceUnit],
        auto_extract: bool,
    ) -> Result<ResolutionReport, ResolveError> {
        if units.is_empty() {
            return Err(ResolveError::InvalidInputRoot(
                "no source units given".to_string(),
            ));
        }

        let usage = self.extractor.extract(units);
        self.resolve_usage(usage, auto_extract).await
    }

    async fn resolve_usage(
        &self,
        usage: UsageReport,
        auto_extract: bool,
    ) -> Result<ResolutionReport, ResolveError> {
        if usage.units_analyzed == 0 {
            let reasons: Vec<String> = usage.failures.iter().map(|e| e.to_string()).collect();
            return Err(ResolveError::InvalidInputRoot(format!(
                "no source unit could be analyzed ({})",
                reasons.join("; ")
            )));
        }

        Ok(self.resolve(&usage, auto_extract).await)
    }

    /// Resolve every library in `usage`
    ///
    /// Libraries missing from the catalog are extracted first when
    /// `auto_extract` is set and a builder is configured; otherwise they are
    /// reported as needing extraction. Every library appears in the result.
    pub async fn resolve(&self, usage: &UsageReport, auto_extract: bool) -> ResolutionReport {
        let mut lookups: BTreeMap<String, Lookup> = usage
            .libraries()
            .map(|library| (library.to_string(), self.lookup(library)))
            .collect();

        let missing: Vec<String> = lookups
            .iter()
            .filter(|(_, lookup)| matches!(lookup, Lookup::Missing))
            .map(|(library, _)| library.clone())
            .collect();

        let mut extraction_warnings: BTreeMap<String, Vec<String>> = BTreeMap::new();

        match (&self.builder, auto_extract && !missing.is_empty()) {
            (Some(builder), true) => {
                info!("Extracting {} libraries missing from the catalog", missing.len());
                for (library, outcome) in self.extract_missing(builder, &missing).await {
                    match outcome {
                        Ok(warnings) => {
                            lookups.insert(library.clone(), self.lookup(&library));
                            extraction_warnings.insert(library, warnings);
                        }
                        Err(e) => {
                            lookups.insert(library, Lookup::Failed(e.to_string()));
                        }
                    }
                }
            }
            (None, true) => {
                warn!("Automatic extraction requested but no signature builder is configured");
            }
            _ => {}
        }

        let results = lookups
            .into_iter()
            .map(|(library, lookup)| {
                let events = usage.events_for(&library);
                let mut result = match lookup {
                    Lookup::Indexed(catalog) => match_library(&library, events, Some(&catalog)),
                    Lookup::Missing => CompatibilityResult::needs_extraction(&library, events.len()),
                    Lookup::Failed(reason) => {
                        CompatibilityResult::failed(&library, events.len(), reason)
                    }
                };
                if let Some(warnings) = extraction_warnings.remove(&library) {
                    result.warnings.extend(warnings);
                }
                debug!(
                    "{}: {} ({} events)",
                    library,
                    result.status.as_str(),
                    result.event_count
                );
                (library, result)
            })
            .collect();

        ResolutionReport {
            results,
            failures: usage.failures.clone(),
        }
    }

    fn lookup(&self, library: &str) -> Lookup {
        match self.store.catalog(library) {
            Ok(Some(catalog)) if !catalog.is_empty() => Lookup::Indexed(catalog),
            Ok(_) => Lookup::Missing,
            Err(e) => {
                error!("Failed to read catalog for {}: {}", library, e);
                Lookup::Failed(format!("failed to read catalog: {}", e))
            }
        }
    }

    /// Extract libraries concurrently; Ok carries the skipped-version warnings
    async fn extract_missing(
        &self,
        builder: &SignatureBuilder<S>,
        libraries: &[String],
    ) -> Vec<(String, Result<Vec<String>, ExtractError>)> {
        let futures = libraries.iter().enumerate().map(|(i, library)| {
            let delay = Duration::from_millis(PROBE_STAGGER_DELAY_MS * i as u64);
            async move {
                sleep(delay).await;
                let outcome = builder.extract(library, None).await.map(|summary| {
                    summary
                        .failures
                        .iter()
                        .map(|failure| format!("skipped version {}", failure))
                        .collect()
                });
                (library.clone(), outcome)
            }
        });

        join_all(futures).await
    }
}
