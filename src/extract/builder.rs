//! Signature builder: populates the catalog from real library versions

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::catalog::ordering::{is_candidate, sort_newest_first};
use crate::catalog::{SignatureStore, SignatureStorer};
use crate::config::{Config, ExtractionConfig, PROBE_STAGGER_DELAY_MS};
use crate::extract::error::{ExtractError, VersionProbeFailure};
use crate::extract::interpreter::InterpreterProbe;
use crate::extract::probe::SignatureProbe;
use crate::index::{PackageIndex, PypiIndex};
use crate::usage::libraries::normalize_distribution_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Most recent versions to index; 0 means every eligible version
    pub version_limit: usize,
    /// Probes allowed to run at once, across every library being extracted
    pub concurrency: usize,
    pub include_prereleases: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

impl From<&ExtractionConfig> for ExtractOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            version_limit: config.version_limit,
            concurrency: config.concurrency,
            include_prereleases: config.include_prereleases,
        }
    }
}

/// Outcome of one successful extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub library: String,
    /// Versions probed and stored by this run, newest first
    pub captured: Vec<String>,
    /// Candidate versions that were already indexed and left untouched
    pub already_indexed: Vec<String>,
    pub failures: Vec<VersionProbeFailure>,
}

pub struct SignatureBuilder<S: SignatureStorer> {
    store: Arc<S>,
    index: Arc<dyn PackageIndex>,
    probe: Arc<dyn SignatureProbe>,
    options: ExtractOptions,
    permits: Arc<Semaphore>,
}

/// Builder wired to PyPI and the interpreter probe, as configured
pub fn create_default_builder(
    store: Arc<SignatureStore>,
    config: &Config,
) -> SignatureBuilder<SignatureStore> {
    SignatureBuilder::new(
        store,
        Arc::new(PypiIndex::from_config(&config.index)),
        Arc::new(InterpreterProbe::from_config(&config.extraction)),
        ExtractOptions::from(&config.extraction),
    )
}

impl<S: SignatureStorer> SignatureBuilder<S> {
    pub fn new(
        store: Arc<S>,
        index: Arc<dyn PackageIndex>,
        probe: Arc<dyn SignatureProbe>,
        options: ExtractOptions,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
        Self {
            store,
            index,
            probe,
            options,
            permits,
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Index up to `version_limit` recent versions that are not in the store yet
    ///
    /// `None` uses the configured limit. The library name is normalized
    /// (PEP 503) before it reaches the index or the store.
    pub async fn extract(
        &self,
        library: &str,
        version_limit: Option<usize>,
    ) -> Result<ExtractionSummary, ExtractError> {
        self.run(library, version_limit, false).await
    }

    /// Re-probe every recent version, overwriting what is stored
    pub async fn update(&self, library: &str) -> Result<ExtractionSummary, ExtractError> {
        self.run(library, None, true).await
    }

    /// Extract several libraries concurrently, reporting each outcome separately
    pub async fn batch_extract(
        &self,
        libraries: &[String],
    ) -> Vec<(String, Result<ExtractionSummary, ExtractError>)> {
        let futures = libraries.iter().enumerate().map(|(i, library)| {
            let delay = Duration::from_millis(PROBE_STAGGER_DELAY_MS * i as u64);
            async move {
                sleep(delay).await;
                (library.clone(), self.extract(library, None).await)
            }
        });

        join_all(futures).await
    }

    async fn run(
        &self,
        library: &str,
        version_limit: Option<usize>,
        force: bool,
    ) -> Result<ExtractionSummary, ExtractError> {
        let library = normalize_distribution_name(library);
        let library = library.as_str();

        // Another process (or task) may be extracting the same library
        if !self.store.try_start_extraction(library)? {
            info!("Skipping {}: already being extracted", library);
            return Err(ExtractError::AlreadyRunning(library.to_string()));
        }

        let result = self.extract_locked(library, version_limit, force).await;

        // Release the lock regardless of the outcome
        let _ = self
            .store
            .finish_extraction(library)
            .inspect_err(|e| error!("Failed to finish extraction for {}: {}", library, e));

        result
    }

    async fn extract_locked(
        &self,
        library: &str,
        version_limit: Option<usize>,
        force: bool,
    ) -> Result<ExtractionSummary, ExtractError> {
        let published = self
            .index
            .list_versions(library)
            .await
            .inspect_err(|e| error!("Failed to list versions for {}: {}", library, e))?;

        let candidates = self.select_candidates(published, version_limit);
        if candidates.is_empty() {
            return Err(ExtractError::NoPublishedVersions(library.to_string()));
        }

        let existing: HashSet<String> = self.store.versions(library)?.into_iter().collect();
        let (to_probe, already_indexed): (Vec<String>, Vec<String>) = candidates
            .into_iter()
            .partition(|version| force || !existing.contains(version));

        debug!(
            "{}: probing {} versions, {} already indexed",
            library,
            to_probe.len(),
            already_indexed.len()
        );

        let futures = to_probe.iter().enumerate().map(|(i, version)| {
            let delay = Duration::from_millis(PROBE_STAGGER_DELAY_MS * i as u64);
            async move {
                sleep(delay).await;
                self.capture_version(library, version).await
            }
        });

        let mut captured = Vec::new();
        let mut failures = Vec::new();
        for (version, result) in to_probe.iter().zip(join_all(futures).await) {
            match result {
                Ok(()) => captured.push(version.clone()),
                Err(failure) => failures.push(failure),
            }
        }

        // Versions that were already indexed count only when not re-probing
        let usable = captured.len() + if force { 0 } else { already_indexed.len() };
        if usable == 0 {
            error!(
                "Extraction failed for {}: {} versions failed",
                library,
                failures.len()
            );
            return Err(ExtractError::NoVersionsCaptured {
                library: library.to_string(),
                failures,
            });
        }

        info!(
            "Extracted {}: {} captured, {} already indexed, {} failed",
            library,
            captured.len(),
            already_indexed.len(),
            failures.len()
        );

        Ok(ExtractionSummary {
            library: library.to_string(),
            captured,
            already_indexed,
            failures,
        })
    }

    /// Eligible versions, newest first, truncated to the limit
    fn select_candidates(&self, published: Vec<String>, version_limit: Option<usize>) -> Vec<String> {
        let mut candidates: Vec<String> = published
            .into_iter()
            .filter(|version| is_candidate(version, self.options.include_prereleases))
            .collect();
        sort_newest_first(&mut candidates);
        candidates.dedup();

        let limit = version_limit.unwrap_or(self.options.version_limit);
        if limit > 0 {
            candidates.truncate(limit);
        }
        candidates
    }

    /// Fetch, probe and store one version; any failure is confined to it
    async fn capture_version(&self, library: &str, version: &str) -> Result<(), VersionProbeFailure> {
        let failure = |reason: String| {
            warn!("Skipping {}=={}: {}", library, version, reason);
            VersionProbeFailure {
                library: library.to_string(),
                version: version.to_string(),
                reason,
            }
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let installable = self
            .index
            .fetch_installable(library, version)
            .await
            .map_err(|e| failure(e.to_string()))?;

        let symbols = self
            .probe
            .probe(&installable)
            .await
            .map_err(|e| failure(e.to_string()))?;

        if symbols.is_empty() {
            return Err(failure("no public symbols found".to_string()));
        }

        self.store
            .put(library, version, &symbols)
            .map_err(|e| failure(e.to_string()))?;

        debug!("Stored {} symbols for {}=={}", symbols.len(), library, version);
        Ok(())
    }
}
