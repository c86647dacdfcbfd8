//! Package index and probe test doubles

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use pinpoint::catalog::SymbolMap;
use pinpoint::extract::{ProbeError, SignatureProbe};
use pinpoint::index::{IndexError, Installable, PackageIndex};

/// Index serving a fixed set of published versions
#[derive(Default)]
pub struct StaticIndex {
    versions: HashMap<String, Vec<String>>,
}

impl StaticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, library: &str, versions: Vec<&str>) -> Self {
        self.versions.insert(
            library.to_string(),
            versions.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl PackageIndex for StaticIndex {
    async fn list_versions(&self, library: &str) -> Result<Vec<String>, IndexError> {
        self.versions
            .get(library)
            .cloned()
            .ok_or_else(|| IndexError::NotFound(library.to_string()))
    }

    async fn fetch_installable(
        &self,
        library: &str,
        version: &str,
    ) -> Result<Installable, IndexError> {
        match self.versions.get(library) {
            Some(versions) if versions.iter().any(|v| v == version) => {
                Ok(Installable::new(library, version))
            }
            _ => Err(IndexError::NotFound(format!("{}=={}", library, version))),
        }
    }
}

/// Probe returning canned symbols per (library, version) and recording each call
#[derive(Default)]
pub struct StaticProbe {
    symbols: HashMap<(String, String), SymbolMap>,
    probed: Mutex<Vec<String>>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbols(mut self, library: &str, version: &str, symbols: SymbolMap) -> Self {
        self.symbols
            .insert((library.to_string(), version.to_string()), symbols);
        self
    }

    /// Requirements probed so far, in call order
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignatureProbe for StaticProbe {
    async fn probe(&self, installable: &Installable) -> Result<SymbolMap, ProbeError> {
        self.probed.lock().unwrap().push(installable.requirement());

        self.symbols
            .get(&(installable.library.clone(), installable.version.clone()))
            .cloned()
            .ok_or_else(|| ProbeError::Introspection {
                stderr: format!("ModuleNotFoundError: {}", installable.library),
            })
    }
}
