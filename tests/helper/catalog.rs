//! Catalog and project fixture utilities

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use pinpoint::catalog::{Signature, SignatureStore, SymbolMap};
use pinpoint::catalog::types::symbol_map;

/// Create a store in a fresh temp dir, pre-populated with `(library, version, signatures)`
pub fn create_test_store(
    entries: Vec<(&str, &str, Vec<Signature>)>,
) -> (TempDir, Arc<SignatureStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SignatureStore::open(&temp_dir.path().join("signatures.db")).unwrap());

    for (library, version, signatures) in entries {
        store
            .put(library, version, &symbol_map(signatures))
            .unwrap();
    }

    (temp_dir, store)
}

pub fn symbols(signatures: Vec<Signature>) -> SymbolMap {
    symbol_map(signatures)
}

/// Write `(relative path, content)` files under `root`
pub fn write_project(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}
