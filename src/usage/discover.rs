//! Source file discovery

use std::path::Path;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::usage::traits::{ParseError, UsageExtractor};
use crate::usage::types::SourceUnit;

/// Directories that never contain code worth analyzing
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "venv",
    "env",
    ".venv",
    "node_modules",
];

/// Units loaded from disk plus the files that could not be read
#[derive(Debug, Default)]
pub struct SourceSet {
    pub units: Vec<SourceUnit>,
    pub failures: Vec<ParseError>,
}

/// Collect the source files under `root` that `extractor` can handle.
///
/// `root` may be a single file or a directory walked recursively. Files are
/// returned in path order. An unreadable file is recorded as a failure and
/// skipped; only an unusable root is an error.
pub fn discover_sources(
    root: &Path,
    extractor: &dyn UsageExtractor,
) -> Result<SourceSet, std::io::Error> {
    let metadata = std::fs::metadata(root)?;
    let mut sources = SourceSet::default();

    if metadata.is_file() {
        load_unit(root, &mut sources);
        return Ok(sources);
    }

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to walk {:?}: {}", root, e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if extractor.can_extract(&file_name) {
            load_unit(entry.path(), &mut sources);
        }
    }

    debug!(
        "Discovered {} source files under {:?}",
        sources.units.len(),
        root
    );
    Ok(sources)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && SKIPPED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref())
}

fn load_unit(path: &Path, sources: &mut SourceSet) {
    let name = path.display().to_string();
    match std::fs::read_to_string(path) {
        Ok(content) => sources.units.push(SourceUnit::new(name, content)),
        Err(e) => {
            warn!("Failed to read {}: {}", name, e);
            sources.failures.push(ParseError::Unreadable {
                unit: name,
                message: e.to_string(),
            });
        }
    }
}
