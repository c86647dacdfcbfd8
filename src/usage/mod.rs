//! Usage extraction layer
//! - traits.rs: UsageExtractor trait and ParseError
//! - types.rs: Common types (SourceUnit, UsageEvent, UsageReport)
//! - syntax.rs: Index-addressed syntax tree built from tree-sitter output
//! - python.rs: Python call-site extractor
//! - libraries.rs: Top-level module → distribution mapping
//! - discover.rs: Source file discovery

pub mod discover;
pub mod libraries;
pub mod python;
pub mod syntax;
pub mod traits;
pub mod types;

pub use discover::{SourceSet, discover_sources};
pub use libraries::LibraryTable;
pub use python::PythonUsageExtractor;
pub use traits::{ParseError, UsageExtractor};
pub use types::{Site, SourceUnit, UnitUsage, UsageEvent, UsageReport};
