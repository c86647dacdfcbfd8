//! Signature catalog: library → version → symbol → signature
//!
//! # Modules
//!
//! - [`store`]: SQLite-backed catalog with per-version atomic writes
//! - [`storer`]: Trait used by the builder and orchestrator to reach the store
//! - [`ordering`]: Version precedence (PEP 440) helpers
//! - [`types`]: Signature, parameter and catalog entry types
//! - [`error`]: Error types for store operations

pub mod error;
pub mod ordering;
pub mod store;
pub mod storer;
pub mod types;

pub use error::StoreError;
pub use store::SignatureStore;
pub use storer::SignatureStorer;
pub use types::{
    CatalogStats, LibraryCatalog, LibrarySummary, Parameter, ParameterKind, Signature, SymbolMap,
    VersionEntry,
};
