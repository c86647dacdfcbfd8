//! Package index collaborator
//! - registry.rs: PackageIndex trait
//! - types.rs: Installable handle for one published version
//! - pypi.rs: PyPI JSON API client
//! - retry.rs: Timeout and exponential backoff for index calls
//! - error.rs: IndexError

pub mod error;
pub mod pypi;
pub mod registry;
pub mod retry;
pub mod types;

pub use error::IndexError;
pub use pypi::PypiIndex;
pub use registry::PackageIndex;
pub use retry::RetryPolicy;
pub use types::Installable;
