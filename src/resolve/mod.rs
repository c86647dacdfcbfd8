//! Version resolution
//! - matcher.rs: Pure compatibility check of usage events against a catalog
//! - orchestrator.rs: Per-library dispatch, on-demand extraction, aggregation
//! - render.rs: Requirements file rendering
//! - types.rs: CompatibilityResult, ResolutionReport

pub mod matcher;
pub mod orchestrator;
pub mod render;
pub mod types;

pub use matcher::{Mismatch, match_library};
pub use orchestrator::{ResolveError, Resolver};
pub use render::{render_requirements, requirement_line};
pub use types::{CompatibilityResult, Confidence, ResolutionReport, ResolutionStatus};
