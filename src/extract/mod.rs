//! Signature building: index → isolated probe → catalog
//! - builder.rs: SignatureBuilder (version selection, worker pool, store writes)
//! - probe.rs: SignatureProbe trait
//! - interpreter.rs: Probe that installs each version into a fresh virtualenv
//! - error.rs: ProbeError, ExtractError

pub mod builder;
pub mod error;
pub mod interpreter;
pub mod probe;

pub use builder::{ExtractOptions, ExtractionSummary, SignatureBuilder, create_default_builder};
pub use error::{ExtractError, ProbeError, VersionProbeFailure};
pub use interpreter::InterpreterProbe;
pub use probe::SignatureProbe;
