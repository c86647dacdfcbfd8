//! pinpoint: pins Python dependencies to the versions whose published
//! signatures accept the calls a codebase actually makes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Usage    │────▶│   Resolve   │────▶│   Report    │
//! │ (tree-sitter│     │(orchestrate,│     │(requirements│
//! │  extractor) │     │   match)    │     │   lines)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                        │       ▲
//!              on demand ▼       │ read
//!                 ┌─────────────┐     ┌─────────────┐
//!                 │   Extract   │────▶│   Catalog   │
//!                 │(index+probe)│ put │  (SQLite)   │
//!                 └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`usage`]: static call-site extraction from Python sources
//! - [`catalog`]: persistent library → version → symbol → signature store
//! - [`index`]: package index collaborator (PyPI) with retry/backoff
//! - [`extract`]: signature builder and the interpreter-backed probe
//! - [`resolve`]: version matcher, orchestrator and report rendering
//! - [`config`]: configuration file and data directory layout
//! - [`logging`]: tracing subscriber setup for the binary

pub mod catalog;
pub mod config;
pub mod extract;
pub mod index;
pub mod logging;
pub mod resolve;
pub mod usage;
