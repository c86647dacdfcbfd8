//! Shared test utilities
#![allow(dead_code)]

mod catalog;
mod index;

pub use catalog::*;
pub use index::*;
