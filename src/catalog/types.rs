//! Signature and catalog types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a parameter may be supplied at a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Positional-only (declared before `/`)
    Positional,
    /// Keyword-only (declared after `*` or `*args`)
    Keyword,
    PositionalOrKeyword,
}

impl ParameterKind {
    pub fn accepts_positional(self) -> bool {
        matches!(self, Self::Positional | Self::PositionalOrKeyword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
}

/// Declared parameter contract of one symbol in one library version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub qualified_symbol: String,
    /// Named parameters in declaration order (variadics excluded)
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub accepts_var_positional: bool,
    #[serde(default)]
    pub accepts_var_keyword: bool,
}

impl Signature {
    pub fn new(qualified_symbol: impl Into<String>) -> Self {
        Self {
            qualified_symbol: qualified_symbol.into(),
            parameters: Vec::new(),
            accepts_var_positional: false,
            accepts_var_keyword: false,
        }
    }

    pub fn with_parameter(mut self, name: &str, kind: ParameterKind, required: bool) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            kind,
            required,
        });
        self
    }

    /// Add a required positional-or-keyword parameter
    pub fn with_required(self, name: &str) -> Self {
        self.with_parameter(name, ParameterKind::PositionalOrKeyword, true)
    }

    /// Add an optional positional-or-keyword parameter
    pub fn with_optional(self, name: &str) -> Self {
        self.with_parameter(name, ParameterKind::PositionalOrKeyword, false)
    }

    pub fn with_var_positional(mut self) -> Self {
        self.accepts_var_positional = true;
        self
    }

    pub fn with_var_keyword(mut self) -> Self {
        self.accepts_var_keyword = true;
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }

    /// Number of parameters that can be filled positionally
    pub fn positional_capacity(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.kind.accepts_positional())
            .count()
    }
}

/// Symbols of one library version, keyed by qualified symbol
pub type SymbolMap = BTreeMap<String, Signature>;

/// Build a symbol map from signatures, keyed by their qualified symbol
pub fn symbol_map(signatures: impl IntoIterator<Item = Signature>) -> SymbolMap {
    signatures
        .into_iter()
        .map(|sig| (sig.qualified_symbol.clone(), sig))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionEntry {
    pub version: String,
    pub symbols: SymbolMap,
}

/// Every indexed version of one library, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryCatalog {
    pub library: String,
    pub versions: Vec<VersionEntry>,
}

impl LibraryCatalog {
    pub fn newest(&self) -> Option<&VersionEntry> {
        self.versions.first()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySummary {
    pub library: String,
    pub version_count: usize,
    pub newest_version: Option<String>,
    pub last_extracted: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total_libraries: usize,
    pub total_versions: usize,
    pub total_symbols: usize,
}
