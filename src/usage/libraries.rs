//! Mapping from importable top-level modules to PyPI distributions

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

/// Well-known top-level modules and the distribution that provides them
const KNOWN_DISTRIBUTIONS: &[(&str, &str)] = &[
    ("pandas", "pandas"),
    ("numpy", "numpy"),
    ("matplotlib", "matplotlib"),
    ("seaborn", "seaborn"),
    ("sklearn", "scikit-learn"),
    ("requests", "requests"),
    ("flask", "flask"),
    ("django", "django"),
    ("fastapi", "fastapi"),
    ("aiohttp", "aiohttp"),
    ("bs4", "beautifulsoup4"),
    ("selenium", "selenium"),
    ("sqlalchemy", "sqlalchemy"),
    ("psycopg2", "psycopg2"),
    ("pymongo", "pymongo"),
    ("redis", "redis"),
    ("click", "click"),
    ("tqdm", "tqdm"),
    ("dotenv", "python-dotenv"),
    ("yaml", "pyyaml"),
    ("jinja2", "jinja2"),
    ("markdown", "markdown"),
    ("lxml", "lxml"),
    ("dateutil", "python-dateutil"),
    ("pytz", "pytz"),
    ("watchdog", "watchdog"),
    ("PIL", "pillow"),
    ("cv2", "opencv-python"),
    ("plotly", "plotly"),
    ("bokeh", "bokeh"),
    ("statsmodels", "statsmodels"),
    ("sympy", "sympy"),
    ("networkx", "networkx"),
    ("scipy", "scipy"),
    ("IPython", "ipython"),
    ("tensorflow", "tensorflow"),
    ("torch", "torch"),
    ("transformers", "transformers"),
    ("openai", "openai"),
    ("langchain", "langchain"),
    ("pandas_profiling", "pandas-profiling"),
    ("h5py", "h5py"),
    ("pyarrow", "pyarrow"),
    ("urllib3", "urllib3"),
    ("httpx", "httpx"),
    ("websockets", "websockets"),
];

static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("separator pattern is valid"));

/// Normalize a distribution name (PEP 503): lowercase, separator runs become `-`
pub fn normalize_distribution_name(name: &str) -> String {
    SEPARATOR_RUNS
        .replace_all(name.trim(), "-")
        .to_lowercase()
}

/// Resolves dotted module paths to `(distribution, symbol)` pairs
#[derive(Debug, Clone)]
pub struct LibraryTable {
    modules: HashMap<String, String>,
}

impl Default for LibraryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryTable {
    pub fn new() -> Self {
        let modules = KNOWN_DISTRIBUTIONS
            .iter()
            .map(|(module, dist)| (module.to_string(), normalize_distribution_name(dist)))
            .collect();
        Self { modules }
    }

    /// Add or replace module mappings (e.g. from the `libraries` config section)
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (module, dist) in overrides {
            self.modules
                .insert(module.clone(), normalize_distribution_name(dist));
        }
        self
    }

    /// Distribution owning the top-level module of `module_path`
    pub fn distribution_for(&self, module_path: &str) -> Option<&str> {
        let top_level = module_path.split('.').next()?;
        self.modules.get(top_level).map(String::as_str)
    }

    /// Split a fully qualified dotted path into its distribution and the
    /// symbol path below the top-level module.
    ///
    /// Returns None for unknown modules and for the bare module itself.
    pub fn resolve(&self, path: &[&str]) -> Option<(String, String)> {
        let (top_level, rest) = path.split_first()?;
        if rest.is_empty() {
            return None;
        }
        let library = self.modules.get(*top_level)?;
        Some((library.clone(), rest.join(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("scikit-learn", "scikit-learn")]
    #[case("Flask", "flask")]
    #[case("python_dateutil", "python-dateutil")]
    #[case("zope.interface", "zope-interface")]
    #[case("Foo__Bar--baz", "foo-bar-baz")]
    fn normalize_distribution_name_returns_expected(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_distribution_name(input), expected);
    }

    #[rstest]
    #[case("numpy", Some("numpy"))]
    #[case("numpy.linalg", Some("numpy"))]
    #[case("sklearn.model_selection", Some("scikit-learn"))]
    #[case("PIL.Image", Some("pillow"))]
    #[case("os.path", None)]
    #[case("myproject.utils", None)]
    fn distribution_for_returns_expected(#[case] module: &str, #[case] expected: Option<&str>) {
        assert_eq!(LibraryTable::new().distribution_for(module), expected);
    }

    #[test]
    fn resolve_splits_library_and_symbol() {
        let table = LibraryTable::new();
        assert_eq!(
            table.resolve(&["numpy", "linalg", "norm"]),
            Some(("numpy".to_string(), "linalg.norm".to_string()))
        );
        assert_eq!(table.resolve(&["numpy"]), None);
        assert_eq!(table.resolve(&["json", "dumps"]), None);
    }

    #[test]
    fn with_overrides_adds_and_normalizes_mappings() {
        let overrides = BTreeMap::from([
            ("mylib".to_string(), "My_Lib".to_string()),
            ("yaml".to_string(), "ruamel.yaml".to_string()),
        ]);
        let table = LibraryTable::new().with_overrides(&overrides);

        assert_eq!(table.distribution_for("mylib.core"), Some("my-lib"));
        assert_eq!(table.distribution_for("yaml"), Some("ruamel-yaml"));
    }
}
