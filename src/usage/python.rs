//! Python call-site extractor
//!
//! Builds an alias table from `import` / `from ... import` statements, then
//! resolves every call whose callee is a dotted name rooted at an imported
//! binding. The source is only parsed, never executed.
//!
//! Binding rules:
//! - `import a.b` binds `a`
//! - `import a.b as x` binds `x` to `a.b`
//! - `from a.b import c as d` binds `d` to `a.b.c`
//! - relative imports are local code and bind nothing

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::usage::libraries::LibraryTable;
use crate::usage::syntax::{NodeId, SyntaxTree};
use crate::usage::traits::{ParseError, UsageExtractor};
use crate::usage::types::{Site, SourceUnit, UnitUsage, UsageEvent};

/// Extractor for Python sources
#[derive(Debug, Clone, Default)]
pub struct PythonUsageExtractor {
    libraries: LibraryTable,
}

/// Names bound by the import statements of one unit
#[derive(Debug, Default)]
struct ImportTable {
    /// Local name → fully qualified dotted path
    bindings: HashMap<String, String>,
    /// Modules imported with `from module import *`
    wildcard_modules: Vec<String>,
}

/// Argument shape of one call
#[derive(Debug, Default)]
struct CallArguments {
    keywords: BTreeSet<String>,
    positional: usize,
    keyword_spread: bool,
    positional_spread: bool,
}

impl PythonUsageExtractor {
    pub fn new(libraries: LibraryTable) -> Self {
        Self { libraries }
    }

    fn parse_syntax<'src>(
        &self,
        unit: &'src SourceUnit,
    ) -> Result<(tree_sitter::Tree, &'src str), ParseError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| {
                warn!("Failed to set Python language for tree-sitter: {}", e);
                ParseError::TreeSitter(e.to_string())
            })?;

        let tree = parser.parse(&unit.content, None).ok_or_else(|| {
            warn!("Failed to parse Python content of {}", unit.name);
            ParseError::TreeSitter(format!("no tree produced for {}", unit.name))
        })?;

        Ok((tree, unit.content.as_str()))
    }

    fn collect_imports(&self, syntax: &SyntaxTree) -> ImportTable {
        let mut imports = ImportTable::default();

        for (id, node) in syntax.nodes() {
            match node.kind {
                "import_statement" => {
                    for name in syntax.children_by_field(id, "name") {
                        self.bind_import(syntax, name, &mut imports);
                    }
                }
                "import_from_statement" => {
                    self.bind_from_import(syntax, id, &mut imports);
                }
                _ => {}
            }
        }

        imports
    }

    fn bind_import(&self, syntax: &SyntaxTree, name: NodeId, imports: &mut ImportTable) {
        match syntax.node(name).kind {
            "dotted_name" => {
                let path = dotted_text(syntax, name);
                if let Some(head) = path.split('.').next() {
                    imports.bindings.insert(head.to_string(), head.to_string());
                }
            }
            "aliased_import" => {
                let (Some(target), Some(alias)) = (
                    syntax.child_by_field(name, "name"),
                    syntax.child_by_field(name, "alias"),
                ) else {
                    return;
                };
                imports
                    .bindings
                    .insert(syntax.text(alias).to_string(), dotted_text(syntax, target));
            }
            _ => {}
        }
    }

    fn bind_from_import(&self, syntax: &SyntaxTree, statement: NodeId, imports: &mut ImportTable) {
        let Some(module) = syntax.child_by_field(statement, "module_name") else {
            return;
        };
        if syntax.node(module).kind != "dotted_name" {
            // relative_import: local code
            return;
        }
        let module_path = dotted_text(syntax, module);

        for &child in syntax.children(statement) {
            let node = syntax.node(child);
            if node.kind == "wildcard_import" {
                imports.wildcard_modules.push(module_path.clone());
                continue;
            }
            if node.field != Some("name") {
                continue;
            }
            match node.kind {
                "dotted_name" => {
                    let name = dotted_text(syntax, child);
                    let local = name.rsplit('.').next().unwrap_or(&name).to_string();
                    imports
                        .bindings
                        .insert(local, format!("{}.{}", module_path, name));
                }
                "aliased_import" => {
                    let (Some(target), Some(alias)) = (
                        syntax.child_by_field(child, "name"),
                        syntax.child_by_field(child, "alias"),
                    ) else {
                        continue;
                    };
                    imports.bindings.insert(
                        syntax.text(alias).to_string(),
                        format!("{}.{}", module_path, dotted_text(syntax, target)),
                    );
                }
                _ => {}
            }
        }
    }

    fn call_event(
        &self,
        syntax: &SyntaxTree,
        call: NodeId,
        imports: &ImportTable,
        unit: &SourceUnit,
    ) -> Option<UsageEvent> {
        let function = syntax.child_by_field(call, "function")?;
        let chain = callee_chain(syntax, function)?;
        let (head, rest) = chain.split_first()?;
        let base = imports.bindings.get(*head)?;

        let path: Vec<&str> = base.split('.').chain(rest.iter().copied()).collect();
        let (library, symbol) = self.libraries.resolve(&path)?;

        let arguments = syntax
            .child_by_field(call, "arguments")
            .map(|args| call_arguments(syntax, args))
            .unwrap_or_default();

        let node = syntax.node(call);
        Some(UsageEvent {
            library,
            symbol,
            keyword_args: arguments.keywords,
            positional_count: arguments.positional,
            has_dynamic_spread: arguments.keyword_spread,
            has_positional_spread: arguments.positional_spread,
            site: Site {
                unit: unit.name.clone(),
                line: node.line,
                column: node.column,
            },
        })
    }
}

impl UsageExtractor for PythonUsageExtractor {
    fn can_extract(&self, file_name: &str) -> bool {
        file_name.ends_with(".py") || file_name.ends_with(".pyw")
    }

    fn extract_unit(&self, unit: &SourceUnit) -> Result<UnitUsage, ParseError> {
        let (tree, source) = self.parse_syntax(unit)?;
        let syntax = SyntaxTree::from_tree(&tree, source);

        if let Some((line, column)) = syntax.first_error() {
            return Err(ParseError::InvalidSyntax {
                unit: unit.name.clone(),
                line,
                column,
            });
        }

        let imports = self.collect_imports(&syntax);
        let mut usage = UnitUsage::default();

        for path in imports
            .bindings
            .values()
            .chain(imports.wildcard_modules.iter())
        {
            if let Some(library) = self.libraries.distribution_for(path) {
                usage.imported.insert(library.to_string());
            }
        }

        for (id, node) in syntax.nodes() {
            if node.kind != "call" {
                continue;
            }
            if let Some(event) = self.call_event(&syntax, id, &imports, unit) {
                usage.events.push(event);
            }
        }

        debug!(
            "{}: {} imported libraries, {} library calls",
            unit.name,
            usage.imported.len(),
            usage.events.len()
        );

        Ok(usage)
    }
}

/// Join the identifiers of a `dotted_name` (or a bare identifier) with `.`
fn dotted_text(syntax: &SyntaxTree, id: NodeId) -> String {
    let parts: Vec<&str> = syntax
        .children(id)
        .iter()
        .filter(|child| syntax.node(**child).kind == "identifier")
        .map(|child| syntax.text(*child))
        .collect();

    if parts.is_empty() {
        syntax.text(id).to_string()
    } else {
        parts.join(".")
    }
}

/// Dotted segments of a callee made only of identifiers and attribute access
/// (`np.linalg.norm` → ["np", "linalg", "norm"]); None for anything else.
fn callee_chain<'src>(syntax: &SyntaxTree<'src>, function: NodeId) -> Option<Vec<&'src str>> {
    let mut segments = Vec::new();
    let mut current = function;

    loop {
        match syntax.node(current).kind {
            "identifier" => {
                segments.push(syntax.text(current));
                break;
            }
            "attribute" => {
                let attribute = syntax.child_by_field(current, "attribute")?;
                segments.push(syntax.text(attribute));
                current = syntax.child_by_field(current, "object")?;
            }
            _ => return None,
        }
    }

    segments.reverse();
    Some(segments)
}

fn call_arguments(syntax: &SyntaxTree, arguments: NodeId) -> CallArguments {
    let mut shape = CallArguments::default();

    if syntax.node(arguments).kind == "generator_expression" {
        // f(x for x in y)
        shape.positional = 1;
        return shape;
    }

    for &argument in syntax.children(arguments) {
        match syntax.node(argument).kind {
            "keyword_argument" => {
                if let Some(name) = syntax.child_by_field(argument, "name") {
                    shape.keywords.insert(syntax.text(name).to_string());
                }
            }
            "dictionary_splat" => shape.keyword_spread = true,
            "list_splat" => shape.positional_spread = true,
            "comment" => {}
            _ => shape.positional += 1,
        }
    }

    shape
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn extract(code: &str) -> UnitUsage {
        PythonUsageExtractor::default()
            .extract_unit(&SourceUnit::new("app.py", code))
            .unwrap()
    }

    fn only_event(code: &str) -> UsageEvent {
        let usage = extract(code);
        assert_eq!(usage.events.len(), 1, "events: {:?}", usage.events);
        usage.events.into_iter().next().unwrap()
    }

    #[rstest]
    #[case("import pandas as pd\npd.read_csv('a.csv')\n", "pandas", "read_csv")]
    #[case("import pandas\npandas.read_csv('a.csv')\n", "pandas", "read_csv")]
    #[case("from pandas import read_csv\nread_csv('a.csv')\n", "pandas", "read_csv")]
    #[case("from pandas import read_csv as rc\nrc('a.csv')\n", "pandas", "read_csv")]
    #[case("import numpy as np\nnp.linalg.norm(v)\n", "numpy", "linalg.norm")]
    #[case("import numpy.linalg\nnumpy.linalg.norm(v)\n", "numpy", "linalg.norm")]
    #[case("import numpy.linalg as la\nla.norm(v)\n", "numpy", "linalg.norm")]
    #[case("from numpy import linalg\nlinalg.norm(v)\n", "numpy", "linalg.norm")]
    #[case("from sklearn.model_selection import train_test_split\ntrain_test_split(x)\n", "scikit-learn", "model_selection.train_test_split")]
    #[case("from flask import Flask\nFlask(__name__)\n", "flask", "Flask")]
    fn extract_unit_resolves_callee_through_imports(
        #[case] code: &str,
        #[case] library: &str,
        #[case] symbol: &str,
    ) {
        let event = only_event(code);
        assert_eq!(event.library, library);
        assert_eq!(event.symbol, symbol);
    }

    #[test]
    fn extract_unit_records_argument_shape() {
        let event = only_event("import requests\nrequests.get(url, 'x', timeout=5, verify=False)\n");

        assert_eq!(event.positional_count, 2);
        assert_eq!(
            event.keyword_args,
            BTreeSet::from(["timeout".to_string(), "verify".to_string()])
        );
        assert!(!event.has_dynamic_spread);
        assert!(!event.has_positional_spread);
        assert_eq!(
            event.site,
            Site {
                unit: "app.py".to_string(),
                line: 2,
                column: 1
            }
        );
    }

    #[test]
    fn extract_unit_marks_keyword_and_positional_spreads() {
        let event = only_event("import requests\nrequests.post(url, *extra, json=body, **options)\n");

        assert_eq!(event.positional_count, 1);
        assert_eq!(event.keyword_args, BTreeSet::from(["json".to_string()]));
        assert!(event.has_dynamic_spread);
        assert!(event.has_positional_spread);
    }

    #[test]
    fn extract_unit_counts_generator_argument_as_positional() {
        let event = only_event("import numpy as np\nnp.fromiter(x for x in range(3))\n");
        assert_eq!(event.positional_count, 1);
    }

    #[test]
    fn extract_unit_keeps_each_call_site() {
        let usage = extract(
            "import requests\nrequests.get(a)\nrequests.get(b, timeout=1)\n",
        );

        assert_eq!(usage.events.len(), 2);
        assert_eq!(usage.events[0].site.line, 2);
        assert_eq!(usage.events[1].site.line, 3);
        assert!(usage.events[0].keyword_args.is_empty());
    }

    #[test]
    fn extract_unit_finds_nested_calls() {
        let usage = extract(
            "import numpy as np\n\ndef f():\n    return np.array(np.zeros(3))\n",
        );

        let symbols: Vec<_> = usage.events.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["array", "zeros"]);
    }

    #[rstest]
    #[case("import os\nos.getcwd()\n")]
    #[case("from . import helpers\nhelpers.run()\n")]
    #[case("from .models import User\nUser(name='x')\n")]
    #[case("import requests\nresp = requests.get(u)\nresp.json()\n")]
    #[case("import requests\nrequests()\n")]
    #[case("print(len([1, 2]))\n")]
    fn extract_unit_ignores_calls_outside_known_libraries(#[case] code: &str) {
        let usage = extract(code);
        assert!(
            usage.events.iter().all(|e| e.library == "requests" && e.symbol == "get"),
            "unexpected events: {:?}",
            usage.events
        );
    }

    #[test]
    fn extract_unit_records_imported_libraries_without_calls() {
        let usage = extract("import numpy as np\nfrom yaml import *\nimport os\n");

        assert!(usage.events.is_empty());
        assert_eq!(
            usage.imported,
            BTreeSet::from(["numpy".to_string(), "pyyaml".to_string()])
        );
    }

    #[test]
    fn extract_unit_uses_configured_module_overrides() {
        let overrides =
            std::collections::BTreeMap::from([("acme".to_string(), "acme-sdk".to_string())]);
        let extractor = PythonUsageExtractor::new(LibraryTable::new().with_overrides(&overrides));
        let usage = extractor
            .extract_unit(&SourceUnit::from_text("import acme\nacme.connect(host='h')\n"))
            .unwrap();

        assert_eq!(usage.events[0].library, "acme-sdk");
        assert_eq!(usage.events[0].site.unit, "<string>");
    }

    #[test]
    fn extract_unit_rejects_invalid_syntax() {
        let result = PythonUsageExtractor::default()
            .extract_unit(&SourceUnit::new("bad.py", "import requests\nrequests.get(\n"));

        assert!(matches!(
            result,
            Err(ParseError::InvalidSyntax { ref unit, .. }) if unit == "bad.py"
        ));
    }

    #[test]
    fn extract_skips_broken_units_and_keeps_the_rest() {
        let units = vec![
            SourceUnit::new("good.py", "import requests\nrequests.get(u)\n"),
            SourceUnit::new("bad.py", "def (:\n"),
            SourceUnit::new("other.py", "import flask\nflask.Flask(__name__)\n"),
        ];

        let report = PythonUsageExtractor::default().extract(&units);

        assert_eq!(report.units_analyzed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.libraries().collect::<Vec<_>>(),
            vec!["flask", "requests"]
        );
    }

    #[rstest]
    #[case("app.py", true)]
    #[case("gui.pyw", true)]
    #[case("setup.cfg", false)]
    #[case("notes.txt", false)]
    fn can_extract_returns_expected(#[case] file_name: &str, #[case] expected: bool) {
        assert_eq!(PythonUsageExtractor::default().can_extract(file_name), expected);
    }
}
