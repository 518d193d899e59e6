use isolink_utils::{
  concat_string,
  ecmascript::{property_access_str, to_js_string_literal},
  indexmap::{FxIndexMap, FxIndexSet},
};
use itertools::Itertools;

use super::prelinked_file::banner;

pub fn source_map_instructions() -> String {
  banner(&[
    "This is a generated file. You can view the original",
    "source in your browser if your browser supports source maps.",
    "Source maps are supported by all recent versions of Chrome, Safari, ",
    "and Firefox, and by Internet Explorer 11.",
  ])
}

enum SymbolNode {
  Leaf(String),
  Branch(FxIndexMap<String, SymbolNode>),
}

/// `{"Foo": a, "Bar.Baz": b}` becomes `{Foo: a, Bar: {Baz: b}}`.
fn build_symbol_tree<'a>(
  symbols: impl IntoIterator<Item = (&'a str, String)>,
) -> FxIndexMap<String, SymbolNode> {
  let mut root = FxIndexMap::default();
  'symbols: for (symbol, value) in symbols {
    let mut parts = symbol.split('.').collect::<Vec<_>>();
    let Some(last) = parts.pop() else { continue };

    let mut walk = &mut root;
    for part in parts {
      let node = walk.entry(part.to_string()).or_insert_with(|| SymbolNode::Branch(FxIndexMap::default()));
      match node {
        SymbolNode::Branch(children) => walk = children,
        // A plain symbol already took this name.
        SymbolNode::Leaf(_) => continue 'symbols,
      }
    }
    walk.insert(last.to_string(), SymbolNode::Leaf(value));
  }
  root
}

fn write_symbol_tree(node: &SymbolNode, indent: usize) -> String {
  let children = match node {
    SymbolNode::Leaf(value) => return value.clone(),
    SymbolNode::Branch(children) => children,
  };
  if children.is_empty() {
    return "{}".to_string();
  }
  let spacing = " ".repeat(indent);
  let entries = children
    .iter()
    .map(|(key, value)| concat_string!(spacing, "  ", key, ": ", write_symbol_tree(value, indent + 2)))
    .join(",\n");
  concat_string!("{\n", entries, "\n", spacing, "}")
}

/// `var Foo = Package.foo.Foo;` for every imported symbol, under `title`.
pub fn import_code(imports: &FxIndexMap<String, String>, title: &str) -> String {
  if imports.is_empty() {
    return String::new();
  }
  let tree = build_symbol_tree(imports.iter().map(|(symbol, package)| {
    (symbol.as_str(), concat_string!(property_access_str("Package", package), ".", symbol))
  }));

  let mut buf = title.to_string();
  for (key, node) in &tree {
    buf.push_str(&concat_string!("var ", key, " = ", write_symbol_tree(node, 0), ";\n"));
  }
  buf.push('\n');
  buf
}

/// Opens the package closure, then declares imports and package-scope variables.
pub fn scoped_header(imports: &FxIndexMap<String, String>, package_variables: &FxIndexSet<String>) -> String {
  let mut header = concat_string!("(function () {\n\n", import_code(imports, "/* Imports */\n"));
  let variables = package_variables.iter().filter(|name| !imports.contains_key(*name)).join(", ");
  if !variables.is_empty() {
    header.push_str(&concat_string!("/* Package-scope variables */\nvar ", variables, ";\n\n"));
  }
  header
}

/// Publishes exports on `Package[name]` without overwriting properties that are already there,
/// then closes the package closure.
pub fn scoped_footer(name: Option<&str>, declared_exports: &[String], has_main_module: bool) -> String {
  let mut footer = String::new();
  if let Some(name) = name {
    let package = concat_string!("Package[", to_js_string_literal(name), "]");
    footer.push_str("\n\n/* Exports */\n");

    let mut merges = Vec::new();
    if !declared_exports.is_empty() {
      let tree = build_symbol_tree(declared_exports.iter().map(|symbol| (symbol.as_str(), symbol.clone())));
      merges.push(write_symbol_tree(&SymbolNode::Branch(tree), 2));
    }
    if has_main_module {
      merges.push("exports".to_string());
    }

    if merges.is_empty() {
      footer.push_str(&concat_string!(package, " = ", package, " || {};\n"));
    } else {
      footer.push_str(
        "(function (pkg) {\n  function merge(symbols) {\n    for (var s in symbols)\n      (s in pkg) || (pkg[s] = symbols[s]);\n  }\n",
      );
      for merge in merges {
        footer.push_str(&concat_string!("  merge(", merge, ");\n"));
      }
      footer.push_str(&concat_string!("})(", package, " = ", package, " || {});\n"));
    }
  }
  footer.push_str("\n})();\n");
  footer
}

#[cfg(test)]
fn imports(pairs: &[(&str, &str)]) -> FxIndexMap<String, String> {
  pairs.iter().map(|(symbol, package)| ((*symbol).to_string(), (*package).to_string())).collect()
}

#[test]
fn test_import_code() {
  assert_eq!(import_code(&imports(&[]), "/* Imports */\n"), "");
  assert_eq!(
    import_code(&imports(&[("Greet", "core"), ("Router", "iron:router")]), "/* Imports */\n"),
    "/* Imports */\nvar Greet = Package.core.Greet;\nvar Router = Package[\"iron:router\"].Router;\n\n"
  );
  assert_eq!(
    import_code(&imports(&[("Bar.Baz", "foo"), ("Bar.Quux", "foo")]), ""),
    "var Bar = {\n  Baz: Package.foo.Bar.Baz,\n  Quux: Package.foo.Bar.Quux\n};\n\n"
  );
}

#[test]
fn test_scoped_header_skips_imported_variables() {
  let variables = ["Greet", "helper"].into_iter().map(String::from).collect::<FxIndexSet<_>>();
  let header = scoped_header(&imports(&[("Greet", "core")]), &variables);
  assert_eq!(
    header,
    "(function () {\n\n/* Imports */\nvar Greet = Package.core.Greet;\n\n/* Package-scope variables */\nvar helper;\n\n"
  );
}

#[test]
fn test_scoped_footer_merges_exports() {
  let footer = scoped_footer(Some("P"), &["X".to_string()], true);
  assert_eq!(
    footer,
    concat!(
      "\n\n/* Exports */\n",
      "(function (pkg) {\n",
      "  function merge(symbols) {\n",
      "    for (var s in symbols)\n",
      "      (s in pkg) || (pkg[s] = symbols[s]);\n",
      "  }\n",
      "  merge({\n    X: X\n  });\n",
      "  merge(exports);\n",
      "})(Package[\"P\"] = Package[\"P\"] || {});\n",
      "\n})();\n"
    )
  );

  assert_eq!(
    scoped_footer(Some("empty"), &[], false),
    "\n\n/* Exports */\nPackage[\"empty\"] = Package[\"empty\"] || {};\n\n})();\n"
  );
}
