mod header_footer;
mod module_tree;
mod prelinked_file;

use isolink_common::{Resource, ResourceType};
use isolink_error::Diagnostics;
use isolink_sourcemap::CombinedSource;
use isolink_utils::{
  concat_string,
  ecmascript::to_js_string_literal,
  indexmap::{FxIndexMap, FxIndexSet},
  xxhash::xxhash_hex,
};
use serde::Serialize;
use tracing::{debug, instrument};

use self::{
  header_footer::{import_code, scoped_footer, scoped_header, source_map_instructions},
  module_tree::ModuleTree,
  prelinked_file::{LinkFile, Wrapper},
};
use crate::{
  cache::{CacheKey, LinkerCache},
  types::scanned_file::ScannedFile,
};

#[cfg(test)]
use crate::types::scanned_file::{ImportStatus, static_deps};

/// Serve path of the app's imports, which load before any package code.
pub const GLOBAL_IMPORTS_SERVE_PATH: &str = "/packages/global-imports.js";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOptions {
  /// Tried in order by the runtime `require` when an id has no extension.
  pub extensions: Vec<String>,
}

/// Everything besides the files that determines a batch's linked output. Serialized into the
/// cache key.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkerOptions {
  pub name: Option<String>,
  pub arch: String,
  /// Top-level declarations land in the global scope instead of a package closure.
  pub use_global_namespace: bool,
  /// `Some` when files are installed with `meteorInstall`.
  pub install_options: Option<InstallOptions>,
  /// Imported symbol to the package providing it.
  pub imports: FxIndexMap<String, String>,
  pub declared_exports: Vec<String>,
  pub combined_serve_path: String,
  pub include_source_map_instructions: bool,
}

/// Links scanned files into the JS resource of their batch. The app gets a second resource
/// declaring its imports.
pub struct Linker {
  cache: LinkerCache,
}

impl Linker {
  pub fn new(cache: LinkerCache) -> Self {
    Self { cache }
  }

  pub fn cache(&self) -> &LinkerCache {
    &self.cache
  }

  /// Results that produced errors are returned but never cached.
  #[instrument(level = "debug", skip_all, fields(name = options.name.as_deref().unwrap_or("app"), files = files.len()))]
  pub fn link(
    &self,
    files: &[ScannedFile],
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
  ) -> Vec<Resource> {
    let key = CacheKey::new(files, options);
    if let Some(resources) = self.cache.get(&key, diagnostics) {
      return resources;
    }
    debug!("linker cache miss {}", key.file_name());

    let mark = diagnostics.mark();
    let resources = full_link(files, options, diagnostics);
    if !diagnostics.has_errors_since(mark) {
      self.cache.insert(key, &resources);
    }
    resources
  }
}

fn full_link(files: &[ScannedFile], options: &LinkerOptions, diagnostics: &mut Diagnostics) -> Vec<Resource> {
  let is_app = options.use_global_namespace;
  let mut resources = Vec::new();
  if is_app {
    let import_stub = import_code(&options.imports, "/* Imports for global scope */\n\n");
    if !import_stub.is_empty() {
      resources.push(js_resource(import_stub, None, GLOBAL_IMPORTS_SERVE_PATH));
    }
    if files.is_empty() {
      return resources;
    }
  }

  let mut link_files =
    files.iter().map(|file| LinkFile::new(file, options.name.as_deref())).collect::<Vec<_>>();

  let mut package_variables = options
    .declared_exports
    .iter()
    .filter_map(|symbol| symbol.split('.').next())
    .map(String::from)
    .collect::<FxIndexSet<_>>();
  if !is_app {
    for file in &mut link_files {
      package_variables.extend(file.assigned_globals(diagnostics));
    }
  }

  // A package without code only re-exports what it imports.
  let imports = if !is_app && link_files.is_empty() {
    options
      .imports
      .iter()
      .filter(|(symbol, _)| options.declared_exports.contains(symbol))
      .map(|(symbol, package)| (symbol.clone(), package.clone()))
      .collect()
  } else {
    options.imports.clone()
  };

  let mut header = if is_app { String::new() } else { scoped_header(&imports, &package_variables) };
  if options.include_source_map_instructions {
    header = concat_string!(source_map_instructions(), "\n\n", header);
  }

  let mut combined = CombinedSource::default();
  combined.add_generated_code(&header);
  let has_main_module = match &options.install_options {
    Some(install_options) => link_with_modules(&link_files, install_options, &mut combined),
    None => {
      link_without_modules(&link_files, &mut combined);
      false
    }
  };
  if !is_app {
    combined.add_generated_code(&scoped_footer(
      options.name.as_deref(),
      &options.declared_exports,
      has_main_module,
    ));
  }

  let (code, map) = combined.into_code_and_map();
  resources.push(js_resource(code, map.map(|map| map.to_json_string()), &options.combined_serve_path));
  resources
}

fn js_resource(code: String, source_map: Option<String>, serve_path: &str) -> Resource {
  Resource {
    r#type: ResourceType::Js,
    hash: xxhash_hex(code.as_bytes()),
    data: code.into_bytes().into(),
    serve_path: Some(serve_path.to_string()),
    source_path: None,
    target_path: None,
    source_map: source_map.map(Into::into),
  }
}

/// Each file in its own closure, separated by blank lines.
fn link_without_modules(files: &[LinkFile], combined: &mut CombinedSource) {
  for (i, file) in files.iter().enumerate() {
    if i > 0 {
      combined.add_empty_lines(6);
    }
    file.write_to(combined, Wrapper::Closure);
  }
}

/// The install tree, then in declaration order bare files inline and a `require` call per eager
/// module. Returns whether a main module's exports were captured.
fn link_with_modules(files: &[LinkFile], install_options: &InstallOptions, combined: &mut CombinedSource) -> bool {
  let tree = ModuleTree::build(files);
  if !tree.is_empty() {
    let options_json = serde_json::to_string_pretty(install_options).unwrap_or_else(|_| "{}".to_string());
    combined.add_generated_code("var require = meteorInstall(");
    tree.write_to(combined, files);
    combined.add_generated_code(&concat_string!(",", options_json, ");\n"));
  }

  let mut has_main_module = false;
  for file in files {
    if file.file.bare {
      combined.add_empty_lines(1);
      file.write_to(combined, Wrapper::Closure);
      continue;
    }
    if file.file.lazy {
      continue;
    }
    let Some(id) = file.file.abs_module_id() else { continue };
    let call = concat_string!("require(", to_js_string_literal(&id), ");\n");
    if file.file.main_module && !has_main_module {
      has_main_module = true;
      combined.add_generated_code(&concat_string!("var exports = ", call));
    } else {
      combined.add_generated_code(&call);
    }
  }
  has_main_module
}

#[cfg(test)]
fn scanned(source_path: &str, data: &str) -> ScannedFile {
  ScannedFile {
    source_path: source_path.to_string(),
    abs_path: std::path::PathBuf::from("/app").join(source_path),
    data: data.to_string(),
    hash: xxhash_hex(data.as_bytes()),
    source_map: None,
    lazy: false,
    imported: ImportStatus::Static,
    bare: false,
    main_module: false,
    implicit: false,
    install_path: Some(source_path.to_string()),
    deps: None,
    pending_errors: Vec::new(),
  }
}

#[cfg(test)]
fn link_code(files: &[ScannedFile], options: &LinkerOptions) -> (String, Diagnostics) {
  let mut diagnostics = Diagnostics::default();
  let resources = full_link(files, options, &mut diagnostics);
  let code = resources.last().and_then(Resource::data_as_str).unwrap_or_default().to_string();
  (code, diagnostics)
}

#[test]
fn test_global_namespace_keeps_declaration_order() {
  let files = [scanned("a.js", "var a = 1;"), scanned("b.js", "var b = 2;"), scanned("c.js", "var c = 3;")];
  let options = LinkerOptions {
    use_global_namespace: true,
    combined_serve_path: "/app.js".to_string(),
    ..LinkerOptions::default()
  };
  let (code, _) = link_code(&files, &options);

  let a = code.find("var a = 1;").unwrap();
  let b = code.find("var b = 2;").unwrap();
  let c = code.find("var c = 3;").unwrap();
  assert!(a < b && b < c);
  assert_eq!(code.matches("(function(){").count(), 3);
  assert_eq!(code.matches("}).call(this);").count(), 3);
}

#[test]
fn test_package_with_modules() {
  let mut main = scanned("node_modules/meteor/core/main.js", "exports.x = require('./lib');");
  main.main_module = true;
  main.deps = Some(static_deps(["./lib"]));
  let mut lib = scanned("node_modules/meteor/core/lib.js", "module.exports = 1;");
  lib.lazy = true;
  let mut legacy = scanned("node_modules/meteor/core/legacy.js", "Legacy = {};");
  legacy.bare = true;

  let options = LinkerOptions {
    name: Some("core".to_string()),
    install_options: Some(InstallOptions { extensions: vec![".js".to_string(), ".json".to_string()] }),
    combined_serve_path: "/packages/core.js".to_string(),
    ..LinkerOptions::default()
  };
  let (code, diagnostics) = link_code(&[legacy, main, lib], &options);
  assert!(diagnostics.is_empty());

  assert!(code.starts_with("(function () {\n\n/* Package-scope variables */\nvar Legacy;\n\n"));
  assert!(code.contains(
    "var require = meteorInstall({\"node_modules\":{\"meteor\":{\"core\":{\"main.js\":[\"./lib\",function module(require,exports){"
  ));
  assert!(code.contains("\"lib.js\":function module(require,exports,module){"));
  assert!(code.contains(",{\n  \"extensions\": [\n    \".js\",\n    \".json\"\n  ]\n});\n"));
  assert!(code.contains("This file is in bare mode and is not in its own closure."));

  let legacy_at = code.find("Legacy = {};").unwrap();
  let require_at = code.find("var exports = require(\"/node_modules/meteor/core/main.js\");\n").unwrap();
  assert!(legacy_at < require_at);
  assert!(!code.contains("require(\"/node_modules/meteor/core/lib.js\")"));
  assert!(code.contains("  merge(exports);\n"));
  assert!(code.ends_with("\n})();\n"));
}

#[test]
fn test_unparsable_file_is_emptied() {
  let options = LinkerOptions {
    name: Some("broken".to_string()),
    combined_serve_path: "/packages/broken.js".to_string(),
    ..LinkerOptions::default()
  };
  let (code, diagnostics) = link_code(&[scanned("bad.js", "var = ;")], &options);

  assert!(diagnostics.has_errors());
  assert!(!code.contains("var = ;"));
  assert!(code.contains("packages/broken/bad.js"));
}

#[test]
fn test_empty_package_reexports_declared_imports() {
  let options = LinkerOptions {
    name: Some("umbrella".to_string()),
    imports: [("A", "a"), ("B", "b")].into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    declared_exports: vec!["A".to_string()],
    combined_serve_path: "/packages/umbrella.js".to_string(),
    ..LinkerOptions::default()
  };
  let (code, _) = link_code(&[], &options);
  assert!(code.contains("var A = Package.a.A;"));
  assert!(!code.contains("Package.b.B"));
  assert!(code.contains("merge({\n    A: A\n  });"));
}

#[test]
fn test_app_imports_are_a_separate_resource() {
  let options = LinkerOptions {
    use_global_namespace: true,
    imports: [("Greet", "core")].into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    combined_serve_path: "/app.js".to_string(),
    ..LinkerOptions::default()
  };
  let mut diagnostics = Diagnostics::default();
  let resources = full_link(&[scanned("main.js", "Greet();")], &options, &mut diagnostics);

  let serve_paths = resources.iter().map(|resource| resource.serve_path.as_deref()).collect::<Vec<_>>();
  assert_eq!(serve_paths, [Some(GLOBAL_IMPORTS_SERVE_PATH), Some("/app.js")]);
  assert_eq!(
    resources[0].data_as_str(),
    Some("/* Imports for global scope */\n\nvar Greet = Package.core.Greet;\n\n")
  );
  let app = resources[1].data_as_str().unwrap();
  assert!(!app.contains("Package.core"));
  assert!(app.contains("Greet();"));

  let resources = full_link(&[], &options, &mut diagnostics);
  assert_eq!(resources.len(), 1);
  assert_eq!(resources[0].serve_path.as_deref(), Some(GLOBAL_IMPORTS_SERVE_PATH));
  let no_imports = LinkerOptions { use_global_namespace: true, ..LinkerOptions::default() };
  assert!(full_link(&[], &no_imports, &mut diagnostics).is_empty());
}
