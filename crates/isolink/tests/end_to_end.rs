mod common;

use common::{app, build, depends_on, memory_fs, package, source};
use isolink::{CompilerRegistry, GLOBAL_IMPORTS_SERVE_PATH, PackageExport, ResourceType};

#[test]
fn package_exports_reach_the_app() {
  let mut core = package("core", vec![source("greet.js", "Greet = function (name) { return 'Hello ' + name; };")]);
  core.declared_exports = vec![PackageExport::new("Greet")];

  let mut main = app(vec![source("main.js", "console.log(Greet);")]);
  main.uses_modules = false;
  main.dependencies = vec![depends_on("core", &["Greet"])];

  let output = build(vec![core, main], CompilerRegistry::default(), memory_fs(&[]));
  assert!(output.diagnostics.is_empty());
  assert_eq!(output.packages.len(), 2);

  let serve_paths = output.resources().map(|resource| resource.serve_path.as_deref()).collect::<Vec<_>>();
  assert_eq!(serve_paths, [Some(GLOBAL_IMPORTS_SERVE_PATH), Some("/packages/core.js"), Some("/app.js")]);
  assert!(output.resources().all(|resource| resource.r#type == ResourceType::Js));

  let code = output.js_code();
  let import_stub = code.find("var Greet = Package.core.Greet;").unwrap();
  let core_file = code.find("Greet = function (name)").unwrap();
  let app_file = code.find("console.log(Greet);").unwrap();
  assert!(import_stub < core_file && core_file < app_file);

  assert!(code.contains("/* Package-scope variables */\nvar Greet;\n"));
  assert!(code.contains("(s in pkg) || (pkg[s] = symbols[s]);"));
  assert!(code.contains("})(Package[\"core\"] = Package[\"core\"] || {});"));

  assert_eq!(
    output.global_imports[0].data_as_str(),
    Some("/* Imports for global scope */\n\nvar Greet = Package.core.Greet;\n\n")
  );
  let app_js = output.packages[1].resources[0].data_as_str().unwrap();
  assert!(app_js.starts_with("(function(){"));
  assert!(app_js.contains("// main.js"));
}

#[test]
fn installed_app_requires_eager_modules() {
  let main = app(vec![
    source("main.js", "import { helper } from './imports/helper';\nhelper();"),
    source("imports/helper.js", "export function helper() {}"),
    source("imports/unused.js", "export default 1;"),
  ]);

  let output = build(vec![main], CompilerRegistry::default(), memory_fs(&[]));
  let code = output.js_code();

  assert!(code.contains("var require = meteorInstall({\"main.js\":[\"./imports/helper\",function module("));
  assert!(code.contains("\"imports\":{\"helper.js\":function module("));
  assert!(!code.contains("unused.js"));
  assert!(code.contains("require(\"/main.js\");\n"));
  assert!(!code.contains("require(\"/imports/helper.js\");"));
}

#[test]
fn source_maps_cover_the_linked_bundle() {
  let main = app(vec![source("a.js", "var a = 1;"), source("b.js", "var b = 2;")]);
  let output = build(vec![main], CompilerRegistry::default(), memory_fs(&[]));

  let resource = &output.packages[0].resources[0];
  let map = resource.source_map.as_deref().unwrap();
  let json: serde_json::Value = serde_json::from_str(map).unwrap();
  let sources = json["sources"].as_array().unwrap();
  assert_eq!(sources.len(), 2);
  assert_eq!(resource.hash, isolink_utils::xxhash::xxhash_hex(&resource.data));
}

#[test]
fn packages_without_modules_keep_only_their_own_files() {
  let legacy = package("legacy", vec![source("a.js", "if (Meteor.isServer) { var dep = require('dep'); }")]);
  let fs = memory_fs(&[("/packages/legacy/node_modules/dep/index.js", "DEP_BODY = 1;")]);

  let output = build(vec![legacy, app(vec![source("main.js", "Main = 1;")])], CompilerRegistry::default(), fs);
  assert!(output.diagnostics.is_empty());
  assert!(output.global_imports.is_empty());

  let code = output.js_code();
  assert!(code.contains("var dep = require('dep');"));
  assert!(!code.contains("DEP_BODY"));
}
