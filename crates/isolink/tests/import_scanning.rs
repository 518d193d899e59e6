mod common;

use common::{app, lazy_source, memory_fs, package, scan, scan_for, source, source_paths};
use isolink::{BuildDiagnostic, ImportStatus};

#[test]
fn unreached_lazy_files_are_dropped() {
  let fs = memory_fs(&[]);
  let (output, diagnostics) = scan(
    vec![app(vec![
      source("a.js", "require('./b');"),
      lazy_source("b.js", "module.exports = 'b';"),
      lazy_source("c.js", "module.exports = 'c';"),
    ])],
    &fs,
  );

  assert!(diagnostics.is_empty());
  assert_eq!(source_paths(&output, 0), ["a.js", "b.js"]);
  assert!(output.files[0].iter().all(|file| file.imported == ImportStatus::Static));
}

#[test]
fn lazy_files_keep_declaration_order() {
  let fs = memory_fs(&[]);
  let (output, _) = scan(
    vec![app(vec![
      lazy_source("one.js", "module.exports = 1;"),
      source("two.js", "require('./three'); require('./one');"),
      lazy_source("three.js", "module.exports = 3;"),
    ])],
    &fs,
  );
  assert_eq!(source_paths(&output, 0), ["one.js", "two.js", "three.js"]);
}

#[test]
fn meteor_package_stub_is_synthesized_once() {
  let fs = memory_fs(&[]);
  let (output, _) = scan(
    vec![
      package("foo", vec![source("foo.js", "Foo = {};")]),
      app(vec![
        source("x.js", "require('meteor/foo');"),
        source("y.js", "import { Foo } from 'meteor/foo';"),
      ]),
    ],
    &fs,
  );

  let stubs = output.files[1]
    .iter()
    .filter(|file| file.install_path.as_deref() == Some("node_modules/meteor/foo.js"))
    .collect::<Vec<_>>();
  assert_eq!(stubs.len(), 1);
  assert_eq!(stubs[0].data, "module.exports = Package[\"foo\"];\n");
}

#[test]
fn node_modules_are_pulled_in_with_package_json_stubs() {
  let fs = memory_fs(&[
    ("/app/node_modules/lodash/package.json", r#"{ "name": "lodash", "main": "lodash.js" }"#),
    ("/app/node_modules/lodash/lodash.js", "#!/usr/bin/env node\nmodule.exports = {};"),
    ("/app/node_modules/lodash/unused.js", "module.exports = 0;"),
    ("/app/node_modules/data/index.json", r#"{"a":1}"#),
  ]);
  let (output, diagnostics) =
    scan(vec![app(vec![source("main.js", "require('lodash'); require('data');")])], &fs);
  assert!(diagnostics.is_empty());

  let installed = output.files[0].iter().filter_map(|file| file.install_path.as_deref()).collect::<Vec<_>>();
  assert_eq!(installed, [
    "main.js",
    "node_modules/lodash/package.json",
    "node_modules/lodash/lodash.js",
    "node_modules/data/index.json"
  ]);

  let lodash = &output.files[0][2];
  assert_eq!(lodash.data, "\nmodule.exports = {};");
  assert_eq!(output.files[0][1].data, "exports.name = \"lodash\";\nexports.main = \"lodash.js\";\n");
  assert_eq!(output.files[0][3].data, "module.exports = {\n  \"a\": 1\n};\n");
}

#[test]
fn missing_modules_are_warnings() {
  let mut core = package("core", vec![source("core.js", "try { require('optional-dep'); } catch (e) {}")]);
  core.uses_modules = true;

  let fs = memory_fs(&[]);
  let (output, diagnostics) = scan(
    vec![
      core,
      app(vec![source("main.js", "require('./nope'); require('meteor/unknown');")]),
    ],
    &fs,
  );

  let warnings = diagnostics.warnings().collect::<Vec<_>>();
  assert_eq!(warnings.len(), 1);
  assert!(matches!(
    warnings[0],
    BuildDiagnostic::MissingModule { id, arch, .. } if id == "./nope" && arch == "os"
  ));
  assert!(!diagnostics.has_errors());
  assert!(output.missing.contains_key("optional-dep"));
  assert!(output.missing.contains_key("meteor/unknown"));
}

#[test]
fn missing_ids_are_relocated_into_their_package() {
  let mut core = package("core", vec![source("core.js", "Core = {};"), lazy_source("lib.js", "module.exports = 42;")]);
  core.uses_modules = true;

  let fs = memory_fs(&[]);
  let (output, diagnostics) =
    scan(vec![core, app(vec![source("main.js", "require('meteor/core/lib.js');")])], &fs);

  assert!(diagnostics.is_empty());
  assert_eq!(source_paths(&output, 0), ["core.js", "lib.js"]);
  assert!(output.missing.is_empty());
}

#[test]
fn parse_errors_are_reported_once() {
  let fs = memory_fs(&[]);
  let (output, diagnostics) = scan(vec![app(vec![source("broken.js", "var = ;")])], &fs);

  assert_eq!(diagnostics.errors().count(), 1);
  assert!(matches!(diagnostics.errors().next(), Some(BuildDiagnostic::Parse { location, .. }) if location.file == "broken.js"));
  assert_eq!(source_paths(&output, 0), ["broken.js"]);
}

#[test]
fn cyclic_requires_terminate() {
  let fs = memory_fs(&[]);
  let (output, diagnostics) = scan(
    vec![app(vec![
      source("a.js", "require('./b');"),
      lazy_source("b.js", "require('./c');"),
      lazy_source("c.js", "require('./b'); require('./a');"),
    ])],
    &fs,
  );

  assert!(diagnostics.is_empty());
  assert_eq!(source_paths(&output, 0), ["a.js", "b.js", "c.js"]);
  assert!(output.missing.is_empty());
}

#[test]
fn packages_without_modules_are_not_scanned() {
  let fs = memory_fs(&[("/packages/legacy/node_modules/dep/index.js", "DEP_BODY = 1;")]);
  let (output, diagnostics) = scan(
    vec![
      package("legacy", vec![source("a.js", "if (Meteor.isServer) { var dep = require('dep'); }")]),
      app(vec![source("main.js", "Main = 1;")]),
    ],
    &fs,
  );

  assert!(diagnostics.is_empty());
  assert_eq!(source_paths(&output, 0), ["a.js"]);
  assert!(output.missing.is_empty());
}

#[test]
fn shadowed_require_misses_stay_silent() {
  let fs = memory_fs(&[]);
  let (output, diagnostics) = scan(
    vec![app(vec![source("main.js", "function load(require) { return require('./maybe'); }\nrequire('./gone');")])],
    &fs,
  );

  let warnings = diagnostics.warnings().collect::<Vec<_>>();
  assert_eq!(warnings.len(), 1);
  assert!(matches!(warnings[0], BuildDiagnostic::MissingModule { id, .. } if id == "./gone"));
  assert!(output.missing["./maybe"][0].possibly_spurious);
  assert!(!output.missing["./gone"][0].possibly_spurious);
}

#[test]
fn dynamic_imports_only_count_in_the_browser() {
  let units = || {
    vec![app(vec![
      source("main.js", "import('./later'); import('./absent');"),
      lazy_source("later.js", "require('./helper');"),
      lazy_source("helper.js", "module.exports = 1;"),
    ])]
  };
  let fs = memory_fs(&[]);

  let (browser, _) = scan_for("web.browser", units(), &fs);
  assert_eq!(source_paths(&browser, 0), ["main.js", "later.js", "helper.js"]);
  let statuses = browser.files[0].iter().map(|file| file.imported).collect::<Vec<_>>();
  assert_eq!(statuses, [ImportStatus::Static, ImportStatus::Dynamic, ImportStatus::Dynamic]);
  let absent = &browser.missing["./absent"][0];
  assert!(absent.dynamic && !absent.parent_was_dynamic);
  assert_eq!(absent.bundle_arch.as_str(), "web.browser");

  let (server, _) = scan_for("os", units(), &fs);
  assert!(server.files[0].iter().all(|file| file.imported == ImportStatus::Static));
}

#[test]
fn static_import_promotes_a_dynamic_file() {
  let fs = memory_fs(&[]);
  let (output, _) = scan_for(
    "web.browser",
    vec![app(vec![
      source("a.js", "import('./shared');"),
      source("b.js", "require('./shared');"),
      lazy_source("shared.js", "require('./dep');"),
      lazy_source("dep.js", "module.exports = 1;"),
    ])],
    &fs,
  );

  let statuses = output.files[0].iter().map(|file| (file.source_path.as_str(), file.imported)).collect::<Vec<_>>();
  assert_eq!(statuses, [
    ("a.js", ImportStatus::Static),
    ("b.js", ImportStatus::Static),
    ("shared.js", ImportStatus::Static),
    ("dep.js", ImportStatus::Static),
  ]);
}
