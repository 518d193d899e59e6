use std::{
  path::{Path, PathBuf},
  sync::{Arc, LazyLock},
};

use arcstr::ArcStr;
use isolink_common::{Arch, PackageJson};
use isolink_ecmascript::{EcmaCompiler, ImportedModule};
use isolink_error::{BuildDiagnostic, BuildResult, Diagnostics, SourceLocation};
use isolink_fs::SharedFileSystem;
use isolink_resolver::{Resolver, ResolverOptions};
use isolink_sourcemap::{CombinedSource, SourceMap};
use isolink_utils::{
  concat_string, ecmascript::to_js_string_literal, indexmap::FxIndexMap, path_ext::PathExt,
  xxhash::HexHasher, xxhash::xxhash_hex,
};
use oxc_index::IndexVec;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use sugar_path::SugarPath;
use tracing::debug;

use crate::{
  scan_stage::install_path::InstallPathRules,
  types::{
    js_output::JsOutput,
    scanned_file::{ImportStatus, ScannedFile, ScannedFileIdx, static_deps},
  },
};

static HASHBANG_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^#![^\n]*").expect("Invalid hashbang regex"));

/// Where an unresolvable module id was requested from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingImport {
  pub parent_path: String,
  /// `None` when requested by the app.
  pub package_name: Option<ArcStr>,
  pub bundle_arch: Arch,
  /// The request came from a shadowed `require`, so the id may never be needed.
  pub possibly_spurious: bool,
  /// Requested through `import()`.
  pub dynamic: bool,
  /// The requesting file was itself only reached dynamically.
  pub parent_was_dynamic: bool,
}

impl MissingImport {
  fn imported_module(&self) -> ImportedModule {
    ImportedModule { dynamic: self.dynamic, possibly_spurious: self.possibly_spurious }
  }

  fn is_dynamic(&self) -> bool {
    self.dynamic || self.parent_was_dynamic
  }
}

/// `Static` as soon as one requester was reached statically.
fn parent_status(imports: &[MissingImport]) -> ImportStatus {
  ImportStatus::new(imports.iter().all(|import| import.parent_was_dynamic))
}

pub type MissingModules = FxIndexMap<String, Vec<MissingImport>>;

pub struct ImportScannerOptions {
  pub name: Option<ArcStr>,
  pub arch: Arch,
  pub source_root: PathBuf,
  pub node_modules_paths: Vec<PathBuf>,
  pub extensions: Vec<String>,
  /// Package names that `meteor/<name>` may refer to.
  pub known_packages: Arc<FxHashSet<ArcStr>>,
  pub uses_modules: bool,
}

/// Resolves the imports of one batch's JS outputs, pulling in lazy files and node_modules
/// files as they are reached.
pub struct ImportScanner {
  name: Option<ArcStr>,
  arch: Arch,
  source_root: PathBuf,
  node_modules_paths: Vec<PathBuf>,
  known_packages: Arc<FxHashSet<ArcStr>>,
  uses_modules: bool,
  fs: SharedFileSystem,
  resolver: Resolver,
  output_files: IndexVec<ScannedFileIdx, ScannedFile>,
  /// Keys are lowercased absolute paths.
  abs_path_to_output_index: FxHashMap<String, ScannedFileIdx>,
  meteor_package_stubs: FxHashMap<ArcStr, ScannedFileIdx>,
  all_missing: MissingModules,
}

impl ImportScanner {
  pub fn new(options: ImportScannerOptions, fs: SharedFileSystem) -> Self {
    let resolver = Resolver::new(Arc::clone(&fs), ResolverOptions {
      source_root: options.source_root.clone(),
      node_modules_paths: options.node_modules_paths.clone(),
      extensions: options.extensions,
      browser: options.arch.is_web(),
    });
    Self {
      name: options.name,
      arch: options.arch,
      source_root: options.source_root,
      node_modules_paths: options.node_modules_paths,
      known_packages: options.known_packages,
      uses_modules: options.uses_modules,
      fs,
      resolver,
      output_files: IndexVec::new(),
      abs_path_to_output_index: FxHashMap::default(),
      meteor_package_stubs: FxHashMap::default(),
      all_missing: FxIndexMap::default(),
    }
  }

  pub fn name(&self) -> Option<&ArcStr> {
    self.name.as_ref()
  }

  /// Packages outside the module system keep their files as declared and never pull in
  /// dependencies.
  pub fn resolves_imports(&self) -> bool {
    self.name.is_none() || self.uses_modules
  }

  pub fn output_files(&self) -> &IndexVec<ScannedFileIdx, ScannedFile> {
    &self.output_files
  }

  /// Every id this scanner failed to resolve so far.
  pub fn missing(&self) -> &MissingModules {
    &self.all_missing
  }

  /// The main module's path relative to the source root, `./`-prefixed.
  pub fn main_module_id(&self) -> Option<String> {
    self.output_files.iter().find(|file| file.main_module).map(|file| {
      concat_string!("./", file.source_path.trim_start_matches('/'))
    })
  }

  fn install_path(&self, abs_path: &Path) -> Option<String> {
    InstallPathRules {
      package_name: self.name.as_deref(),
      arch: &self.arch,
      source_root: &self.source_root,
      node_modules_paths: &self.node_modules_paths,
    }
    .install_path(abs_path)
  }

  fn index_of(&self, abs_path: &Path) -> Option<ScannedFileIdx> {
    self.abs_path_to_output_index.get(&path_key(abs_path)).copied()
  }

  pub fn add_input_files(&mut self, files: impl IntoIterator<Item = JsOutput>) -> BuildResult<()> {
    for file in files {
      let source_path = file.source_path.trim_start_matches('/').to_string();
      let target_path = file
        .target_path
        .as_deref()
        .map(|path| path.trim_start_matches('/').to_string())
        .filter(|path| *path != source_path);
      let abs_path = self.source_root.join(target_path.as_deref().unwrap_or(&source_path)).normalize();
      let data = strip_hashbang(strip_bom(&file.data)).to_string();

      let scanned = ScannedFile {
        install_path: self.install_path(&abs_path),
        source_path: source_path.clone(),
        abs_path: abs_path.clone(),
        data,
        hash: file.hash,
        source_map: file.source_map,
        lazy: file.lazy,
        imported: ImportStatus::NotImported,
        bare: file.bare,
        main_module: file.main_module,
        implicit: file.implicit,
        deps: None,
        pending_errors: file.pending_errors,
      };
      let lazy = scanned.lazy;
      self.add_file(scanned)?;

      if target_path.is_some() {
        self.add_target_alias(&source_path, &abs_path, lazy)?;
      }
    }
    Ok(())
  }

  /// Installs a module at the source path that re-exports the file installed at its target path.
  fn add_target_alias(&mut self, source_path: &str, target_abs_path: &Path, lazy: bool) -> BuildResult<()> {
    let abs_path = self.source_root.join(source_path).normalize();
    if self.index_of(&abs_path).is_some() {
      return Ok(());
    }
    let dir = abs_path.parent().unwrap_or(&self.source_root);
    let relative = target_abs_path.relative(dir).expect_to_slash();
    let relative = if relative.starts_with("../") { relative } else { concat_string!("./", relative) };
    let data = concat_string!("module.exports = require(", to_js_string_literal(&relative), ");\n");

    self.add_file(ScannedFile {
      install_path: self.install_path(&abs_path),
      source_path: source_path.to_string(),
      abs_path,
      hash: xxhash_hex(data.as_bytes()),
      data,
      source_map: None,
      lazy,
      imported: ImportStatus::NotImported,
      bare: false,
      main_module: false,
      implicit: false,
      deps: Some(static_deps([relative.as_str()])),
      pending_errors: Vec::new(),
    })?;
    Ok(())
  }

  /// Adds `file`, or merges it into an existing file at the same absolute path.
  fn add_file(&mut self, file: ScannedFile) -> BuildResult<ScannedFileIdx> {
    let key = path_key(&file.abs_path);
    let Some(&idx) = self.abs_path_to_output_index.get(&key) else {
      let idx = self.output_files.push(file);
      self.abs_path_to_output_index.insert(key, idx);
      return Ok(idx);
    };

    let existing = &mut self.output_files[idx];
    if file.implicit {
      return Ok(idx);
    }
    if existing.implicit {
      *existing = file;
      return Ok(idx);
    }
    if existing.lazy != file.lazy || existing.bare != file.bare {
      return Err(
        anyhow::anyhow!(
          "Attempting to combine different files: {} ({}) and {} ({})",
          existing.source_path,
          describe_flags(existing),
          file.source_path,
          describe_flags(&file)
        )
        .into(),
      );
    }
    combine_files(existing, file);
    Ok(idx)
  }

  /// Scans every eager file, transitively pulling in what they import.
  pub fn scan_imports(&mut self, diagnostics: &mut Diagnostics) -> BuildResult<()> {
    let seeds = self.output_files.indices().collect::<Vec<_>>();
    for idx in seeds {
      if !self.output_files[idx].lazy {
        self.scan_file(idx, false, diagnostics)?;
      }
    }
    Ok(())
  }

  /// A file already reached statically, or dynamically when `for_dynamic_import`, is not
  /// scanned again.
  fn scan_file(
    &mut self,
    idx: ScannedFileIdx,
    for_dynamic_import: bool,
    diagnostics: &mut Diagnostics,
  ) -> BuildResult<()> {
    let status = ImportStatus::new(for_dynamic_import);
    let file = &mut self.output_files[idx];
    if file.imported >= status {
      return Ok(());
    }
    file.imported = status;
    diagnostics.extend(file.pending_errors.drain(..));

    if file.deps.is_none() {
      let deps = match EcmaCompiler::parse(file.data.as_str()) {
        Ok(ast) => ast.imported_modules(),
        Err(err) => {
          diagnostics.push(BuildDiagnostic::Parse {
            message: err.message,
            location: SourceLocation { file: file.source_path.clone(), line: err.line, column: err.column },
          });
          FxIndexMap::default()
        }
      };
      file.deps = Some(deps);
    }
    let deps = file.deps.clone().unwrap_or_default();

    let parent_path = file.abs_path.clone();
    for (id, info) in &deps {
      self.scan_dependency(id, *info, &parent_path, for_dynamic_import, diagnostics)?;
    }
    Ok(())
  }

  fn scan_dependency(
    &mut self,
    id: &str,
    info: ImportedModule,
    parent_path: &Path,
    parent_was_dynamic: bool,
    diagnostics: &mut Diagnostics,
  ) -> BuildResult<()> {
    // Modules are only fetched on demand in the browser.
    let dynamic = self.arch.matches("web.browser") && (parent_was_dynamic || info.dynamic);

    if let Some(package) = meteor_package_id(id) {
      if self.known_packages.contains(package) {
        self.add_meteor_package_stub(package, dynamic)?;
        return Ok(());
      }
    }

    let resolution = {
      let index = &self.abs_path_to_output_index;
      self.resolver.resolve(id, parent_path, &|path: &Path| index.contains_key(&path_key(path)))
    };
    let Some(resolution) = resolution else {
      self.all_missing.entry(id.to_string()).or_default().push(MissingImport {
        parent_path: parent_path.display().to_string(),
        package_name: self.name.clone(),
        bundle_arch: self.arch.clone(),
        possibly_spurious: info.possibly_spurious,
        dynamic: info.dynamic,
        parent_was_dynamic,
      });
      return Ok(());
    };

    for package_json in &resolution.package_jsons {
      self.add_package_json_stub(package_json, dynamic)?;
    }

    if let Some(idx) = self.index_of(&resolution.path) {
      return self.scan_file(idx, dynamic, diagnostics);
    }

    let Some(file) = self.read_module(&resolution.path) else { return Ok(()) };
    if file.install_path.is_none() {
      return Ok(());
    }
    let idx = self.add_file(file)?;
    self.scan_file(idx, dynamic, diagnostics)
  }

  /// A lazy file discovered on disk during scanning.
  fn read_module(&self, abs_path: &Path) -> Option<ScannedFile> {
    let bytes = self.fs.read(abs_path).ok()?;
    let text = simdutf8::basic::from_utf8(&bytes).ok()?;
    let text = strip_bom(text);

    let data = match abs_path.extension().and_then(|ext| ext.to_str()) {
      Some("json") => {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        let pretty = serde_json::to_string_pretty(&value).ok()?;
        concat_string!("module.exports = ", pretty, ";\n")
      }
      Some("js") => strip_hashbang(text).to_string(),
      _ => {
        let text = strip_hashbang(text);
        EcmaCompiler::parse(text).ok()?;
        text.to_string()
      }
    };

    let source_path = abs_path
      .strip_prefix(&self.source_root)
      .map_or_else(|_| abs_path.expect_to_slash(), PathExt::expect_to_slash);

    Some(ScannedFile {
      install_path: self.install_path(abs_path),
      source_path,
      abs_path: abs_path.to_path_buf(),
      hash: xxhash_hex(data.as_bytes()),
      data,
      source_map: None,
      lazy: true,
      imported: ImportStatus::NotImported,
      bare: false,
      main_module: false,
      implicit: false,
      deps: None,
      pending_errors: Vec::new(),
    })
  }

  fn add_package_json_stub(&mut self, package_json: &PackageJson, dynamic: bool) -> BuildResult<()> {
    let status = ImportStatus::new(dynamic);
    if let Some(idx) = self.index_of(&package_json.path) {
      let file = &mut self.output_files[idx];
      file.imported = file.imported.max(status);
      return Ok(());
    }
    let Some(install_path) = self.install_path(&package_json.path) else { return Ok(()) };
    let data = package_json.to_stub_module();
    self.add_file(ScannedFile {
      install_path: Some(install_path),
      source_path: package_json
        .path
        .strip_prefix(&self.source_root)
        .map_or_else(|_| package_json.path.expect_to_slash(), PathExt::expect_to_slash),
      abs_path: package_json.path.clone(),
      hash: xxhash_hex(data.as_bytes()),
      data,
      source_map: None,
      lazy: true,
      imported: status,
      bare: false,
      main_module: false,
      implicit: false,
      deps: Some(FxIndexMap::default()),
      pending_errors: Vec::new(),
    })?;
    Ok(())
  }

  /// `require("meteor/<name>")` becomes a one-line module returning `Package["<name>"]`,
  /// synthesized once per package name.
  fn add_meteor_package_stub(&mut self, package: &str, dynamic: bool) -> BuildResult<()> {
    let status = ImportStatus::new(dynamic);
    if let Some(&idx) = self.meteor_package_stubs.get(package) {
      let file = &mut self.output_files[idx];
      file.imported = file.imported.max(status);
      return Ok(());
    }
    debug!("synthesizing stub module for meteor/{package}");

    let install_path = concat_string!("node_modules/meteor/", package, ".js");
    let data = concat_string!("module.exports = Package[", to_js_string_literal(package), "];\n");
    let idx = self.add_file(ScannedFile {
      abs_path: self.source_root.join(&install_path),
      source_path: install_path.clone(),
      install_path: Some(install_path),
      hash: xxhash_hex(data.as_bytes()),
      data,
      source_map: None,
      lazy: true,
      imported: status,
      bare: false,
      main_module: false,
      implicit: false,
      deps: Some(FxIndexMap::default()),
      pending_errors: Vec::new(),
    })?;
    self.meteor_package_stubs.insert(ArcStr::from(package), idx);
    Ok(())
  }

  /// Retries ids that another scanner could not resolve, as if required from a file at this
  /// scanner's source root. Each id is retried at most once statically and once dynamically.
  /// Returns the ids that now resolve and the ids that went missing while scanning the files they
  /// pulled in. Ids this scanner already missed are only reported again when they are now
  /// requested with a higher status.
  pub fn scan_missing_modules(
    &mut self,
    missing: &MissingModules,
    diagnostics: &mut Diagnostics,
  ) -> BuildResult<(Vec<String>, MissingModules)> {
    let previous = std::mem::take(&mut self.all_missing);
    let fake_parent = self.source_root.join("fake.js");
    for (id, imports) in missing {
      if let Some(import) = imports.iter().find(|import| !import.is_dynamic()) {
        self.scan_dependency(id, import.imported_module(), &fake_parent, false, diagnostics)?;
      }
      if let Some(import) = imports.iter().find(|import| import.is_dynamic()) {
        self.scan_dependency(id, import.imported_module(), &fake_parent, true, diagnostics)?;
      }
    }
    let mut newly_missing = std::mem::replace(&mut self.all_missing, previous);

    let newly_added = missing.keys().filter(|id| !newly_missing.contains_key(*id)).cloned().collect();
    newly_missing.retain(|id, imports| {
      self
        .all_missing
        .get(id)
        .is_none_or(|previous| parent_status(imports) > parent_status(previous))
    });
    merge_missing(&mut self.all_missing, &newly_missing);
    Ok((newly_added, newly_missing))
  }

  /// Files that made it into the bundle, in the order they were added.
  pub fn get_output_files(&mut self, diagnostics: &mut Diagnostics) -> Vec<ScannedFile> {
    self
      .output_files
      .iter_mut()
      .filter(|file| file.is_included())
      .map(|file| {
        diagnostics.extend(file.pending_errors.drain(..));
        file.clone()
      })
      .collect()
  }
}

pub fn merge_missing(into: &mut MissingModules, from: &MissingModules) {
  for (id, imports) in from {
    into.entry(id.clone()).or_default().extend(imports.iter().cloned());
  }
}

/// `meteor/<name>` with nothing after the package name.
pub fn meteor_package_id(id: &str) -> Option<&str> {
  id.strip_prefix("meteor/").filter(|name| !name.is_empty() && !name.contains('/'))
}

fn path_key(path: &Path) -> String {
  path.to_string_lossy().to_lowercase()
}

fn strip_bom(text: &str) -> &str {
  text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Blanks a leading `#!` line, keeping line numbers intact.
fn strip_hashbang(text: &str) -> &str {
  match HASHBANG_RE.find(text) {
    Some(found) => &text[found.end()..],
    None => text,
  }
}

fn describe_flags(file: &ScannedFile) -> String {
  format!("lazy: {}, bare: {}", file.lazy, file.bare)
}

fn combine_files(existing: &mut ScannedFile, file: ScannedFile) {
  if existing.source_map.is_none() && file.source_map.is_none() {
    existing.data = concat_string!(existing.data, "\n\n", file.data);
  } else {
    let parse = |map: Option<&ArcStr>| map.and_then(|map| SourceMap::from_json_string(map).ok());
    let mut combined = CombinedSource::default();
    combined.add_code_with_map(&existing.source_path, &existing.data, parse(existing.source_map.as_ref()));
    combined.add_empty_lines(1);
    combined.add_code_with_map(&file.source_path, &file.data, parse(file.source_map.as_ref()));
    let (code, map) = combined.into_code_and_map();
    existing.data = code;
    existing.source_map = map.map(|map| map.to_json_string().into());
  }
  existing.hash = HexHasher::default().update(&existing.hash).update(&file.hash).finish();
  existing.imported = existing.imported.max(file.imported);
  existing.main_module |= file.main_module;
  existing.pending_errors.extend(file.pending_errors);
}

#[test]
fn test_strip_hashbang_and_bom() {
  assert_eq!(strip_hashbang("#!/usr/bin/env node\nrun();"), "\nrun();");
  assert_eq!(strip_bom("\u{feff}x"), "x");
  assert_eq!(meteor_package_id("meteor/core"), Some("core"));
  assert_eq!(meteor_package_id("meteor/core/lib.js"), None);
}
