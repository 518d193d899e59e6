use std::{path::PathBuf, sync::Arc};

use arcstr::ArcStr;
use isolink_common::{Arch, NormalizedBundlerOptions, PackageExport, PackageUnit, Resource, ResourceType};
use isolink_error::{BuildDiagnostic, Diagnostics};
use isolink_plugin::{CompilerRegistry, file_extension};
use isolink_utils::indexmap::{FxIndexMap, FxIndexSet};

use crate::{
  compiler::resource_slot::{ResourceSlot, SlotContext},
  link_stage::{InstallOptions, Linker, LinkerOptions},
  types::{js_output::JsOutput, scanned_file::ScannedFile},
  utils::serve_path::combined_serve_path,
};

/// One package's (or the app's) slots, in declaration order.
pub struct SourceBatch {
  pub name: Option<ArcStr>,
  pub arch: Arch,
  pub source_root: PathBuf,
  pub node_modules_paths: Vec<PathBuf>,
  pub uses_modules: bool,
  pub declared_exports: Vec<PackageExport>,
  pub slots: Vec<ResourceSlot>,
  /// Symbol to the package it is imported from. Later dependencies win.
  pub imported_symbol_to_package_name: FxIndexMap<String, ArcStr>,
  /// `.js` and `.json`, then every extension a compiler of this batch handles.
  pub import_extensions: Vec<String>,
}

impl SourceBatch {
  pub fn new(
    mut unit: PackageUnit,
    options: &NormalizedBundlerOptions,
    registry: &CompilerRegistry,
    diagnostics: &mut Diagnostics,
  ) -> Self {
    let context = Arc::new(SlotContext {
      package_name: unit.name.clone(),
      arch: options.arch.clone(),
      uses_modules: unit.uses_modules,
      declared_exports: unit.declared_exports.clone(),
    });

    let mut import_extensions: FxIndexSet<String> =
      [".js", ".json"].into_iter().map(String::from).collect();

    let mut slots = Vec::with_capacity(unit.resources.len());
    for resource in std::mem::take(&mut unit.resources) {
      let compiler = match resource.r#type {
        ResourceType::Source => registry.lookup(&resource.path),
        _ => None,
      };

      if let Some(matched) = &compiler {
        for ext in registry.extensions(matched.idx) {
          import_extensions.insert(format!(".{ext}"));
        }
      } else if resource.r#type == ResourceType::Source
        && file_extension(&resource.path) != Some("js")
      {
        diagnostics.push(BuildDiagnostic::UnresolvablePlugin {
          path: resource.path.clone(),
          package: unit.display_name().to_string(),
          extension: file_extension(&resource.path).unwrap_or_default().to_string(),
        });
        continue;
      }

      slots.push(ResourceSlot::new(resource, compiler, Arc::clone(&context)));
    }

    let imported_symbol_to_package_name = imported_symbols(&unit);

    Self {
      name: unit.name,
      arch: options.arch.clone(),
      source_root: if unit.source_root.as_os_str().is_empty() {
        options.source_root.clone()
      } else {
        unit.source_root
      },
      node_modules_paths: unit.node_modules_paths,
      uses_modules: unit.uses_modules,
      declared_exports: unit.declared_exports,
      slots,
      imported_symbol_to_package_name,
      import_extensions: import_extensions.into_iter().collect(),
    }
  }

  pub fn is_app(&self) -> bool {
    self.name.is_none()
  }

  pub fn js_outputs(&self) -> impl Iterator<Item = &JsOutput> {
    self.slots.iter().flat_map(|slot| slot.js_outputs.iter())
  }

  pub fn non_js_resources(&self) -> impl Iterator<Item = &Resource> {
    self.slots.iter().flat_map(|slot| slot.output_resources.iter())
  }

  pub fn linker_options(&self, options: &NormalizedBundlerOptions) -> LinkerOptions {
    LinkerOptions {
      name: self.name.as_ref().map(ToString::to_string),
      arch: self.arch.to_string(),
      use_global_namespace: self.is_app(),
      install_options: self
        .uses_modules
        .then(|| InstallOptions { extensions: self.import_extensions.clone() }),
      imports: self
        .imported_symbol_to_package_name
        .iter()
        .map(|(symbol, package)| (symbol.clone(), package.to_string()))
        .collect(),
      declared_exports: self.declared_exports.iter().map(|export| export.name.clone()).collect(),
      combined_serve_path: combined_serve_path(self.name.as_deref()),
      include_source_map_instructions: options.include_source_map_instructions,
    }
  }

  /// Non-JS resources followed by the linked JS for `js_files`.
  pub fn get_resources(
    &self,
    js_files: &[ScannedFile],
    linker: &Linker,
    options: &NormalizedBundlerOptions,
    diagnostics: &mut Diagnostics,
  ) -> Vec<Resource> {
    let mut resources = self.non_js_resources().cloned().collect::<Vec<_>>();
    resources.extend(linker.link(js_files, &self.linker_options(options), diagnostics));
    resources
  }
}

/// Unordered and weak dependencies may not have loaded yet, so nothing is imported from them.
fn imported_symbols(unit: &PackageUnit) -> FxIndexMap<String, ArcStr> {
  let mut symbols = FxIndexMap::default();
  for dependency in &unit.dependencies {
    if dependency.unordered || dependency.weak || (dependency.test_only && !unit.is_test) {
      continue;
    }
    for export in &dependency.exports {
      if !export.test_only || unit.is_test {
        symbols.insert(export.name.clone(), dependency.package.clone());
      }
    }
  }
  symbols
}

#[test]
fn test_imported_symbols() {
  use isolink_common::Dependency;

  let mut weak = Dependency::new("weak", vec![PackageExport::new("W")]);
  weak.weak = true;
  let mut unordered = Dependency::new("unordered", vec![PackageExport::new("U")]);
  unordered.unordered = true;
  let testing = vec![PackageExport::new("X"), PackageExport { name: "T".to_string(), test_only: true }];

  let mut unit = PackageUnit {
    dependencies: vec![
      Dependency::new("first", vec![PackageExport::new("X"), PackageExport::new("Y")]),
      weak,
      unordered,
      Dependency::new("second", testing),
    ],
    ..PackageUnit::default()
  };

  let symbols = imported_symbols(&unit);
  assert_eq!(
    symbols.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<Vec<_>>(),
    [("X", "second"), ("Y", "first")]
  );

  unit.is_test = true;
  assert_eq!(imported_symbols(&unit).get("T").map(ArcStr::as_str), Some("second"));
}
