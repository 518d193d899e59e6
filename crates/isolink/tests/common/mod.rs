#![allow(dead_code)]

use std::{borrow::Cow, path::PathBuf, sync::Arc};

use isolink::{
  AddJavaScriptOptions, BundleOutput, Bundler, BundlerOptions, CompilerOrchestrator,
  CompilerPlugin, CompilerRegistry, Dependency, Diagnostics, FileOptions, InputFile,
  InputResource, PackageExport, PackageUnit, ScanOutput, normalize_options, scan_batches,
};
use isolink_fs::{MemoryFileSystem, SharedFileSystem};

pub fn memory_fs(files: &[(&str, &str)]) -> SharedFileSystem {
  Arc::new(MemoryFileSystem::new(files))
}

pub fn source(path: &str, data: &str) -> InputResource {
  InputResource::source(path, data)
}

pub fn lazy_source(path: &str, data: &str) -> InputResource {
  InputResource::source(path, data)
    .with_file_options(FileOptions { lazy: Some(true), ..FileOptions::default() })
}

pub fn app(resources: Vec<InputResource>) -> PackageUnit {
  PackageUnit {
    resources,
    source_root: PathBuf::from("/app"),
    uses_modules: true,
    ..PackageUnit::default()
  }
}

pub fn package(name: &str, resources: Vec<InputResource>) -> PackageUnit {
  PackageUnit {
    name: Some(name.into()),
    resources,
    source_root: PathBuf::from("/packages").join(name),
    ..PackageUnit::default()
  }
}

pub fn depends_on(package: &str, exports: &[&str]) -> Dependency {
  Dependency::new(package, exports.iter().map(|name| PackageExport::new(*name)).collect())
}

pub fn options(arch: &str) -> BundlerOptions {
  BundlerOptions {
    arch: Some(arch.to_string()),
    source_root: Some(PathBuf::from("/app")),
    ..BundlerOptions::default()
  }
}

pub fn build(units: Vec<PackageUnit>, registry: CompilerRegistry, fs: SharedFileSystem) -> BundleOutput {
  Bundler::new(options("os"), registry, fs).build(units).expect("build failed")
}

/// Runs the compile and scan stages only.
pub fn scan(units: Vec<PackageUnit>, fs: &SharedFileSystem) -> (ScanOutput, Diagnostics) {
  scan_for("os", units, fs)
}

pub fn scan_for(arch: &str, units: Vec<PackageUnit>, fs: &SharedFileSystem) -> (ScanOutput, Diagnostics) {
  let options = Arc::new(normalize_options(options(arch)));
  let registry = CompilerRegistry::default();
  let mut diagnostics = Diagnostics::default();
  let batches = CompilerOrchestrator::new(&registry, &options)
    .run(units, &mut diagnostics)
    .expect("compile failed");
  let output = scan_batches(&batches, fs, &options, &mut diagnostics).expect("scan failed");
  (output, diagnostics)
}

pub fn source_paths(output: &ScanOutput, batch: usize) -> Vec<&str> {
  output.files[batch].iter().map(|file| file.source_path.as_str()).collect()
}

/// Emits each file's contents upper-cased as JavaScript.
pub struct UpperCaseCompiler;

impl CompilerPlugin for UpperCaseCompiler {
  fn name(&self) -> Cow<'static, str> {
    "upper-case".into()
  }

  fn process_files_for_target(&self, input_files: &mut [&mut dyn InputFile]) -> anyhow::Result<()> {
    for file in input_files.iter_mut() {
      let data = file.contents_as_string()?.to_uppercase();
      file.add_javascript(AddJavaScriptOptions { data, ..AddJavaScriptOptions::default() })?;
    }
    Ok(())
  }
}
