use std::path::PathBuf;

use arcstr::ArcStr;

use crate::InputResource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageExport {
  pub name: String,
  pub test_only: bool,
}

impl PackageExport {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), test_only: false }
  }
}

#[derive(Debug, Clone)]
pub struct Dependency {
  pub package: ArcStr,
  pub exports: Vec<PackageExport>,
  /// May load after the dependent, so its symbols are not imported.
  pub unordered: bool,
  pub weak: bool,
  pub test_only: bool,
}

impl Dependency {
  pub fn new(package: impl Into<ArcStr>, exports: Vec<PackageExport>) -> Self {
    Self { package: package.into(), exports, unordered: false, weak: false, test_only: false }
  }
}

/// One package (or the app, when `name` is `None`) as handed over by the surrounding build tool.
#[derive(Debug, Clone, Default)]
pub struct PackageUnit {
  pub name: Option<ArcStr>,
  /// Declaration order, which is also execution order.
  pub resources: Vec<InputResource>,
  pub dependencies: Vec<Dependency>,
  pub declared_exports: Vec<PackageExport>,
  pub source_root: PathBuf,
  pub node_modules_paths: Vec<PathBuf>,
  /// Whether this unit installs its files with the module system.
  pub uses_modules: bool,
  pub is_test: bool,
}

impl PackageUnit {
  pub fn is_app(&self) -> bool {
    self.name.is_none()
  }

  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or("the app")
  }
}
