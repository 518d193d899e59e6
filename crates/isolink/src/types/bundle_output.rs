use arcstr::ArcStr;
use isolink_common::{Resource, ResourceType};
use isolink_error::BuildDiagnostic;

#[derive(Debug, Clone)]
pub struct PackageBundle {
  /// `None` for the app.
  pub name: Option<ArcStr>,
  /// Non-JS resources in declaration order, followed by the linked JS.
  pub resources: Vec<Resource>,
}

#[derive(Debug)]
pub struct BundleOutput {
  /// Declarations of the symbols the app imports from packages.
  pub global_imports: Vec<Resource>,
  /// In the order the packages were handed to the build.
  pub packages: Vec<PackageBundle>,
  pub diagnostics: Vec<BuildDiagnostic>,
}

impl BundleOutput {
  /// Load order: global imports, then every package's resources.
  pub fn resources(&self) -> impl Iterator<Item = &Resource> {
    self.global_imports.iter().chain(self.packages.iter().flat_map(|package| package.resources.iter()))
  }

  /// Every linked JS file joined in load order.
  pub fn js_code(&self) -> String {
    self
      .resources()
      .filter(|resource| resource.r#type == ResourceType::Js)
      .filter_map(Resource::data_as_str)
      .collect()
  }
}
