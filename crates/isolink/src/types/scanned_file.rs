use std::path::PathBuf;

use arcstr::ArcStr;
use isolink_ecmascript::ImportedModule;
use isolink_error::BuildDiagnostic;
use isolink_utils::{concat_string, indexmap::FxIndexMap};
use serde::Serialize;

oxc_index::define_index_type! {
  pub struct ScannedFileIdx = u32;
}

/// How a file was reached. A file is only ever promoted, `Static` wins over `Dynamic`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportStatus {
  #[default]
  NotImported,
  /// Only reached through `import()` on a browser arch.
  Dynamic,
  Static,
}

impl ImportStatus {
  pub fn new(dynamic: bool) -> Self {
    if dynamic { Self::Dynamic } else { Self::Static }
  }

  pub fn is_imported(self) -> bool {
    self != Self::NotImported
  }
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
  pub source_path: String,
  pub abs_path: PathBuf,
  pub data: String,
  pub hash: String,
  pub source_map: Option<ArcStr>,
  /// `false` means the file is always included.
  pub lazy: bool,
  /// Reachability from an eager file, independent of `lazy`.
  pub imported: ImportStatus,
  pub bare: bool,
  pub main_module: bool,
  pub implicit: bool,
  /// `None` keeps the file out of the bundle.
  pub install_path: Option<String>,
  /// Module ids the file requests, filled in when the file is first scanned.
  pub deps: Option<FxIndexMap<String, ImportedModule>>,
  pub pending_errors: Vec<BuildDiagnostic>,
}

impl ScannedFile {
  pub fn is_included(&self) -> bool {
    self.install_path.is_some() && (!self.lazy || self.imported.is_imported())
  }

  pub fn abs_module_id(&self) -> Option<String> {
    self.install_path.as_ref().map(|install_path| concat_string!("/", install_path))
  }

  pub fn dep_ids(&self) -> Option<impl Iterator<Item = &str>> {
    self.deps.as_ref().map(|deps| deps.keys().map(String::as_str))
  }
}

/// Dependencies of a synthesized module: plain static requests.
pub fn static_deps<'a>(ids: impl IntoIterator<Item = &'a str>) -> FxIndexMap<String, ImportedModule> {
  ids.into_iter().map(|id| (id.to_string(), ImportedModule::default())).collect()
}
