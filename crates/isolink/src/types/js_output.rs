use arcstr::ArcStr;
use isolink_error::BuildDiagnostic;

/// JavaScript emitted for one input file, before import scanning.
#[derive(Debug, Clone)]
pub struct JsOutput {
  /// Path of the input file in its package.
  pub source_path: String,
  /// Path the compiler asked for, when it differs from `source_path`.
  pub target_path: Option<String>,
  pub data: String,
  pub hash: String,
  pub source_map: Option<ArcStr>,
  pub lazy: bool,
  pub bare: bool,
  pub main_module: bool,
  /// Placeholder that a real `add_javascript` for the same path replaces.
  pub implicit: bool,
  /// Errors reported on a lazy file, surfaced only if the file ends up imported.
  pub pending_errors: Vec<BuildDiagnostic>,
}

impl JsOutput {
  pub fn path(&self) -> &str {
    self.target_path.as_deref().unwrap_or(&self.source_path)
  }
}
