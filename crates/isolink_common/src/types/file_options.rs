use serde::{Deserialize, Serialize};

/// Per-file options declared alongside a resource. Unknown keys are kept for plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOptions {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lazy: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub bare: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub main_module: Option<bool>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}
