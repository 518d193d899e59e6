use std::sync::Arc;

use isolink_common::FileOptions;

/// A source map as a compiler hands it over.
#[derive(Debug, Clone)]
pub enum SourceMapInput {
  Json(String),
  Object(serde_json::Value),
}

impl SourceMapInput {
  pub fn into_json_string(self) -> String {
    match self {
      Self::Json(json) => json,
      Self::Object(value) => value.to_string(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct AddJavaScriptOptions {
  /// Defaults to the input file's path.
  pub path: Option<String>,
  pub data: String,
  pub source_map: Option<SourceMapInput>,
  pub hash: Option<String>,
  pub lazy: Option<bool>,
  pub bare: Option<bool>,
  pub main_module: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct AddStylesheetOptions {
  pub path: Option<String>,
  pub data: String,
  pub source_map: Option<SourceMapInput>,
  pub hash: Option<String>,
  pub lazy: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct AddAssetOptions {
  pub path: String,
  pub data: Arc<[u8]>,
  pub hash: Option<String>,
  pub file_options: FileOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlSection {
  Head,
  Body,
}

impl HtmlSection {
  pub fn parse(section: &str) -> Option<Self> {
    match section {
      "head" => Some(Self::Head),
      "body" => Some(Self::Body),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct AddHtmlOptions {
  /// `head` or `body`.
  pub section: String,
  pub data: String,
}
