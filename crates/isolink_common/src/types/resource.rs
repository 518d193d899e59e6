use std::sync::Arc;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
  Source,
  Js,
  Css,
  Asset,
  Head,
  Body,
}

impl ResourceType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Source => "source",
      Self::Js => "js",
      Self::Css => "css",
      Self::Asset => "asset",
      Self::Head => "head",
      Self::Body => "body",
    }
  }
}

/// A final output file handed to whatever serves the bundle. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
  pub r#type: ResourceType,
  pub data: Arc<[u8]>,
  pub serve_path: Option<String>,
  pub source_path: Option<String>,
  pub target_path: Option<String>,
  pub hash: String,
  /// JSON encoded source map.
  pub source_map: Option<ArcStr>,
}

impl Resource {
  pub fn data_as_str(&self) -> Option<&str> {
    std::str::from_utf8(&self.data).ok()
  }

  /// Size counted against the in-memory linker cache bound.
  pub fn size(&self) -> usize {
    self.data.len() + self.source_map.as_ref().map_or(0, |map| map.len())
  }
}
