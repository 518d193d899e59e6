use std::sync::Arc;

use isolink_utils::xxhash::xxhash_hex;

use crate::{FileOptions, ResourceType};

/// A resource as declared by a package, before any compiler has seen it.
#[derive(Debug, Clone)]
pub struct InputResource {
  pub r#type: ResourceType,
  /// Path relative to the package's source root, `/`-separated.
  pub path: String,
  pub data: Arc<[u8]>,
  pub hash: String,
  pub file_options: FileOptions,
}

impl InputResource {
  pub fn new(r#type: ResourceType, path: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
    let data = data.into();
    Self {
      r#type,
      path: path.into(),
      hash: xxhash_hex(&data),
      data,
      file_options: FileOptions::default(),
    }
  }

  pub fn source(path: impl Into<String>, data: &str) -> Self {
    Self::new(ResourceType::Source, path, data.as_bytes())
  }

  #[must_use]
  pub fn with_file_options(mut self, file_options: FileOptions) -> Self {
    self.file_options = file_options;
    self
  }
}
