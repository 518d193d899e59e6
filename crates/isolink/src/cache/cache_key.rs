use isolink_utils::xxhash::HexHasher;
use serde::Serialize;

use crate::{
  link_stage::LinkerOptions,
  types::scanned_file::{ImportStatus, ScannedFile},
};

/// Bumped whenever the linked output format changes.
const CACHE_SALT: &str = "isolink-linker-1";

/// Identifies one link result. File contents are represented by their hashes only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  /// Digest of the linker options and the file layout. Entries sharing it differ only in
  /// file contents.
  prefix: String,
  /// Digest of the file hashes.
  suffix: String,
}

/// Everything about a file that shapes the output except its content.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileLayout<'a> {
  source_path: &'a str,
  abs_module_id: Option<String>,
  has_source_map: bool,
  main_module: bool,
  imported: ImportStatus,
  lazy: bool,
  bare: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileContent<'a> {
  hash: &'a str,
  deps: Option<Vec<&'a str>>,
}

impl CacheKey {
  pub fn new(files: &[ScannedFile], options: &LinkerOptions) -> Self {
    let layout = files
      .iter()
      .map(|file| FileLayout {
        source_path: &file.source_path,
        abs_module_id: file.abs_module_id(),
        has_source_map: file.source_map.is_some(),
        main_module: file.main_module,
        imported: file.imported,
        lazy: file.lazy,
        bare: file.bare,
      })
      .collect::<Vec<_>>();
    let prefix = HexHasher::default()
      .update(serde_json::to_vec(options).unwrap_or_default())
      .update(serde_json::to_vec(&layout).unwrap_or_default())
      .finish();

    let contents = files
      .iter()
      .map(|file| FileContent { hash: &file.hash, deps: file.dep_ids().map(Iterator::collect) })
      .collect::<Vec<_>>();
    let suffix = HexHasher::default()
      .update(CACHE_SALT)
      .update(serde_json::to_vec(&contents).unwrap_or_default())
      .finish();

    Self { prefix, suffix }
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  pub fn file_name(&self) -> String {
    format!("{}_{}.cache", self.prefix, self.suffix)
  }
}
