use std::path::PathBuf;

use crate::Arch;

#[derive(Debug)]
pub struct NormalizedBundlerOptions {
  pub arch: Arch,
  pub source_root: PathBuf,

  // --- Linker
  pub linker_cache_dir: Option<PathBuf>,
  /// Upper bound in bytes for the in-memory linker cache.
  pub linker_cache_size: usize,
  pub include_source_map_instructions: bool,
}
