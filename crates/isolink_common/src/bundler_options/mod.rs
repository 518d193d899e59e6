pub mod normalized_bundler_options;

use std::path::PathBuf;

#[derive(Default, Debug, Clone)]
pub struct BundlerOptions {
  pub arch: Option<String>,
  pub source_root: Option<PathBuf>,

  // --- Linker
  pub linker_cache_dir: Option<PathBuf>,
  pub linker_cache_size: Option<usize>,
  pub include_source_map_instructions: Option<bool>,
}
