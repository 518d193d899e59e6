use isolink_common::{Arch, BundlerOptions, NormalizedBundlerOptions};
use sugar_path::SugarPath;

const DEFAULT_LINKER_CACHE_SIZE: usize = 100 * 1024 * 1024;

pub fn normalize_options(raw_options: BundlerOptions) -> NormalizedBundlerOptions {
  let arch = Arch::new(raw_options.arch.unwrap_or_else(|| "os".to_string()));

  let source_root = raw_options
    .source_root
    .unwrap_or_else(|| std::env::current_dir().expect("Failed to get current dir"));

  let linker_cache_dir =
    raw_options.linker_cache_dir.map(|dir| if dir.is_absolute() { dir } else { source_root.join(dir).normalize() });

  NormalizedBundlerOptions {
    include_source_map_instructions: raw_options
      .include_source_map_instructions
      .unwrap_or_else(|| arch.is_web()),
    arch,
    source_root,
    linker_cache_dir,
    linker_cache_size: raw_options.linker_cache_size.unwrap_or(DEFAULT_LINKER_CACHE_SIZE),
  }
}

#[test]
fn test_normalize_options_defaults() {
  use std::path::PathBuf;

  let options = normalize_options(BundlerOptions {
    arch: Some("web.browser".to_string()),
    source_root: Some(PathBuf::from("/project")),
    linker_cache_dir: Some(PathBuf::from(".meteor/local/linker")),
    ..BundlerOptions::default()
  });
  assert!(options.include_source_map_instructions);
  assert_eq!(options.linker_cache_dir, Some(PathBuf::from("/project/.meteor/local/linker")));
  assert_eq!(options.linker_cache_size, DEFAULT_LINKER_CACHE_SIZE);

  let options = normalize_options(BundlerOptions {
    source_root: Some(PathBuf::from("/project")),
    ..BundlerOptions::default()
  });
  assert_eq!(options.arch.as_str(), "os");
  assert!(!options.include_source_map_instructions);
}
