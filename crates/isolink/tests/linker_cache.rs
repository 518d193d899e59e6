mod common;

use std::{path::PathBuf, sync::Arc};

use common::memory_fs;
use isolink::{
  BuildDiagnostic, CacheKey, Diagnostics, ImportStatus, InstallOptions, Linker, LinkerCache,
  LinkerOptions, ScannedFile,
};
use isolink_fs::{FileSystem, SharedFileSystem};

fn file(source_path: &str, data: &str) -> ScannedFile {
  ScannedFile {
    source_path: source_path.to_string(),
    abs_path: PathBuf::from("/packages/core").join(source_path),
    data: data.to_string(),
    hash: isolink_utils::xxhash::xxhash_hex(data.as_bytes()),
    source_map: None,
    lazy: false,
    imported: ImportStatus::Static,
    bare: false,
    main_module: false,
    implicit: false,
    install_path: Some(format!("node_modules/meteor/core/{source_path}")),
    deps: None,
    pending_errors: Vec::new(),
  }
}

fn core_options() -> LinkerOptions {
  LinkerOptions {
    name: Some("core".to_string()),
    arch: "os".to_string(),
    install_options: Some(InstallOptions { extensions: vec![".js".to_string(), ".json".to_string()] }),
    declared_exports: vec!["Greet".to_string()],
    combined_serve_path: "/packages/core.js".to_string(),
    ..LinkerOptions::default()
  }
}

fn linker(fs: &SharedFileSystem, dir: Option<&str>) -> Linker {
  Linker::new(LinkerCache::new(1024 * 1024, dir.map(PathBuf::from), Arc::clone(fs)))
}

#[test]
fn linking_is_deterministic() {
  let fs = memory_fs(&[]);
  let files = [file("greet.js", "Greet = function () {};"), file("main.js", "require('./greet');")];
  let options = core_options();

  let mut diagnostics = Diagnostics::default();
  let cold = linker(&fs, None).link(&files, &options, &mut diagnostics);
  let again = linker(&fs, None).link(&files, &options, &mut diagnostics);
  assert_eq!(cold, again);

  let cached = linker(&fs, None);
  let first = cached.link(&files, &options, &mut diagnostics);
  let key = CacheKey::new(&files, &options);
  assert_eq!(cached.cache().get(&key, &mut diagnostics), Some(first.clone()));
  assert_eq!(cached.link(&files, &options, &mut diagnostics), cold);
  assert!(diagnostics.is_empty());
}

#[test]
fn cache_key_follows_hashes_and_options() {
  let files = vec![file("greet.js", "Greet = 1;")];
  let options = core_options();
  let key = CacheKey::new(&files, &options);

  let mut edited = files.clone();
  edited[0].hash = "0".repeat(32);
  assert_ne!(CacheKey::new(&edited, &options), key);

  // Only the hash stands for the contents.
  let mut same_hash = files.clone();
  same_hash[0].data = "Greet = 2;".to_string();
  assert_eq!(CacheKey::new(&same_hash, &options), key);

  let global = LinkerOptions { use_global_namespace: true, ..options.clone() };
  assert_ne!(CacheKey::new(&files, &global), key);

  let mut lazy = files;
  lazy[0].lazy = true;
  assert_ne!(CacheKey::new(&lazy, &options), key);
}

#[test]
fn disk_cache_survives_a_new_linker() {
  let fs = memory_fs(&[]);
  let files = [file("greet.js", "Greet = function () {};")];
  let options = core_options();
  let mut diagnostics = Diagnostics::default();

  let first = linker(&fs, Some("/cache"));
  let linked = first.link(&files, &options, &mut diagnostics);
  first.cache().flush();

  let key = CacheKey::new(&files, &options);
  assert!(fs.is_file(&PathBuf::from("/cache").join(key.file_name())));

  let second = linker(&fs, Some("/cache"));
  assert_eq!(second.cache().get(&key, &mut diagnostics), Some(linked));
  assert!(diagnostics.is_empty());
}

#[test]
fn stale_disk_entries_are_replaced() {
  let fs = memory_fs(&[]);
  let options = core_options();
  let mut diagnostics = Diagnostics::default();
  let linker = linker(&fs, Some("/cache"));

  linker.link(&[file("greet.js", "Greet = 1;")], &options, &mut diagnostics);
  linker.cache().flush();
  linker.link(&[file("greet.js", "Greet = 2;")], &options, &mut diagnostics);
  linker.cache().flush();

  let entries = fs.read_dir(&PathBuf::from("/cache")).unwrap();
  assert_eq!(entries.len(), 1);
}

#[test]
fn disk_entries_with_another_layout_are_kept() {
  let fs = memory_fs(&[]);
  let options = core_options();
  let mut diagnostics = Diagnostics::default();
  let linker = linker(&fs, Some("/cache"));

  let one = [file("greet.js", "Greet = 1;")];
  let two = [file("greet.js", "Greet = 1;"), file("main.js", "require('./greet');")];
  assert_ne!(CacheKey::new(&one, &options).prefix(), CacheKey::new(&two, &options).prefix());
  let edited = [file("greet.js", "Greet = 2;")];
  assert_eq!(CacheKey::new(&one, &options).prefix(), CacheKey::new(&edited, &options).prefix());

  linker.link(&one, &options, &mut diagnostics);
  linker.cache().flush();
  linker.link(&two, &options, &mut diagnostics);
  linker.cache().flush();
  assert_eq!(fs.read_dir(&PathBuf::from("/cache")).unwrap().len(), 2);

  linker.link(&edited, &options, &mut diagnostics);
  linker.cache().flush();
  let mut names = fs
    .read_dir(&PathBuf::from("/cache"))
    .unwrap()
    .into_iter()
    .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
    .collect::<Vec<_>>();
  names.sort();
  let mut expected = vec![CacheKey::new(&two, &options).file_name(), CacheKey::new(&edited, &options).file_name()];
  expected.sort();
  assert_eq!(names, expected);
}

#[test]
fn corrupt_disk_entries_are_misses() {
  let fs = memory_fs(&[]);
  let files = [file("greet.js", "Greet = 1;")];
  let options = core_options();
  let key = CacheKey::new(&files, &options);
  fs.create_dir_all(&PathBuf::from("/cache")).unwrap();
  fs.write(&PathBuf::from("/cache").join(key.file_name()), b"{ not json").unwrap();

  let mut diagnostics = Diagnostics::default();
  let linker = linker(&fs, Some("/cache"));
  let resources = linker.link(&files, &options, &mut diagnostics);

  assert_eq!(resources.len(), 1);
  assert!(!diagnostics.has_errors());
  assert!(matches!(diagnostics.warnings().next(), Some(BuildDiagnostic::CacheCorruption { .. })));
}

#[test]
fn failed_links_are_not_cached() {
  let fs = memory_fs(&[]);
  let files = [file("broken.js", "var = ;")];
  let options = core_options();
  let mut diagnostics = Diagnostics::default();
  let linker = linker(&fs, None);

  let resources = linker.link(&files, &options, &mut diagnostics);
  assert_eq!(resources.len(), 1);
  assert!(diagnostics.has_errors());

  let mut fresh = Diagnostics::default();
  assert_eq!(linker.cache().get(&CacheKey::new(&files, &options), &mut fresh), None);
}
