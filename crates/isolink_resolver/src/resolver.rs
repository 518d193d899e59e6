use std::{
  ffi::OsStr,
  path::{Path, PathBuf},
  sync::Arc,
};

use dashmap::DashMap;
use isolink_common::PackageJson;
use isolink_fs::{FileKind, SharedFileSystem};
use sugar_path::SugarPath;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResolverOptions {
  pub source_root: PathBuf,
  /// Searched after the node_modules directories between the importer and the source root.
  pub node_modules_paths: Vec<PathBuf>,
  /// Tried in order, with the leading dot, e.g. `.js`.
  pub extensions: Vec<String>,
  /// Prefer the `browser` field of `package.json` over `main`.
  pub browser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  pub path: PathBuf,
  /// Every `package.json` whose `main`/`browser` field was followed to reach `path`.
  pub package_jsons: Vec<Arc<PackageJson>>,
}

pub struct Resolver {
  fs: SharedFileSystem,
  options: ResolverOptions,
  stat_cache: DashMap<PathBuf, Option<FileKind>>,
  package_json_cache: DashMap<PathBuf, Option<Arc<PackageJson>>>,
}

impl Resolver {
  pub fn new(fs: SharedFileSystem, options: ResolverOptions) -> Self {
    Self { fs, options, stat_cache: DashMap::default(), package_json_cache: DashMap::default() }
  }

  pub fn options(&self) -> &ResolverOptions {
    &self.options
  }

  /// Resolves `id` as imported from the file at `parent_path`. `is_known_file` reports files
  /// that exist only in memory (compiler outputs) and are not on disk.
  pub fn resolve(
    &self,
    id: &str,
    parent_path: &Path,
    is_known_file: &dyn Fn(&Path) -> bool,
  ) -> Option<Resolution> {
    let mut ctx = ResolveContext { is_known_file, package_jsons: Vec::new(), seen_dirs: Vec::new() };

    let resolved = if let Some(rest) = id.strip_prefix('/') {
      self.join_and_stat(&mut ctx, &self.options.source_root, rest)
    } else if is_relative(id) {
      self.join_and_stat(&mut ctx, parent_path.parent().unwrap_or(Path::new("/")), id)
    } else {
      self.resolve_node_module(&mut ctx, id, parent_path)
    };

    resolved.map(|path| Resolution { path, package_jsons: ctx.package_jsons })
  }

  fn resolve_node_module(
    &self,
    ctx: &mut ResolveContext,
    id: &str,
    parent_path: &Path,
  ) -> Option<PathBuf> {
    let source_root = &self.options.source_root;
    let mut dir = parent_path.parent();
    while let Some(current) = dir {
      if !current.starts_with(source_root) {
        break;
      }
      if current.file_name() != Some(OsStr::new("node_modules")) {
        if let Some(found) = self.join_and_stat(ctx, &current.join("node_modules"), id) {
          return Some(found);
        }
      }
      if current == source_root {
        break;
      }
      dir = current.parent();
    }

    self.options.node_modules_paths.iter().find_map(|node_modules| {
      let found = self.join_and_stat(ctx, node_modules, id);
      if found.is_some() {
        debug!("resolved {id} from external node_modules {}", node_modules.display());
      }
      found
    })
  }

  /// Exact file, then each extension, then the directory's `package.json` main, then `index`.
  fn join_and_stat(&self, ctx: &mut ResolveContext, base: &Path, rel: &str) -> Option<PathBuf> {
    let path = base.join(rel).normalize();

    if self.is_file(ctx, &path) {
      return Some(path);
    }

    if let Some(found) = self.try_extensions(ctx, &path) {
      return Some(found);
    }

    if self.kind(&path) != Some(FileKind::Dir) || ctx.seen_dirs.contains(&path) {
      return None;
    }
    ctx.seen_dirs.push(path.clone());

    if let Some(pkg) = self.read_package_json(&path.join("package.json")) {
      if let Some(main) = pkg.main_field(self.options.browser) {
        let main = main.to_string();
        ctx.package_jsons.push(Arc::clone(&pkg));
        if let Some(found) = self.join_and_stat(ctx, &path, &main) {
          return Some(found);
        }
        ctx.package_jsons.pop();
      }
    }

    let index = path.join("index");
    if self.is_file(ctx, &index) {
      return Some(index);
    }
    self.try_extensions(ctx, &index)
  }

  fn try_extensions(&self, ctx: &ResolveContext, path: &Path) -> Option<PathBuf> {
    self.options.extensions.iter().find_map(|ext| {
      let mut candidate = path.as_os_str().to_os_string();
      candidate.push(ext);
      let candidate = PathBuf::from(candidate);
      self.is_file(ctx, &candidate).then_some(candidate)
    })
  }

  fn is_file(&self, ctx: &ResolveContext, path: &Path) -> bool {
    (ctx.is_known_file)(path) || self.kind(path) == Some(FileKind::File)
  }

  fn kind(&self, path: &Path) -> Option<FileKind> {
    if let Some(kind) = self.stat_cache.get(path) {
      return *kind;
    }
    let kind = self.fs.kind(path).ok();
    self.stat_cache.insert(path.to_path_buf(), kind);
    kind
  }

  pub fn read_package_json(&self, path: &Path) -> Option<Arc<PackageJson>> {
    if let Some(pkg) = self.package_json_cache.get(path) {
      return pkg.clone();
    }
    let pkg = self
      .fs
      .read_to_string(path)
      .ok()
      .and_then(|content| PackageJson::parse(path, &content).ok())
      .map(Arc::new);
    self.package_json_cache.insert(path.to_path_buf(), pkg.clone());
    pkg
  }
}

struct ResolveContext<'a> {
  is_known_file: &'a dyn Fn(&Path) -> bool,
  package_jsons: Vec<Arc<PackageJson>>,
  seen_dirs: Vec<PathBuf>,
}

fn is_relative(id: &str) -> bool {
  id == "." || id == ".." || id.starts_with("./") || id.starts_with("../")
}

#[cfg(test)]
fn resolver_for(files: &[(&str, &str)], browser: bool) -> Resolver {
  let fs = isolink_fs::MemoryFileSystem::new(files);
  Resolver::new(Arc::new(fs), ResolverOptions {
    source_root: PathBuf::from("/app"),
    node_modules_paths: vec![PathBuf::from("/npm/node_modules")],
    extensions: vec![".js".to_string(), ".json".to_string()],
    browser,
  })
}

#[test]
fn test_extension_match_beats_directory_index() {
  let resolver = resolver_for(&[("/app/x.js", ""), ("/app/x/index.js", ""), ("/app/main.js", "")], false);
  let resolution = resolver.resolve("./x", Path::new("/app/main.js"), &|_| false).unwrap();
  assert_eq!(resolution.path, PathBuf::from("/app/x.js"));
}

#[test]
fn test_absolute_and_parent_relative() {
  let resolver = resolver_for(&[("/app/lib/util.js", ""), ("/app/client/main.js", "")], false);
  let from = Path::new("/app/client/main.js");
  assert_eq!(resolver.resolve("/lib/util", from, &|_| false).unwrap().path, Path::new("/app/lib/util.js"));
  assert_eq!(resolver.resolve("../lib/util.js", from, &|_| false).unwrap().path, Path::new("/app/lib/util.js"));
  assert!(resolver.resolve("./nope", from, &|_| false).is_none());
}

#[test]
fn test_known_files_count_as_existing() {
  let resolver = resolver_for(&[], false);
  let known = |path: &Path| path == Path::new("/app/gen.coffee");
  let resolution = resolver.resolve("./gen.coffee", Path::new("/app/main.js"), &known).unwrap();
  assert_eq!(resolution.path, PathBuf::from("/app/gen.coffee"));
}

#[test]
fn test_node_modules_walk_and_package_main() {
  let resolver = resolver_for(
    &[
      ("/app/node_modules/lib/package.json", r#"{"name":"lib","main":"./dist/lib","browser":"./dist/browser.js"}"#),
      ("/app/node_modules/lib/dist/lib.js", ""),
      ("/app/node_modules/lib/dist/browser.js", ""),
      ("/app/client/deep/main.js", ""),
      ("/npm/node_modules/ext/index.js", ""),
    ],
    false,
  );
  let from = Path::new("/app/client/deep/main.js");

  let resolution = resolver.resolve("lib", from, &|_| false).unwrap();
  assert_eq!(resolution.path, PathBuf::from("/app/node_modules/lib/dist/lib.js"));
  assert_eq!(resolution.package_jsons.len(), 1);
  assert_eq!(resolution.package_jsons[0].name.as_deref(), Some("lib"));

  assert_eq!(resolver.resolve("ext", from, &|_| false).unwrap().path, Path::new("/npm/node_modules/ext/index.js"));
  assert!(resolver.resolve("missing", from, &|_| false).is_none());
}

#[test]
fn test_browser_field_on_web() {
  let resolver = resolver_for(
    &[
      ("/app/node_modules/lib/package.json", r#"{"main":"./main.js","browser":"./browser.js"}"#),
      ("/app/node_modules/lib/main.js", ""),
      ("/app/node_modules/lib/browser.js", ""),
    ],
    true,
  );
  let resolution = resolver.resolve("lib", Path::new("/app/main.js"), &|_| false).unwrap();
  assert_eq!(resolution.path, PathBuf::from("/app/node_modules/lib/browser.js"));
}
