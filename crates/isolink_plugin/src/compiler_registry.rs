use std::sync::Arc;

use oxc_index::IndexVec;
use rustc_hash::FxHashMap;

use crate::CompilerPlugin;

oxc_index::define_index_type! {
  pub struct CompilerIdx = u32;
}

struct RegisteredCompiler {
  plugin: Arc<dyn CompilerPlugin>,
  extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerMatch {
  pub idx: CompilerIdx,
  /// `None` when the file matched by exact filename.
  pub extension: Option<String>,
}

/// Maps extensions and exact filenames to compilers.
#[derive(Default)]
pub struct CompilerRegistry {
  compilers: IndexVec<CompilerIdx, RegisteredCompiler>,
  by_extension: FxHashMap<String, CompilerIdx>,
  by_filename: FxHashMap<String, CompilerIdx>,
}

impl CompilerRegistry {
  /// Extensions are given without the leading dot, e.g. `coffee` or `module.css`. A later
  /// registration of the same key replaces the earlier one.
  pub fn register(
    &mut self,
    plugin: Arc<dyn CompilerPlugin>,
    extensions: &[&str],
    filenames: &[&str],
  ) -> CompilerIdx {
    let extensions = extensions.iter().map(|ext| ext.trim_start_matches('.').to_string()).collect();
    let idx = self.compilers.push(RegisteredCompiler { plugin, extensions });
    for ext in &self.compilers[idx].extensions {
      self.by_extension.insert(ext.clone(), idx);
    }
    for filename in filenames {
      self.by_filename.insert((*filename).to_string(), idx);
    }
    idx
  }

  pub fn plugin(&self, idx: CompilerIdx) -> &Arc<dyn CompilerPlugin> {
    &self.compilers[idx].plugin
  }

  pub fn extensions(&self, idx: CompilerIdx) -> &[String] {
    &self.compilers[idx].extensions
  }

  /// Exact filename first, then the longest registered extension.
  pub fn lookup(&self, path: &str) -> Option<CompilerMatch> {
    let basename = path.rsplit('/').next().unwrap_or(path);
    if let Some(&idx) = self.by_filename.get(basename) {
      return Some(CompilerMatch { idx, extension: None });
    }
    basename
      .match_indices('.')
      .map(|(i, _)| &basename[i + 1..])
      .find_map(|ext| self.by_extension.get(ext).map(|&idx| (idx, ext)))
      .map(|(idx, ext)| CompilerMatch { idx, extension: Some(ext.to_string()) })
  }
}

/// The text after the last dot of the basename, if any.
pub fn file_extension(path: &str) -> Option<&str> {
  let basename = path.rsplit('/').next().unwrap_or(path);
  basename.rfind('.').filter(|&i| i > 0).map(|i| &basename[i + 1..])
}

#[cfg(test)]
struct NoopCompiler;

#[cfg(test)]
impl CompilerPlugin for NoopCompiler {
  fn name(&self) -> std::borrow::Cow<'static, str> {
    "noop".into()
  }

  fn process_files_for_target(
    &self,
    _input_files: &mut [&mut dyn crate::InputFile],
  ) -> anyhow::Result<()> {
    Ok(())
  }
}

#[test]
fn test_longest_extension_wins() {
  let mut registry = CompilerRegistry::default();
  let css = registry.register(Arc::new(NoopCompiler), &["css"], &[]);
  let modules = registry.register(Arc::new(NoopCompiler), &["module.css"], &[]);
  let config = registry.register(Arc::new(NoopCompiler), &[], &["package.json"]);

  assert_eq!(registry.lookup("client/a.css").map(|m| m.idx), Some(css));
  let matched = registry.lookup("client/button.module.css").unwrap();
  assert_eq!((matched.idx, matched.extension.as_deref()), (modules, Some("module.css")));
  assert_eq!(registry.lookup("lib/package.json").map(|m| m.idx), Some(config));
  assert_eq!(registry.lookup("lib/other.json"), None);
  assert_eq!(file_extension("lib/.babelrc"), None);
  assert_eq!(file_extension("a/b.min.js"), Some("js"));
}
