use isolink_sourcemap::CombinedSource;
use isolink_utils::{
  ecmascript::to_js_string_literal, indexmap::FxIndexMap, path_ext::path_segments,
};

use super::prelinked_file::{LinkFile, Wrapper};

enum TreeNode {
  Dir(FxIndexMap<String, TreeNode>),
  /// Index into the linked files.
  File(usize),
}

/// Installed files nested by the segments of their install paths.
#[derive(Default)]
pub struct ModuleTree {
  root: FxIndexMap<String, TreeNode>,
}

impl ModuleTree {
  /// Every non-bare file with an install path. The first file claiming a path wins.
  pub fn build(files: &[LinkFile]) -> Self {
    let mut tree = Self::default();
    for (idx, file) in files.iter().enumerate() {
      if file.file.bare {
        continue;
      }
      if let Some(install_path) = &file.file.install_path {
        tree.add(install_path, idx);
      }
    }
    tree
  }

  fn add(&mut self, install_path: &str, idx: usize) {
    let segments = path_segments(install_path).collect::<Vec<_>>();
    let Some((last, dirs)) = segments.split_last() else { return };

    let mut walk = &mut self.root;
    for dir in dirs {
      let node = walk.entry((*dir).to_string()).or_insert_with(|| TreeNode::Dir(FxIndexMap::default()));
      match node {
        TreeNode::Dir(children) => walk = children,
        TreeNode::File(_) => return,
      }
    }
    walk.entry((*last).to_string()).or_insert(TreeNode::File(idx));
  }

  pub fn is_empty(&self) -> bool {
    self.root.is_empty()
  }

  pub fn write_to(&self, combined: &mut CombinedSource, files: &[LinkFile]) {
    write_dir(&self.root, combined, files);
  }
}

fn write_dir(dir: &FxIndexMap<String, TreeNode>, combined: &mut CombinedSource, files: &[LinkFile]) {
  combined.add_generated_code("{");
  for (i, (key, node)) in dir.iter().enumerate() {
    if i > 0 {
      combined.add_generated_code(",");
    }
    combined.add_generated_code(&to_js_string_literal(key));
    combined.add_generated_code(":");
    match node {
      TreeNode::Dir(children) => write_dir(children, combined, files),
      TreeNode::File(idx) => write_module(&files[*idx], combined),
    }
  }
  combined.add_generated_code("}");
}

/// A module with known dependencies is installed as `[...ids, function module(){}]`.
fn write_module(file: &LinkFile, combined: &mut CombinedSource) {
  let Some(deps) = file.file.deps.as_ref().filter(|deps| !deps.is_empty()) else {
    file.write_to(combined, Wrapper::Module);
    return;
  };
  combined.add_generated_code("[");
  for id in deps.keys() {
    combined.add_generated_code(&to_js_string_literal(id));
    combined.add_generated_code(",");
  }
  file.write_to(combined, Wrapper::Module);
  combined.add_generated_code("]");
}
