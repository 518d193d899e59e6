use std::path::Path;

use sugar_path::SugarPath;

pub trait PathExt {
  fn expect_to_slash(&self) -> String;

  /// Whether any `/`-separated segment of the path equals `segment`.
  fn has_segment(&self, segment: &str) -> bool;
}

impl PathExt for Path {
  fn expect_to_slash(&self) -> String {
    self
      .to_slash()
      .unwrap_or_else(|| panic!("Failed to convert {:?} to slash str", self.display()))
      .into_owned()
  }

  fn has_segment(&self, segment: &str) -> bool {
    self.components().any(|component| component.as_os_str() == segment)
  }
}

/// Splits a `/`-separated path into its non-empty segments.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
  path.split('/').filter(|part| !part.is_empty())
}

#[test]
fn test_has_segment() {
  assert!(Path::new("client/imports/foo.js").has_segment("imports"));
  assert!(!Path::new("client/imports.js").has_segment("imports"));
}

#[test]
fn test_path_segments() {
  assert_eq!(path_segments("/node_modules//meteor/core/").collect::<Vec<_>>(), [
    "node_modules",
    "meteor",
    "core"
  ]);
}
