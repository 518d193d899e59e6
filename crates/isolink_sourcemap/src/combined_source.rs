use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap};

use crate::{identity_source_map, lines_count};

/// Joins generated code and mapped code into one file, shifting each piece's source map by the
/// number of lines emitted before it.
#[derive(Default)]
pub struct CombinedSource {
  code: String,
  line_offset: u32,
  maps: Vec<(SourceMap, u32)>,
}

impl CombinedSource {
  pub fn add_empty_lines(&mut self, count: u32) {
    self.start_new_line();
    for _ in 0..count {
      self.code.push('\n');
    }
    self.line_offset += count;
  }

  pub fn add_generated_code(&mut self, code: &str) {
    self.code.push_str(code);
    self.line_offset += lines_count(code);
  }

  /// Appends `code` starting on a fresh line. Without `map`, lines map to themselves in
  /// `source_name`.
  pub fn add_code_with_map(&mut self, source_name: &str, code: &str, map: Option<SourceMap>) {
    self.start_new_line();
    let map = map.unwrap_or_else(|| identity_source_map(source_name, code));
    self.maps.push((map, self.line_offset));
    self.add_generated_code(code);
  }

  pub fn code(&self) -> &str {
    &self.code
  }

  pub fn into_code_and_map(self) -> (String, Option<SourceMap>) {
    let map = match self.maps.len() {
      0 => None,
      _ => {
        let mut builder = ConcatSourceMapBuilder::default();
        for (map, line_offset) in &self.maps {
          builder.add_sourcemap(map, *line_offset);
        }
        Some(builder.into_sourcemap())
      }
    };
    (self.code, map)
  }

  fn start_new_line(&mut self) {
    if !self.code.is_empty() && !self.code.ends_with('\n') {
      self.code.push('\n');
      self.line_offset += 1;
    }
  }
}

#[test]
fn test_combined_source_shifts_maps() {
  let mut combined = CombinedSource::default();
  combined.add_generated_code("(function () {\n\n");
  combined.add_code_with_map("a.js", "var a = 1;\n", None);
  combined.add_empty_lines(1);
  combined.add_code_with_map("b.js", "var b = 2;\n", None);
  combined.add_generated_code("})();\n");

  let (code, map) = combined.into_code_and_map();
  assert_eq!(code, "(function () {\n\nvar a = 1;\n\nvar b = 2;\n})();\n");

  let map = map.unwrap();
  let a = crate::original_position(&map, 2, 0).unwrap();
  assert_eq!((a.source.as_deref(), a.line), (Some("a.js"), 0));
  let b = crate::original_position(&map, 4, 0).unwrap();
  assert_eq!((b.source.as_deref(), b.line), (Some("b.js"), 0));
}

#[test]
fn test_combined_source_breaks_unterminated_lines() {
  let mut combined = CombinedSource::default();
  combined.add_generated_code("var x");
  combined.add_code_with_map("a.js", "a();", None);
  assert_eq!(combined.code(), "var x\na();");
}
