use oxc_sourcemap::SourceMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
  pub source: Option<String>,
  /// 0-based
  pub line: u32,
  /// 0-based
  pub column: u32,
}

/// Maps a 0-based generated position back through `map`.
pub fn original_position(map: &SourceMap, line: u32, column: u32) -> Option<OriginalPosition> {
  let lookup_table = map.generate_lookup_table();
  let token = map.lookup_token(&lookup_table, line, column)?;
  Some(OriginalPosition {
    source: token.get_source_id().and_then(|id| map.get_source(id)).map(ToString::to_string),
    line: token.get_src_line(),
    column: token.get_src_col(),
  })
}

#[test]
fn test_original_position() {
  let map = crate::identity_source_map("a.coffee", "x = 1\ny = 2\n");
  let position = original_position(&map, 1, 0).unwrap();
  assert_eq!(position.source.as_deref(), Some("a.coffee"));
  assert_eq!(position.line, 1);
}
