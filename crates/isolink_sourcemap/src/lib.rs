mod combined_source;
mod lines_count;
mod lookup;
mod source;

pub use crate::{
  combined_source::CombinedSource,
  lines_count::lines_count,
  lookup::{OriginalPosition, original_position},
  source::Source,
};
pub use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap, SourceMapBuilder};

/// Identity mapping for `code`: every generated line maps to the same line of `source_name`.
pub fn identity_source_map(source_name: &str, code: &str) -> SourceMap {
  let mut builder = SourceMapBuilder::default();
  let source_id = builder.add_source_and_content(source_name, code);
  for line in 0..=lines_count(code) {
    builder.add_token(line, 0, line, 0, Some(source_id), None);
  }
  builder.into_sourcemap()
}
